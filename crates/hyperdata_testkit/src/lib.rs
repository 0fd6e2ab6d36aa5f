//! # Hyperdata Testkit
//!
//! Test utilities for the hyperdata engine.
//!
//! This crate provides:
//! - An in-memory hypermedia API server behind the engine's HTTP seam
//! - A todo API fixture with pooled tags and a read-only archive
//! - A recording resolver for asserting identity mappings
//! - Property-based test generators using proptest
//! - Test logging setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use hyperdata_testkit::prelude::*;
//!
//! #[tokio::test]
//! async fn syncs_todos() {
//!     let api = TestApi::new(todo_api());
//!     let desired = collection_document(vec![todo_document("milk", false, &[])]);
//!     // ... sync and assert against api.server
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod logging;
pub mod resolver;
pub mod server;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::logging::*;
    pub use crate::resolver::*;
    pub use crate::server::*;
}

pub use fixtures::*;
pub use generators::*;
pub use logging::init_tracing;
pub use resolver::{RecordingResolver, ResolverCall};
pub use server::{CollectionSpec, MemoryServer};
