//! # Hyperdata Protocol
//!
//! Wire types shared by the hyperdata engine and its transports.
//!
//! This crate provides:
//! - `Link` and the well-known link relation names
//! - `Representation`, the JSON shape of resources, collections and
//!   desired-state documents
//! - The `text/uri-list` codec
//! - `Body` and `WriteResponse` for write operations
//!
//! This is a pure protocol crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod link;
mod messages;
mod representation;
pub mod uri_list;

pub use error::{ProtocolError, ProtocolResult};
pub use link::{rel, Link};
pub use messages::{media_type, Body, WriteResponse};
pub use representation::Representation;
