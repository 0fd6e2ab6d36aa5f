//! # Hyperdata Engine
//!
//! Client-side engine for a "network of data": an in-memory graph of
//! hypermedia resources, lazily hydrated from a REST API and reconciled
//! against desired-state documents.
//!
//! This crate provides:
//! - Per-resource hydration state (unknown → locationOnly/virtual → hydrated)
//! - Sparse resource factories
//! - Cache orchestration (get, try-get, create, update, delete)
//! - Collection differencing with prioritized comparators
//! - A recursive synchronizer driven by caller-supplied sync steps
//! - Pooled collections for shared reference data
//! - Link transport abstraction with an HTTP adapter and a mock
//!
//! ## Architecture
//!
//! The engine decides *which* link to follow or write, in what order, and
//! at most once per resource per pass. Everything else sits behind a seam:
//! 1. [`LinkTransport`] performs GET/POST/PUT/DELETE against link targets
//! 2. [`FormMerge`] turns a document plus a create/edit form into a payload
//! 3. [`UriResolver`] maps document identities to resolved identities
//!
//! ## Key Invariants
//!
//! - Every resource carries exactly one state, created with it
//! - State only moves forward; `hydrated` never reverts
//! - Differencer phases run delete, then update, then create
//! - A missing form link makes the write a local no-op
//! - Resolvers are scoped to a sync call, never process-wide

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod config;
mod diff;
mod error;
mod http;
mod merge;
mod policy;
mod pooled;
mod resolver;
mod resource;
pub mod sparse;
mod state;
mod sync;
mod transport;

pub use cache::Cache;
pub use config::{CacheConfig, SyncOptions};
pub use diff::{
    default_comparators, diff_collection, diff_uri_list, partition, AttributeComparator,
    CollectionDiff, Comparator, DiffActions, LinkRelationComparator, SyncAction, SyncInfo,
    UriListActions, UriListDiff,
};
pub use error::{SyncError, SyncResult};
pub use http::{HttpClient, HttpRequest, HttpResponse, HttpTransport, Method};
pub use merge::{FieldMerge, FormMerge};
pub use policy::CollectionPolicy;
pub use pooled::{PooledCollection, PooledReferenceStep};
pub use resolver::{resolve_document, MapResolver, PassthroughResolver, UriResolver};
pub use resource::Resource;
pub use state::{Accessors, State, Status};
pub use sync::{
    NamedCollectionStep, NamedSingletonStep, SyncReport, SyncStep, Synchronizer, UriListStep,
};
pub use transport::{LinkTransport, MockTransport, TransportCall};
