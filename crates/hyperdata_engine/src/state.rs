//! Per-resource hydration state.
//!
//! Every [`Resource`] carries exactly one [`State`], created with the
//! resource and never moved to another one. The state records how much of
//! the resource has been fetched and which child slots the engine itself
//! added as placeholders.
//!
//! ```text
//! unknown ──► locationOnly ──► hydrated ◄──┐
//!    │            feedOnly ───►    │       │ refresh
//!    └──► virtual ──(create)──►    └───────┘
//! ```

use crate::error::{SyncError, SyncResult};
use crate::resource::Resource;
use crate::transport::LinkTransport;
use hyperdata_protocol::{rel, Body, Link, Representation, WriteResponse};
use std::collections::BTreeSet;
use tracing::debug;

/// Hydration status of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    /// A placeholder with neither identity nor content.
    Unknown,
    /// No identity; exists only to be created.
    Virtual,
    /// Identity known, content not fetched.
    LocationOnly,
    /// A collection whose items came from a feed; own attributes not fetched.
    FeedOnly,
    /// Content reflects the last successful fetch or write.
    Hydrated,
}

impl Status {
    /// Returns true if a get must hit the network.
    pub fn needs_fetch(&self) -> bool {
        matches!(
            self,
            Status::Unknown | Status::LocationOnly | Status::FeedOnly
        )
    }

    /// Returns true if the engine allows moving from `self` to `next`.
    ///
    /// Transitions only move forward; `hydrated` never goes back and an
    /// `unknown` placeholder must gain an identity (or become virtual)
    /// before it can be hydrated.
    pub fn can_transition_to(&self, next: Status) -> bool {
        if *self == next {
            return true;
        }
        match self {
            Status::Unknown => matches!(next, Status::LocationOnly | Status::Virtual),
            Status::Virtual | Status::LocationOnly | Status::FeedOnly => {
                next == Status::Hydrated
            }
            Status::Hydrated => false,
        }
    }
}

/// Hydration status plus tracked placeholder names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct State {
    status: Status,
    tracked: BTreeSet<String>,
}

impl State {
    pub(crate) fn new(status: Status) -> Self {
        Self {
            status,
            tracked: BTreeSet::new(),
        }
    }

    /// Returns the current status.
    pub fn status(&self) -> Status {
        self.status
    }

    /// Returns true once content has been fetched or written.
    pub fn is_hydrated(&self) -> bool {
        self.status == Status::Hydrated
    }

    /// Moves to `next`, rejecting backward transitions.
    pub(crate) fn transition(&mut self, next: Status) -> SyncResult<()> {
        if !self.status.can_transition_to(next) {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", self.status),
                to: format!("{:?}", next),
            });
        }
        if self.status != next {
            debug!(from = ?self.status, to = ?next, "resource state transition");
        }
        self.status = next;
        Ok(())
    }

    /// Records `name` as an engine-added placeholder.
    ///
    /// Returns false if it was already tracked.
    pub(crate) fn track(&mut self, name: &str) -> bool {
        self.tracked.insert(name.to_owned())
    }

    /// Returns true if `name` is an engine-added placeholder.
    pub fn is_tracked(&self, name: &str) -> bool {
        self.tracked.contains(name)
    }

    /// Returns all tracked placeholder names.
    pub fn tracked(&self) -> impl Iterator<Item = &str> {
        self.tracked.iter().map(String::as_str)
    }
}

/// Network accessors bound to one resource's link relations.
///
/// Obtained through [`Resource::accessors`]. Each call re-reads the links so
/// it always follows the resource's current relations.
pub struct Accessors<'a> {
    resource: &'a Resource,
    transport: &'a dyn LinkTransport,
}

impl<'a> Accessors<'a> {
    pub(crate) fn new(resource: &'a Resource, transport: &'a dyn LinkTransport) -> Self {
        Self {
            resource,
            transport,
        }
    }

    fn identity_link(&self) -> SyncResult<Link> {
        self.resource
            .identity_link()
            .ok_or(SyncError::MissingIdentity)
    }

    fn relation(&self, name: &str) -> SyncResult<Link> {
        self.resource
            .link(name)
            .ok_or_else(|| SyncError::unsupported(name))
    }

    /// Fetches the resource (or collection) through its identity link.
    pub async fn get(&self) -> SyncResult<Representation> {
        let link = self.identity_link()?;
        self.transport.get(&link).await
    }

    /// Fetches the form behind relation `name`.
    ///
    /// `Ok(None)` when the resource has no such link.
    pub async fn form(&self, name: &str) -> SyncResult<Option<Representation>> {
        match self.resource.link(name) {
            Some(link) => self.transport.get(&link).await.map(Some),
            None => Ok(None),
        }
    }

    /// Fetches the identifier list behind relation `name`.
    pub async fn get_uri_list(&self, name: &str) -> SyncResult<Vec<String>> {
        let link = self.relation(name)?;
        self.transport.get_uri_list(&link).await
    }

    /// POSTs `body` to the resource's identity.
    pub async fn create(&self, body: Body) -> SyncResult<WriteResponse> {
        let link = self.identity_link()?;
        self.transport.post(&link, body).await
    }

    /// PUTs `body` to the resource's identity.
    pub async fn update(&self, body: Body) -> SyncResult<WriteResponse> {
        let link = self.identity_link()?;
        self.transport.put(&link, body).await
    }

    /// DELETEs the resource's identity, optionally with a body.
    pub async fn delete(&self, body: Option<Body>) -> SyncResult<WriteResponse> {
        let link = self.identity_link()?;
        self.transport.delete(&link, body).await
    }

    /// POSTs `body` to the target of relation `name`.
    pub async fn post_to(&self, name: &str, body: Body) -> SyncResult<WriteResponse> {
        let link = self.relation(name)?;
        self.transport.post(&link, body).await
    }

    /// PUTs `body` to the target of relation `name`.
    pub async fn put_to(&self, name: &str, body: Body) -> SyncResult<WriteResponse> {
        let link = self.relation(name)?;
        self.transport.put(&link, body).await
    }

    /// DELETEs the target of relation `name`, optionally with a body.
    pub async fn delete_at(&self, name: &str, body: Option<Body>) -> SyncResult<WriteResponse> {
        let link = self.relation(name)?;
        self.transport.delete(&link, body).await
    }

    /// Returns true if the resource links to relation `name`.
    pub fn has(&self, name: &str) -> bool {
        self.resource.link(name).is_some()
    }

    /// Returns true if the resource can be fetched.
    pub fn is_fetchable(&self) -> bool {
        rel::IDENTITY.iter().any(|r| self.has(r))
    }
}
