//! Link-following transport abstraction.

use crate::error::{SyncError, SyncResult};
use async_trait::async_trait;
use hyperdata_protocol::{rel, Body, Link, Representation, WriteResponse};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

/// Follows links and performs writes against their targets.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, mock for testing, etc.). The engine only decides
/// *which* link to follow; the transport does the I/O.
#[async_trait]
pub trait LinkTransport: Send + Sync {
    /// Fetches the representation behind `link`.
    async fn get(&self, link: &Link) -> SyncResult<Representation>;

    /// Fetches the uri-list behind `link`.
    async fn get_uri_list(&self, link: &Link) -> SyncResult<Vec<String>>;

    /// POSTs `body` to `link`.
    async fn post(&self, link: &Link, body: Body) -> SyncResult<WriteResponse>;

    /// PUTs `body` to `link`.
    async fn put(&self, link: &Link, body: Body) -> SyncResult<WriteResponse>;

    /// DELETEs `link`, optionally with a body.
    async fn delete(&self, link: &Link, body: Option<Body>) -> SyncResult<WriteResponse>;
}

/// A call recorded by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub enum TransportCall {
    /// A representation fetch.
    Get(String),
    /// A uri-list fetch.
    GetUriList(String),
    /// A POST.
    Post(String, Body),
    /// A PUT.
    Put(String, Body),
    /// A DELETE.
    Delete(String, Option<Body>),
}

impl TransportCall {
    /// Returns the target href.
    pub fn href(&self) -> &str {
        match self {
            TransportCall::Get(href)
            | TransportCall::GetUriList(href)
            | TransportCall::Post(href, _)
            | TransportCall::Put(href, _)
            | TransportCall::Delete(href, _) => href,
        }
    }

    /// Returns true for POST, PUT and DELETE.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            TransportCall::Post(..) | TransportCall::Put(..) | TransportCall::Delete(..)
        )
    }
}

#[derive(Debug, Default)]
struct MockState {
    representations: HashMap<String, Representation>,
    uri_lists: HashMap<String, Vec<String>>,
    failing: HashSet<String>,
    calls: Vec<TransportCall>,
    next_id: u64,
}

/// A scripted transport for testing.
///
/// GETs answer from the representations set with [`MockTransport::set`]
/// (unknown hrefs are `NotFound`). POSTs answer `201 Created` at the first
/// free `{href}{n}`, PUTs and DELETEs answer `204`. Every call is recorded.
#[derive(Debug, Default)]
pub struct MockTransport {
    state: Mutex<MockState>,
}

impl MockTransport {
    /// Creates a new mock transport.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the representation served at `href`.
    pub fn set(&self, href: impl Into<String>, repr: Representation) {
        self.state.lock().representations.insert(href.into(), repr);
    }

    /// Sets the uri-list served at `href`.
    pub fn set_uri_list(&self, href: impl Into<String>, uris: Vec<String>) {
        self.state.lock().uri_lists.insert(href.into(), uris);
    }

    /// Makes every call to `href` fail with a retryable transport error.
    pub fn fail(&self, href: impl Into<String>) {
        self.state.lock().failing.insert(href.into());
    }

    /// Returns all recorded calls.
    pub fn calls(&self) -> Vec<TransportCall> {
        self.state.lock().calls.clone()
    }

    /// Returns the recorded write calls.
    pub fn writes(&self) -> Vec<TransportCall> {
        self.calls().into_iter().filter(TransportCall::is_write).collect()
    }

    /// Returns how many GETs hit `href`.
    pub fn get_count(&self, href: &str) -> usize {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|c| matches!(c, TransportCall::Get(h) if h == href))
            .count()
    }

    /// Forgets recorded calls.
    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    fn record(&self, call: TransportCall) -> SyncResult<()> {
        let mut state = self.state.lock();
        let failing = state.failing.contains(call.href());
        let href = call.href().to_owned();
        state.calls.push(call);
        if failing {
            return Err(SyncError::transport_retryable(format!(
                "mock failure for {href}"
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl LinkTransport for MockTransport {
    async fn get(&self, link: &Link) -> SyncResult<Representation> {
        self.record(TransportCall::Get(link.href.clone()))?;
        self.state
            .lock()
            .representations
            .get(&link.href)
            .cloned()
            .ok_or_else(|| SyncError::not_found(&link.href))
    }

    async fn get_uri_list(&self, link: &Link) -> SyncResult<Vec<String>> {
        self.record(TransportCall::GetUriList(link.href.clone()))?;
        self.state
            .lock()
            .uri_lists
            .get(&link.href)
            .cloned()
            .ok_or_else(|| SyncError::not_found(&link.href))
    }

    async fn post(&self, link: &Link, body: Body) -> SyncResult<WriteResponse> {
        self.record(TransportCall::Post(link.href.clone(), body.clone()))?;
        let mut state = self.state.lock();
        match body {
            Body::Representation(repr) => {
                let location = loop {
                    state.next_id += 1;
                    let candidate = format!("{}{}", link.href, state.next_id);
                    if !state.representations.contains_key(&candidate) {
                        break candidate;
                    }
                };
                let created = Representation {
                    links: vec![Link::new(rel::SELF, location.clone())],
                    ..repr
                };
                state.representations.insert(location.clone(), created);
                Ok(WriteResponse::created(location))
            }
            Body::UriList(uris) => {
                state
                    .uri_lists
                    .entry(link.href.clone())
                    .or_default()
                    .extend(uris);
                Ok(WriteResponse::no_content())
            }
        }
    }

    async fn put(&self, link: &Link, body: Body) -> SyncResult<WriteResponse> {
        self.record(TransportCall::Put(link.href.clone(), body.clone()))?;
        let mut state = self.state.lock();
        match body {
            Body::Representation(repr) => {
                let stored = state
                    .representations
                    .entry(link.href.clone())
                    .or_default();
                stored.attributes.extend(repr.attributes);
            }
            Body::UriList(uris) => {
                state.uri_lists.insert(link.href.clone(), uris);
            }
        }
        Ok(WriteResponse::no_content())
    }

    async fn delete(&self, link: &Link, body: Option<Body>) -> SyncResult<WriteResponse> {
        self.record(TransportCall::Delete(link.href.clone(), body.clone()))?;
        let mut state = self.state.lock();
        match body {
            Some(Body::UriList(uris)) => {
                if let Some(list) = state.uri_lists.get_mut(&link.href) {
                    list.retain(|u| !uris.contains(u));
                }
            }
            _ => {
                state.representations.remove(&link.href);
            }
        }
        Ok(WriteResponse::no_content())
    }
}
