//! A resolver that records every call.

use hyperdata_engine::{MapResolver, UriResolver};
use parking_lot::Mutex;

/// A call made to a [`RecordingResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolverCall {
    /// `add(document, resolved)`.
    Add(String, String),
    /// `update(document, resolved)`.
    Update(String, String),
    /// `remove(uri)`.
    Remove(String),
}

/// A [`MapResolver`] that records mutations.
///
/// Lookups are not recorded; they happen on every sync step.
#[derive(Debug, Default)]
pub struct RecordingResolver {
    inner: MapResolver,
    calls: Mutex<Vec<ResolverCall>>,
}

impl RecordingResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the recorded calls.
    pub fn calls(&self) -> Vec<ResolverCall> {
        self.calls.lock().clone()
    }

    /// Returns the URIs passed to `remove`, in order.
    pub fn removed(&self) -> Vec<String> {
        self.calls
            .lock()
            .iter()
            .filter_map(|c| match c {
                ResolverCall::Remove(uri) => Some(uri.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the mapping for `document_uri`, if any.
    pub fn get(&self, document_uri: &str) -> Option<String> {
        self.inner.get(document_uri)
    }

    /// Returns the number of mappings.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns true if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}

impl UriResolver for RecordingResolver {
    fn add(&self, document_uri: &str, resolved_uri: &str) -> bool {
        self.calls.lock().push(ResolverCall::Add(
            document_uri.to_owned(),
            resolved_uri.to_owned(),
        ));
        self.inner.add(document_uri, resolved_uri)
    }

    fn update(&self, document_uri: &str, resolved_uri: &str) -> bool {
        self.calls.lock().push(ResolverCall::Update(
            document_uri.to_owned(),
            resolved_uri.to_owned(),
        ));
        self.inner.update(document_uri, resolved_uri)
    }

    fn remove(&self, uri: &str) -> bool {
        self.calls.lock().push(ResolverCall::Remove(uri.to_owned()));
        self.inner.remove(uri)
    }

    fn resolve(&self, document_uri: &str) -> String {
        self.inner.resolve(document_uri)
    }
}
