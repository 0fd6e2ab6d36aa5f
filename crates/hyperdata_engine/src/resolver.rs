//! Document-identity to resolved-identity mapping.
//!
//! A desired-state document may quote identities that do not exist in the
//! target graph (for example when copying a graph into a new context). As
//! the synchronizer matches or creates resources it records
//! `document uri -> resolved uri` so later cross-references can be rewritten.
//!
//! Resolvers are scoped to a synchronization call through
//! [`SyncOptions`](crate::SyncOptions); there is no process-wide instance.

use hyperdata_protocol::{Link, Representation};
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::trace;

/// Maps document identities to resolved identities.
pub trait UriResolver: Send + Sync {
    /// Adds a mapping. Returns false (and changes nothing) if `document_uri`
    /// is already mapped.
    fn add(&self, document_uri: &str, resolved_uri: &str) -> bool;

    /// Retargets an existing mapping. Returns false if `document_uri` is not
    /// mapped.
    fn update(&self, document_uri: &str, resolved_uri: &str) -> bool;

    /// Removes every mapping whose document or resolved identity is `uri`.
    /// Returns true if anything was removed.
    fn remove(&self, uri: &str) -> bool;

    /// Returns the resolved identity, or `document_uri` unchanged if unmapped.
    fn resolve(&self, document_uri: &str) -> String;

    /// Adds the mapping, or retargets it if one already exists.
    ///
    /// A document identity that already resolves to itself is not recorded.
    fn register(&self, document_uri: &str, resolved_uri: &str) {
        if document_uri == resolved_uri {
            return;
        }
        if !self.add(document_uri, resolved_uri) {
            self.update(document_uri, resolved_uri);
        }
    }
}

/// A resolver that maps nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct PassthroughResolver;

impl UriResolver for PassthroughResolver {
    fn add(&self, _document_uri: &str, _resolved_uri: &str) -> bool {
        true
    }

    fn update(&self, _document_uri: &str, _resolved_uri: &str) -> bool {
        true
    }

    fn remove(&self, _uri: &str) -> bool {
        false
    }

    fn resolve(&self, document_uri: &str) -> String {
        document_uri.to_owned()
    }
}

/// An in-memory resolver.
#[derive(Debug, Default)]
pub struct MapResolver {
    map: RwLock<HashMap<String, String>>,
}

impl MapResolver {
    /// Creates an empty resolver.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of mappings.
    pub fn len(&self) -> usize {
        self.map.read().len()
    }

    /// Returns true if there are no mappings.
    pub fn is_empty(&self) -> bool {
        self.map.read().is_empty()
    }

    /// Returns the mapping for `document_uri`, if any.
    pub fn get(&self, document_uri: &str) -> Option<String> {
        self.map.read().get(document_uri).cloned()
    }
}

impl UriResolver for MapResolver {
    fn add(&self, document_uri: &str, resolved_uri: &str) -> bool {
        let mut map = self.map.write();
        if map.contains_key(document_uri) {
            return false;
        }
        trace!(document_uri, resolved_uri, "resolver add");
        map.insert(document_uri.to_owned(), resolved_uri.to_owned());
        true
    }

    fn update(&self, document_uri: &str, resolved_uri: &str) -> bool {
        match self.map.write().get_mut(document_uri) {
            Some(target) => {
                trace!(document_uri, resolved_uri, "resolver update");
                *target = resolved_uri.to_owned();
                true
            }
            None => false,
        }
    }

    fn remove(&self, uri: &str) -> bool {
        let mut map = self.map.write();
        let before = map.len();
        map.retain(|document, resolved| document != uri && resolved != uri);
        map.len() != before
    }

    fn resolve(&self, document_uri: &str) -> String {
        self.map
            .read()
            .get(document_uri)
            .cloned()
            .unwrap_or_else(|| document_uri.to_owned())
    }
}

/// Rewrites a document's identity links through `resolver`.
///
/// Returns the document unchanged when its identity is unmapped.
pub fn resolve_document(document: &Representation, resolver: &dyn UriResolver) -> Representation {
    let mut resolved = document.clone();
    let Some(identity) = document.identity() else {
        return resolved;
    };
    let target = resolver.resolve(identity);
    if target == identity {
        return resolved;
    }
    for link in resolved.links.iter_mut().filter(|l| l.href == identity) {
        *link = Link {
            href: target.clone(),
            ..link.clone()
        };
    }
    resolved
}
