//! Pooled collections.
//!
//! A pooled collection holds shared reference data (tags, categories,
//! people) that many parts of a graph point at. A document referencing a
//! pooled resource is resolved to an existing member when one matches,
//! and the member is created at most once otherwise.
//!
//! Creation is serialized per reference: two concurrent resolutions of the
//! same reference wait on one lock, so the second sees the first's result
//! instead of creating a duplicate.

use crate::config::SyncOptions;
use crate::diff::run_phase;
use crate::error::SyncResult;
use crate::resource::Resource;
use crate::sync::{SyncReport, SyncStep, Synchronizer};
use async_trait::async_trait;
use hyperdata_protocol::{rel, Link, Representation};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A collection of shared resources, resolved by reference.
pub struct PooledCollection {
    parent: Resource,
    name: String,
    rel: String,
    match_attribute: String,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl PooledCollection {
    /// Creates a pool for the collection `parent` reaches through `rel`,
    /// stored as child `name`. Members match on their `name` attribute.
    pub fn new(parent: Resource, name: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            parent,
            name: name.into(),
            rel: rel.into(),
            match_attribute: "name".to_owned(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Sets the attribute members are matched on.
    pub fn with_match_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.match_attribute = attribute.into();
        self
    }

    /// Returns the pool collection, hydrated with its items.
    pub async fn collection(&self, sync: &Synchronizer) -> SyncResult<Resource> {
        sync.cache()
            .get_named_collection_resource_and_items(&self.parent, &self.name, &self.rel)
            .await
    }

    fn lock_key(&self, document: &Representation) -> Option<String> {
        if let Some(uri) = document.identity() {
            return Some(uri.to_owned());
        }
        document
            .attribute(&self.match_attribute)
            .filter(|v| !v.is_null())
            .map(|v| format!("{}={v}", self.match_attribute))
    }

    fn member_by_attribute(&self, collection: &Resource, document: &Representation) -> Option<Resource> {
        let wanted = document
            .attribute(&self.match_attribute)
            .filter(|v| !v.is_null())?;
        collection
            .items()
            .into_iter()
            .find(|item| item.attribute(&self.match_attribute).as_ref() == Some(wanted))
    }

    /// Resolves `document` to the identity of a pool member.
    ///
    /// Tries, in order: a member with an equal match attribute, the
    /// resolver's mapping for the document's identity, and finally creating
    /// a new member. The document-to-member mapping is registered with the
    /// resolver. `Ok(None)` when nothing matches and the pool does not allow
    /// creation.
    pub async fn resolve(
        &self,
        sync: &Synchronizer,
        document: &Representation,
        options: &SyncOptions,
    ) -> SyncResult<Option<String>> {
        let Some(key) = self.lock_key(document) else {
            debug!(pool = %self.name, "reference without identity or match attribute");
            return Ok(None);
        };
        let lock = self.locks.lock().entry(key).or_default().clone();
        let _guard = lock.lock().await;

        let collection = self.collection(sync).await?;
        let register = |uri: &str| {
            if let Some(document_uri) = document.identity() {
                options.resolver.register(document_uri, uri);
            }
        };

        if let Some(uri) = self
            .member_by_attribute(&collection, document)
            .and_then(|member| member.uri())
        {
            register(&uri);
            return Ok(Some(uri));
        }

        if let Some(document_uri) = document.identity() {
            let resolved = options.resolver.resolve(document_uri);
            if resolved != document_uri || collection.find_item(&resolved).is_some() {
                return Ok(Some(resolved));
            }
        }

        let Some(created) = sync
            .cache()
            .create_collection_resource_item(&collection, document)
            .await?
        else {
            warn!(pool = %self.name, "reference unresolved and pool creation not permitted");
            return Ok(None);
        };
        let created = sync.cache().get_resource(&created).await?;
        let Some(uri) = created.uri() else {
            return Ok(None);
        };
        debug!(pool = %self.name, %uri, "pooled resource created");
        register(&uri);
        Ok(Some(uri))
    }

    /// Resolves every document, honouring the options' batching rule.
    pub async fn resolve_all(
        &self,
        sync: &Synchronizer,
        documents: &[Representation],
        options: &SyncOptions,
    ) -> SyncResult<Vec<Option<String>>> {
        run_phase(documents.iter().collect(), options.is_sequential(), |document| {
            self.resolve(sync, document, options)
        })
        .await
    }
}

impl std::fmt::Debug for PooledCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PooledCollection")
            .field("parent", &self.parent.uri())
            .field("name", &self.name)
            .field("rel", &self.rel)
            .field("match_attribute", &self.match_attribute)
            .finish_non_exhaustive()
    }
}

/// Syncs a membership collection whose entries reference a pool.
///
/// Each entry of the document's `name` collection is first resolved
/// against the pool (creating the pooled resource if needed); the
/// membership list is then synchronized as contribute-only so targets are
/// linked and unlinked, never created or destroyed.
pub struct PooledReferenceStep {
    pool: Arc<PooledCollection>,
    name: String,
    rel: String,
}

impl PooledReferenceStep {
    /// Creates a step for the membership collection stored as `name` and
    /// linked by `rel`, resolving entries against `pool`.
    pub fn new(pool: Arc<PooledCollection>, name: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            pool,
            name: name.into(),
            rel: rel.into(),
        }
    }
}

#[async_trait]
impl SyncStep for PooledReferenceStep {
    async fn sync(
        &self,
        sync: &Synchronizer,
        resource: &Resource,
        document: &Representation,
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        let Some(references) = document.child(&self.name)? else {
            return Ok(SyncReport::default());
        };
        let resolved = self
            .pool
            .resolve_all(sync, references.items(), options)
            .await?;

        let mut report = SyncReport::default();
        let mut members = Vec::with_capacity(resolved.len());
        for (reference, uri) in references.items().iter().zip(resolved) {
            let Some(uri) = uri else {
                report.skipped += 1;
                continue;
            };
            let mut member = reference.clone();
            member
                .links
                .retain(|l| !rel::IDENTITY.iter().any(|r| l.has_rel(r)));
            member.links.insert(0, Link::new(rel::SELF, uri));
            members.push(member);
        }

        let membership = Representation {
            items: Some(members),
            ..references
        };
        let document = document.clone().with_child(self.name.as_str(), &membership);
        let options = options.clone().with_contribute_only(true);
        report.merge(
            sync.sync_named_collection(resource, &self.name, &self.rel, &document, &[], &options)
                .await?,
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;
    use crate::resolver::{MapResolver, UriResolver};
    use crate::sparse;
    use crate::transport::MockTransport;

    fn pool_server() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.set(
            "http://x/",
            Representation::from_uri("http://x/").with_link("tags", "http://x/g/"),
        );
        transport.set(
            "http://x/g/",
            Representation::from_uri("http://x/g/")
                .with_link(rel::CREATE_FORM, "http://x/g/form")
                .with_items(vec![Representation::from_uri("http://x/g/1")]),
        );
        transport.set(
            "http://x/g/1",
            Representation::from_uri("http://x/g/1").with_attribute("name", "urgent"),
        );
        transport.set(
            "http://x/g/form",
            Representation::collection().with_item(Representation::new().with_attribute("name", "name")),
        );
        transport
    }

    fn setup(transport: &Arc<MockTransport>) -> (Synchronizer, PooledCollection) {
        let sync = Synchronizer::new(Arc::new(Cache::new(transport.clone())));
        let pool = PooledCollection::new(sparse::from_uri(Some("http://x/")), "tags", "tags");
        (sync, pool)
    }

    #[tokio::test]
    async fn existing_member_matched_by_name() {
        let transport = pool_server();
        let (sync, pool) = setup(&transport);
        let resolver = Arc::new(MapResolver::new());
        let options = SyncOptions::new().with_resolver(resolver.clone());

        let doc = Representation::from_uri("http://old/g/9").with_attribute("name", "urgent");
        let uri = pool.resolve(&sync, &doc, &options).await.unwrap();
        assert_eq!(uri.as_deref(), Some("http://x/g/1"));
        assert_eq!(resolver.resolve("http://old/g/9"), "http://x/g/1");
        assert!(transport.writes().is_empty());
    }

    #[tokio::test]
    async fn missing_member_created_once() {
        let transport = pool_server();
        let (sync, pool) = setup(&transport);
        let options = SyncOptions::new().with_resolver(Arc::new(MapResolver::new()));

        let doc = Representation::from_uri("http://old/g/5").with_attribute("name", "later");
        let resolved = pool
            .resolve_all(&sync, &[doc.clone(), doc.clone(), doc], &options)
            .await
            .unwrap();

        assert_eq!(resolved.len(), 3);
        assert!(resolved.iter().all(|u| u.as_deref() == Some("http://x/g/2")));
        assert_eq!(transport.writes().len(), 1);
    }

    #[tokio::test]
    async fn unidentified_reference_is_unresolved() {
        let transport = pool_server();
        let (sync, pool) = setup(&transport);
        let uri = pool
            .resolve(&sync, &Representation::new(), &SyncOptions::new())
            .await
            .unwrap();
        assert!(uri.is_none());
    }
}
