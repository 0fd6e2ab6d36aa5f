//! Collection mutability policies.
//!
//! A collection is synchronized under exactly one policy, chosen once per
//! collection sync. Each policy supplies the differencer's create, update
//! and delete operations.

use crate::cache::Cache;
use crate::config::SyncOptions;
use crate::diff::DiffActions;
use crate::error::SyncResult;
use crate::resource::Resource;
use crate::sync::SyncReport;
use async_trait::async_trait;
use hyperdata_protocol::Representation;
use parking_lot::Mutex;
use tracing::debug;

/// How a collection may be changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionPolicy {
    /// The collection has a create form: items are created, updated and
    /// deleted remotely.
    Updatable,
    /// No create form: creates and deletes are local bookkeeping only.
    ReadOnly,
    /// A membership list: create links an existing resource, delete unlinks
    /// it. Targets are never created or destroyed.
    ContributeOnly,
}

impl CollectionPolicy {
    /// Chooses the policy for a hydrated collection.
    pub fn classify(collection: &Resource, cache: &Cache, options: &SyncOptions) -> Self {
        if options.contribute_only {
            CollectionPolicy::ContributeOnly
        } else if collection.link(&cache.config().create_form_rel).is_some() {
            CollectionPolicy::Updatable
        } else {
            CollectionPolicy::ReadOnly
        }
    }

    /// Returns the differencer operations for this policy.
    pub(crate) fn actions<'a>(self, scope: Scope<'a>) -> Box<dyn DiffActions + 'a> {
        match self {
            CollectionPolicy::Updatable => Box::new(Updatable(scope)),
            CollectionPolicy::ReadOnly => Box::new(ReadOnly(scope)),
            CollectionPolicy::ContributeOnly => Box::new(ContributeOnly(scope)),
        }
    }
}

/// What a policy operates on, plus the running tally.
pub(crate) struct Scope<'a> {
    pub cache: &'a Cache,
    pub collection: &'a Resource,
    pub options: &'a SyncOptions,
    pub report: &'a Mutex<SyncReport>,
}

impl Scope<'_> {
    fn register(&self, document: &Representation, resource: &Resource) {
        if let (Some(document_uri), Some(uri)) = (document.identity(), resource.uri()) {
            self.options.resolver.register(document_uri, &uri);
        }
    }

    fn forget(&self, resource: &Resource) {
        if let Some(uri) = resource.uri() {
            self.options.resolver.remove(&uri);
        }
    }

    fn tally(&self, f: impl FnOnce(&mut SyncReport)) {
        f(&mut self.report.lock());
    }
}

struct Updatable<'a>(Scope<'a>);

#[async_trait]
impl DiffActions for Updatable<'_> {
    async fn create(&self, document: &Representation) -> SyncResult<Option<Resource>> {
        let scope = &self.0;
        let created = scope
            .cache
            .create_collection_resource_item(scope.collection, document)
            .await?;
        match &created {
            Some(item) => {
                scope.register(document, item);
                scope.tally(|r| r.created += 1);
            }
            None => scope.tally(|r| r.skipped += 1),
        }
        Ok(created)
    }

    async fn update(&self, resource: &Resource, document: &Representation) -> SyncResult<()> {
        let scope = &self.0;
        let written = scope.cache.update_resource(resource, document).await?;
        scope.register(document, resource);
        scope.tally(|r| {
            if written {
                r.updated += 1
            } else {
                r.skipped += 1
            }
        });
        Ok(())
    }

    async fn delete(&self, resource: &Resource) -> SyncResult<()> {
        let scope = &self.0;
        scope
            .cache
            .delete_collection_item(scope.collection, resource)
            .await?;
        scope.forget(resource);
        scope.tally(|r| r.deleted += 1);
        Ok(())
    }
}

struct ReadOnly<'a>(Scope<'a>);

#[async_trait]
impl DiffActions for ReadOnly<'_> {
    async fn create(&self, document: &Representation) -> SyncResult<Option<Resource>> {
        let scope = &self.0;
        debug!(
            collection = ?scope.collection.uri(),
            document = ?document.identity(),
            "read-only collection, create skipped"
        );
        scope.tally(|r| r.skipped += 1);
        Ok(None)
    }

    async fn update(&self, resource: &Resource, document: &Representation) -> SyncResult<()> {
        let scope = &self.0;
        let written = scope.cache.update_resource(resource, document).await?;
        scope.register(document, resource);
        scope.tally(|r| {
            if written {
                r.updated += 1
            } else {
                r.skipped += 1
            }
        });
        Ok(())
    }

    async fn delete(&self, resource: &Resource) -> SyncResult<()> {
        let scope = &self.0;
        scope.collection.remove_item(resource);
        scope.forget(resource);
        scope.tally(|r| r.deleted += 1);
        Ok(())
    }
}

struct ContributeOnly<'a>(Scope<'a>);

#[async_trait]
impl DiffActions for ContributeOnly<'_> {
    async fn create(&self, document: &Representation) -> SyncResult<Option<Resource>> {
        let scope = &self.0;
        let Some(document_uri) = document.identity() else {
            debug!(
                collection = ?scope.collection.uri(),
                "membership entry without identity skipped"
            );
            scope.tally(|r| r.skipped += 1);
            return Ok(None);
        };
        let uri = scope.options.resolver.resolve(document_uri);
        let item = scope
            .cache
            .link_collection_item(scope.collection, &uri)
            .await?;
        scope.register(document, &item);
        scope.tally(|r| r.created += 1);
        Ok(Some(item))
    }

    async fn update(&self, resource: &Resource, document: &Representation) -> SyncResult<()> {
        let scope = &self.0;
        scope.register(document, resource);
        scope.tally(|r| r.skipped += 1);
        Ok(())
    }

    async fn delete(&self, resource: &Resource) -> SyncResult<()> {
        let scope = &self.0;
        scope
            .cache
            .unlink_collection_item(scope.collection, resource)
            .await?;
        scope.tally(|r| r.deleted += 1);
        Ok(())
    }
}
