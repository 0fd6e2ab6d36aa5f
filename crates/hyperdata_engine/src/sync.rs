//! Recursive graph synchronization.
//!
//! The [`Synchronizer`] reconciles the local graph against desired-state
//! documents. Each entry point handles one shape (resource, resource in a
//! collection, collection, named collection, named singleton, uri-list),
//! drives the differencer and the cache, and then runs the caller's
//! [`SyncStep`]s depth-first over every resource it created or matched.
//!
//! ```text
//! sync_collection(todos, doc)
//!   ├─ diff: delete ─► update ─► create
//!   ├─ re-hydrate items
//!   └─ for each (todo, todo_doc): steps
//!        └─ NamedCollectionStep("tags") ─► sync_collection(tags, ..)
//! ```

use crate::cache::Cache;
use crate::config::SyncOptions;
use crate::diff::{diff_collection, partition, SyncAction, SyncInfo, UriListDiff};
use crate::error::{SyncError, SyncResult};
use crate::policy::{CollectionPolicy, Scope};
use crate::resolver::resolve_document;
use crate::resource::Resource;
use async_trait::async_trait;
use hyperdata_protocol::Representation;
use parking_lot::Mutex;
use std::slice;
use std::sync::Arc;
use tracing::{debug, info};

/// Counts of what a synchronization pass did.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SyncReport {
    /// Resources created (or linked into membership lists).
    pub created: usize,
    /// Resources whose attributes were written.
    pub updated: usize,
    /// Resources deleted (or unlinked / dropped locally).
    pub deleted: usize,
    /// Matched or requested changes that needed no write, or were not
    /// permitted.
    pub skipped: usize,
}

impl SyncReport {
    /// Adds `other` into this report.
    pub fn merge(&mut self, other: SyncReport) {
        self.created += other.created;
        self.updated += other.updated;
        self.deleted += other.deleted;
        self.skipped += other.skipped;
    }

    /// Returns the number of writes (creates, updates, deletes).
    pub fn writes(&self) -> usize {
        self.created + self.updated + self.deleted
    }

    fn skipped_one() -> Self {
        Self {
            skipped: 1,
            ..Self::default()
        }
    }
}

/// One step of a recursive synchronization.
///
/// Steps run after their parent resource has been reconciled and receive
/// that resource with the document it was reconciled against.
#[async_trait]
pub trait SyncStep: Send + Sync {
    /// Synchronizes whatever this step owns below `resource`.
    async fn sync(
        &self,
        sync: &Synchronizer,
        resource: &Resource,
        document: &Representation,
        options: &SyncOptions,
    ) -> SyncResult<SyncReport>;
}

/// Reconciles the local graph against desired-state documents.
#[derive(Debug, Clone)]
pub struct Synchronizer {
    cache: Arc<Cache>,
}

impl Synchronizer {
    /// Creates a synchronizer over `cache`.
    pub fn new(cache: Arc<Cache>) -> Self {
        Self { cache }
    }

    /// Returns the cache.
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Synchronizes `resource` with `document`, dispatching on shape.
    ///
    /// A collection with a collection document is a collection sync; a
    /// collection with a single document is a resource-in-collection sync;
    /// anything else updates the resource and runs `steps` over it.
    pub async fn sync_resource(
        &self,
        resource: &Resource,
        document: &Representation,
        steps: &[Arc<dyn SyncStep>],
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        self.cache.get_resource(resource).await?;
        if resource.is_collection() {
            return if document.is_collection() {
                self.sync_collection(resource, document, steps, options).await
            } else {
                self.sync_resource_in_collection(resource, document, steps, options)
                    .await
            };
        }

        let mut report = SyncReport::default();
        if self.cache.update_resource(resource, document).await? {
            report.updated += 1;
        } else {
            report.skipped += 1;
        }
        if let (Some(document_uri), Some(uri)) = (document.identity(), resource.uri()) {
            options.resolver.register(document_uri, &uri);
        }
        report.merge(self.run_steps(resource, document, steps, options).await?);
        Ok(self.finish("resource", resource, report, options))
    }

    /// Finds `document`'s match among `collection`'s items, updates it or
    /// creates it, then runs `steps` over the result.
    pub async fn sync_resource_in_collection(
        &self,
        collection: &Resource,
        document: &Representation,
        steps: &[Arc<dyn SyncStep>],
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        self.cache
            .get_collection_resource_and_items(collection)
            .await?;
        let document = resolve_document(document, &*options.resolver);
        let mut diff = partition(
            &collection.items(),
            slice::from_ref(&document),
            &options.comparators,
        );

        let tally = Mutex::new(SyncReport::default());
        let info = {
            let actions = CollectionPolicy::classify(collection, &self.cache, options).actions(
                Scope {
                    cache: &self.cache,
                    collection,
                    options,
                    report: &tally,
                },
            );
            match diff.update.pop() {
                Some((resource, document)) => {
                    actions.update(&resource, &document).await?;
                    Some(SyncInfo {
                        resource,
                        document,
                        action: SyncAction::Update,
                    })
                }
                None => {
                    let created = actions.create(&document).await?;
                    created.map(|resource| SyncInfo {
                        resource,
                        document,
                        action: SyncAction::Create,
                    })
                }
            }
        };

        let mut report = *tally.lock();
        if let Some(info) = info {
            self.cache.get_resource(&info.resource).await?;
            report.merge(
                self.run_steps(&info.resource, &info.document, steps, options)
                    .await?,
            );
        }
        Ok(self.finish("resource in collection", collection, report, options))
    }

    /// Reconciles `collection`'s items with `document`'s items, then runs
    /// `steps` over every created or updated item.
    ///
    /// A document without items is a single member, not an empty
    /// collection, and goes through
    /// [`Synchronizer::sync_resource_in_collection`].
    pub async fn sync_collection(
        &self,
        collection: &Resource,
        document: &Representation,
        steps: &[Arc<dyn SyncStep>],
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        if !document.is_collection() {
            return self
                .sync_resource_in_collection(collection, document, steps, options)
                .await;
        }
        self.cache
            .get_collection_resource_and_items(collection)
            .await?;
        let desired = Representation {
            items: Some(
                document
                    .items()
                    .iter()
                    .map(|item| resolve_document(item, &*options.resolver))
                    .collect(),
            ),
            ..document.clone()
        };

        let policy = CollectionPolicy::classify(collection, &self.cache, options);
        debug!(collection = ?collection.uri(), ?policy, "syncing collection");
        let tally = Mutex::new(SyncReport::default());
        let infos = {
            let actions = policy.actions(Scope {
                cache: &self.cache,
                collection,
                options,
                report: &tally,
            });
            diff_collection(
                collection,
                &desired,
                &options.comparators,
                actions.as_ref(),
                options.batch_size,
            )
            .await?
        };

        let items = self.cache.get_collection_items(collection).await?;
        let mut report = *tally.lock();
        for info in infos {
            if !items.iter().any(|i| i.ptr_eq(&info.resource)) {
                continue;
            }
            report.merge(
                self.run_steps(&info.resource, &info.document, steps, options)
                    .await?,
            );
        }
        Ok(self.finish("collection", collection, report, options))
    }

    /// Synchronizes the collection `parent` reaches through `rel` with the
    /// collection document held in `document`'s `name` attribute. A single
    /// document there is matched against the collection's members.
    ///
    /// Skipped when the document has no such attribute or the parent has no
    /// such link.
    pub async fn sync_named_collection(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
        document: &Representation,
        steps: &[Arc<dyn SyncStep>],
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        let Some(child_document) = document.child(name)? else {
            return Ok(SyncReport::default());
        };
        let Some(collection) = self
            .cache
            .try_get_named_collection_resource(parent, name, rel)
            .await?
        else {
            debug!(parent = ?parent.uri(), name, rel, "no collection link, skipped");
            return Ok(SyncReport::skipped_one());
        };
        self.sync_collection(&collection, &child_document, steps, options)
            .await
    }

    /// Synchronizes the singleton `parent` reaches through `rel` with the
    /// document held in `document`'s `name` attribute, creating the
    /// singleton when it does not exist yet.
    pub async fn sync_named_singleton(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
        document: &Representation,
        steps: &[Arc<dyn SyncStep>],
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        let Some(child_document) = document.child(name)? else {
            return Ok(SyncReport::default());
        };
        let child_document = resolve_document(&child_document, &*options.resolver);

        let mut report = SyncReport::default();
        let singleton = match self.cache.try_get_singleton(parent, name, rel).await {
            Ok(Some(singleton)) => {
                if self
                    .cache
                    .update_resource(&singleton, &child_document)
                    .await?
                {
                    report.updated += 1;
                } else {
                    report.skipped += 1;
                }
                singleton
            }
            Ok(None) => {
                debug!(parent = ?parent.uri(), name, rel, "no singleton link, skipped");
                return Ok(SyncReport::skipped_one());
            }
            Err(SyncError::NotFound { .. }) => {
                let Some(singleton) = parent.child(name) else {
                    return Ok(SyncReport::skipped_one());
                };
                if self.cache.create_singleton(&singleton, &child_document).await? {
                    report.created += 1;
                } else {
                    report.skipped += 1;
                }
                singleton
            }
            Err(e) => return Err(e),
        };

        if let (Some(document_uri), Some(uri)) = (child_document.identity(), singleton.uri()) {
            options.resolver.register(document_uri, &uri);
        }
        report.merge(
            self.run_steps(&singleton, &child_document, steps, options)
                .await?,
        );
        Ok(self.finish("singleton", &singleton, report, options))
    }

    /// Synchronizes the identifier list behind `resource`'s `rel` link with
    /// the string array in `document`'s `name` attribute.
    ///
    /// Removals go out as one DELETE and additions as one POST; there is no
    /// per-item merge and no recursion.
    pub async fn sync_uri_list(
        &self,
        resource: &Resource,
        name: &str,
        rel: &str,
        document: &Representation,
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        let Some(desired) = document.uri_list(name)? else {
            return Ok(SyncReport::default());
        };
        self.cache.get_resource(resource).await?;
        if resource.link(rel).is_none() {
            debug!(uri = ?resource.uri(), rel, "no uri-list link, skipped");
            return Ok(SyncReport::skipped_one());
        }
        let desired: Vec<String> = desired
            .iter()
            .map(|uri| options.resolver.resolve(uri))
            .collect();
        let existing = self.cache.get_uri_list(resource, rel).await?;
        let diff = UriListDiff::compute(&existing, &desired);

        let report = SyncReport {
            created: diff.create.len(),
            deleted: diff.delete.len(),
            ..SyncReport::default()
        };
        self.cache.delete_uri_list(resource, rel, diff.delete).await?;
        self.cache.post_uri_list(resource, rel, diff.create).await?;
        Ok(self.finish("uri-list", resource, report, options))
    }

    async fn run_steps(
        &self,
        resource: &Resource,
        document: &Representation,
        steps: &[Arc<dyn SyncStep>],
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        let nested = options.nested();
        let mut report = SyncReport::default();
        for step in steps {
            report.merge(step.sync(self, resource, document, &nested).await?);
        }
        Ok(report)
    }

    fn finish(
        &self,
        shape: &'static str,
        resource: &Resource,
        report: SyncReport,
        options: &SyncOptions,
    ) -> SyncReport {
        if options.is_nested() {
            debug!(shape, uri = ?resource.uri(), ?report, "sync step done");
        } else {
            info!(
                shape,
                uri = ?resource.uri(),
                created = report.created,
                updated = report.updated,
                deleted = report.deleted,
                skipped = report.skipped,
                "sync complete"
            );
        }
        report
    }
}

/// Syncs a named child collection of each reconciled resource.
pub struct NamedCollectionStep {
    name: String,
    rel: String,
    steps: Vec<Arc<dyn SyncStep>>,
    contribute_only: bool,
}

impl NamedCollectionStep {
    /// Creates a step for the collection stored as `name` and linked by
    /// `rel`.
    pub fn new(name: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rel: rel.into(),
            steps: Vec::new(),
            contribute_only: false,
        }
    }

    /// Adds a step to run over every item of the collection.
    pub fn with_step(mut self, step: impl SyncStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    /// Treats the collection as a membership list.
    pub fn contribute_only(mut self) -> Self {
        self.contribute_only = true;
        self
    }
}

#[async_trait]
impl SyncStep for NamedCollectionStep {
    async fn sync(
        &self,
        sync: &Synchronizer,
        resource: &Resource,
        document: &Representation,
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        let options = options.clone().with_contribute_only(self.contribute_only);
        sync.sync_named_collection(resource, &self.name, &self.rel, document, &self.steps, &options)
            .await
    }
}

/// Syncs a named singleton of each reconciled resource.
pub struct NamedSingletonStep {
    name: String,
    rel: String,
    steps: Vec<Arc<dyn SyncStep>>,
}

impl NamedSingletonStep {
    /// Creates a step for the singleton stored as `name` and linked by
    /// `rel`.
    pub fn new(name: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rel: rel.into(),
            steps: Vec::new(),
        }
    }

    /// Adds a step to run over the singleton.
    pub fn with_step(mut self, step: impl SyncStep + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }
}

#[async_trait]
impl SyncStep for NamedSingletonStep {
    async fn sync(
        &self,
        sync: &Synchronizer,
        resource: &Resource,
        document: &Representation,
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        sync.sync_named_singleton(resource, &self.name, &self.rel, document, &self.steps, options)
            .await
    }
}

/// Syncs a named uri-list of each reconciled resource.
pub struct UriListStep {
    name: String,
    rel: String,
}

impl UriListStep {
    /// Creates a step for the string array stored as `name` and linked by
    /// `rel`.
    pub fn new(name: impl Into<String>, rel: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rel: rel.into(),
        }
    }
}

#[async_trait]
impl SyncStep for UriListStep {
    async fn sync(
        &self,
        sync: &Synchronizer,
        resource: &Resource,
        document: &Representation,
        options: &SyncOptions,
    ) -> SyncResult<SyncReport> {
        sync.sync_uri_list(resource, &self.name, &self.rel, document, options)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::{MapResolver, UriResolver};
    use crate::sparse;
    use crate::state::Status;
    use crate::transport::{LinkTransport, MockTransport, TransportCall};
    use hyperdata_protocol::{rel, Body, Link};
    use serde_json::json;

    fn form(fields: &[&str]) -> Representation {
        fields.iter().fold(Representation::collection(), |form, f| {
            form.with_item(Representation::new().with_attribute("name", *f))
        })
    }

    fn todo(uri: &str, name: &str) -> Representation {
        Representation::from_uri(uri)
            .with_link(rel::EDIT_FORM, "http://x/t/edit")
            .with_attribute("name", name)
    }

    fn server() -> Arc<MockTransport> {
        let transport = Arc::new(MockTransport::new());
        transport.set("http://x/t/form", form(&["name"]));
        transport.set("http://x/t/edit", form(&["name"]));
        transport
    }

    fn synchronizer(transport: &Arc<MockTransport>) -> Synchronizer {
        Synchronizer::new(Arc::new(Cache::new(transport.clone())))
    }

    #[tokio::test]
    async fn collection_update_and_create() {
        let transport = server();
        transport.set(
            "http://x/t/",
            Representation::from_uri("http://x/t/")
                .with_link(rel::CREATE_FORM, "http://x/t/form")
                .with_items(vec![Representation::from_uri("http://x/t/1")]),
        );
        transport.set("http://x/t/1", todo("http://x/t/1", "A"));
        let sync = synchronizer(&transport);
        let collection = sparse::collection_from_uri(Some("http://x/t/"));

        let desired = Representation::collection()
            .with_item(Representation::new().with_attribute("name", "A"))
            .with_item(Representation::new().with_attribute("name", "B"));
        let report = sync
            .sync_collection(&collection, &desired, &[], &SyncOptions::new())
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.deleted, 0);
        let items = collection.items();
        assert_eq!(items.len(), 2);
        assert!(items.iter().all(|i| i.status() == Status::Hydrated));
        assert_eq!(items[1].attribute("name"), Some(json!("B")));
        assert!(!transport
            .writes()
            .iter()
            .any(|c| matches!(c, TransportCall::Delete(..))));
    }

    #[tokio::test]
    async fn read_only_collection_deletes_locally() {
        let transport = server();
        transport.set(
            "http://x/r/",
            Representation::from_uri("http://x/r/").with_items(vec![
                Representation::from_uri("http://x/r/1"),
                Representation::from_uri("http://x/r/2"),
            ]),
        );
        transport.set("http://x/r/1", Representation::from_uri("http://x/r/1"));
        transport.set("http://x/r/2", Representation::from_uri("http://x/r/2"));
        let resolver = Arc::new(MapResolver::new());
        resolver.add("http://old/r/1", "http://x/r/1");
        resolver.add("http://old/r/2", "http://x/r/2");
        let options = SyncOptions::new().with_resolver(resolver.clone());
        let sync = synchronizer(&transport);
        let collection = sparse::collection_from_uri(Some("http://x/r/"));

        let report = sync
            .sync_collection(&collection, &Representation::collection(), &[], &options)
            .await
            .unwrap();

        assert_eq!(report.deleted, 2);
        assert!(collection.items().is_empty());
        assert!(resolver.is_empty());
        assert!(transport.writes().is_empty());
    }

    struct Touch(Mutex<Vec<String>>);

    #[async_trait]
    impl SyncStep for Touch {
        async fn sync(
            &self,
            _sync: &Synchronizer,
            resource: &Resource,
            document: &Representation,
            options: &SyncOptions,
        ) -> SyncResult<SyncReport> {
            assert!(options.is_nested());
            self.0.lock().push(format!(
                "{} <- {}",
                resource.uri().unwrap_or_default(),
                document.attribute_str("name").unwrap_or_default()
            ));
            Ok(SyncReport::default())
        }
    }

    #[tokio::test]
    async fn steps_run_over_matched_and_created() {
        let transport = server();
        transport.set(
            "http://x/t/",
            Representation::from_uri("http://x/t/")
                .with_link(rel::CREATE_FORM, "http://x/t/form")
                .with_items(vec![Representation::from_uri("http://x/t/1")]),
        );
        transport.set("http://x/t/1", todo("http://x/t/1", "A"));
        let sync = synchronizer(&transport);
        let collection = sparse::collection_from_uri(Some("http://x/t/"));
        let touch = Arc::new(Touch(Mutex::new(Vec::new())));
        let steps: Vec<Arc<dyn SyncStep>> = vec![touch.clone() as Arc<dyn SyncStep>];

        let desired = Representation::collection()
            .with_item(Representation::new().with_attribute("name", "A"))
            .with_item(Representation::new().with_attribute("name", "B"));
        sync.sync_collection(&collection, &desired, &steps, &SyncOptions::new().with_batch_size(1))
            .await
            .unwrap();

        assert_eq!(
            *touch.0.lock(),
            vec!["http://x/t/1 <- A", "http://x/t/2 <- B"]
        );
    }

    #[tokio::test]
    async fn resource_in_collection_matches_by_name() {
        let transport = server();
        transport.set(
            "http://x/t/",
            Representation::from_uri("http://x/t/")
                .with_link(rel::CREATE_FORM, "http://x/t/form")
                .with_items(vec![Representation::from_uri("http://x/t/1")]),
        );
        transport.set("http://x/t/1", todo("http://x/t/1", "A"));
        let sync = synchronizer(&transport);
        let collection = sparse::collection_from_uri(Some("http://x/t/"));

        let report = sync
            .sync_resource(
                &collection,
                &Representation::new().with_attribute("name", "A"),
                &[],
                &SyncOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(report, SyncReport { skipped: 1, ..SyncReport::default() });

        let report = sync
            .sync_resource_in_collection(
                &collection,
                &Representation::new().with_attribute("name", "C"),
                &[],
                &SyncOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(collection.items().len(), 2);
    }

    #[tokio::test]
    async fn uri_list_whole_list_writes() {
        let transport = server();
        transport.set(
            "http://x/t/1",
            todo("http://x/t/1", "A").with_link("tags", "http://x/t/1/tags"),
        );
        transport.set_uri_list("http://x/t/1/tags", vec!["A".into(), "B".into()]);
        let sync = synchronizer(&transport);
        let resource = sparse::from_uri(Some("http://x/t/1"));

        let document = Representation::new().with_attribute("tags", json!(["B", "C"]));
        let report = sync
            .sync_uri_list(&resource, "tags", "tags", &document, &SyncOptions::new())
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.deleted, 1);
        assert_eq!(
            transport.writes(),
            vec![
                TransportCall::Delete(
                    "http://x/t/1/tags".into(),
                    Some(Body::UriList(vec!["A".into()]))
                ),
                TransportCall::Post("http://x/t/1/tags".into(), Body::UriList(vec!["C".into()])),
            ]
        );
        let list = transport
            .get_uri_list(&Link::new("tags", "http://x/t/1/tags"))
            .await
            .unwrap();
        assert_eq!(list, vec!["B".to_string(), "C".to_string()]);
    }

    #[tokio::test]
    async fn singleton_created_when_missing() {
        let transport = server();
        transport.set(
            "http://x/t/1",
            todo("http://x/t/1", "A").with_link("note", "http://x/t/1/note"),
        );
        let sync = synchronizer(&transport);
        let resource = sparse::from_uri(Some("http://x/t/1"));
        let document = Representation::new()
            .with_attribute("note", json!({"text": "remember"}));

        let report = sync
            .sync_named_singleton(&resource, "note", "note", &document, &[], &SyncOptions::new())
            .await
            .unwrap();
        assert_eq!(report.created, 1);

        let note = resource.child("note").unwrap();
        assert_eq!(note.status(), Status::Hydrated);
        assert_eq!(note.attribute("text"), Some(json!("remember")));
        assert!(transport
            .writes()
            .iter()
            .any(|c| matches!(c, TransportCall::Put(href, _) if href == "http://x/t/1/note")));
    }

    #[tokio::test]
    async fn named_collection_absent_in_document_is_untouched() {
        let transport = server();
        let sync = synchronizer(&transport);
        let resource = sparse::from_uri(Some("http://x/t/1"));

        let report = sync
            .sync_named_collection(
                &resource,
                "tags",
                "tags",
                &Representation::new(),
                &[],
                &SyncOptions::new(),
            )
            .await
            .unwrap();
        assert_eq!(report, SyncReport::default());
        assert!(transport.calls().is_empty());
    }

    fn tags_server() -> Arc<MockTransport> {
        let transport = server();
        transport.set(
            "http://x/t/1",
            todo("http://x/t/1", "A").with_link("tags", "http://x/g/"),
        );
        transport.set(
            "http://x/g/",
            Representation::from_uri("http://x/g/")
                .with_link(rel::CREATE_FORM, "http://x/t/form")
                .with_items(vec![
                    Representation::from_uri("http://x/g/1"),
                    Representation::from_uri("http://x/g/2"),
                ]),
        );
        transport.set("http://x/g/1", todo("http://x/g/1", "a"));
        transport.set("http://x/g/2", todo("http://x/g/2", "b"));
        transport
    }

    fn deletes(transport: &MockTransport) -> usize {
        transport
            .writes()
            .iter()
            .filter(|c| matches!(c, TransportCall::Delete(..)))
            .count()
    }

    #[tokio::test]
    async fn named_collection_with_single_document_matches_one_member() {
        let transport = tags_server();
        let sync = synchronizer(&transport);
        let todo = sparse::from_uri(Some("http://x/t/1"));

        let document = Representation::new().with_attribute("tags", json!({"name": "a"}));
        let report = sync
            .sync_named_collection(&todo, "tags", "tags", &document, &[], &SyncOptions::new())
            .await
            .unwrap();

        assert_eq!(report, SyncReport { skipped: 1, ..SyncReport::default() });
        assert_eq!(deletes(&transport), 0);
        assert_eq!(todo.child("tags").unwrap().items().len(), 2);
    }

    #[tokio::test]
    async fn collection_with_single_document_creates_one_member() {
        let transport = tags_server();
        let sync = synchronizer(&transport);
        let tags = sparse::collection_from_uri(Some("http://x/g/"));

        let report = sync
            .sync_collection(
                &tags,
                &Representation::new().with_attribute("name", "c"),
                &[],
                &SyncOptions::new(),
            )
            .await
            .unwrap();

        assert_eq!(report.created, 1);
        assert_eq!(report.deleted, 0);
        assert_eq!(deletes(&transport), 0);
        assert_eq!(tags.items().len(), 3);
    }

    struct ContributeFlags(Mutex<Vec<bool>>);

    #[async_trait]
    impl SyncStep for ContributeFlags {
        async fn sync(
            &self,
            _sync: &Synchronizer,
            _resource: &Resource,
            _document: &Representation,
            options: &SyncOptions,
        ) -> SyncResult<SyncReport> {
            self.0.lock().push(options.contribute_only);
            Ok(SyncReport::default())
        }
    }

    #[tokio::test]
    async fn membership_item_steps_are_not_contribute_only() {
        let transport = tags_server();
        let sync = synchronizer(&transport);
        let todo = sparse::from_uri(Some("http://x/t/1"));
        let flags = Arc::new(ContributeFlags(Mutex::new(Vec::new())));
        let step = NamedCollectionStep {
            steps: vec![flags.clone() as Arc<dyn SyncStep>],
            ..NamedCollectionStep::new("tags", "tags").contribute_only()
        };

        let document = Representation::new().with_child(
            "tags",
            &Representation::collection()
                .with_item(Representation::from_uri("http://x/g/1"))
                .with_item(Representation::from_uri("http://x/g/2")),
        );
        let report = step
            .sync(&sync, &todo, &document, &SyncOptions::new())
            .await
            .unwrap();

        assert_eq!(report.skipped, 2);
        assert!(transport.writes().is_empty());
        assert_eq!(*flags.0.lock(), vec![false, false]);
    }
}
