//! Cache orchestration.
//!
//! The [`Cache`] composes resource state and the sparse factories into the
//! get/create/update/delete operations the synchronizer calls. It decides
//! when a resource must be fetched; the [`LinkTransport`] does the I/O and
//! the [`FormMerge`] builds write payloads.

use crate::config::CacheConfig;
use crate::error::{SyncError, SyncResult};
use crate::merge::{FieldMerge, FormMerge};
use crate::resource::Resource;
use crate::sparse;
use crate::state::Status;
use crate::transport::LinkTransport;
use futures::future::join_all;
use hyperdata_protocol::{Body, Representation};
use std::sync::Arc;
use tracing::{debug, warn};

/// Lazily hydrating view of the remote resource graph.
pub struct Cache {
    transport: Arc<dyn LinkTransport>,
    merge: Arc<dyn FormMerge>,
    config: CacheConfig,
}

impl Cache {
    /// Creates a cache over `transport` with [`FieldMerge`] and default
    /// configuration.
    pub fn new(transport: Arc<dyn LinkTransport>) -> Self {
        Self {
            transport,
            merge: Arc::new(FieldMerge),
            config: CacheConfig::default(),
        }
    }

    /// Replaces the merge strategy.
    pub fn with_merge(mut self, merge: Arc<dyn FormMerge>) -> Self {
        self.merge = merge;
        self
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns the transport.
    pub fn transport(&self) -> &dyn LinkTransport {
        &*self.transport
    }

    // ---- reads ----

    /// Hydrates `resource` if needed and returns it.
    ///
    /// A hydrated resource is returned as-is unless `force_load` is set. A
    /// virtual resource has nothing to fetch and is returned without I/O.
    pub async fn get_resource(&self, resource: &Resource) -> SyncResult<Resource> {
        match resource.status() {
            Status::Virtual => return Ok(resource.clone()),
            Status::Hydrated if !self.config.force_load => return Ok(resource.clone()),
            _ => {}
        }
        self.fetch(resource).await?;
        Ok(resource.clone())
    }

    /// Re-fetches `resource` regardless of its status.
    ///
    /// On failure the resource keeps its previous content and status.
    pub async fn refresh(&self, resource: &Resource) -> SyncResult<Resource> {
        self.fetch(resource).await?;
        Ok(resource.clone())
    }

    async fn fetch(&self, resource: &Resource) -> SyncResult<()> {
        let fetched = resource.accessors(self.transport()).get().await?;
        debug!(uri = ?resource.uri(), "fetched resource");
        resource.apply_fetched(fetched)
    }

    /// Like [`Cache::get_resource`], but `Ok(None)` when the resource has no
    /// identity link at all.
    pub async fn try_get_resource(&self, resource: &Resource) -> SyncResult<Option<Resource>> {
        if resource.identity_link().is_none() {
            return Ok(None);
        }
        self.get_resource(resource).await.map(Some)
    }

    /// Returns `parent`'s named child, installing a sparse one built from
    /// relation `rel` when absent. A declared `unknown` child is located at
    /// the relation's target instead.
    async fn child_slot(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
        collection: bool,
    ) -> SyncResult<Option<Resource>> {
        let placeholder = match parent.child(name) {
            Some(child) if child.status() != Status::Unknown => return Ok(Some(child)),
            declared => declared,
        };
        self.get_resource(parent).await?;
        let Some(href) = parent.href(rel) else {
            return Ok(None);
        };
        if let Some(child) = placeholder {
            child.locate(&href, collection)?;
            return Ok(Some(child));
        }
        let child = if collection {
            sparse::collection_from_uri(Some(&href))
        } else {
            sparse::from_uri(Some(&href))
        };
        parent.attach_child(name, child.clone());
        Ok(Some(child))
    }

    /// Hydrates the singleton reached from `parent` through `rel`, stored
    /// as child `name`.
    pub async fn get_singleton(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
    ) -> SyncResult<Resource> {
        self.try_get_singleton(parent, name, rel)
            .await?
            .ok_or_else(|| SyncError::unsupported(rel))
    }

    /// Like [`Cache::get_singleton`], but `Ok(None)` when `parent` has no
    /// `rel` link.
    pub async fn try_get_singleton(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
    ) -> SyncResult<Option<Resource>> {
        match self.child_slot(parent, name, rel, false).await? {
            Some(child) => self.try_get_resource(&child).await,
            None => Ok(None),
        }
    }

    /// Hydrates the named collection's own attributes (not its items).
    pub async fn get_named_collection_resource(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
    ) -> SyncResult<Resource> {
        self.try_get_named_collection_resource(parent, name, rel)
            .await?
            .ok_or_else(|| SyncError::unsupported(rel))
    }

    /// Like [`Cache::get_named_collection_resource`], but `Ok(None)` when
    /// `parent` has no `rel` link.
    pub async fn try_get_named_collection_resource(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
    ) -> SyncResult<Option<Resource>> {
        match self.child_slot(parent, name, rel, true).await? {
            Some(child) => self.try_get_resource(&child).await,
            None => Ok(None),
        }
    }

    /// Hydrates every item of `collection` concurrently.
    ///
    /// Items that fail to hydrate are dropped from the collection instead of
    /// failing the call. Returns the surviving items.
    pub async fn get_collection_items(&self, collection: &Resource) -> SyncResult<Vec<Resource>> {
        let items = collection.items();
        let results = join_all(items.iter().map(|item| self.get_resource(item))).await;

        let failed: Vec<Resource> = items
            .into_iter()
            .zip(results)
            .filter_map(|(item, result)| match result {
                Ok(_) => None,
                Err(e) => {
                    warn!(uri = ?item.uri(), error = %e, "dropping item that failed to hydrate");
                    Some(item)
                }
            })
            .collect();
        if !failed.is_empty() {
            collection.retain_items(|i| !failed.iter().any(|f| f.ptr_eq(i)));
        }
        Ok(collection.items())
    }

    /// Hydrates `collection` and then its items.
    pub async fn get_collection_resource_and_items(
        &self,
        collection: &Resource,
    ) -> SyncResult<Resource> {
        self.get_resource(collection).await?;
        self.get_collection_items(collection).await?;
        Ok(collection.clone())
    }

    /// Locates the named collection and hydrates it and its items.
    pub async fn get_named_collection_resource_and_items(
        &self,
        parent: &Resource,
        name: &str,
        rel: &str,
    ) -> SyncResult<Resource> {
        let collection = self.get_named_collection_resource(parent, name, rel).await?;
        self.get_collection_items(&collection).await?;
        Ok(collection)
    }

    // ---- writes ----

    /// Creates `document` in `collection` through its create form and
    /// appends the new item.
    ///
    /// `Ok(None)` when the collection has no create form or the merge
    /// fails; both leave the collection untouched.
    pub async fn create_collection_resource_item(
        &self,
        collection: &Resource,
        document: &Representation,
    ) -> SyncResult<Option<Resource>> {
        let accessors = collection.accessors(self.transport());
        let Some(form) = accessors.form(&self.config.create_form_rel).await? else {
            debug!(collection = ?collection.uri(), "no create form, create skipped");
            return Ok(None);
        };
        let payload = match self.merge.create_merge(document, &form) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(collection = ?collection.uri(), error = %e, "create merge failed");
                return Ok(None);
            }
        };

        let response = accessors
            .create(Body::Representation(payload.clone()))
            .await?;
        let item = match response.location.as_deref() {
            Some(location) if response.is_created() => sparse::from_uri(Some(location)),
            location => {
                let item = Resource::with_status(payload, Status::Virtual);
                if let Some(location) = location {
                    item.assign_identity(location);
                }
                item.transition(Status::Hydrated)?;
                item
            }
        };
        debug!(collection = ?collection.uri(), item = ?item.uri(), "created item");
        collection.push_item(item.clone());
        Ok(Some(item))
    }

    /// Creates a singleton that its parent links to but that does not exist
    /// yet, by PUTting `document` to its identity.
    pub async fn create_singleton(
        &self,
        singleton: &Resource,
        document: &Representation,
    ) -> SyncResult<bool> {
        let payload = match self.merge.create_merge(document, &Representation::new()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(uri = ?singleton.uri(), error = %e, "singleton merge failed");
                return Ok(false);
            }
        };
        singleton
            .accessors(self.transport())
            .update(Body::Representation(payload.clone()))
            .await?;
        singleton.apply_written(&payload)?;
        debug!(uri = ?singleton.uri(), "created singleton");
        Ok(true)
    }

    /// Updates `resource` towards `document` through its edit form.
    ///
    /// Returns false, without writing, when there is no edit form, the merge
    /// reports no change, or the merge fails.
    pub async fn update_resource(
        &self,
        resource: &Resource,
        document: &Representation,
    ) -> SyncResult<bool> {
        let accessors = resource.accessors(self.transport());
        let Some(form) = accessors.form(&self.config.edit_form_rel).await? else {
            debug!(uri = ?resource.uri(), "no edit form, update skipped");
            return Ok(false);
        };
        let current = resource.to_wire_representation();
        let payload = match self.merge.edit_merge(&current, document, &form) {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                debug!(uri = ?resource.uri(), "no change, update skipped");
                return Ok(false);
            }
            Err(e) => {
                warn!(uri = ?resource.uri(), error = %e, "edit merge failed");
                return Ok(false);
            }
        };

        accessors
            .update(Body::Representation(payload.clone()))
            .await?;
        resource.apply_written(&payload)?;
        debug!(uri = ?resource.uri(), "updated resource");
        Ok(true)
    }

    /// Deletes `resource` remotely. A resource already gone is not an error.
    pub async fn delete_resource(&self, resource: &Resource) -> SyncResult<()> {
        if resource.identity_link().is_none() {
            return Ok(());
        }
        match resource.accessors(self.transport()).delete(None).await {
            Ok(_) => {
                debug!(uri = ?resource.uri(), "deleted resource");
                Ok(())
            }
            Err(e) if e.is_not_found() => {
                debug!(uri = ?resource.uri(), "resource already deleted");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Deletes `item` remotely, then removes it from `collection`.
    pub async fn delete_collection_item(
        &self,
        collection: &Resource,
        item: &Resource,
    ) -> SyncResult<()> {
        self.delete_resource(item).await?;
        collection.remove_item(item);
        Ok(())
    }

    /// Adds `uri` to a membership collection without creating anything.
    pub async fn link_collection_item(
        &self,
        collection: &Resource,
        uri: &str,
    ) -> SyncResult<Resource> {
        if let Some(existing) = collection.find_item(uri) {
            return Ok(existing);
        }
        collection
            .accessors(self.transport())
            .create(Body::UriList(vec![uri.to_owned()]))
            .await?;
        let item = sparse::from_uri(Some(uri));
        collection.push_item(item.clone());
        debug!(collection = ?collection.uri(), uri, "linked item");
        Ok(item)
    }

    /// Removes `item` from a membership collection. The item itself is not
    /// deleted.
    pub async fn unlink_collection_item(
        &self,
        collection: &Resource,
        item: &Resource,
    ) -> SyncResult<()> {
        if let Some(uri) = item.uri() {
            collection
                .accessors(self.transport())
                .delete(Some(Body::UriList(vec![uri.clone()])))
                .await?;
            debug!(collection = ?collection.uri(), uri, "unlinked item");
        }
        collection.remove_item(item);
        Ok(())
    }

    /// Reads the identifier list behind `resource`'s `rel` link.
    pub async fn get_uri_list(&self, resource: &Resource, rel: &str) -> SyncResult<Vec<String>> {
        resource
            .accessors(self.transport())
            .get_uri_list(rel)
            .await
    }

    /// Adds `uris` to the list behind `rel` in one request.
    pub async fn post_uri_list(
        &self,
        resource: &Resource,
        rel: &str,
        uris: Vec<String>,
    ) -> SyncResult<()> {
        if uris.is_empty() {
            return Ok(());
        }
        resource
            .accessors(self.transport())
            .post_to(rel, Body::UriList(uris))
            .await?;
        Ok(())
    }

    /// Removes `uris` from the list behind `rel` in one request.
    pub async fn delete_uri_list(
        &self,
        resource: &Resource,
        rel: &str,
        uris: Vec<String>,
    ) -> SyncResult<()> {
        if uris.is_empty() {
            return Ok(());
        }
        resource
            .accessors(self.transport())
            .delete_at(rel, Some(Body::UriList(uris)))
            .await?;
        Ok(())
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{MockTransport, TransportCall};
    use hyperdata_protocol::rel;
    use serde_json::json;

    fn setup() -> (Arc<MockTransport>, Cache) {
        let transport = Arc::new(MockTransport::new());
        let cache = Cache::new(transport.clone());
        (transport, cache)
    }

    fn todos() -> Representation {
        Representation::from_uri("http://x/t/")
            .with_link(rel::CREATE_FORM, "http://x/t/form")
            .with_items(Vec::new())
    }

    fn form(fields: &[&str]) -> Representation {
        fields.iter().fold(Representation::collection(), |form, f| {
            form.with_item(Representation::new().with_attribute("name", *f))
        })
    }

    #[tokio::test]
    async fn get_fetches_once() {
        let (transport, cache) = setup();
        transport.set(
            "http://x/1",
            Representation::from_uri("http://x/1").with_attribute("name", "A"),
        );
        let resource = sparse::from_uri(Some("http://x/1"));

        cache.get_resource(&resource).await.unwrap();
        cache.get_resource(&resource).await.unwrap();

        assert_eq!(resource.status(), Status::Hydrated);
        assert_eq!(resource.attribute("name"), Some(json!("A")));
        assert_eq!(transport.get_count("http://x/1"), 1);
    }

    #[tokio::test]
    async fn force_load_refetches() {
        let transport = Arc::new(MockTransport::new());
        let cache = Cache::new(transport.clone()).with_config(CacheConfig::new().with_force_load(true));
        transport.set("http://x/1", Representation::from_uri("http://x/1"));
        let resource = sparse::from_uri(Some("http://x/1"));

        cache.get_resource(&resource).await.unwrap();
        cache.get_resource(&resource).await.unwrap();
        assert_eq!(transport.get_count("http://x/1"), 2);
    }

    #[tokio::test]
    async fn virtual_get_is_local() {
        let (transport, cache) = setup();
        let resource = sparse::from_uri(None);
        let got = cache.get_resource(&resource).await.unwrap();
        assert!(got.ptr_eq(&resource));
        assert_eq!(got.status(), Status::Virtual);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn not_found_and_try_get() {
        let (_transport, cache) = setup();
        let missing = sparse::from_uri(Some("http://x/404"));
        let err = cache.get_resource(&missing).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(missing.status(), Status::LocationOnly);

        let unidentified = sparse::unknown();
        assert!(cache.try_get_resource(&unidentified).await.unwrap().is_none());
        assert!(matches!(
            cache.get_resource(&unidentified).await.unwrap_err(),
            SyncError::MissingIdentity
        ));
    }

    #[tokio::test]
    async fn refresh_failure_keeps_stale_state() {
        let (transport, cache) = setup();
        transport.set(
            "http://x/1",
            Representation::from_uri("http://x/1").with_attribute("name", "A"),
        );
        let resource = sparse::from_uri(Some("http://x/1"));
        cache.get_resource(&resource).await.unwrap();

        transport.fail("http://x/1");
        assert!(cache.refresh(&resource).await.is_err());
        assert_eq!(resource.status(), Status::Hydrated);
        assert_eq!(resource.attribute("name"), Some(json!("A")));
    }

    #[tokio::test]
    async fn named_collection_and_singleton() {
        let (transport, cache) = setup();
        transport.set(
            "http://x/t/1",
            Representation::from_uri("http://x/t/1")
                .with_link("tags", "http://x/t/1/tags")
                .with_link("owner", "http://x/u/1"),
        );
        transport.set("http://x/t/1/tags", Representation::from_uri("http://x/t/1/tags").with_items(vec![
            Representation::from_uri("http://x/g/1"),
        ]));
        transport.set(
            "http://x/u/1",
            Representation::from_uri("http://x/u/1").with_attribute("name", "me"),
        );
        let todo = sparse::from_uri(Some("http://x/t/1"));

        let tags = cache
            .get_named_collection_resource(&todo, "tags", "tags")
            .await
            .unwrap();
        assert!(todo.child("tags").unwrap().ptr_eq(&tags));
        assert!(todo.state().is_tracked("tags"));
        assert_eq!(tags.items().len(), 1);
        assert_eq!(tags.items()[0].status(), Status::LocationOnly);

        let owner = cache.get_singleton(&todo, "owner", "owner").await.unwrap();
        assert_eq!(owner.attribute("name"), Some(json!("me")));

        assert!(cache
            .try_get_singleton(&todo, "assignee", "assignee")
            .await
            .unwrap()
            .is_none());
        assert!(cache
            .get_singleton(&todo, "assignee", "assignee")
            .await
            .unwrap_err()
            .is_unsupported());
    }

    #[tokio::test]
    async fn declared_placeholder_is_located() {
        let (transport, cache) = setup();
        transport.set(
            "http://x/t/1",
            Representation::from_uri("http://x/t/1").with_link("tags", "http://x/t/1/tags"),
        );
        transport.set(
            "http://x/t/1/tags",
            Representation::from_uri("http://x/t/1/tags")
                .with_items(vec![Representation::from_uri("http://x/g/1")]),
        );
        let todo = sparse::from_uri(Some("http://x/t/1"));
        let declared = todo.declare_child("tags");
        let owner = todo.declare_child("owner");

        let tags = cache
            .get_named_collection_resource(&todo, "tags", "tags")
            .await
            .unwrap();
        assert!(tags.ptr_eq(&declared));
        assert_eq!(tags.status(), Status::Hydrated);
        assert_eq!(tags.items().len(), 1);

        assert!(cache
            .try_get_singleton(&todo, "owner", "owner")
            .await
            .unwrap()
            .is_none());
        assert_eq!(owner.status(), Status::Unknown);
    }

    #[tokio::test]
    async fn failed_items_are_dropped() {
        let (transport, cache) = setup();
        transport.set(
            "http://x/t/",
            todos().with_items(vec![
                Representation::from_uri("http://x/t/1"),
                Representation::from_uri("http://x/t/2"),
            ]),
        );
        transport.set(
            "http://x/t/1",
            Representation::from_uri("http://x/t/1").with_attribute("name", "A"),
        );
        let collection = sparse::collection_from_uri(Some("http://x/t/"));

        cache
            .get_collection_resource_and_items(&collection)
            .await
            .unwrap();
        let items = collection.items();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].uri().as_deref(), Some("http://x/t/1"));
        assert_eq!(items[0].status(), Status::Hydrated);
    }

    #[tokio::test]
    async fn create_appends_sparse_item() {
        let (transport, cache) = setup();
        transport.set("http://x/t/", todos());
        transport.set("http://x/t/form", form(&["name"]));
        let collection = sparse::collection_from_uri(Some("http://x/t/"));
        cache.get_resource(&collection).await.unwrap();

        let doc = Representation::new()
            .with_attribute("name", "B")
            .with_attribute("ignored", true);
        let created = cache
            .create_collection_resource_item(&collection, &doc)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(created.status(), Status::LocationOnly);
        assert_eq!(created.uri().as_deref(), Some("http://x/t/1"));
        assert_eq!(collection.items().len(), 1);

        let posted = transport
            .writes()
            .into_iter()
            .find_map(|c| match c {
                TransportCall::Post(_, Body::Representation(r)) => Some(r),
                _ => None,
            })
            .unwrap();
        assert!(posted.attribute("ignored").is_none());
    }

    #[tokio::test]
    async fn writes_without_forms_are_noops() {
        let (transport, cache) = setup();
        transport.set("http://x/t/", Representation::from_uri("http://x/t/").with_items(Vec::new()));
        let collection = sparse::collection_from_uri(Some("http://x/t/"));
        cache.get_resource(&collection).await.unwrap();

        let doc = Representation::new().with_attribute("name", "B");
        assert!(cache
            .create_collection_resource_item(&collection, &doc)
            .await
            .unwrap()
            .is_none());
        assert!(!cache.update_resource(&collection, &doc).await.unwrap());
        assert!(transport.writes().is_empty());
        assert!(collection.items().is_empty());
    }

    #[tokio::test]
    async fn update_only_on_change() {
        let (transport, cache) = setup();
        transport.set(
            "http://x/t/1",
            Representation::from_uri("http://x/t/1")
                .with_link(rel::EDIT_FORM, "http://x/t/form")
                .with_attribute("name", "A"),
        );
        transport.set("http://x/t/form", form(&["name"]));
        let todo = sparse::from_uri(Some("http://x/t/1"));
        cache.get_resource(&todo).await.unwrap();

        let same = Representation::new().with_attribute("name", "A");
        assert!(!cache.update_resource(&todo, &same).await.unwrap());
        assert!(transport.writes().is_empty());

        let changed = Representation::new().with_attribute("name", "B");
        assert!(cache.update_resource(&todo, &changed).await.unwrap());
        assert_eq!(transport.writes().len(), 1);
        assert_eq!(todo.attribute("name"), Some(json!("B")));
    }

    #[tokio::test]
    async fn delete_removes_locally_and_tolerates_gone() {
        let (transport, cache) = setup();
        let collection = sparse::collection_from_uri(Some("http://x/t/"));
        let item = sparse::from_uri(Some("http://x/t/1"));
        collection.push_item(item.clone());

        cache.delete_collection_item(&collection, &item).await.unwrap();
        assert!(collection.items().is_empty());
        assert_eq!(transport.writes(), vec![TransportCall::Delete("http://x/t/1".into(), None)]);
    }

    #[tokio::test]
    async fn link_and_unlink_membership() {
        let (transport, cache) = setup();
        transport.set_uri_list("http://x/t/1/tags", Vec::new());
        let tags = sparse::collection_from_uri(Some("http://x/t/1/tags"));

        let linked = cache
            .link_collection_item(&tags, "http://x/g/1")
            .await
            .unwrap();
        let again = cache
            .link_collection_item(&tags, "http://x/g/1")
            .await
            .unwrap();
        assert!(linked.ptr_eq(&again));
        assert_eq!(tags.items().len(), 1);

        cache.unlink_collection_item(&tags, &linked).await.unwrap();
        assert!(tags.items().is_empty());
        assert_eq!(transport.writes().len(), 2);
        assert!(transport
            .get_uri_list(&hyperdata_protocol::Link::new(rel::SELF, "http://x/t/1/tags"))
            .await
            .unwrap()
            .is_empty());
    }
}
