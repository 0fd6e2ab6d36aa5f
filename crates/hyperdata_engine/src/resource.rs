//! Resource handles in the local graph.

use crate::error::{SyncError, SyncResult};
use crate::state::{Accessors, State, Status};
use crate::transport::LinkTransport;
use hyperdata_protocol::{rel, Link, Representation};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

struct Node {
    state: State,
    links: Vec<Link>,
    attributes: Map<String, Value>,
    children: IndexMap<String, Resource>,
    items: Option<Vec<Resource>>,
}

/// A shared handle to one resource in the local graph.
///
/// Cloning the handle does not copy the resource; two handles are the same
/// resource iff [`Resource::ptr_eq`] holds. The resource's [`State`] lives
/// inside the handle and is never serialized (see
/// [`Resource::to_wire_representation`]).
///
/// Locks are held only for the duration of each accessor, never across an
/// `.await`.
#[derive(Clone)]
pub struct Resource {
    inner: Arc<RwLock<Node>>,
}

impl Resource {
    pub(crate) fn with_status(repr: Representation, status: Status) -> Self {
        let items = repr.items.map(|items| {
            items
                .into_iter()
                .map(|item| {
                    let item_status = if status == Status::Hydrated {
                        Status::Hydrated
                    } else if item.identity().is_some() {
                        Status::LocationOnly
                    } else {
                        Status::Virtual
                    };
                    Resource::with_status(item, item_status)
                })
                .collect()
        });
        Self {
            inner: Arc::new(RwLock::new(Node {
                state: State::new(status),
                links: repr.links,
                attributes: repr.attributes,
                children: IndexMap::new(),
                items,
            })),
        }
    }

    /// Wraps a fully-populated representation (and its embedded items) as
    /// hydrated resources.
    pub fn hydrated(repr: Representation) -> Self {
        Self::with_status(repr, Status::Hydrated)
    }

    /// Returns true if both handles point at the same resource.
    pub fn ptr_eq(&self, other: &Resource) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Returns a snapshot of the resource's state.
    pub fn state(&self) -> State {
        self.inner.read().state.clone()
    }

    /// Returns the current hydration status.
    pub fn status(&self) -> Status {
        self.inner.read().state.status()
    }

    pub(crate) fn transition(&self, next: Status) -> SyncResult<()> {
        self.inner.write().state.transition(next)
    }

    /// Returns accessors bound to this resource's link relations.
    pub fn accessors<'a>(&'a self, transport: &'a dyn LinkTransport) -> Accessors<'a> {
        Accessors::new(self, transport)
    }

    /// Returns a copy of the links.
    pub fn links(&self) -> Vec<Link> {
        self.inner.read().links.clone()
    }

    /// Returns the first link carrying relation `name`.
    pub fn link(&self, name: &str) -> Option<Link> {
        self.inner
            .read()
            .links
            .iter()
            .find(|l| l.has_rel(name))
            .cloned()
    }

    /// Returns the href of the first link carrying relation `name`.
    pub fn href(&self, name: &str) -> Option<String> {
        self.link(name).map(|l| l.href)
    }

    /// Returns the identifying link: `canonical` when present, else `self`.
    pub fn identity_link(&self) -> Option<Link> {
        rel::IDENTITY.iter().find_map(|r| self.link(r))
    }

    /// Returns the identity URI, if any.
    pub fn uri(&self) -> Option<String> {
        self.identity_link().map(|l| l.href)
    }

    /// Returns a named attribute.
    pub fn attribute(&self, name: &str) -> Option<Value> {
        self.inner.read().attributes.get(name).cloned()
    }

    /// Sets a named attribute locally.
    pub fn set_attribute(&self, name: impl Into<String>, value: impl Into<Value>) {
        self.inner
            .write()
            .attributes
            .insert(name.into(), value.into());
    }

    /// Returns a named child singleton or collection.
    pub fn child(&self, name: &str) -> Option<Resource> {
        self.inner.read().children.get(name).cloned()
    }

    /// Installs a named child. The slot is tracked as an engine placeholder
    /// unless the resource already held a real attribute of that name.
    pub(crate) fn attach_child(&self, name: &str, child: Resource) {
        let mut node = self.inner.write();
        if !node.attributes.contains_key(name) {
            node.state.track(name);
        }
        node.children.insert(name.to_owned(), child);
    }

    /// Declares a child slot `name` whose identity is not known yet.
    ///
    /// Installs an `unknown` placeholder unless the slot is already taken,
    /// and returns whatever the slot holds. The cache locates the
    /// placeholder once the parent links the child.
    pub fn declare_child(&self, name: &str) -> Resource {
        if let Some(child) = self.child(name) {
            return child;
        }
        let placeholder = crate::sparse::unknown();
        self.attach_child(name, placeholder.clone());
        placeholder
    }

    /// Returns the names of all attached children.
    pub fn child_names(&self) -> Vec<String> {
        self.inner.read().children.keys().cloned().collect()
    }

    /// Returns true if this resource is a collection.
    pub fn is_collection(&self) -> bool {
        self.inner.read().items.is_some()
    }

    /// Returns handles to the collection items (empty for non-collections).
    pub fn items(&self) -> Vec<Resource> {
        self.inner.read().items.clone().unwrap_or_default()
    }

    /// Appends an item, turning the resource into a collection if needed.
    pub(crate) fn push_item(&self, item: Resource) {
        self.inner
            .write()
            .items
            .get_or_insert_with(Vec::new)
            .push(item);
    }

    /// Removes `item` from the collection. Returns false if absent.
    pub(crate) fn remove_item(&self, item: &Resource) -> bool {
        let mut node = self.inner.write();
        let Some(items) = node.items.as_mut() else {
            return false;
        };
        let before = items.len();
        items.retain(|i| !i.ptr_eq(item));
        items.len() != before
    }

    /// Keeps only the items for which `keep` returns true.
    pub(crate) fn retain_items(&self, keep: impl Fn(&Resource) -> bool) {
        if let Some(items) = self.inner.write().items.as_mut() {
            items.retain(|i| keep(i));
        }
    }

    /// Finds an item by identity.
    pub fn find_item(&self, uri: &str) -> Option<Resource> {
        self.items()
            .into_iter()
            .find(|i| i.uri().as_deref() == Some(uri))
    }

    /// Applies a fetched representation and marks the resource hydrated.
    ///
    /// Links and attributes are replaced. For collections the incoming items
    /// are reconciled by identity: an existing item handle (and its state) is
    /// kept when the feed still lists it, new entries become sparse items,
    /// and items the feed no longer lists are dropped.
    pub(crate) fn apply_fetched(&self, fetched: Representation) -> SyncResult<()> {
        let existing = self.items();
        let mut node = self.inner.write();
        node.state.transition(Status::Hydrated)?;
        node.links = fetched.links;
        node.attributes = fetched.attributes;
        if let Some(feed) = fetched.items {
            let items = feed
                .iter()
                .map(|entry| {
                    entry
                        .identity()
                        .and_then(|uri| {
                            existing
                                .iter()
                                .find(|e| e.uri().as_deref() == Some(uri))
                                .cloned()
                        })
                        .unwrap_or_else(|| crate::sparse::from_feed_item(entry))
                })
                .collect();
            node.items = Some(items);
        }
        Ok(())
    }

    /// Replaces attributes after a successful write and marks the resource
    /// hydrated.
    pub(crate) fn apply_written(&self, written: &Representation) -> SyncResult<()> {
        let mut node = self.inner.write();
        node.state.transition(Status::Hydrated)?;
        for (name, value) in &written.attributes {
            node.attributes.insert(name.clone(), value.clone());
        }
        Ok(())
    }

    /// Gives an `unknown` placeholder the identity `uri` and moves it to
    /// `locationOnly`. A placeholder located as a collection gets an empty
    /// item list.
    pub fn locate(&self, uri: &str, collection: bool) -> SyncResult<()> {
        let mut node = self.inner.write();
        if node.state.status() != Status::Unknown {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", node.state.status()),
                to: format!("{:?}", Status::LocationOnly),
            });
        }
        node.state.transition(Status::LocationOnly)?;
        node.links.insert(0, Link::new(rel::SELF, uri));
        if collection {
            node.items.get_or_insert_with(Vec::new);
        }
        Ok(())
    }

    /// Gives a virtual resource its identity after it was created at `uri`.
    pub(crate) fn assign_identity(&self, uri: &str) {
        let mut node = self.inner.write();
        if !node.links.iter().any(|l| l.has_rel(rel::SELF)) {
            node.links.insert(0, Link::new(rel::SELF, uri));
        }
    }

    /// Returns a full snapshot: links, attributes, and item snapshots.
    pub fn representation(&self) -> Representation {
        let (links, attributes, items) = {
            let node = self.inner.read();
            (node.links.clone(), node.attributes.clone(), node.items.clone())
        };
        Representation {
            links,
            attributes,
            items: items.map(|items| items.iter().map(Resource::representation).collect()),
        }
    }

    /// Returns the representation to send over the wire.
    ///
    /// The state, child placeholders, tracked names, and collection items
    /// are not part of the wire form.
    pub fn to_wire_representation(&self) -> Representation {
        let node = self.inner.read();
        let attributes = node
            .attributes
            .iter()
            .filter(|(name, _)| !node.state.is_tracked(name))
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Representation {
            links: node.links.clone(),
            attributes,
            items: None,
        }
    }
}

impl fmt::Debug for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let node = self.inner.read();
        f.debug_struct("Resource")
            .field("status", &node.state.status())
            .field(
                "uri",
                &rel::IDENTITY
                    .iter()
                    .find_map(|r| node.links.iter().find(|l| l.has_rel(r)))
                    .map(|l| l.href.as_str()),
            )
            .field("items", &node.items.as_ref().map(Vec::len))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sparse;

    #[test]
    fn identity_and_handles() {
        let a = sparse::from_uri(Some("http://x/1"));
        let b = a.clone();
        let c = sparse::from_uri(Some("http://x/1"));
        assert!(a.ptr_eq(&b));
        assert!(!a.ptr_eq(&c));
        assert_eq!(a.uri().as_deref(), Some("http://x/1"));
    }

    #[test]
    fn fetched_items_keep_existing_handles() {
        let collection = sparse::collection_from_uri(Some("http://x/t/"));
        let kept = sparse::from_uri(Some("http://x/t/1"));
        let dropped = sparse::from_uri(Some("http://x/t/2"));
        collection.push_item(kept.clone());
        collection.push_item(dropped.clone());

        let fetched = Representation::from_uri("http://x/t/")
            .with_attribute("title", "Todos")
            .with_item(Representation::from_uri("http://x/t/1"))
            .with_item(Representation::from_uri("http://x/t/3"));
        collection.apply_fetched(fetched).unwrap();

        let items = collection.items();
        assert_eq!(items.len(), 2);
        assert!(items[0].ptr_eq(&kept));
        assert_eq!(items[1].uri().as_deref(), Some("http://x/t/3"));
        assert_eq!(items[1].status(), Status::LocationOnly);
        assert_eq!(collection.status(), Status::Hydrated);
        assert_eq!(collection.attribute("title"), Some(Value::from("Todos")));
    }

    #[test]
    fn wire_representation_strips_placeholders() {
        let todo = Resource::hydrated(
            Representation::from_uri("http://x/t/1").with_attribute("name", "A"),
        );
        todo.attach_child("tags", sparse::collection_from_uri(Some("http://x/t/1/tags")));
        todo.set_attribute("tags", "placeholder");

        let wire = todo.to_wire_representation();
        assert_eq!(wire.attribute_str("name"), Some("A"));
        assert!(wire.attribute("tags").is_none());
        assert!(wire.items.is_none());
        assert!(todo.state().is_tracked("tags"));
    }

    #[test]
    fn existing_attribute_not_tracked() {
        let todo = Resource::hydrated(
            Representation::from_uri("http://x/t/1").with_attribute("owner", "me"),
        );
        todo.attach_child("owner", sparse::from_uri(Some("http://x/u/1")));
        assert!(!todo.state().is_tracked("owner"));
        assert_eq!(
            todo.to_wire_representation().attribute_str("owner"),
            Some("me")
        );
    }

    #[test]
    fn declared_child_is_located_once() {
        let todo = sparse::from_uri(Some("http://x/t/1"));
        let tags = todo.declare_child("tags");
        assert_eq!(tags.status(), Status::Unknown);
        assert!(todo.declare_child("tags").ptr_eq(&tags));
        assert!(todo.state().is_tracked("tags"));

        tags.locate("http://x/t/1/tags", true).unwrap();
        assert_eq!(tags.status(), Status::LocationOnly);
        assert_eq!(tags.uri().as_deref(), Some("http://x/t/1/tags"));
        assert!(tags.is_collection());

        let err = tags.locate("http://x/t/1/other", true).unwrap_err();
        assert!(matches!(err, SyncError::InvalidStateTransition { .. }));
        assert_eq!(tags.uri().as_deref(), Some("http://x/t/1/tags"));
    }

    #[test]
    fn remove_item_by_handle() {
        let collection = sparse::collection_from_uri(Some("http://x/t/"));
        let item = sparse::from_uri(Some("http://x/t/1"));
        collection.push_item(item.clone());
        assert!(collection.remove_item(&item));
        assert!(!collection.remove_item(&item));
        assert!(collection.items().is_empty());
    }
}
