//! Test fixtures.
//!
//! Provides a ready-made todo API and helpers for building desired-state
//! documents against it.

use crate::server::{CollectionSpec, MemoryServer};
use hyperdata_engine::{Cache, HttpTransport, Resource, Synchronizer};
use hyperdata_protocol::{rel, Representation};
use serde_json::Value;
use std::sync::Arc;

/// Root of the fixture API.
pub const ROOT: &str = "http://api.test/";
/// The todo collection.
pub const TODOS: &str = "http://api.test/todos/";
/// The pooled tag collection.
pub const TAGS: &str = "http://api.test/tags/";
/// A collection without a create form.
pub const ARCHIVE: &str = "http://api.test/archive/";

/// A synchronizer wired to a [`MemoryServer`].
pub struct TestApi {
    /// The server, for assertions.
    pub server: Arc<MemoryServer>,
    /// The synchronizer under test.
    pub sync: Synchronizer,
}

impl TestApi {
    /// Wraps `server` in the real HTTP transport and a default cache.
    pub fn new(server: MemoryServer) -> Self {
        let server = Arc::new(server);
        let transport = Arc::new(HttpTransport::new(server.clone()));
        let cache = Arc::new(Cache::new(transport));
        Self {
            server,
            sync: Synchronizer::new(cache),
        }
    }

    /// Returns the cache.
    pub fn cache(&self) -> &Cache {
        self.sync.cache()
    }

    /// Returns a fresh sparse handle on the API root.
    pub fn root(&self) -> Resource {
        hyperdata_engine::sparse::from_uri(Some(ROOT))
    }
}

/// Builds the todo API.
///
/// - `/` links `todos`, `tags` and `archive`
/// - `/todos/` has a create form (`name`, `done`); every todo gets a `tags`
///   membership collection
/// - `/tags/` is the tag pool, with a create form (`name`)
/// - `/archive/` has no create form
pub fn todo_api() -> MemoryServer {
    let server = MemoryServer::new();
    server.insert(
        Representation::from_uri(ROOT)
            .with_link("todos", TODOS)
            .with_link("tags", TAGS)
            .with_link("archive", ARCHIVE)
            .with_attribute("title", "Todo API"),
    );
    server.insert_collection(
        TODOS,
        CollectionSpec::with_form(&["name", "done"])
            .with_member_collection("tags")
            .with_attribute("title", "Todos"),
    );
    server.insert_collection(TAGS, CollectionSpec::with_form(&["name"]));
    server.insert_collection(ARCHIVE, CollectionSpec::read_only());
    server
}

/// Adds a todo with the given tags (tag names, created in the pool when
/// missing). Returns the todo's identity.
///
/// # Panics
///
/// Panics if `server` was not built by [`todo_api`].
pub fn seed_todo(server: &MemoryServer, name: &str, done: bool, tags: &[&str]) -> String {
    let uri = server
        .insert_member(TODOS, todo_document(name, done, &[]))
        .expect("todo collection has a create form");
    for tag in tags {
        let existing = server
            .member_documents(TAGS)
            .into_iter()
            .find(|t| t.attribute_str("name") == Some(*tag))
            .and_then(|t| t.identity().map(str::to_owned));
        let tag_uri = existing.unwrap_or_else(|| {
            server
                .insert_member(TAGS, tag_document(tag))
                .expect("tag collection has a create form")
        });
        server.link(&format!("{uri}/tags"), &tag_uri);
    }
    uri
}

/// Adds an item to the read-only archive. Returns its identity.
pub fn seed_archived(server: &MemoryServer, id: u32, name: &str) -> String {
    let uri = format!("{ARCHIVE}{id}");
    server.insert(
        Representation::from_uri(uri.as_str())
            .with_link(rel::UP, ARCHIVE)
            .with_attribute("name", name),
    );
    server.link(ARCHIVE, &uri);
    uri
}

/// A desired-state todo. Tags are given by name.
pub fn todo_document(name: &str, done: bool, tags: &[&str]) -> Representation {
    let doc = Representation::new()
        .with_attribute("name", name)
        .with_attribute("done", done);
    if tags.is_empty() {
        return doc;
    }
    let tags = tags
        .iter()
        .fold(Representation::collection(), |c, t| c.with_item(tag_document(t)));
    doc.with_child("tags", &tags)
}

/// A desired-state tag.
pub fn tag_document(name: &str) -> Representation {
    Representation::new().with_attribute("name", name)
}

/// A desired-state collection of `items`.
pub fn collection_document(items: Vec<Representation>) -> Representation {
    Representation::collection().with_items(items)
}

/// Returns the names of `resources`, in order.
pub fn names(resources: &[Resource]) -> Vec<String> {
    resources
        .iter()
        .filter_map(|r| r.attribute("name"))
        .filter_map(|v| match v {
            Value::String(s) => Some(s),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seeded_todo_links_pooled_tags() {
        let server = todo_api();
        let first = seed_todo(&server, "milk", false, &["shop", "urgent"]);
        let second = seed_todo(&server, "eggs", false, &["shop"]);

        assert_eq!(server.members(TODOS), vec![first.clone(), second.clone()]);
        assert_eq!(server.members(TAGS).len(), 2);
        assert_eq!(
            server.members(&format!("{second}/tags")),
            vec![server.members(TAGS)[0].clone()]
        );
        let todo = server.document(&first).unwrap();
        assert_eq!(todo.href("tags"), Some(format!("{first}/tags").as_str()));
    }

    #[test]
    fn todo_document_shape() {
        let doc = todo_document("milk", true, &["shop"]);
        let tags = doc.child("tags").unwrap().unwrap();
        assert!(tags.is_collection());
        assert_eq!(tags.items()[0].attribute_str("name"), Some("shop"));
        assert!(todo_document("x", false, &[]).child("tags").unwrap().is_none());
    }
}
