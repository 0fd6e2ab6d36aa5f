//! In-memory hypermedia server.
//!
//! [`MemoryServer`] implements the engine's [`HttpClient`] so tests can run
//! the real [`HttpTransport`](hyperdata_engine::HttpTransport) against a
//! server that behaves like a small REST API:
//!
//! - documents are served as JSON at their `self` URI
//! - collections list their members as feed entries (identity + title)
//! - POSTing JSON to a collection with a create form creates a member and
//!   answers `201 Created` with a `Location`
//! - POSTing or DELETEing a `text/uri-list` body links or unlinks members
//! - PUT replaces a document's attributes, or creates it if absent
//! - DELETE removes a document and every membership pointing at it

use async_trait::async_trait;
use hyperdata_engine::{HttpClient, HttpRequest, HttpResponse, Method};
use hyperdata_protocol::{media_type, rel, uri_list, Body, Link, Representation};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashSet};

/// How a collection is set up.
#[derive(Debug, Clone, Default)]
pub struct CollectionSpec {
    /// Collection attributes (title, description, ...).
    pub attributes: Map<String, Value>,
    /// Fields of the create form. `None` publishes no create form, making
    /// the collection read-only (or a pure membership list).
    pub form_fields: Option<Vec<String>>,
    /// Membership collections every created member gets, by link relation.
    pub member_collections: Vec<String>,
}

impl CollectionSpec {
    /// A collection without a create form.
    pub fn read_only() -> Self {
        Self::default()
    }

    /// A collection whose create form lists `fields`.
    pub fn with_form(fields: &[&str]) -> Self {
        Self {
            form_fields: Some(fields.iter().map(|f| (*f).to_owned()).collect()),
            ..Self::default()
        }
    }

    /// Gives every created member a membership collection under `rel`.
    pub fn with_member_collection(mut self, rel: impl Into<String>) -> Self {
        self.member_collections.push(rel.into());
        self
    }

    /// Sets a collection attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }
}

#[derive(Debug)]
struct Collection {
    links: Vec<Link>,
    attributes: Map<String, Value>,
    members: Vec<String>,
    member_collections: Vec<String>,
}

#[derive(Debug, Default)]
struct ServerState {
    documents: BTreeMap<String, Representation>,
    collections: BTreeMap<String, Collection>,
    uri_lists: BTreeMap<String, Vec<String>>,
    unavailable: HashSet<String>,
    requests: Vec<(Method, String)>,
    next_id: u64,
}

/// An in-memory REST API reachable through [`HttpClient`].
#[derive(Debug, Default)]
pub struct MemoryServer {
    state: RwLock<ServerState>,
}

fn form_uri(collection: &str) -> String {
    format!("{}/form", collection.trim_end_matches('/'))
}

fn form(fields: &[String]) -> Representation {
    fields.iter().fold(Representation::collection(), |form, f| {
        form.with_item(Representation::new().with_attribute("name", f.as_str()))
    })
}

fn json(repr: &Representation) -> HttpResponse {
    match repr.to_json() {
        Ok(body) => HttpResponse::ok(media_type::JSON, body),
        Err(_) => HttpResponse::status(500),
    }
}

impl ServerState {
    fn create_member(&mut self, collection_uri: &str, payload: Representation) -> Option<String> {
        let (form, children) = {
            let collection = self.collections.get(collection_uri)?;
            (
                collection
                    .links
                    .iter()
                    .find(|l| l.has_rel(rel::CREATE_FORM))
                    .map(|l| l.href.clone()),
                collection.member_collections.clone(),
            )
        };
        let form = form?;

        let base = if collection_uri.ends_with('/') {
            collection_uri.to_owned()
        } else {
            format!("{collection_uri}/")
        };
        let uri = loop {
            self.next_id += 1;
            let candidate = format!("{base}{}", self.next_id);
            if !self.documents.contains_key(&candidate) {
                break candidate;
            }
        };

        let mut links = vec![
            Link::new(rel::SELF, uri.clone()),
            Link::new(rel::UP, collection_uri),
            Link::new(rel::EDIT_FORM, form),
        ];
        for child in children {
            let child_uri = format!("{uri}/{child}");
            self.collections.insert(
                child_uri.clone(),
                Collection {
                    links: vec![Link::new(rel::SELF, child_uri.clone())],
                    attributes: Map::new(),
                    members: Vec::new(),
                    member_collections: Vec::new(),
                },
            );
            links.push(Link::new(child, child_uri));
        }
        self.documents.insert(
            uri.clone(),
            Representation {
                links,
                attributes: payload.attributes,
                items: None,
            },
        );
        if let Some(collection) = self.collections.get_mut(collection_uri) {
            collection.members.push(uri.clone());
        }
        Some(uri)
    }

    fn feed_entry(&self, uri: &str) -> Representation {
        let mut entry = Representation::from_uri(uri);
        if let Some(title) = self
            .documents
            .get(uri)
            .and_then(|d| d.attribute("title").or_else(|| d.attribute("name")))
        {
            entry.attributes.insert("title".into(), title.clone());
        }
        entry
    }

    fn get(&self, request: &HttpRequest) -> HttpResponse {
        let url = request.url.as_str();
        if let Some(collection) = self.collections.get(url) {
            if request.accept == media_type::URI_LIST {
                return HttpResponse::ok(media_type::URI_LIST, uri_list::encode(&collection.members));
            }
            let repr = Representation {
                links: collection.links.clone(),
                attributes: collection.attributes.clone(),
                items: Some(collection.members.iter().map(|m| self.feed_entry(m)).collect()),
            };
            return json(&repr);
        }
        if let Some(list) = self.uri_lists.get(url) {
            return HttpResponse::ok(media_type::URI_LIST, uri_list::encode(list));
        }
        match self.documents.get(url) {
            Some(repr) => json(repr),
            None => HttpResponse::status(404),
        }
    }

    fn post(&mut self, url: &str, body: Body) -> HttpResponse {
        match body {
            Body::UriList(uris) => {
                let target = if let Some(collection) = self.collections.get_mut(url) {
                    &mut collection.members
                } else if let Some(list) = self.uri_lists.get_mut(url) {
                    list
                } else {
                    return HttpResponse::status(404);
                };
                for uri in uris {
                    if !target.contains(&uri) {
                        target.push(uri);
                    }
                }
                HttpResponse::status(204)
            }
            Body::Representation(payload) => {
                if !self.collections.contains_key(url) {
                    return HttpResponse::status(405);
                }
                match self.create_member(url, payload) {
                    Some(uri) => HttpResponse::created(uri),
                    None => HttpResponse::status(405),
                }
            }
        }
    }

    fn put(&mut self, url: &str, body: Body) -> HttpResponse {
        match body {
            Body::UriList(uris) => {
                self.uri_lists.insert(url.to_owned(), uris);
                HttpResponse::status(204)
            }
            Body::Representation(payload) => match self.documents.get_mut(url) {
                Some(existing) => {
                    existing.attributes = payload.attributes;
                    HttpResponse::status(204)
                }
                None => {
                    self.documents.insert(
                        url.to_owned(),
                        Representation {
                            links: vec![Link::new(rel::SELF, url)],
                            attributes: payload.attributes,
                            items: None,
                        },
                    );
                    HttpResponse::created(url)
                }
            },
        }
    }

    fn delete(&mut self, url: &str, body: Option<Body>) -> HttpResponse {
        if let Some(Body::UriList(uris)) = body {
            let target = if let Some(collection) = self.collections.get_mut(url) {
                &mut collection.members
            } else if let Some(list) = self.uri_lists.get_mut(url) {
                list
            } else {
                return HttpResponse::status(404);
            };
            target.retain(|u| !uris.contains(u));
            return HttpResponse::status(204);
        }
        if self.documents.remove(url).is_none() {
            return HttpResponse::status(404);
        }
        for collection in self.collections.values_mut() {
            collection.members.retain(|m| m != url);
        }
        HttpResponse::status(204)
    }
}

impl MemoryServer {
    /// Creates an empty server.
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a document at its identity. Returns the identity.
    ///
    /// # Panics
    ///
    /// Panics if the document has no `self` or `canonical` link.
    pub fn insert(&self, repr: Representation) -> String {
        let uri = repr
            .identity()
            .expect("fixture documents need an identity")
            .to_owned();
        self.state.write().documents.insert(uri.clone(), repr);
        uri
    }

    /// Sets up a collection at `uri`. When `spec` lists form fields, the
    /// create form is published at `{uri}/form`.
    pub fn insert_collection(&self, uri: &str, spec: CollectionSpec) {
        let mut state = self.state.write();
        let mut links = vec![Link::new(rel::SELF, uri)];
        if let Some(fields) = &spec.form_fields {
            let form_uri = form_uri(uri);
            links.push(Link::new(rel::CREATE_FORM, form_uri.clone()));
            state.documents.insert(form_uri, form(fields));
        }
        state.collections.insert(
            uri.to_owned(),
            Collection {
                links,
                attributes: spec.attributes,
                members: Vec::new(),
                member_collections: spec.member_collections,
            },
        );
    }

    /// Creates a member of `collection` as a POST would. Returns its
    /// identity, or `None` if the collection has no create form.
    pub fn insert_member(&self, collection: &str, document: Representation) -> Option<String> {
        self.state.write().create_member(collection, document)
    }

    /// Adds `uri` to a membership collection or uri-list.
    pub fn link(&self, collection: &str, uri: &str) {
        let mut state = self.state.write();
        if let Some(c) = state.collections.get_mut(collection) {
            c.members.push(uri.to_owned());
        } else {
            state
                .uri_lists
                .entry(collection.to_owned())
                .or_default()
                .push(uri.to_owned());
        }
    }

    /// Sets up a plain identifier list at `uri`.
    pub fn insert_uri_list(&self, uri: &str, uris: Vec<String>) {
        self.state.write().uri_lists.insert(uri.to_owned(), uris);
    }

    /// Makes every request to `uri` answer `503`.
    pub fn fail(&self, uri: &str) {
        self.state.write().unavailable.insert(uri.to_owned());
    }

    /// Undoes [`MemoryServer::fail`].
    pub fn recover(&self, uri: &str) {
        self.state.write().unavailable.remove(uri);
    }

    /// Returns the document stored at `uri`.
    pub fn document(&self, uri: &str) -> Option<Representation> {
        self.state.read().documents.get(uri).cloned()
    }

    /// Returns the member identities of the collection at `uri`.
    pub fn members(&self, uri: &str) -> Vec<String> {
        self.state
            .read()
            .collections
            .get(uri)
            .map(|c| c.members.clone())
            .unwrap_or_default()
    }

    /// Returns the member documents of the collection at `uri`.
    pub fn member_documents(&self, uri: &str) -> Vec<Representation> {
        let state = self.state.read();
        state
            .collections
            .get(uri)
            .map(|c| {
                c.members
                    .iter()
                    .filter_map(|m| state.documents.get(m).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns the identifier list at `uri`.
    pub fn uri_list(&self, uri: &str) -> Vec<String> {
        self.state
            .read()
            .uri_lists
            .get(uri)
            .cloned()
            .unwrap_or_default()
    }

    /// Returns every request received, in order.
    pub fn requests(&self) -> Vec<(Method, String)> {
        self.state.read().requests.clone()
    }

    /// Returns the POST, PUT and DELETE requests received.
    pub fn writes(&self) -> Vec<(Method, String)> {
        self.requests()
            .into_iter()
            .filter(|(m, _)| *m != Method::Get)
            .collect()
    }

    /// Counts requests with `method` to `uri`.
    pub fn count(&self, method: Method, uri: &str) -> usize {
        self.state
            .read()
            .requests
            .iter()
            .filter(|(m, u)| *m == method && u == uri)
            .count()
    }

    /// Forgets recorded requests.
    pub fn clear_requests(&self) {
        self.state.write().requests.clear();
    }
}

#[async_trait]
impl HttpClient for MemoryServer {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, String> {
        let mut state = self.state.write();
        state.requests.push((request.method, request.url.clone()));
        if state.unavailable.contains(&request.url) {
            return Ok(HttpResponse::status(503));
        }

        let body = match request.content_type {
            Some(content_type) if !request.body.is_empty() => {
                match Body::decode(content_type, &request.body) {
                    Ok(body) => Some(body),
                    Err(_) => return Ok(HttpResponse::status(400)),
                }
            }
            _ => None,
        };
        let url = request.url.clone();
        let response = match (request.method, body) {
            (Method::Get, _) => state.get(&request),
            (Method::Post, Some(body)) => state.post(&url, body),
            (Method::Put, Some(body)) => state.put(&url, body),
            (Method::Delete, body) => state.delete(&url, body),
            (Method::Post | Method::Put, None) => HttpResponse::status(400),
        };
        Ok(response)
    }
}
