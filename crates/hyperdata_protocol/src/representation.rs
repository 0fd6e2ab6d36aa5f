//! Resource representations.

use crate::error::{ProtocolError, ProtocolResult};
use crate::link::{rel, Link};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The JSON shape of a resource, a collection, or a desired-state document.
///
/// A collection is a representation whose `items` is present. Every other
/// top-level key is a named attribute:
///
/// ```json
/// {
///   "links": [{ "rel": "self", "href": "http://api.example.com/todo/1" }],
///   "name": "Buy milk",
///   "tags": { "items": [{ "name": "shopping" }] }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Representation {
    /// Ordered link relations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<Link>,
    /// Collection members, present only on collections.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Representation>>,
    /// Named attributes.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Representation {
    /// Creates an empty, non-collection representation.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty collection representation.
    pub fn collection() -> Self {
        Self {
            items: Some(Vec::new()),
            ..Self::default()
        }
    }

    /// Creates a representation identified by a `self` link.
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self::new().with_link(rel::SELF, uri)
    }

    /// Adds a link.
    pub fn with_link(mut self, rel: impl Into<String>, href: impl Into<String>) -> Self {
        self.links.push(Link::new(rel, href));
        self
    }

    /// Sets an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(name.into(), value.into());
        self
    }

    /// Replaces the collection items.
    pub fn with_items(mut self, items: Vec<Representation>) -> Self {
        self.items = Some(items);
        self
    }

    /// Appends a collection item, turning this representation into a
    /// collection if it was not one.
    pub fn with_item(mut self, item: Representation) -> Self {
        self.items.get_or_insert_with(Vec::new).push(item);
        self
    }

    /// Sets a named nested document.
    pub fn with_child(self, name: impl Into<String>, child: &Representation) -> Self {
        let value = serde_json::to_value(child).unwrap_or(Value::Null);
        self.with_attribute(name, value)
    }

    /// Returns true if this representation is a collection.
    pub fn is_collection(&self) -> bool {
        self.items.is_some()
    }

    /// Returns the collection items, or an empty slice.
    pub fn items(&self) -> &[Representation] {
        self.items.as_deref().unwrap_or(&[])
    }

    /// Returns the first link carrying relation `name`.
    pub fn link(&self, name: &str) -> Option<&Link> {
        self.links.iter().find(|l| l.has_rel(name))
    }

    /// Returns the href of the first link carrying relation `name`.
    pub fn href(&self, name: &str) -> Option<&str> {
        self.link(name).map(|l| l.href.as_str())
    }

    /// Returns the identifying link: `canonical` when present, else `self`.
    pub fn identity_link(&self) -> Option<&Link> {
        rel::IDENTITY.iter().find_map(|r| self.link(r))
    }

    /// Returns the identity URI: `canonical` when present, else `self`.
    pub fn identity(&self) -> Option<&str> {
        self.identity_link().map(|l| l.href.as_str())
    }

    /// Returns a named attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.attributes.get(name)
    }

    /// Returns a named attribute when it is a string.
    pub fn attribute_str(&self, name: &str) -> Option<&str> {
        self.attribute(name).and_then(Value::as_str)
    }

    /// Returns a named nested document.
    ///
    /// `Ok(None)` when the attribute is absent or is not an object.
    pub fn child(&self, name: &str) -> ProtocolResult<Option<Representation>> {
        match self.attributes.get(name) {
            Some(value @ Value::Object(_)) => Ok(Some(serde_json::from_value(value.clone())?)),
            _ => Ok(None),
        }
    }

    /// Returns a named attribute holding a plain array of identifiers.
    ///
    /// `Ok(None)` when the attribute is absent or not an array.
    pub fn uri_list(&self, name: &str) -> ProtocolResult<Option<Vec<String>>> {
        let Some(Value::Array(values)) = self.attributes.get(name) else {
            return Ok(None);
        };
        values
            .iter()
            .map(|v| {
                v.as_str().map(str::to_owned).ok_or_else(|| {
                    ProtocolError::invalid_structure(format!(
                        "uri-list attribute '{name}' must only hold strings"
                    ))
                })
            })
            .collect::<ProtocolResult<Vec<_>>>()
            .map(Some)
    }

    /// Decodes a JSON payload.
    pub fn from_json(bytes: &[u8]) -> ProtocolResult<Self> {
        let value: Value = serde_json::from_slice(bytes)?;
        if !value.is_object() {
            return Err(ProtocolError::invalid_structure(
                "representation must be a JSON object",
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Encodes as a JSON payload.
    pub fn to_json(&self) -> ProtocolResult<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}
