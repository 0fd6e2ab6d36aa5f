//! Link relations.

use serde::{Deserialize, Serialize};

/// Well-known link relation names.
pub mod rel {
    /// Authoritative network identity of a resource.
    pub const SELF: &str = "self";
    /// Stable alias used for identity when present.
    pub const CANONICAL: &str = "canonical";
    /// Parent resource.
    pub const UP: &str = "up";
    /// Form describing how to create an item in a collection.
    pub const CREATE_FORM: &str = "create-form";
    /// Form describing how to edit a resource.
    pub const EDIT_FORM: &str = "edit-form";

    /// Identity relations in priority order.
    pub const IDENTITY: [&str; 2] = [CANONICAL, SELF];
}

/// A named edge from one resource to another.
///
/// `rel` may hold several whitespace-separated relation names, as in
/// `rel="self canonical"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    /// Relation name(s).
    pub rel: String,
    /// Target identifier.
    pub href: String,
    /// Optional media type hint.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
    /// Optional human-readable title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

impl Link {
    /// Creates a new link.
    pub fn new(rel: impl Into<String>, href: impl Into<String>) -> Self {
        Self {
            rel: rel.into(),
            href: href.into(),
            media_type: None,
            title: None,
        }
    }

    /// Sets the media type hint.
    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    /// Sets the title.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Returns the individual relation names.
    pub fn rels(&self) -> impl Iterator<Item = &str> {
        self.rel.split_whitespace()
    }

    /// Returns true if any of this link's relation names equals `name`
    /// (case-insensitive).
    pub fn has_rel(&self, name: &str) -> bool {
        self.rels().any(|r| r.eq_ignore_ascii_case(name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn multiple_relations() {
        let link = Link::new("self  Canonical", "http://api.example.com/a/1");
        assert!(link.has_rel("self"));
        assert!(link.has_rel("canonical"));
        assert!(!link.has_rel("up"));
        assert_eq!(link.rels().count(), 2);
    }

    #[test]
    fn serializes_media_type_as_type() {
        let link = Link::new(rel::CREATE_FORM, "http://api.example.com/form")
            .with_media_type("application/json")
            .with_title("Create");
        let json = serde_json::to_value(&link).unwrap();
        assert_eq!(json["type"], "application/json");
        assert_eq!(json["title"], "Create");

        let bare = serde_json::to_value(Link::new("up", "/")).unwrap();
        assert!(bare.get("type").is_none());
        assert!(bare.get("title").is_none());
    }
}
