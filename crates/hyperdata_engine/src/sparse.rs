//! Sparse resource factories.
//!
//! These build minimally-populated resources tagged with their initial
//! [`Status`]. They never perform I/O and never consult a resolver.

use crate::resource::Resource;
use crate::state::Status;
use hyperdata_protocol::{rel, Link, Representation};

/// A resource identified by `uri`, pending hydration.
///
/// Tagged `locationOnly`, or `virtual` when there is no (non-empty) uri.
pub fn from_uri(uri: Option<&str>) -> Resource {
    match uri.filter(|u| !u.is_empty()) {
        Some(uri) => Resource::with_status(Representation::from_uri(uri), Status::LocationOnly),
        None => Resource::with_status(Representation::new(), Status::Virtual),
    }
}

/// Like [`from_uri`], with an empty `items` list.
pub fn collection_from_uri(uri: Option<&str>) -> Resource {
    match uri.filter(|u| !u.is_empty()) {
        Some(uri) => Resource::with_status(
            Representation::from_uri(uri).with_items(Vec::new()),
            Status::LocationOnly,
        ),
        None => Resource::with_status(Representation::collection(), Status::Virtual),
    }
}

/// A resource built from a feed entry's identity and title.
pub fn from_feed_item(item: &Representation) -> Resource {
    let Some(link) = item.identity_link() else {
        return Resource::with_status(title_only(item, Representation::new()), Status::Virtual);
    };
    let mut self_link = Link::new(rel::SELF, link.href.clone());
    self_link.title = link.title.clone();
    let sparse = Representation {
        links: vec![self_link],
        ..Representation::default()
    };
    Resource::with_status(title_only(item, sparse), Status::LocationOnly)
}

/// A collection whose items come from a feed; its own attributes are not
/// fetched yet.
pub fn collection_from_feed(uri: &str, feed: &[Representation]) -> Resource {
    let collection = Resource::with_status(
        Representation::from_uri(uri).with_items(Vec::new()),
        Status::FeedOnly,
    );
    for entry in feed {
        collection.push_item(from_feed_item(entry));
    }
    collection
}

/// A placeholder declared by a parent before any identity is known.
pub fn unknown() -> Resource {
    Resource::with_status(Representation::new(), Status::Unknown)
}

fn title_only(item: &Representation, mut sparse: Representation) -> Representation {
    let title = item
        .attribute("title")
        .cloned()
        .or_else(|| item.identity_link().and_then(|l| l.title.clone()).map(Into::into));
    if let Some(title) = title {
        sparse.attributes.insert("title".into(), title);
    }
    sparse
}
