//! Property-based test generators using proptest.
//!
//! Strategies produce documents the differencer can reason about: names are
//! unique within one generated collection unless stated otherwise.

use hyperdata_protocol::Representation;
use proptest::prelude::*;
use std::collections::BTreeSet;

/// Strategy for generating absolute resource URIs under `http://gen.test/`.
pub fn uri_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z]{1,8}/[0-9]{1,4}")
        .expect("Invalid regex")
        .prop_map(|path| format!("http://gen.test/{path}"))
}

/// Strategy for generating attribute names.
pub fn name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9-]{0,11}").expect("Invalid regex")
}

/// Strategy for a document with a `name` attribute and, half the time, an
/// identity link.
pub fn named_document_strategy() -> impl Strategy<Value = Representation> {
    (name_strategy(), prop::option::of(uri_strategy()), any::<bool>()).prop_map(
        |(name, uri, done)| {
            let doc = match uri {
                Some(uri) => Representation::from_uri(uri),
                None => Representation::new(),
            };
            doc.with_attribute("name", name).with_attribute("done", done)
        },
    )
}

/// Strategy for a collection document of up to `max` items with distinct
/// names and no identity links.
pub fn collection_document_strategy(max: usize) -> impl Strategy<Value = Representation> {
    prop::collection::btree_set(name_strategy(), 0..=max).prop_map(|names| {
        Representation::collection().with_items(
            names
                .into_iter()
                .map(|name| Representation::new().with_attribute("name", name))
                .collect(),
        )
    })
}

/// Strategy for a uri-list of up to `max` entries, possibly with
/// duplicates.
pub fn uri_list_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec(uri_strategy(), 0..=max)
}

/// Strategy for a uri-list of up to `max` distinct entries.
pub fn distinct_uri_list_strategy(max: usize) -> impl Strategy<Value = Vec<String>> {
    prop::collection::btree_set(uri_strategy(), 0..=max)
        .prop_map(|set: BTreeSet<String>| set.into_iter().collect())
}
