//! Plan command implementation.

use super::read_representation;
use hyperdata_engine::{
    partition, AttributeComparator, Comparator, LinkRelationComparator, Resource,
};
use hyperdata_protocol::Representation;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// One planned write.
#[derive(Debug, Serialize, PartialEq)]
pub struct PlannedItem {
    /// Identity of the existing resource, when there is one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Display label (name or title).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
}

/// The differencer's plan for a collection.
#[derive(Debug, Serialize, PartialEq)]
pub struct PlanResult {
    /// Comparators, in priority order.
    pub comparators: Vec<String>,
    /// Items removed first.
    pub delete: Vec<PlannedItem>,
    /// Items matched and reconciled.
    pub update: Vec<PlannedItem>,
    /// Documents created last.
    pub create: Vec<PlannedItem>,
}

fn label(repr: &Representation) -> Option<String> {
    repr.attribute_str("name")
        .or_else(|| repr.attribute_str("title"))
        .map(str::to_owned)
}

fn planned(repr: &Representation) -> PlannedItem {
    PlannedItem {
        uri: repr.identity().map(str::to_owned),
        label: label(repr),
    }
}

/// Builds the comparator chain: link identity, then each attribute.
pub fn comparators(match_on: &[String]) -> Vec<Arc<dyn Comparator>> {
    let mut chain: Vec<Arc<dyn Comparator>> = vec![Arc::new(LinkRelationComparator) as Arc<dyn Comparator>];
    chain.extend(
        match_on
            .iter()
            .filter(|a| !a.is_empty())
            .map(|a| Arc::new(AttributeComparator::new(a.as_str())) as Arc<dyn Comparator>),
    );
    chain
}

/// Partitions `existing` items against `desired` items.
pub fn plan(existing: &Representation, desired: &Representation, match_on: &[String]) -> PlanResult {
    let chain = comparators(match_on);
    let items: Vec<Resource> = existing
        .items()
        .iter()
        .cloned()
        .map(Resource::hydrated)
        .collect();
    let diff = partition(&items, desired.items(), &chain);
    debug!(
        create = diff.create.len(),
        update = diff.update.len(),
        delete = diff.delete.len(),
        "partitioned"
    );

    PlanResult {
        comparators: chain.iter().map(|c| c.name().to_owned()).collect(),
        delete: diff
            .delete
            .iter()
            .map(|r| planned(&r.representation()))
            .collect(),
        update: diff
            .update
            .iter()
            .map(|(r, d)| PlannedItem {
                uri: r.uri(),
                label: label(d),
            })
            .collect(),
        create: diff.create.iter().map(planned).collect(),
    }
}

/// Runs the plan command.
pub fn run(
    existing: &Path,
    desired: &Path,
    match_on: &[String],
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let existing = read_representation(existing)?;
    let desired = read_representation(desired)?;
    if !existing.is_collection() || !desired.is_collection() {
        return Err("both documents must be collections (carry an `items` array)".into());
    }
    let result = plan(&existing, &desired, match_on);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_text_output(&result);
    }
    Ok(())
}

fn describe(item: &PlannedItem) -> String {
    match (&item.uri, &item.label) {
        (Some(uri), Some(label)) => format!("{uri} ({label})"),
        (Some(uri), None) => uri.clone(),
        (None, Some(label)) => format!("<new> ({label})"),
        (None, None) => "<new>".to_owned(),
    }
}

fn print_text_output(result: &PlanResult) {
    println!("Sync Plan");
    println!("=========");
    println!("Match on: {}", result.comparators.join(" > "));
    for (title, items) in [
        ("Delete", &result.delete),
        ("Update", &result.update),
        ("Create", &result.create),
    ] {
        println!();
        println!("{title} ({}):", items.len());
        for item in items {
            println!("  {}", describe(item));
        }
    }
}
