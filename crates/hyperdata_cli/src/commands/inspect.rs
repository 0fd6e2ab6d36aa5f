//! Inspect command implementation.

use super::read_representation;
use hyperdata_protocol::{rel, Representation};
use serde::Serialize;
use serde_json::Value;
use std::path::Path;

/// Summary of a representation.
#[derive(Debug, Serialize, PartialEq)]
pub struct InspectResult {
    /// Identity (`canonical`, else `self`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub identity: Option<String>,
    /// `rel -> href` for every link.
    pub links: Vec<(String, String)>,
    /// Plain attribute names.
    pub attributes: Vec<String>,
    /// Nested documents (name, item count if a collection).
    pub children: Vec<(String, Option<usize>)>,
    /// Collection size, if a collection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    /// Whether writes are possible through forms.
    pub create_form: bool,
    /// Whether the edit form is linked.
    pub edit_form: bool,
}

/// Summarizes `repr`.
pub fn inspect(repr: &Representation) -> InspectResult {
    let mut attributes = Vec::new();
    let mut children = Vec::new();
    for (name, value) in &repr.attributes {
        let nested = value
            .as_object()
            .filter(|o| o.contains_key("links") || o.contains_key("items"));
        match nested {
            Some(object) => children.push((
                name.clone(),
                object.get("items").and_then(Value::as_array).map(Vec::len),
            )),
            None => attributes.push(name.clone()),
        }
    }

    InspectResult {
        identity: repr.identity().map(str::to_owned),
        links: repr
            .links
            .iter()
            .map(|l| (l.rel.clone(), l.href.clone()))
            .collect(),
        attributes,
        children,
        items: repr.items.as_ref().map(Vec::len),
        create_form: repr.link(rel::CREATE_FORM).is_some(),
        edit_form: repr.link(rel::EDIT_FORM).is_some(),
    }
}

/// Runs the inspect command.
pub fn run(path: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let result = inspect(&read_representation(path)?);

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Representation: {}", path.display());
    println!("Identity: {}", result.identity.as_deref().unwrap_or("<none>"));
    if let Some(items) = result.items {
        println!("Collection of {items} items");
    }
    println!("Create form: {}  Edit form: {}", result.create_form, result.edit_form);
    println!();
    println!("Links:");
    for (rel, href) in &result.links {
        println!("  {rel:<16} {href}");
    }
    println!();
    println!("Attributes: {}", result.attributes.join(", "));
    if !result.children.is_empty() {
        println!();
        println!("Children:");
        for (name, items) in &result.children {
            match items {
                Some(n) => println!("  {name} ({n} items)"),
                None => println!("  {name}"),
            }
        }
    }
    Ok(())
}
