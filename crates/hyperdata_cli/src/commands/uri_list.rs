//! Uri-list command implementation.

use hyperdata_engine::UriListDiff;
use hyperdata_protocol::uri_list;
use serde::Serialize;
use std::path::Path;

/// Additions and removals for an identifier list.
#[derive(Debug, Serialize)]
pub struct UriListResult {
    /// Sent in one DELETE.
    pub delete: Vec<String>,
    /// Sent in one POST.
    pub create: Vec<String>,
}

fn read_list(path: &Path) -> Result<Vec<String>, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(uri_list::parse(&text))
}

/// Runs the uri-list command.
pub fn run(existing: &Path, desired: &Path, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let diff = UriListDiff::compute(&read_list(existing)?, &read_list(desired)?);
    let result = UriListResult {
        delete: diff.delete,
        create: diff.create,
    };

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }
    if result.delete.is_empty() && result.create.is_empty() {
        println!("Lists are identical.");
        return Ok(());
    }
    for uri in &result.delete {
        println!("- {uri}");
    }
    for uri in &result.create {
        println!("+ {uri}");
    }
    Ok(())
}
