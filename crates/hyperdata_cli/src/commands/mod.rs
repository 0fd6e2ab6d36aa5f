//! CLI command implementations.

pub mod inspect;
pub mod plan;
pub mod uri_list;

use hyperdata_protocol::Representation;
use std::path::Path;

/// Reads a JSON representation from `path`.
pub fn read_representation(path: &Path) -> Result<Representation, Box<dyn std::error::Error>> {
    let bytes = std::fs::read(path).map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    Ok(Representation::from_json(&bytes)?)
}
