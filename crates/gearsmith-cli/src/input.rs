//! Input file loading for CLI commands.
//!
//! All command inputs are JSON documents: the interface registry, the spec
//! tree, manifests, and caller config files.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use indexmap::IndexMap;
use serde_json::Value;

use gearsmith_spec::{Manifest, Registry, SpecNode};

/// Loads the interface registry from a JSON file.
pub fn load_registry(path: &Path) -> Result<Registry> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read registry file: {}", path.display()))?;
    Registry::from_json(&text)
        .with_context(|| format!("Failed to parse registry file: {}", path.display()))
}

/// Loads a spec tree from a JSON file.
pub fn load_tree(path: &Path) -> Result<SpecNode> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read spec tree: {}", path.display()))?;
    SpecNode::from_json(&text)
        .with_context(|| format!("Failed to parse spec tree: {}", path.display()))
}

/// Loads a manifest from a JSON file.
pub fn load_manifest(path: &Path) -> Result<Manifest> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read manifest: {}", path.display()))?;
    Manifest::from_json(&text)
        .with_context(|| format!("Failed to parse manifest: {}", path.display()))
}

/// Loads a caller config from a JSON file.
///
/// Accepts either a bare object of config values, or the runtime layout
/// where they sit under a top-level `"config"` key.
pub fn load_config(path: &Path) -> Result<IndexMap<String, Value>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    let value: Value = serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
    let object = match value {
        Value::Object(ref map) if map.contains_key("config") => match &map["config"] {
            Value::Object(inner) => inner.clone(),
            other => anyhow::bail!(
                "'config' key in {} must be an object, got {}",
                path.display(),
                json_kind(other)
            ),
        },
        Value::Object(map) => map,
        other => anyhow::bail!(
            "config file {} must be a JSON object, got {}",
            path.display(),
            json_kind(&other)
        ),
    };
    Ok(object.into_iter().collect())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
