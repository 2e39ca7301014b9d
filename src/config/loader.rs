use anyhow::{Context, Result, bail};
use schemars::{Schema, schema_for};
use serde_json::Value;
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

use super::models::{ActionKind, CoordinateDoc, Script};
use crate::error::EngineError;

/// Load a script from a string slice.
pub fn load_script_from_str(s: &str) -> Result<Script> {
    let raw: Value = serde_json::from_str(s).context("Failed to parse script JSON")?;
    script_from_value(raw)
}

/// Load a script from any reader (e.g., a file).
pub fn load_script_from_reader<R: Read>(reader: R) -> Result<Script> {
    let raw: Value = serde_json::from_reader(reader).context("Failed to parse script JSON")?;
    script_from_value(raw)
}

/// Load a script from a file path synchronously.
pub fn load_script<P: AsRef<Path>>(path: P) -> Result<Script> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open script file {}", path_ref.display()))?;
    let script = load_script_from_reader(file)?;
    debug!("Loaded script from {}", path_ref.display());
    Ok(script)
}

/// Load a script from a file path asynchronously (Tokio).
pub async fn load_script_async<P: AsRef<Path>>(path: P) -> Result<Script> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read script file {}", path_ref.display()))?;
    let raw: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse script JSON from {}", path_ref.display()))?;
    let script = script_from_value(raw)?;
    debug!("Loaded script from {}", path_ref.display());
    Ok(script)
}

/// Load a coordinate document from a string slice.
pub fn load_coordinates_from_str(s: &str) -> Result<CoordinateDoc> {
    serde_json::from_str(s).context("Failed to parse coordinate JSON")
}

/// Load a coordinate document from a file path synchronously.
pub fn load_coordinates<P: AsRef<Path>>(path: P) -> Result<CoordinateDoc> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open coordinate file {}", path_ref.display()))?;
    let doc: CoordinateDoc =
        serde_json::from_reader(file).context("Failed to parse coordinate JSON")?;
    debug!(
        points = doc.recorded_points.len(),
        "Loaded coordinates from {}",
        path_ref.display()
    );
    Ok(doc)
}

/// Load a coordinate document from a file path asynchronously (Tokio).
pub async fn load_coordinates_async<P: AsRef<Path>>(path: P) -> Result<CoordinateDoc> {
    use tokio::fs;
    let path_ref = path.as_ref();
    let bytes = fs::read(path_ref)
        .await
        .with_context(|| format!("Failed to read coordinate file {}", path_ref.display()))?;
    let doc: CoordinateDoc = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse coordinate JSON from {}", path_ref.display()))?;
    Ok(doc)
}

fn script_from_value(raw: Value) -> Result<Script> {
    validate_action_kinds(&raw)?;
    let script: Script =
        serde_json::from_value(raw).context("Failed to parse script document")?;
    Ok(script)
}

/// Reject action kinds the engine does not implement, before the typed
/// parse runs, so the error names the offending node's position instead
/// of dumping a serde variant list.
pub fn validate_action_kinds(raw: &Value) -> Result<()> {
    if let Some(actions) = raw.get("actions").and_then(Value::as_array) {
        for (index, node) in actions.iter().enumerate() {
            check_node(node, &format!("actions[{index}]"))?;
        }
    }
    Ok(())
}

fn check_node(node: &Value, path: &str) -> Result<()> {
    let Some(object) = node.as_object() else {
        bail!("Expected an action object at {path}");
    };
    let Some(kind) = object.get("type").and_then(Value::as_str) else {
        bail!("Missing 'type' on the action at {path}");
    };
    if !ActionKind::KNOWN.contains(&kind) {
        return Err(EngineError::UnsupportedActionKind {
            kind: kind.to_string(),
            path: path.to_string(),
        }
        .into());
    }

    // Only action lists recurse; `condition` objects have their own tags.
    for key in ["actions", "if_true", "if_false"] {
        if let Some(children) = object.get(key).and_then(Value::as_array) {
            for (index, child) in children.iter().enumerate() {
                check_node(child, &format!("{path}.{key}[{index}]"))?;
            }
        }
    }
    Ok(())
}

/// Generate the JSON Schema for the Script model (for external validation or tooling).
pub fn generate_schema() -> Schema {
    schema_for!(Script)
}

/// Write the JSON Schema for the Script model to any writer (pretty-printed).
pub fn write_schema_to_writer<W: Write>(mut writer: W) -> Result<()> {
    let schema = generate_schema();
    let json = serde_json::to_string_pretty(&schema).context("Failed to serialize schema")?;
    writer
        .write_all(json.as_bytes())
        .context("Failed to write schema to writer")?;
    Ok(())
}
