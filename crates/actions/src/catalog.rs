//! Action catalog loading.
//!
//! Catalogs are trusted local files, re-read on every action operation.
//! Malformed entries are dropped silently; a catalog with no runnable
//! actions at all is an error.

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use gpi_common::{read_to_string_opt, render_template, PathTemplateSet, TemplateArgs};

use crate::error::ActionError;

pub const DEFAULT_TIMEOUT_SECONDS: f64 = 30.0;

/// One runnable action from a per-app catalog.
#[derive(Debug, Clone)]
pub struct ActionDefinition {
    pub name: String,
    pub label: String,
    pub command: Vec<String>,
    pub cwd: String,
    pub timeout_seconds: f64,
    pub detached: bool,
    /// Argument schema passthrough for `action.list`; opaque to the host.
    pub args_schema: Value,
}

fn parse_entry(item: &Value) -> Option<ActionDefinition> {
    let name = item.get("name")?.as_str()?.to_string();
    if name.is_empty() {
        return None;
    }

    let command: Vec<String> = item
        .get("cmd")?
        .as_array()?
        .iter()
        .filter_map(Value::as_str)
        .map(str::to_string)
        .collect();
    if command.is_empty() {
        return None;
    }

    let label = item
        .get("label")
        .and_then(Value::as_str)
        .filter(|label| !label.is_empty())
        .unwrap_or(&name)
        .to_string();

    let cwd = item
        .get("cwd")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let timeout_seconds = item
        .get("timeoutSeconds")
        .and_then(Value::as_f64)
        .filter(|timeout| *timeout > 0.0)
        .unwrap_or(DEFAULT_TIMEOUT_SECONDS);

    let detached = item
        .get("detached")
        .and_then(Value::as_bool)
        .unwrap_or(false);

    let args_schema = match item.get("args") {
        Some(Value::Array(schema)) => Value::Array(schema.clone()),
        _ => Value::Array(Vec::new()),
    };

    Some(ActionDefinition {
        name,
        label,
        command,
        cwd,
        timeout_seconds,
        detached,
        args_schema,
    })
}

/// Loads the action catalog for `app_id`.
pub fn load_catalog(
    repo_root: &Path,
    templates: &PathTemplateSet,
    app_id: &str,
) -> Result<Vec<ActionDefinition>, ActionError> {
    let catalog_path = render_template(
        &templates.action_catalog,
        &TemplateArgs::for_app(repo_root, app_id),
    );

    let Some(text) = read_to_string_opt(&catalog_path) else {
        return Err(ActionError::CatalogMissing(format!(
            "action catalog file not found: {}",
            catalog_path.display()
        )));
    };

    let root: Value = serde_json::from_str(&text).map_err(|_| {
        ActionError::CatalogMissing(format!(
            "action catalog is not valid JSON: {}",
            catalog_path.display()
        ))
    })?;

    let Some(entries) = root.get("actions").and_then(Value::as_array) else {
        return Err(ActionError::CatalogMissing(format!(
            "action catalog missing actions array: {}",
            catalog_path.display()
        )));
    };

    let actions: Vec<ActionDefinition> = entries.iter().filter_map(parse_entry).collect();
    if actions.is_empty() {
        return Err(ActionError::CatalogMissing(format!(
            "action catalog has no runnable actions: {}",
            catalog_path.display()
        )));
    }

    debug!(app_id, actions = actions.len(), "action catalog loaded");
    Ok(actions)
}
