//! Status spec loading.
//!
//! Specs are re-read on every `status.get`; nothing is cached.

use std::collections::HashSet;
use std::path::Path;

use serde_json::Value;

use gpi_common::{read_to_string_opt, render_template, PathTemplateSet, TemplateArgs};

use crate::error::StatusError;
use crate::expr::{parse_operation_line, Operation};

/// A loaded per-app status spec.
#[derive(Debug, Clone)]
pub struct StatusSpec {
    pub app_id: String,
    pub app_title: String,
    pub running_field: String,
    pub pid_field: String,
    pub host_running_field: String,
    pub host_pid_field: String,
    pub operations: Vec<Operation>,
}

fn string_field(root: &Value, key: &str) -> Option<String> {
    root.get(key).and_then(Value::as_str).map(str::to_string)
}

/// Loads and validates the status spec for `app_id`.
pub fn load_status_spec(
    repo_root: &Path,
    templates: &PathTemplateSet,
    app_id: &str,
) -> Result<StatusSpec, StatusError> {
    let spec_path = render_template(
        &templates.status_spec,
        &TemplateArgs::for_app(repo_root, app_id),
    );

    let Some(text) = read_to_string_opt(&spec_path) else {
        return Err(StatusError::SpecMissing(spec_path.display().to_string()));
    };

    let root: Value = serde_json::from_str(&text).map_err(|_| {
        StatusError::SpecInvalid(format!(
            "status spec is not valid JSON: {}",
            spec_path.display()
        ))
    })?;
    if !root.is_object() {
        return Err(StatusError::SpecInvalid(format!(
            "status spec must be a JSON object: {}",
            spec_path.display()
        )));
    }

    let spec_app_id = string_field(&root, "appId").unwrap_or_else(|| app_id.to_string());
    if spec_app_id != app_id {
        return Err(StatusError::SpecInvalid(format!(
            "status spec appId mismatch for {app_id}"
        )));
    }

    let Some(app_title) = string_field(&root, "appTitle") else {
        return Err(StatusError::SpecInvalid(format!(
            "status spec missing appTitle: {}",
            spec_path.display()
        )));
    };

    let running_field = string_field(&root, "runningField").unwrap_or_else(|| "running".to_string());
    let pid_field = string_field(&root, "pidField").unwrap_or_else(|| "pid".to_string());
    let host_running_field =
        string_field(&root, "hostRunningField").unwrap_or_else(|| running_field.clone());
    let host_pid_field = string_field(&root, "hostPidField").unwrap_or_else(|| pid_field.clone());

    let Some(raw_operations) = root.get("operations").and_then(Value::as_array) else {
        return Err(StatusError::SpecInvalid(format!(
            "status spec missing operations array: {}",
            spec_path.display()
        )));
    };

    let mut operations = Vec::new();
    let mut declared: HashSet<String> = HashSet::new();
    for entry in raw_operations {
        let Some(line) = entry.as_str() else {
            continue;
        };
        let operation = parse_operation_line(line).map_err(|message| {
            StatusError::SpecInvalid(format!("status spec operation parse failed: {message}"))
        })?;

        for referenced in operation.op.referenced_fields() {
            if !declared.contains(referenced) {
                return Err(StatusError::SpecInvalid(format!(
                    "operation {} references undeclared field: {referenced}",
                    operation.field
                )));
            }
        }

        declared.insert(operation.field.clone());
        operations.push(operation);
    }

    if operations.is_empty() {
        return Err(StatusError::SpecInvalid(format!(
            "status spec operations empty: {}",
            spec_path.display()
        )));
    }

    Ok(StatusSpec {
        app_id: spec_app_id,
        app_title,
        running_field,
        pid_field,
        host_running_field,
        host_pid_field,
        operations,
    })
}
