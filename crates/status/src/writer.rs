//! Snapshot publication.

use std::path::Path;

use serde_json::{json, Value};

use gpi_common::{atomic_replace, now_epoch_ms, now_rfc3339, render_template, PathTemplateSet, TemplateArgs};

use crate::error::StatusError;

/// Wraps a payload in the snapshot envelope and atomically publishes it.
pub fn write_snapshot(
    repo_root: &Path,
    templates: &PathTemplateSet,
    app_id: &str,
    payload: &Value,
) -> Result<(), StatusError> {
    if !payload.is_object() {
        return Err(StatusError::SnapshotWriteFailed(
            "snapshot payload must be a JSON object".to_string(),
        ));
    }

    let envelope = json!({
        "appId": app_id,
        "generatedAt": now_rfc3339(),
        "generatedAtEpochMs": now_epoch_ms(),
        "payload": payload,
    });

    let snapshot_path = render_template(
        &templates.status_snapshot,
        &TemplateArgs::for_app(repo_root, app_id),
    );
    let bytes = serde_json::to_vec(&envelope)
        .map_err(|err| StatusError::SnapshotWriteFailed(err.to_string()))?;

    atomic_replace(&snapshot_path, &bytes)
        .map_err(|err| StatusError::SnapshotWriteFailed(err.to_string()))
}
