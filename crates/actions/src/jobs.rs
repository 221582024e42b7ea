//! Job records.
//!
//! Every invocation writes exactly one terminal record; records are never
//! updated in place. Ids combine the epoch-ms prefix with a process-global
//! counter so any two ids minted by one process differ.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;
use serde_json::{json, Value};

use gpi_common::{atomic_replace, now_epoch_ms, read_to_string_opt, render_template, PathTemplateSet, TemplateArgs};

use crate::error::ActionError;

static JOB_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Mints a process-unique job id.
pub fn generate_job_id() -> String {
    let counter = JOB_COUNTER.fetch_add(1, Ordering::Relaxed) + 1;
    format!("job-{}-{counter}", now_epoch_ms())
}

#[derive(Debug, Clone, Serialize)]
pub struct JobFailure {
    pub code: String,
    pub message: String,
    pub details: Value,
}

impl JobFailure {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: json!({}),
        }
    }
}

/// A terminal job record as persisted on disk.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionJobRecord {
    pub job_id: String,
    pub state: String,
    pub accepted_at: String,
    pub started_at: String,
    pub finished_at: String,
    pub result: Value,
    pub stdout: String,
    pub stderr: String,
    pub error: Option<JobFailure>,
}

/// Concrete record path for `(app_id, job_id)`.
pub fn job_record_path(
    repo_root: &Path,
    templates: &PathTemplateSet,
    app_id: &str,
    job_id: &str,
) -> PathBuf {
    render_template(
        &templates.action_job,
        &TemplateArgs::for_job(repo_root, app_id, job_id),
    )
}

/// Atomically persists a job record.
pub fn write_job_record(
    repo_root: &Path,
    templates: &PathTemplateSet,
    app_id: &str,
    record: &ActionJobRecord,
) -> Result<(), ActionError> {
    let path = job_record_path(repo_root, templates, app_id, &record.job_id);
    let bytes =
        serde_json::to_vec(record).map_err(|err| ActionError::Internal(err.to_string()))?;
    atomic_replace(&path, &bytes).map_err(|err| ActionError::Internal(err.to_string()))
}

/// Reads a persisted job record back, verbatim.
pub fn read_job_record(
    repo_root: &Path,
    templates: &PathTemplateSet,
    app_id: &str,
    job_id: &str,
) -> Result<Value, ActionError> {
    let path = job_record_path(repo_root, templates, app_id, job_id);
    let Some(text) = read_to_string_opt(&path) else {
        return Err(ActionError::JobNotFound {
            job_id: job_id.to_string(),
        });
    };

    let record: Value = serde_json::from_str(&text)
        .map_err(|_| ActionError::Internal("job record is invalid JSON".to_string()))?;

    let has_id = record
        .get("jobId")
        .and_then(Value::as_str)
        .is_some_and(|id| !id.is_empty());
    let has_state = record
        .get("state")
        .and_then(Value::as_str)
        .is_some_and(|state| !state.is_empty());
    if !record.is_object() || !has_id || !has_state {
        return Err(ActionError::Internal(
            "job record missing required fields".to_string(),
        ));
    }

    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tempfile::TempDir;

    fn templates() -> PathTemplateSet {
        PathTemplateSet {
            status_spec: "{repoRoot}/status/{appId}.status.json".to_string(),
            status_snapshot: "{repoRoot}/runtime/{appId}.json".to_string(),
            action_catalog: "{repoRoot}/actions/{appId}.actions.json".to_string(),
            action_job: "{repoRoot}/runtime/jobs/{appId}/{jobId}.json".to_string(),
        }
    }

    fn record(job_id: &str, error: Option<JobFailure>) -> ActionJobRecord {
        ActionJobRecord {
            job_id: job_id.to_string(),
            state: if error.is_some() { "failed" } else { "succeeded" }.to_string(),
            accepted_at: "2026-08-02T10:00:00.000Z".to_string(),
            started_at: "2026-08-02T10:00:00.000Z".to_string(),
            finished_at: "2026-08-02T10:00:01.000Z".to_string(),
            result: json!({"done": true}),
            stdout: "out".to_string(),
            stderr: String::new(),
            error,
        }
    }

    #[test]
    fn job_ids_are_pairwise_distinct() {
        let ids: HashSet<String> = (0..256).map(|_| generate_job_id()).collect();
        assert_eq!(ids.len(), 256);
        assert!(ids.iter().all(|id| id.starts_with("job-")));
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let record = record("job-1-1", None);
        write_job_record(dir.path(), &templates(), "bridge", &record).unwrap();

        let read = read_job_record(dir.path(), &templates(), "bridge", "job-1-1").unwrap();
        assert_eq!(read["jobId"], json!("job-1-1"));
        assert_eq!(read["state"], json!("succeeded"));
        assert_eq!(read["result"], json!({"done": true}));
        assert_eq!(read["error"], Value::Null);
    }

    #[test]
    fn failure_serializes_code_message_details() {
        let dir = TempDir::new().unwrap();
        let record = record(
            "job-1-2",
            Some(JobFailure::new("missing_action_arg", "missing action arg: msg")),
        );
        write_job_record(dir.path(), &templates(), "bridge", &record).unwrap();

        let read = read_job_record(dir.path(), &templates(), "bridge", "job-1-2").unwrap();
        assert_eq!(read["error"]["code"], json!("missing_action_arg"));
        assert_eq!(read["error"]["message"], json!("missing action arg: msg"));
        assert_eq!(read["error"]["details"], json!({}));
    }

    #[test]
    fn unknown_job_is_not_found() {
        let dir = TempDir::new().unwrap();
        let err = read_job_record(dir.path(), &templates(), "bridge", "job-9-9").unwrap_err();
        assert!(matches!(err, ActionError::JobNotFound { .. }));
    }

    #[test]
    fn invalid_record_is_internal() {
        let dir = TempDir::new().unwrap();
        let path = job_record_path(dir.path(), &templates(), "bridge", "job-0-0");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "not json").unwrap();
        let err = read_job_record(dir.path(), &templates(), "bridge", "job-0-0").unwrap_err();
        assert!(matches!(err, ActionError::Internal(_)));
    }
}
