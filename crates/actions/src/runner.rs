//! The catalog-driven operation surface: `config.get`, `config.set`,
//! `action.list`, `action.invoke` and `action.job.get`.
//!
//! `config.get` and `config.set` are synthesized as invocations of the
//! well-known catalog actions `config_show` and `config_set_key`.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};
use tracing::debug;

use gpi_common::{now_rfc3339, PathTemplateSet};

use crate::catalog::load_catalog;
use crate::error::ActionError;
use crate::executor::{execute_action, ActionRunResult};
use crate::jobs::{generate_job_id, write_job_record, read_job_record, ActionJobRecord, JobFailure};

const CONFIG_SHOW_ACTION: &str = "config_show";
const CONFIG_SET_ACTION: &str = "config_set_key";

/// Renders one JSON argument value into the text spliced into commands.
pub fn render_arg_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn non_empty_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Stateless binding of the action surface to one repo root.
#[derive(Debug, Clone)]
pub struct ActionRunner {
    repo_root: PathBuf,
    templates: PathTemplateSet,
}

impl ActionRunner {
    pub fn new(repo_root: impl Into<PathBuf>, templates: PathTemplateSet) -> Self {
        Self {
            repo_root: repo_root.into(),
            templates,
        }
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    fn parse_args_object(args: &Value) -> Result<BTreeMap<String, String>, ActionError> {
        let Value::Object(map) = args else {
            return Err(ActionError::BadArgs(
                "args json must decode to an object".to_string(),
            ));
        };
        Ok(map
            .iter()
            .map(|(key, value)| (key.clone(), render_arg_value(value)))
            .collect())
    }

    fn config_get_fallback(&self, reason: &str) -> Value {
        json!({
            "repoRoot": self.repo_root.display().to_string(),
            "valid": false,
            "errors": [reason],
            "entries": {},
            "paths": {},
            "configTree": {},
        })
    }

    fn config_set_fallback(key: &str, value: &str, result: &ActionRunResult, output: &str) -> Value {
        json!({
            "ok": result.exit_code == 0,
            "key": key,
            "value": value,
            "output": non_empty_lines(output),
        })
    }

    /// `config.get`: run `config_show`; any action failure degrades to the
    /// fallback object rather than failing the RPC.
    pub fn config_get(&self, app_id: &str) -> Result<Value, ActionError> {
        let actions = load_catalog(&self.repo_root, &self.templates, app_id)?;

        let result = execute_action(
            &self.repo_root,
            &actions,
            CONFIG_SHOW_ACTION,
            &BTreeMap::new(),
            0.0,
        );

        if !result.ok {
            let reason = result
                .error_message
                .as_deref()
                .unwrap_or("config.get failed");
            debug!(app_id, reason, "config.get degraded to fallback payload");
            return Ok(self.config_get_fallback(reason));
        }

        Ok(result.payload)
    }

    /// `config.set`: run `config_set_key` with `{key, value}`.
    pub fn config_set(&self, app_id: &str, key: &str, value: &str) -> Result<Value, ActionError> {
        let actions = load_catalog(&self.repo_root, &self.templates, app_id)?;

        let mut args = BTreeMap::new();
        args.insert("key".to_string(), key.to_string());
        args.insert("value".to_string(), value.to_string());

        let result = execute_action(&self.repo_root, &actions, CONFIG_SET_ACTION, &args, 0.0);

        if !result.ok {
            let output = if result.stderr.is_empty() {
                result.stdout.clone()
            } else {
                result.stderr.clone()
            };
            return Ok(Self::config_set_fallback(key, value, &result, &output));
        }

        let payload_is_empty = result
            .payload
            .as_object()
            .map_or(true, |payload| payload.is_empty());
        if payload_is_empty {
            let output = result.stdout.clone();
            return Ok(Self::config_set_fallback(key, value, &result, &output));
        }

        Ok(result.payload)
    }

    /// `action.list`: names, labels and the schema passthrough.
    pub fn action_list(&self, app_id: &str) -> Result<Value, ActionError> {
        let actions = load_catalog(&self.repo_root, &self.templates, app_id)?;

        let entries: Vec<Value> = actions
            .iter()
            .map(|action| {
                json!({
                    "name": action.name,
                    "label": action.label,
                    "args": action.args_schema,
                })
            })
            .collect();

        Ok(json!({ "actions": entries }))
    }

    /// `action.invoke`: execute synchronously, persist a terminal job
    /// record, and reply with the accepted/queued contract.
    pub fn action_invoke(
        &self,
        app_id: &str,
        action_name: &str,
        args: &Value,
        timeout_override_seconds: f64,
    ) -> Result<Value, ActionError> {
        let actions = load_catalog(&self.repo_root, &self.templates, app_id)?;
        let args_map = Self::parse_args_object(args)?;

        let accepted_at = now_rfc3339();
        let result = execute_action(
            &self.repo_root,
            &actions,
            action_name,
            &args_map,
            timeout_override_seconds,
        );

        let (state, error) = if result.ok {
            ("succeeded", None)
        } else if result.timed_out {
            (
                "timeout",
                Some(JobFailure::new(
                    "E_ACTION_TIMEOUT",
                    result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "action timed out".to_string()),
                )),
            )
        } else {
            (
                "failed",
                Some(JobFailure::new(
                    result
                        .error_code
                        .clone()
                        .unwrap_or_else(|| "E_ACTION_FAILED".to_string()),
                    result
                        .error_message
                        .clone()
                        .unwrap_or_else(|| "action failed".to_string()),
                )),
            )
        };

        let record = ActionJobRecord {
            job_id: generate_job_id(),
            state: state.to_string(),
            accepted_at: accepted_at.clone(),
            started_at: accepted_at.clone(),
            finished_at: now_rfc3339(),
            result: result.payload,
            stdout: result.stdout,
            stderr: result.stderr,
            error,
        };

        write_job_record(&self.repo_root, &self.templates, app_id, &record)?;
        debug!(
            app_id,
            action = action_name,
            job_id = %record.job_id,
            state = %record.state,
            "action job recorded"
        );

        Ok(json!({
            "jobId": record.job_id,
            "state": "queued",
            "acceptedAt": accepted_at,
        }))
    }

    /// `action.job.get`: the persisted record, verbatim.
    pub fn job_get(&self, app_id: &str, job_id: &str) -> Result<Value, ActionError> {
        read_job_record(&self.repo_root, &self.templates, app_id, job_id)
    }
}
