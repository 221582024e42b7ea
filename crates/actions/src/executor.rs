//! Action execution: template rendering, working-directory resolution and
//! the launch itself.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use gpi_probes::{run_command, RunRequest};

use crate::catalog::ActionDefinition;

/// Outcome of one action execution. Failures are carried as data; the
/// caller turns them into a job record.
#[derive(Debug)]
pub struct ActionRunResult {
    pub ok: bool,
    pub exit_code: i32,
    pub detached: bool,
    pub pid: Option<u32>,
    pub timed_out: bool,
    pub payload: Value,
    pub stdout: String,
    pub stderr: String,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
}

impl ActionRunResult {
    fn soft_failure(code: &str, message: String) -> Self {
        Self {
            ok: false,
            exit_code: 2,
            detached: false,
            pid: None,
            timed_out: false,
            payload: json!({}),
            stdout: String::new(),
            stderr: String::new(),
            error_code: Some(code.to_string()),
            error_message: Some(message),
        }
    }
}

/// Replaces `{name}` placeholders in a single command token. Replacements
/// are spliced in as-is and never re-scanned.
fn render_token(token: &str, args: &BTreeMap<String, String>) -> Result<String, String> {
    let mut rendered = String::new();
    let mut rest = token;

    loop {
        let mut placeholder: Option<(usize, usize)> = None;
        for (open, _) in rest.match_indices('{') {
            let tail = &rest[open + 1..];
            if let Some(close) = tail.find(['{', '}']) {
                if tail.as_bytes()[close] == b'}' && close > 0 {
                    placeholder = Some((open, open + 1 + close));
                    break;
                }
            }
        }

        let Some((open, close)) = placeholder else {
            rendered.push_str(rest);
            return Ok(rendered);
        };

        rendered.push_str(&rest[..open]);
        let name = rest[open + 1..close].trim();
        let value = args.get(name).ok_or_else(|| name.to_string())?;
        rendered.push_str(value);
        rest = &rest[close + 1..];
    }
}

/// Renders the full command line, failing with the first missing arg name.
pub fn render_command(
    action: &ActionDefinition,
    args: &BTreeMap<String, String>,
) -> Result<Vec<String>, String> {
    action
        .command
        .iter()
        .map(|token| render_token(token, args))
        .collect()
}

/// Picks the working directory for an action, falling back to the repo root
/// whenever the configured directory cannot be used.
pub fn resolve_action_cwd(repo_root: &Path, action: &ActionDefinition) -> PathBuf {
    if action.cwd.is_empty() {
        return repo_root.to_path_buf();
    }
    // UNC-style prefixes are never trusted as action cwds.
    if action.cwd.starts_with("\\\\") {
        return repo_root.to_path_buf();
    }

    let configured = Path::new(&action.cwd);
    if configured.is_absolute() {
        if configured.exists() {
            return configured.to_path_buf();
        }
        return repo_root.to_path_buf();
    }

    let combined = repo_root.join(configured);
    if combined.exists() {
        return combined;
    }
    repo_root.to_path_buf()
}

/// Finds the first balanced top-level `{...}` object in `text`, skipping
/// brace characters inside string literals (including `\"` and `\\`).
pub fn extract_first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let start = bytes.iter().position(|&b| b == b'{')?;

    let mut in_string = false;
    let mut escaped = false;
    let mut depth = 0usize;

    for (index, &byte) in bytes.iter().enumerate().skip(start) {
        if in_string {
            if escaped {
                escaped = false;
            } else if byte == b'\\' {
                escaped = true;
            } else if byte == b'"' {
                in_string = false;
            }
            continue;
        }

        match byte {
            b'"' => in_string = true,
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..=index]);
                }
            }
            _ => {}
        }
    }

    None
}

fn payload_from_stdout(stdout: &str) -> Value {
    extract_first_json_object(stdout)
        .and_then(|raw| serde_json::from_str::<Value>(raw).ok())
        .filter(Value::is_object)
        .unwrap_or_else(|| json!({}))
}

/// Executes `action_name` from the catalog with rendered `args`.
pub fn execute_action(
    repo_root: &Path,
    actions: &[ActionDefinition],
    action_name: &str,
    args: &BTreeMap<String, String>,
    timeout_override_seconds: f64,
) -> ActionRunResult {
    let Some(action) = actions.iter().find(|action| action.name == action_name) else {
        return ActionRunResult::soft_failure(
            "unknown_action",
            format!("unknown action: {action_name}"),
        );
    };

    let command = match render_command(action, args) {
        Ok(command) => command,
        Err(missing) => {
            return ActionRunResult::soft_failure(
                "missing_action_arg",
                format!("missing action arg: {missing}"),
            );
        }
    };

    let cwd = resolve_action_cwd(repo_root, action);
    let timeout_seconds = if timeout_override_seconds > 0.0 {
        timeout_override_seconds
    } else {
        action.timeout_seconds
    };
    let timeout = if timeout_seconds > 0.0 {
        Duration::from_millis((timeout_seconds * 1000.0) as u64)
    } else {
        Duration::from_secs(30)
    };

    debug!(
        action = %action.name,
        detached = action.detached,
        cwd = %cwd.display(),
        timeout_ms = timeout.as_millis() as u64,
        "launching action"
    );

    let outcome = match run_command(&RunRequest {
        command,
        cwd,
        detached: action.detached,
        timeout,
    }) {
        Ok(outcome) => outcome,
        Err(err) => {
            return ActionRunResult::soft_failure("action_launch_failed", err.to_string());
        }
    };

    if action.detached {
        let payload = json!({
            "detached": true,
            "pid": outcome.pid,
            "action": action_name,
        });
        return ActionRunResult {
            ok: true,
            exit_code: 0,
            detached: true,
            pid: outcome.pid,
            timed_out: false,
            payload,
            stdout: String::new(),
            stderr: String::new(),
            error_code: None,
            error_message: None,
        };
    }

    let exit_code = outcome.exit_code.unwrap_or(-1);
    let payload = payload_from_stdout(&outcome.stdout);

    if outcome.timed_out {
        return ActionRunResult {
            ok: false,
            exit_code,
            detached: false,
            pid: outcome.pid,
            timed_out: true,
            payload,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            error_code: Some("action_timeout".to_string()),
            error_message: Some("action timed out".to_string()),
        };
    }

    if exit_code == 0 {
        ActionRunResult {
            ok: true,
            exit_code,
            detached: false,
            pid: outcome.pid,
            timed_out: false,
            payload,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            error_code: None,
            error_message: None,
        }
    } else {
        ActionRunResult {
            ok: false,
            exit_code,
            detached: false,
            pid: outcome.pid,
            timed_out: false,
            payload,
            stdout: outcome.stdout,
            stderr: outcome.stderr,
            error_code: Some("action_failed".to_string()),
            error_message: Some("action failed".to_string()),
        }
    }
}
