//! Operation evaluation and coercion rules.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use gpi_probes::StatusProbes;

use crate::error::StatusError;
use crate::expr::{parse_bool_text, DeriveOp, Op};

/// Everything an evaluation needs besides the operation itself.
pub struct StatusContext<'a> {
    pub repo_root: &'a Path,
    pub probes: &'a dyn StatusProbes,
}

/// bool coercion: native bools, non-zero integers and the usual text forms.
pub fn value_to_bool(value: &Value, default: bool) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Number(number) => match number.as_i64() {
            Some(int) => int != 0,
            None => default,
        },
        Value::String(text) => parse_bool_text(text, default),
        _ => default,
    }
}

/// int coercion: integers and fully-numeric decimal strings.
pub fn value_to_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64(),
        Value::String(text) => text.trim().parse::<i64>().ok(),
        _ => None,
    }
}

fn field_value(values: &HashMap<String, Value>, key: &str) -> Value {
    values.get(key).cloned().unwrap_or(Value::Null)
}

fn evaluate_derive(derive: &DeriveOp, values: &HashMap<String, Value>) -> Value {
    match derive {
        DeriveOp::Copy { src } => field_value(values, src),
        DeriveOp::BoolFromObj { src, key, default } => {
            let source = field_value(values, src);
            let flag = match source.get(key) {
                Some(value) => value_to_bool(value, false),
                None => *default,
            };
            Value::Bool(flag)
        }
        DeriveOp::IntFromObj { src, key } => {
            let source = field_value(values, src);
            source
                .get(key)
                .and_then(value_to_int)
                .map_or(Value::Null, Value::from)
        }
        DeriveOp::StrFromObj { src, key, default } => {
            let source = field_value(values, src);
            let text = source
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default.as_str());
            Value::String(text.to_string())
        }
        DeriveOp::JsonFromObj { src, key, default } => {
            let source = field_value(values, src);
            source.get(key).cloned().unwrap_or_else(|| default.clone())
        }
        DeriveOp::RunningDisplay { running, pid } => {
            let is_running = value_to_bool(&field_value(values, running), false);
            let pid_value = value_to_int(&field_value(values, pid));
            let text = match (is_running, pid_value) {
                (true, Some(pid)) => format!("True (PID {pid})"),
                (true, None) => "True".to_string(),
                (false, _) => "False".to_string(),
            };
            Value::String(text)
        }
        DeriveOp::StrIfBool {
            src,
            true_text,
            false_text,
        } => {
            let flag = value_to_bool(&field_value(values, src), false);
            Value::String(if flag { true_text } else { false_text }.clone())
        }
        DeriveOp::PickInt { primary, fallback } => value_to_int(&field_value(values, primary))
            .or_else(|| value_to_int(&field_value(values, fallback)))
            .map_or(Value::Null, Value::from),
        DeriveOp::OrBool { left, right } => {
            let left = value_to_bool(&field_value(values, left), false);
            let right = value_to_bool(&field_value(values, right), false);
            Value::Bool(left || right)
        }
    }
}

/// Evaluates one operation against already-computed fields.
pub fn evaluate(
    op: &Op,
    values: &HashMap<String, Value>,
    context: &StatusContext<'_>,
) -> Result<Value, StatusError> {
    match op {
        Op::Const(value) => Ok(value.clone()),
        Op::ConstStr(text) => Ok(Value::String(text.clone())),
        Op::FileJson { rel_path, default } => {
            let path = context.repo_root.join(rel_path);
            match gpi_common::read_json_file(&path) {
                Some(value) if value.is_object() || value.is_array() => Ok(value),
                Some(_) => Ok(default.clone()),
                None => {
                    debug!(path = %path.display(), "file_json source missing or unreadable");
                    Ok(default.clone())
                }
            }
        }
        Op::FileExists { rel_path } => Ok(Value::Bool(context.repo_root.join(rel_path).exists())),
        Op::ProcessRunning { name } => {
            let probe = context
                .probes
                .query_process_by_name(name)
                .map_err(|err| StatusError::CollectFailed(err.to_string()))?;
            let pid = probe
                .pid
                .filter(|pid| probe.running && *pid > 0)
                .map_or(Value::Null, Value::from);
            Ok(json!({
                "running": probe.running,
                "pid": pid,
                "pids": probe.pids,
            }))
        }
        Op::PortListening {
            host,
            port,
            timeout_ms,
        } => {
            if *port < 1 || *port > 65535 {
                return Ok(Value::Bool(false));
            }
            let timeout = Duration::from_millis((*timeout_ms).clamp(0, 30_000) as u64);
            Ok(Value::Bool(context.probes.check_port_listening(
                host,
                *port as u16,
                timeout,
            )))
        }
        Op::Derive(derive) => Ok(evaluate_derive(derive, values)),
    }
}
