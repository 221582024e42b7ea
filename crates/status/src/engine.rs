//! Spec execution: ordered evaluation plus the fixed envelope fields.

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::debug;

use crate::error::StatusError;
use crate::eval::{evaluate, value_to_bool, value_to_int, StatusContext};
use crate::spec::StatusSpec;

pub const INTERFACE_NAME: &str = "generic-process-interface";
pub const INTERFACE_VERSION: i64 = 1;

fn table_value(values: &HashMap<String, Value>, key: &str) -> Value {
    values.get(key).cloned().unwrap_or(Value::Null)
}

/// Runs every operation in declaration order and assembles the payload.
///
/// Fields whose name starts with `_` stay in the side table but never reach
/// the payload.
pub fn execute_spec(
    spec: &StatusSpec,
    context: &StatusContext<'_>,
) -> Result<Value, StatusError> {
    let mut values: HashMap<String, Value> = HashMap::new();
    let mut payload = Map::new();

    for operation in &spec.operations {
        let value = evaluate(&operation.op, &values, context)
            .map_err(|err| err.for_operation(&operation.field))?;

        values.insert(operation.field.clone(), value.clone());
        if !operation.field.starts_with('_') {
            payload.insert(operation.field.clone(), value);
        }
    }

    let running = value_to_bool(&table_value(&values, &spec.running_field), false);
    let host_running = value_to_bool(&table_value(&values, &spec.host_running_field), false);
    let pid = value_to_int(&table_value(&values, &spec.pid_field));
    let host_pid = value_to_int(&table_value(&values, &spec.host_pid_field));

    let boot_id = match (running, pid) {
        (true, Some(pid)) => format!("{}:{pid}", spec.app_id),
        _ => String::new(),
    };

    payload.insert("interfaceName".to_string(), Value::from(INTERFACE_NAME));
    payload.insert("interfaceVersion".to_string(), Value::from(INTERFACE_VERSION));
    payload.insert("appId".to_string(), Value::from(spec.app_id.clone()));
    payload.insert("appTitle".to_string(), Value::from(spec.app_title.clone()));
    payload.insert("running".to_string(), Value::from(running));
    payload.insert("pid".to_string(), pid.map_or(Value::Null, Value::from));
    payload.insert("hostRunning".to_string(), Value::from(host_running));
    payload.insert(
        "hostPid".to_string(),
        host_pid.map_or(Value::Null, Value::from),
    );
    payload.insert("bootId".to_string(), Value::from(boot_id));
    payload.insert("error".to_string(), Value::from(String::new()));

    debug!(
        app_id = %spec.app_id,
        fields = payload.len(),
        "status payload assembled"
    );

    Ok(Value::Object(payload))
}
