//! Request dispatch.
//!
//! `dispatch` is a pure function over an immutable [`HostContext`]; side
//! effects happen only inside the status engine (snapshot write) and the
//! action runner (process execution, job write). That keeps the handler
//! re-entrant when the transport multiplexes connections.

use std::path::PathBuf;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::debug;

use gpi_actions::{ActionError, ActionRunner};
use gpi_common::PathTemplateSet;
use gpi_probes::{StatusProbes, SystemProbes};
use gpi_status::{collect_and_publish, StatusError, INTERFACE_NAME, INTERFACE_VERSION};
use gpi_wire::{error_response, ok_response, parse_request, WireRequest};

const BAD_ARG: &str = "E_BAD_ARG";
const UNSUPPORTED_APP: &str = "E_UNSUPPORTED_APP";
const UNSUPPORTED_METHOD: &str = "E_UNSUPPORTED_METHOD";
const NOT_FOUND: &str = "E_NOT_FOUND";
const INTERNAL: &str = "E_INTERNAL";

/// Immutable per-process dispatch state.
pub struct HostContext {
    pub repo_root: PathBuf,
    pub allowed_apps: Vec<String>,
    pub templates: PathTemplateSet,
    pub runner: ActionRunner,
    pub probes: Arc<dyn StatusProbes>,
}

impl HostContext {
    pub fn new(repo_root: PathBuf, allowed_apps: Vec<String>, templates: PathTemplateSet) -> Self {
        Self::with_probes(repo_root, allowed_apps, templates, Arc::new(SystemProbes))
    }

    pub fn with_probes(
        repo_root: PathBuf,
        allowed_apps: Vec<String>,
        templates: PathTemplateSet,
        probes: Arc<dyn StatusProbes>,
    ) -> Self {
        let runner = ActionRunner::new(repo_root.clone(), templates.clone());
        Self {
            repo_root,
            allowed_apps,
            templates,
            runner,
            probes,
        }
    }

    fn is_allowed(&self, app_id: &str) -> bool {
        self.allowed_apps.iter().any(|allowed| allowed == app_id)
    }
}

/// A wire-level failure produced by dispatch.
#[derive(Debug)]
pub struct RouteError {
    pub code: String,
    pub message: String,
    pub details: Value,
}

impl RouteError {
    fn new(code: &str, message: impl Into<String>, details: Value) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details,
        }
    }
}

fn required_params(method: &str) -> Option<&'static [&'static str]> {
    match method {
        "ping" => Some(&[]),
        "status.get" | "config.get" | "action.list" => Some(&["appId"]),
        "config.set" => Some(&["appId", "key"]),
        "action.invoke" => Some(&["appId", "actionName"]),
        "action.job.get" => Some(&["appId", "jobId"]),
        _ => None,
    }
}

fn param_value<'r>(request: &'r WireRequest, name: &str) -> &'r str {
    match name {
        "appId" => &request.app_id,
        "key" => &request.key,
        "actionName" => &request.action_name,
        "jobId" => &request.job_id,
        _ => "",
    }
}

fn status_error(err: StatusError) -> RouteError {
    RouteError::new(err.wire_code(), err.to_string(), json!({}))
}

fn action_error(err: ActionError) -> RouteError {
    match err {
        ActionError::BadArgs(message) => {
            RouteError::new(BAD_ARG, message, json!({"param": "args"}))
        }
        ActionError::JobNotFound { job_id } => {
            RouteError::new(NOT_FOUND, "job not found", json!({"jobId": job_id}))
        }
        ActionError::CatalogMissing(message) | ActionError::Internal(message) => {
            RouteError::new(INTERNAL, message, json!({}))
        }
    }
}

fn ping_payload() -> Value {
    json!({
        "pong": true,
        "interfaceName": INTERFACE_NAME,
        "interfaceVersion": INTERFACE_VERSION,
    })
}

/// Routes one validated request to its handler.
pub fn dispatch(request: &WireRequest, context: &HostContext) -> Result<Value, RouteError> {
    let Some(required) = required_params(&request.method) else {
        return Err(RouteError::new(
            UNSUPPORTED_METHOD,
            format!("unsupported method: {}", request.method),
            json!({"method": request.method}),
        ));
    };

    for name in required {
        if param_value(request, name).is_empty() {
            return Err(RouteError::new(
                BAD_ARG,
                format!("missing required key: params.{name}"),
                json!({"param": name}),
            ));
        }
    }

    if request.method != "ping" && !context.is_allowed(&request.app_id) {
        return Err(RouteError::new(
            UNSUPPORTED_APP,
            "unsupported appId",
            json!({"appId": request.app_id}),
        ));
    }

    debug!(method = %request.method, app_id = %request.app_id, "dispatching request");

    match request.method.as_str() {
        "ping" => Ok(ping_payload()),
        "status.get" => collect_and_publish(
            &context.repo_root,
            &request.app_id,
            &context.templates,
            context.probes.as_ref(),
        )
        .map_err(status_error),
        "config.get" => context
            .runner
            .config_get(&request.app_id)
            .map_err(action_error),
        "config.set" => context
            .runner
            .config_set(&request.app_id, &request.key, &request.value)
            .map_err(action_error),
        "action.list" => context
            .runner
            .action_list(&request.app_id)
            .map_err(action_error),
        "action.invoke" => context
            .runner
            .action_invoke(
                &request.app_id,
                &request.action_name,
                &request.args,
                request.timeout_seconds,
            )
            .map_err(action_error),
        "action.job.get" => context
            .runner
            .job_get(&request.app_id, &request.job_id)
            .map_err(action_error),
        _ => unreachable!("method table covers every routed method"),
    }
}

/// Full line-level handling: parse, dispatch, serialize.
pub fn handle_line(context: &HostContext, raw: &str) -> String {
    let response = match parse_request(raw) {
        Err(err) => {
            let details = err.details();
            error_response(err.id.as_deref(), BAD_ARG, &err.message, details)
        }
        Ok(request) => match dispatch(&request, context) {
            Ok(payload) => ok_response(request.id.as_deref(), payload),
            Err(err) => error_response(request.id.as_deref(), &err.code, &err.message, err.details),
        },
    };
    response.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpi_probes::ProcessQuery;
    use std::io;
    use std::time::Duration;
    use tempfile::TempDir;

    struct NoProbes;

    impl StatusProbes for NoProbes {
        fn query_process_by_name(&self, _name: &str) -> io::Result<ProcessQuery> {
            Ok(ProcessQuery::default())
        }

        fn check_port_listening(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
            false
        }
    }

    fn templates() -> PathTemplateSet {
        PathTemplateSet {
            status_spec: "{repoRoot}/status/{appId}.status.json".to_string(),
            status_snapshot: "{repoRoot}/runtime/{appId}.json".to_string(),
            action_catalog: "{repoRoot}/actions/{appId}.actions.json".to_string(),
            action_job: "{repoRoot}/runtime/jobs/{appId}/{jobId}.json".to_string(),
        }
    }

    fn context(dir: &TempDir) -> HostContext {
        HostContext::with_probes(
            dir.path().to_path_buf(),
            vec!["bridge".to_string()],
            templates(),
            Arc::new(NoProbes),
        )
    }

    #[test]
    fn ping_payload_is_exact() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(&context(&dir), r#"{"id":"r1","method":"ping"}"#);
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(
            value,
            json!({
                "id": "r1",
                "ok": true,
                "response": {
                    "pong": true,
                    "interfaceName": "generic-process-interface",
                    "interfaceVersion": 1,
                }
            })
        );
    }

    #[test]
    fn unknown_method_is_unsupported() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(&context(&dir), r#"{"method":"status.flush"}"#);
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["ok"], json!(false));
        assert_eq!(value["error"]["code"], json!("E_UNSUPPORTED_METHOD"));
        assert_eq!(value["error"]["details"]["method"], json!("status.flush"));
    }

    #[test]
    fn missing_app_id_is_bad_arg() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(&context(&dir), r#"{"method":"status.get"}"#);
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], json!("E_BAD_ARG"));
        assert_eq!(value["error"]["details"]["param"], json!("appId"));
    }

    #[test]
    fn disallowed_app_is_rejected_before_handlers() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(
            &context(&dir),
            r#"{"method":"status.get","params":{"appId":"other"}}"#,
        );
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], json!("E_UNSUPPORTED_APP"));
        assert_eq!(value["error"]["details"]["appId"], json!("other"));
    }

    #[test]
    fn param_order_missing_param_beats_app_check() {
        // config.set with appId missing reports the param error, even though
        // the app would also be disallowed.
        let dir = TempDir::new().unwrap();
        let response = handle_line(
            &context(&dir),
            r#"{"method":"config.set","params":{"key":"k"}}"#,
        );
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], json!("E_BAD_ARG"));
        assert_eq!(value["error"]["details"]["param"], json!("appId"));
    }

    #[test]
    fn parse_failure_is_bad_arg_with_id_when_recoverable() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(&context(&dir), r#"{"id":"x","params":{}}"#);
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["id"], json!("x"));
        assert_eq!(value["error"]["code"], json!("E_BAD_ARG"));
    }

    #[test]
    fn status_get_spec_missing_is_native_unavailable() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(
            &context(&dir),
            r#"{"method":"status.get","params":{"appId":"bridge"}}"#,
        );
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], json!("E_NATIVE_UNAVAILABLE"));
    }

    #[test]
    fn job_get_unknown_is_not_found() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(
            &context(&dir),
            r#"{"method":"action.job.get","params":{"appId":"bridge","jobId":"job-1-1"}}"#,
        );
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], json!("E_NOT_FOUND"));
        assert_eq!(value["error"]["details"]["jobId"], json!("job-1-1"));
    }

    #[test]
    fn invoke_with_non_object_args_fails_at_parse() {
        let dir = TempDir::new().unwrap();
        let response = handle_line(
            &context(&dir),
            r#"{"method":"action.invoke","params":{"appId":"bridge","actionName":"x","args":[1]}}"#,
        );
        let value: Value = serde_json::from_str(&response).unwrap();
        assert_eq!(value["error"]["code"], json!("E_BAD_ARG"));
    }
}
