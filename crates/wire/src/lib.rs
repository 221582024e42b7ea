//! Wire codec.
//!
//! One JSON object per message. Requests carry `{id?, method, params?}`;
//! responses are `{id?, ok:true, response}` or
//! `{id?, ok:false, error:{code, message, details}}`. Response payloads and
//! error details are always JSON objects; anything else is coerced to `{}`.

use serde_json::{json, Map, Value};

/// A parsed request with its typed parameters extracted.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub id: Option<String>,
    pub method: String,
    pub app_id: String,
    pub key: String,
    pub value: String,
    pub action_name: String,
    pub job_id: String,
    pub args: Value,
    pub timeout_seconds: f64,
}

/// A request that could not be parsed. The id is echoed when it was
/// recoverable so the client can still correlate the error, and `param`
/// names the offending parameter when one is identifiable.
#[derive(Debug, Clone, PartialEq)]
pub struct WireParseError {
    pub id: Option<String>,
    pub message: String,
    pub param: Option<&'static str>,
}

impl WireParseError {
    fn new(id: Option<String>, message: impl Into<String>) -> Self {
        Self {
            id,
            message: message.into(),
            param: None,
        }
    }

    fn for_param(id: Option<String>, message: impl Into<String>, param: &'static str) -> Self {
        Self {
            id,
            message: message.into(),
            param: Some(param),
        }
    }

    /// Details object for the error response.
    pub fn details(&self) -> Value {
        match self.param {
            Some(param) => json!({ "param": param }),
            None => json!({}),
        }
    }
}

fn param_string(params: &Map<String, Value>, key: &str) -> String {
    params
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

/// Renders the `value` parameter: strings pass through, anything else is
/// compact JSON (so `null` renders as the string `null`). Action args have
/// their own null convention; it does not apply here.
fn render_value_param(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Parses one request message.
pub fn parse_request(raw: &str) -> Result<WireRequest, WireParseError> {
    let root: Value = serde_json::from_str(raw)
        .map_err(|_| WireParseError::new(None, "request is not a JSON object"))?;
    let Some(object) = root.as_object() else {
        return Err(WireParseError::new(None, "request is not a JSON object"));
    };

    let id = object
        .get("id")
        .and_then(Value::as_str)
        .map(str::to_string);

    let Some(method) = object.get("method").and_then(Value::as_str) else {
        return Err(WireParseError::new(id, "missing required key: method"));
    };

    let empty = Map::new();
    let params = match object.get("params") {
        None | Some(Value::Null) => &empty,
        Some(Value::Object(params)) => params,
        Some(_) => {
            return Err(WireParseError::new(id, "params must be a JSON object"));
        }
    };

    let args = match params.get("args") {
        None => json!({}),
        Some(args @ Value::Object(_)) => args.clone(),
        Some(_) => {
            return Err(WireParseError::for_param(
                id,
                "args must be a JSON object",
                "args",
            ));
        }
    };

    let timeout_seconds = params
        .get("timeoutSeconds")
        .and_then(Value::as_f64)
        .filter(|timeout| *timeout > 0.0)
        .unwrap_or(0.0);

    let value = params.get("value").map(render_value_param).unwrap_or_default();

    Ok(WireRequest {
        id,
        method: method.to_string(),
        app_id: param_string(params, "appId"),
        key: param_string(params, "key"),
        value,
        action_name: param_string(params, "actionName"),
        job_id: param_string(params, "jobId"),
        args,
        timeout_seconds,
    })
}

fn coerce_object(value: Value) -> Value {
    if value.is_object() {
        value
    } else {
        json!({})
    }
}

/// Builds an ok response envelope.
pub fn ok_response(id: Option<&str>, payload: Value) -> Value {
    let mut response = Map::new();
    if let Some(id) = id {
        response.insert("id".to_string(), Value::from(id));
    }
    response.insert("ok".to_string(), Value::from(true));
    response.insert("response".to_string(), coerce_object(payload));
    Value::Object(response)
}

/// Builds an error response envelope.
pub fn error_response(id: Option<&str>, code: &str, message: &str, details: Value) -> Value {
    let mut response = Map::new();
    if let Some(id) = id {
        response.insert("id".to_string(), Value::from(id));
    }
    response.insert("ok".to_string(), Value::from(false));
    response.insert(
        "error".to_string(),
        json!({
            "code": code,
            "message": message,
            "details": coerce_object(details),
        }),
    );
    Value::Object(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_ping() {
        let request = parse_request(r#"{"id":"r1","method":"ping"}"#).unwrap();
        assert_eq!(request.id.as_deref(), Some("r1"));
        assert_eq!(request.method, "ping");
        assert_eq!(request.args, json!({}));
        assert_eq!(request.timeout_seconds, 0.0);
    }

    #[test]
    fn parses_typed_params() {
        let raw = r#"{
            "method": "action.invoke",
            "params": {
                "appId": "bridge",
                "actionName": "echo",
                "args": {"msg": "hi"},
                "timeoutSeconds": 2.5
            }
        }"#;
        let request = parse_request(raw).unwrap();
        assert_eq!(request.app_id, "bridge");
        assert_eq!(request.action_name, "echo");
        assert_eq!(request.args, json!({"msg": "hi"}));
        assert_eq!(request.timeout_seconds, 2.5);
        assert!(request.id.is_none());
    }

    #[test]
    fn non_object_request_fails_without_id() {
        let err = parse_request("[1,2,3]").unwrap_err();
        assert!(err.id.is_none());
        assert_eq!(err.message, "request is not a JSON object");
    }

    #[test]
    fn missing_method_keeps_id() {
        let err = parse_request(r#"{"id":"r7","params":{}}"#).unwrap_err();
        assert_eq!(err.id.as_deref(), Some("r7"));
        assert_eq!(err.message, "missing required key: method");
    }

    #[test]
    fn non_object_params_fail() {
        let err = parse_request(r#"{"method":"ping","params":[1]}"#).unwrap_err();
        assert_eq!(err.message, "params must be a JSON object");
    }

    #[test]
    fn non_object_args_fail_naming_the_param() {
        let err =
            parse_request(r#"{"method":"action.invoke","params":{"args":"nope"}}"#).unwrap_err();
        assert_eq!(err.message, "args must be a JSON object");
        assert_eq!(err.details(), json!({"param": "args"}));
    }

    #[test]
    fn value_param_stringification() {
        let get = |raw: &str| parse_request(raw).unwrap().value;
        assert_eq!(
            get(r#"{"method":"config.set","params":{"value":"text"}}"#),
            "text"
        );
        assert_eq!(
            get(r#"{"method":"config.set","params":{"value":null}}"#),
            "null"
        );
        assert_eq!(get(r#"{"method":"config.set","params":{"value":12}}"#), "12");
        assert_eq!(
            get(r#"{"method":"config.set","params":{"value":{"a":1}}}"#),
            r#"{"a":1}"#
        );
    }

    #[test]
    fn non_positive_timeout_is_dropped() {
        let request =
            parse_request(r#"{"method":"action.invoke","params":{"timeoutSeconds":-3}}"#).unwrap();
        assert_eq!(request.timeout_seconds, 0.0);
    }

    #[test]
    fn ok_response_echoes_id_and_coerces_payload() {
        let response = ok_response(Some("r1"), json!({"pong": true}));
        assert_eq!(response, json!({"id": "r1", "ok": true, "response": {"pong": true}}));

        let coerced = ok_response(None, json!([1, 2]));
        assert_eq!(coerced, json!({"ok": true, "response": {}}));
    }

    #[test]
    fn error_response_shape() {
        let response = error_response(
            Some("r2"),
            "E_BAD_ARG",
            "missing required key: params.appId",
            json!({"param": "appId"}),
        );
        assert_eq!(
            response,
            json!({
                "id": "r2",
                "ok": false,
                "error": {
                    "code": "E_BAD_ARG",
                    "message": "missing required key: params.appId",
                    "details": {"param": "appId"},
                }
            })
        );

        let coerced = error_response(None, "E_INTERNAL", "boom", json!("not-an-object"));
        assert_eq!(coerced["error"]["details"], json!({}));
    }

    #[test]
    fn id_round_trips_for_every_valid_request() {
        for method in ["ping", "status.get", "action.invoke"] {
            let raw = format!(r#"{{"id":"round","method":"{method}"}}"#);
            let request = parse_request(&raw).unwrap();
            let response = ok_response(request.id.as_deref(), json!({}));
            assert_eq!(response["id"], json!("round"));
        }
    }
}
