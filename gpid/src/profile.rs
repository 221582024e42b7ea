//! Host profile: the one declarative input of the daemon process.
//!
//! Loaded once at startup and immutable afterwards.

use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use gpi_common::{template_has_token, PathTemplateSet};

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("host profile not found: {0}")]
    NotFound(String),
    #[error("host profile is not valid JSON: {0}")]
    InvalidJson(String),
    #[error("invalid host profile: {0}")]
    Invalid(String),
}

/// Supported transport backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpcBackendKind {
    /// Unix-domain socket, newline-delimited JSON.
    Uds,
    /// TCP, newline-delimited JSON.
    Tcp,
}

impl IpcBackendKind {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "uds" => Some(Self::Uds),
            "tcp" => Some(Self::Tcp),
            _ => None,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaths {
    status_spec: String,
    status_snapshot: String,
    action_catalog: String,
    action_job: String,
}

#[derive(Debug, Deserialize)]
struct RawIpc {
    backend: String,
    endpoint: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawProfile {
    #[serde(default)]
    allowed_apps: Vec<Value>,
    paths: RawPaths,
    ipc: RawIpc,
}

/// The validated host profile.
#[derive(Debug, Clone)]
pub struct HostProfile {
    pub allowed_apps: Vec<String>,
    pub templates: PathTemplateSet,
    pub backend: IpcBackendKind,
    pub endpoint: String,
}

fn require_tokens(
    template: &str,
    template_name: &str,
    tokens: &[&str],
) -> Result<(), ProfileError> {
    if template.is_empty() {
        return Err(ProfileError::Invalid(format!(
            "paths.{template_name} must be a non-empty template"
        )));
    }
    for token in tokens {
        if !template_has_token(template, token) {
            return Err(ProfileError::Invalid(format!(
                "paths.{template_name} is missing required token {{{token}}}"
            )));
        }
    }
    Ok(())
}

/// Loads and validates the host profile at `path`.
pub fn load_host_profile(path: &Path) -> Result<HostProfile, ProfileError> {
    let text = std::fs::read_to_string(path)
        .map_err(|_| ProfileError::NotFound(path.display().to_string()))?;

    let raw: RawProfile = serde_json::from_str(&text)
        .map_err(|err| ProfileError::InvalidJson(format!("{}: {err}", path.display())))?;

    let allowed_apps: Vec<String> = raw
        .allowed_apps
        .iter()
        .filter_map(Value::as_str)
        .filter(|app_id| !app_id.is_empty())
        .map(str::to_string)
        .collect();
    if allowed_apps.is_empty() {
        return Err(ProfileError::Invalid(
            "allowedApps has no valid entries".to_string(),
        ));
    }

    require_tokens(&raw.paths.status_spec, "statusSpec", &["repoRoot", "appId"])?;
    require_tokens(
        &raw.paths.status_snapshot,
        "statusSnapshot",
        &["repoRoot", "appId"],
    )?;
    require_tokens(
        &raw.paths.action_catalog,
        "actionCatalog",
        &["repoRoot", "appId"],
    )?;
    require_tokens(
        &raw.paths.action_job,
        "actionJob",
        &["repoRoot", "appId", "jobId"],
    )?;

    let Some(backend) = IpcBackendKind::from_tag(&raw.ipc.backend) else {
        return Err(ProfileError::Invalid(format!(
            "unsupported ipc.backend: {}",
            raw.ipc.backend
        )));
    };
    if raw.ipc.endpoint.is_empty() {
        return Err(ProfileError::Invalid(
            "ipc.endpoint must be non-empty".to_string(),
        ));
    }

    Ok(HostProfile {
        allowed_apps,
        templates: PathTemplateSet {
            status_spec: raw.paths.status_spec,
            status_snapshot: raw.paths.status_snapshot,
            action_catalog: raw.paths.action_catalog,
            action_job: raw.paths.action_job,
        },
        backend,
        endpoint: raw.ipc.endpoint,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn profile_json() -> Value {
        json!({
            "allowedApps": ["bridge"],
            "paths": {
                "statusSpec": "{repoRoot}/status/{appId}.status.json",
                "statusSnapshot": "{repoRoot}/runtime/{appId}.json",
                "actionCatalog": "{repoRoot}/actions/{appId}.actions.json",
                "actionJob": "{repoRoot}/runtime/jobs/{appId}/{jobId}.json",
            },
            "ipc": {"backend": "uds", "endpoint": "/tmp/gpid.sock"},
        })
    }

    fn load(value: &Value) -> Result<HostProfile, ProfileError> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("host.json");
        std::fs::write(&path, serde_json::to_string(value).unwrap()).unwrap();
        load_host_profile(&path)
    }

    #[test]
    fn loads_valid_profile() {
        let profile = load(&profile_json()).unwrap();
        assert_eq!(profile.allowed_apps, vec!["bridge".to_string()]);
        assert_eq!(profile.backend, IpcBackendKind::Uds);
        assert_eq!(profile.endpoint, "/tmp/gpid.sock");
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = load_host_profile(Path::new("/nonexistent/host.json")).unwrap_err();
        assert!(matches!(err, ProfileError::NotFound(_)));
    }

    #[test]
    fn empty_allowed_apps_fails() {
        let mut value = profile_json();
        value["allowedApps"] = json!([]);
        assert!(matches!(load(&value), Err(ProfileError::Invalid(_))));

        value["allowedApps"] = json!(["", 42]);
        assert!(matches!(load(&value), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn unknown_backend_fails() {
        let mut value = profile_json();
        value["ipc"]["backend"] = json!("carrier-pigeon");
        assert!(matches!(load(&value), Err(ProfileError::Invalid(_))));
    }

    #[test]
    fn job_template_requires_job_token() {
        let mut value = profile_json();
        value["paths"]["actionJob"] = json!("{repoRoot}/runtime/jobs/{appId}.json");
        let err = load(&value).unwrap_err();
        match err {
            ProfileError::Invalid(message) => assert!(message.contains("jobId"), "{message}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn spec_template_requires_app_token() {
        let mut value = profile_json();
        value["paths"]["statusSpec"] = json!("{repoRoot}/status/spec.json");
        assert!(matches!(load(&value), Err(ProfileError::Invalid(_))));
    }
}
