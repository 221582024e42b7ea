//! Status engine.
//!
//! `status.get` re-reads the per-app status spec, evaluates its operations
//! in declaration order against the probe layer, publishes the snapshot
//! envelope atomically and returns the payload. Nothing is cached between
//! requests; the filesystem is the only store.

pub mod engine;
pub mod error;
pub mod eval;
pub mod expr;
pub mod spec;
pub mod writer;

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use gpi_common::PathTemplateSet;
use gpi_probes::StatusProbes;

pub use engine::{execute_spec, INTERFACE_NAME, INTERFACE_VERSION};
pub use error::StatusError;
pub use eval::{evaluate, value_to_bool, value_to_int, StatusContext};
pub use expr::{parse_operation_line, DeriveOp, Op, Operation};
pub use spec::{load_status_spec, StatusSpec};
pub use writer::write_snapshot;

/// The full `status.get` pipeline: load, evaluate, publish, return payload.
pub fn collect_and_publish(
    repo_root: &Path,
    app_id: &str,
    templates: &PathTemplateSet,
    probes: &dyn StatusProbes,
) -> Result<Value, StatusError> {
    let spec = load_status_spec(repo_root, templates, app_id)?;

    let context = StatusContext { repo_root, probes };
    let payload = execute_spec(&spec, &context)?;

    write_snapshot(repo_root, templates, app_id, &payload)?;
    debug!(app_id, "status snapshot published");

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use gpi_probes::ProcessQuery;
    use serde_json::json;
    use std::io;
    use std::time::Duration;
    use tempfile::TempDir;

    struct Probes;

    impl StatusProbes for Probes {
        fn query_process_by_name(&self, _name: &str) -> io::Result<ProcessQuery> {
            Ok(ProcessQuery {
                running: true,
                pid: Some(31337),
                pids: vec![31337],
            })
        }

        fn check_port_listening(&self, _host: &str, _port: u16, _timeout: Duration) -> bool {
            true
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

    #[test]
    fn publishes_snapshot_and_returns_payload() {
        let dir = TempDir::new().unwrap();
        let spec_path = dir.path().join("status/bridge.status.json");
        std::fs::create_dir_all(spec_path.parent().unwrap()).unwrap();
        std::fs::write(
            &spec_path,
            serde_json::to_string(&json!({
                "appTitle": "Bridge",
                "operations": [
                    "host = process_running:worker",
                    "running = derive:bool_from_obj:host:running",
                    "pid = derive:int_from_obj:host:pid",
                    "gateway = port_listening:127.0.0.1:8123",
                ],
            }))
            .unwrap(),
        )
        .unwrap();

        let payload = collect_and_publish(dir.path(), "bridge", &templates(), &Probes).unwrap();
        assert_eq!(payload["bootId"], json!("bridge:31337"));
        assert_eq!(payload["gateway"], json!(true));

        let snapshot: Value = serde_json::from_str(
            &std::fs::read_to_string(dir.path().join("runtime/bridge.json")).unwrap(),
        )
        .unwrap();
        assert_eq!(snapshot["payload"], payload);
    }

    #[test]
    fn missing_spec_maps_to_native_unavailable() {
        let dir = TempDir::new().unwrap();
        let err = collect_and_publish(dir.path(), "bridge", &templates(), &Probes).unwrap_err();
        assert_eq!(err.wire_code(), "E_NATIVE_UNAVAILABLE");
    }
}
