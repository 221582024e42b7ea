//! gpi-call: one-shot request tool for the process-interface host.
//!
//! Either build a request from `--method`/`--params`, or send a raw
//! envelope with `--request-json`. Prints the response as one JSON line.

use anyhow::{bail, Context, Result};
use clap::Parser;
use serde_json::{json, Value};
use uuid::Uuid;

use gpid_client::{request, ClientBackend};

#[derive(Parser, Debug)]
#[command(name = "gpi-call", version)]
#[command(about = "Send one request to a process-interface host")]
struct Cli {
    /// Endpoint to connect to (socket path for uds, host:port for tcp)
    #[arg(long)]
    ipc_endpoint: String,

    /// Transport backend: uds or tcp
    #[arg(long, default_value = "uds")]
    backend: String,

    /// Method to call (ignored when --request-json is given)
    #[arg(long)]
    method: Option<String>,

    /// Params object as JSON text
    #[arg(long)]
    params: Option<String>,

    /// Full request envelope as JSON text
    #[arg(long)]
    request_json: Option<String>,
}

fn build_payload(cli: &Cli) -> Result<Value> {
    if let Some(raw) = &cli.request_json {
        let mut payload: Value =
            serde_json::from_str(raw).context("--request-json is not valid JSON")?;
        if !payload.is_object() {
            bail!("--request-json must be a JSON object");
        }
        if payload.get("id").is_none() {
            payload["id"] = json!(Uuid::new_v4().to_string());
        }
        return Ok(payload);
    }

    let Some(method) = &cli.method else {
        bail!("either --method or --request-json is required");
    };

    let params: Value = match &cli.params {
        Some(raw) => serde_json::from_str(raw).context("--params is not valid JSON")?,
        None => json!({}),
    };
    if !params.is_object() {
        bail!("--params must be a JSON object");
    }

    Ok(json!({
        "id": Uuid::new_v4().to_string(),
        "method": method,
        "params": params,
    }))
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let Some(backend) = ClientBackend::from_tag(&cli.backend) else {
        bail!("unsupported backend: {}", cli.backend);
    };

    let payload = build_payload(&cli)?;
    let response = request(backend, &cli.ipc_endpoint, &payload).await?;
    println!("{response}");

    Ok(())
}
