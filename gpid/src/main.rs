//! gpid: the generic process-interface host daemon.
//!
//! Loads a host profile, binds the configured IPC transport and answers the
//! seven interface methods until stopped.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info};

use gpid::{bind_and_serve, handle_line, load_host_profile, HostContext, RequestHandler};

#[derive(Parser, Debug)]
#[command(name = "gpid", version)]
#[command(about = "Generic process-interface host daemon")]
struct Cli {
    /// Repository root the per-app specs, catalogs and records live under
    #[arg(long)]
    repo: PathBuf,

    /// Path to the host profile JSON
    #[arg(long)]
    host_config: PathBuf,

    /// Override the profile's IPC endpoint
    #[arg(long)]
    ipc_endpoint: Option<String>,

    /// Enable debug logging
    #[arg(long)]
    debug: bool,
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(stream) => stream,
            Err(_) => {
                let _ = signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = signal::ctrl_c().await;
    }
}

async fn run(cli: Cli) -> Result<()> {
    let profile = load_host_profile(&cli.host_config)
        .with_context(|| format!("loading host profile {}", cli.host_config.display()))?;

    let endpoint = cli
        .ipc_endpoint
        .unwrap_or_else(|| profile.endpoint.clone());

    info!(
        repo = %cli.repo.display(),
        apps = profile.allowed_apps.len(),
        endpoint = %endpoint,
        "gpid {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let context = Arc::new(HostContext::new(
        cli.repo,
        profile.allowed_apps.clone(),
        profile.templates.clone(),
    ));
    let handler: RequestHandler = {
        let context = context.clone();
        Arc::new(move |line: String| handle_line(&context, &line))
    };

    tokio::select! {
        result = bind_and_serve(profile.backend, &endpoint, handler) => {
            result.context("transport failure")?;
        }
        _ = shutdown_signal() => {
            info!("shutdown signal received");
        }
    }

    Ok(())
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run(cli).await {
        error!("{err:#}");
        std::process::exit(2);
    }
}
