//! One-shot line-protocol client for the process-interface host.
//!
//! Sends a single JSON request line over a unix socket or TCP connection
//! and returns the host's response line, parsed.

use anyhow::{bail, Context, Result};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
#[cfg(unix)]
use tokio::net::UnixStream;

/// Client-side transport selection, matching the host profile's `ipc.backend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientBackend {
    Uds,
    Tcp,
}

impl ClientBackend {
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "uds" => Some(Self::Uds),
            "tcp" => Some(Self::Tcp),
            _ => None,
        }
    }
}

async fn round_trip<S>(stream: S, payload: &Value) -> Result<Value>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let (reader, mut writer) = tokio::io::split(stream);

    let mut request_line = payload.to_string();
    request_line.push('\n');
    writer
        .write_all(request_line.as_bytes())
        .await
        .context("sending request")?;

    let mut response_line = String::new();
    BufReader::new(reader)
        .read_line(&mut response_line)
        .await
        .context("reading response")?;

    let trimmed = response_line.trim();
    if trimmed.is_empty() {
        bail!("host closed the connection without a response");
    }

    serde_json::from_str(trimmed).context("parsing response")
}

/// Performs one request/response exchange against `endpoint`.
pub async fn request(backend: ClientBackend, endpoint: &str, payload: &Value) -> Result<Value> {
    match backend {
        ClientBackend::Uds => {
            #[cfg(unix)]
            {
                let stream = UnixStream::connect(endpoint)
                    .await
                    .with_context(|| format!("connecting to {endpoint}"))?;
                round_trip(stream, payload).await
            }
            #[cfg(not(unix))]
            {
                let _ = endpoint;
                bail!("uds backend requires a unix platform");
            }
        }
        ClientBackend::Tcp => {
            let stream = TcpStream::connect(endpoint)
                .await
                .with_context(|| format!("connecting to {endpoint}"))?;
            round_trip(stream, payload).await
        }
    }
}
