//! IPC transports.
//!
//! Both backends speak the same framing: one JSON object per line, one
//! response line per request. Each accepted connection runs in its own
//! task; the (blocking) request handler runs on the blocking pool so probe
//! and subprocess work never stalls the accept loop.

use std::io;
#[cfg(unix)]
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
#[cfg(unix)]
use tokio::net::UnixListener;
use tracing::{info, warn};

use crate::profile::IpcBackendKind;

/// Maps one request line to one response line.
pub type RequestHandler = Arc<dyn Fn(String) -> String + Send + Sync>;

#[async_trait]
pub trait IpcListener: Send {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    async fn accept(&mut self) -> io::Result<Self::Stream>;
}

#[cfg(unix)]
pub struct UnixIpcListener {
    inner: UnixListener,
}

#[cfg(unix)]
impl UnixIpcListener {
    pub async fn bind(endpoint: &str) -> io::Result<Self> {
        if let Some(parent) = Path::new(endpoint).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let _ = std::fs::remove_file(endpoint);
        Ok(Self {
            inner: UnixListener::bind(endpoint)?,
        })
    }
}

#[cfg(unix)]
#[async_trait]
impl IpcListener for UnixIpcListener {
    type Stream = tokio::net::UnixStream;

    async fn accept(&mut self) -> io::Result<Self::Stream> {
        let (stream, _addr) = self.inner.accept().await?;
        Ok(stream)
    }
}

pub struct TcpIpcListener {
    inner: TcpListener,
}

impl TcpIpcListener {
    pub async fn bind(endpoint: &str) -> io::Result<Self> {
        Ok(Self {
            inner: TcpListener::bind(endpoint).await?,
        })
    }
}

#[async_trait]
impl IpcListener for TcpIpcListener {
    type Stream = tokio::net::TcpStream;

    async fn accept(&mut self) -> io::Result<Self::Stream> {
        let (stream, _addr) = self.inner.accept().await?;
        Ok(stream)
    }
}

async fn handle_connection<S>(stream: S, handler: RequestHandler) -> io::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (reader, mut writer) = tokio::io::split(stream);
    let mut buf_reader = BufReader::new(reader);
    let mut line = String::new();

    loop {
        line.clear();
        if buf_reader.read_line(&mut line).await? == 0 {
            break;
        }

        let raw = line.trim();
        if raw.is_empty() {
            continue;
        }

        let handler = handler.clone();
        let request = raw.to_string();
        let response = tokio::task::spawn_blocking(move || handler(request))
            .await
            .unwrap_or_else(|_| {
                r#"{"ok":false,"error":{"code":"E_INTERNAL","message":"request handler panicked","details":{}}}"#.to_string()
            });

        writer.write_all(response.as_bytes()).await?;
        writer.write_all(b"\n").await?;
    }

    Ok(())
}

/// Accepts connections forever, one task per connection.
pub async fn serve<L: IpcListener>(mut listener: L, handler: RequestHandler) -> io::Result<()> {
    loop {
        let stream = listener.accept().await?;
        let handler = handler.clone();
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, handler).await {
                warn!("connection error: {err}");
            }
        });
    }
}

/// Binds the configured backend and runs the accept loop.
pub async fn bind_and_serve(
    kind: IpcBackendKind,
    endpoint: &str,
    handler: RequestHandler,
) -> io::Result<()> {
    match kind {
        IpcBackendKind::Uds => {
            #[cfg(unix)]
            {
                let listener = UnixIpcListener::bind(endpoint).await?;
                info!(endpoint, "listening on unix socket");
                serve(listener, handler).await
            }
            #[cfg(not(unix))]
            {
                let _ = endpoint;
                Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "uds backend requires a unix platform",
                ))
            }
        }
        IpcBackendKind::Tcp => {
            let listener = TcpIpcListener::bind(endpoint).await?;
            info!(endpoint, "listening on tcp");
            serve(listener, handler).await
        }
    }
}
