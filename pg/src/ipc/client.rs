//! IPC client for talking to a running `pg serve`

use std::path::PathBuf;
use std::time::Duration;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::UnixStream;
use tracing::debug;

use super::get_socket_path;
use super::messages::{Request, Response};
use crate::pipeline::{Command, ResponseEnvelope};

/// Default timeout for IPC operations
///
/// Generous because a bundle makes several backend calls in a row.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

/// Client for the command endpoint
#[derive(Debug, Clone)]
pub struct ProtogenClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl Default for ProtogenClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ProtogenClient {
    /// Create a new client with the default socket path
    pub fn new() -> Self {
        Self {
            socket_path: get_socket_path(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Create a client with a custom socket path
    pub fn with_socket_path(socket_path: PathBuf) -> Self {
        Self {
            socket_path,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set a custom timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check if the server socket exists
    pub fn socket_exists(&self) -> bool {
        self.socket_path.exists()
    }

    /// Run one command on the server and return its envelope
    pub async fn send_command(&self, command: &Command) -> Result<ResponseEnvelope> {
        debug!(prompt_len = command.text.len(), "ProtogenClient::send_command: called");
        let response = self.send_request(Request::from(command.clone())).await?;
        match response {
            Response::Envelope { envelope } => Ok(envelope),
            Response::Error { message } => Err(eyre::eyre!("Server error: {}", message)),
            _ => Err(eyre::eyre!("Unexpected response")),
        }
    }

    /// Check if the server is alive and get its version
    pub async fn ping(&self) -> Result<String> {
        debug!("ProtogenClient::ping: called");
        let response = self.send_request(Request::Ping).await?;
        match response {
            Response::Pong { version } => Ok(version),
            Response::Error { message } => Err(eyre::eyre!("Server error: {}", message)),
            _ => Err(eyre::eyre!("Unexpected response")),
        }
    }

    /// Request the server to shut down
    pub async fn shutdown(&self) -> Result<()> {
        debug!("ProtogenClient::shutdown: called");
        let response = self.send_request(Request::Shutdown).await?;
        match response {
            Response::Ok => Ok(()),
            Response::Error { message } => Err(eyre::eyre!("Server error: {}", message)),
            _ => Err(eyre::eyre!("Unexpected response")),
        }
    }

    async fn send_request(&self, request: Request) -> Result<Response> {
        debug!(?self.socket_path, "ProtogenClient::send_request: called");

        let stream = tokio::time::timeout(self.timeout, UnixStream::connect(&self.socket_path))
            .await
            .context("Connection timeout")?
            .context("Failed to connect to protogen socket")?;

        self.send_on_stream(stream, request).await
    }

    async fn send_on_stream(&self, mut stream: UnixStream, request: Request) -> Result<Response> {
        let request_json = serde_json::to_string(&request).context("Failed to serialize request")?;

        tokio::time::timeout(self.timeout, async {
            stream
                .write_all(request_json.as_bytes())
                .await
                .context("Failed to write request")?;
            stream.write_all(b"\n").await.context("Failed to write newline")?;
            stream.flush().await.context("Failed to flush stream")?;
            Ok::<_, eyre::Error>(())
        })
        .await
        .context("Write timeout")??;

        let mut reader = BufReader::new(&mut stream);
        let mut response_line = String::new();

        tokio::time::timeout(self.timeout, reader.read_line(&mut response_line))
            .await
            .context("Read timeout")?
            .context("Failed to read response")?;

        if response_line.trim().is_empty() {
            return Err(eyre::eyre!("Server closed the connection without responding"));
        }

        let response: Response =
            serde_json::from_str(response_line.trim()).context("Failed to parse server response")?;

        debug!("ProtogenClient::send_on_stream: received response");
        Ok(response)
    }
}
