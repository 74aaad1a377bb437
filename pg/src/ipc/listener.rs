//! IPC listener for the server side
//!
//! Socket setup helpers plus the accept loop that runs commands through the
//! orchestrator.

use std::path::PathBuf;
use std::sync::Arc;

use eyre::{Context, Result};
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::messages::{Request, Response};
use crate::pipeline::{Command, Orchestrator, RunError};

/// Create and bind a Unix Domain Socket listener
///
/// Handles cleanup of stale socket files from previous runs.
pub fn create_listener_at(socket_path: &PathBuf) -> Result<(UnixListener, PathBuf)> {
    debug!(?socket_path, "create_listener_at: called");

    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent).context("Failed to create socket directory")?;
    }

    if socket_path.exists() {
        debug!(?socket_path, "create_listener_at: removing stale socket");
        std::fs::remove_file(socket_path).context("Failed to remove stale socket")?;
    }

    let listener = UnixListener::bind(socket_path).context("Failed to bind IPC socket")?;
    debug!(?socket_path, "create_listener_at: socket bound successfully");

    Ok((listener, socket_path.clone()))
}

/// Remove the socket file on shutdown
pub fn cleanup_socket(socket_path: &PathBuf) {
    if socket_path.exists() {
        debug!(?socket_path, "cleanup_socket: removing socket file");
        if let Err(e) = std::fs::remove_file(socket_path) {
            warn!(?socket_path, error = %e, "Failed to remove socket file");
        }
    }
}

/// Read one request line, refusing lines longer than `max_bytes`
pub async fn read_request(stream: &mut UnixStream, max_bytes: usize) -> Result<Request> {
    debug!(max_bytes, "read_request: called");
    let limit = u64::try_from(max_bytes).unwrap_or(u64::MAX).saturating_add(1);
    let mut reader = BufReader::new(stream.take(limit));
    let mut line = String::new();

    let bytes_read = reader
        .read_line(&mut line)
        .await
        .context("Failed to read IPC request")?;

    if bytes_read > max_bytes {
        return Err(eyre::eyre!("Request too large: more than {} bytes", max_bytes));
    }

    if line.trim().is_empty() {
        return Err(eyre::eyre!("Empty request received"));
    }

    let request: Request = serde_json::from_str(line.trim()).context("Failed to parse IPC request")?;
    debug!(?request, "read_request: parsed request");

    Ok(request)
}

/// Send a response on the stream
pub async fn send_response(stream: &mut UnixStream, response: &Response) -> Result<()> {
    let response_json = serde_json::to_string(response).context("Failed to serialize response")?;
    stream
        .write_all(response_json.as_bytes())
        .await
        .context("Failed to write response")?;
    stream.write_all(b"\n").await.context("Failed to write newline")?;
    stream.flush().await.context("Failed to flush response")?;
    debug!(kind = response_type(response), "send_response: sent response");
    Ok(())
}

/// Accept connections until `shutdown` is cancelled
///
/// Every connection runs on its own task. A command gets a child token of
/// `shutdown`, so stopping the server aborts whatever is still in flight.
pub async fn serve(
    listener: UnixListener,
    orchestrator: Arc<Orchestrator>,
    shutdown: CancellationToken,
    max_request_bytes: usize,
) -> Result<()> {
    info!("serve: accepting commands");
    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                info!("serve: shutdown requested");
                break;
            }
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, _)) => {
                        debug!("serve: connection accepted");
                        let orchestrator = orchestrator.clone();
                        let shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, &orchestrator, &shutdown, max_request_bytes).await {
                                warn!(error = %e, "serve: connection failed");
                            }
                        });
                    }
                    Err(e) => {
                        warn!(error = %e, "serve: accept failed");
                    }
                }
            }
        }
    }
    Ok(())
}

async fn handle_connection(
    mut stream: UnixStream,
    orchestrator: &Orchestrator,
    shutdown: &CancellationToken,
    max_request_bytes: usize,
) -> Result<()> {
    debug!("handle_connection: called");
    let request = match read_request(&mut stream, max_request_bytes).await {
        Ok(request) => request,
        Err(e) => {
            warn!(error = %e, "handle_connection: bad request");
            return send_response(&mut stream, &Response::error(format!("{:#}", e))).await;
        }
    };

    let response = match request {
        Request::Ping => {
            debug!("handle_connection: matched Ping");
            Response::Pong {
                version: env!("GIT_DESCRIBE").to_string(),
            }
        }
        Request::Shutdown => {
            debug!("handle_connection: matched Shutdown");
            send_response(&mut stream, &Response::Ok).await?;
            shutdown.cancel();
            return Ok(());
        }
        Request::Command { prompt, scene } => {
            debug!("handle_connection: matched Command");
            let command = Command::new(prompt, scene);
            let cancel = shutdown.child_token();
            run_command(orchestrator, &command, &cancel).await
        }
    };

    send_response(&mut stream, &response).await
}

async fn run_command(orchestrator: &Orchestrator, command: &Command, cancel: &CancellationToken) -> Response {
    match orchestrator.run(command, cancel).await {
        Ok(envelope) => Response::Envelope { envelope },
        Err(RunError::EmptyPrompt) => Response::error(RunError::EmptyPrompt.to_string()),
        Err(RunError::Cancelled) => {
            info!("run_command: command cancelled");
            Response::error(RunError::Cancelled.to_string())
        }
    }
}

fn response_type(response: &Response) -> &'static str {
    match response {
        Response::Envelope { .. } => "Envelope",
        Response::Pong { .. } => "Pong",
        Response::Ok => "Ok",
        Response::Error { .. } => "Error",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::image::ScriptedImageClient;
    use crate::ipc::ProtogenClient;
    use crate::llm::ScriptedLlmClient;
    use crate::pipeline::ResponseEnvelope;
    use crate::prompts::PromptLoader;
    use std::time::Duration;
    use tempfile::TempDir;

    fn orchestrator(llm: Arc<ScriptedLlmClient>) -> Arc<Orchestrator> {
        let config = PipelineConfig {
            parallel_bundle: false,
            ..PipelineConfig::default()
        };
        Arc::new(Orchestrator::new(
            llm,
            Arc::new(ScriptedImageClient::new(vec![])),
            Arc::new(PromptLoader::embedded_only()),
            &config,
        ))
    }

    fn start_server(
        socket_path: &PathBuf,
        llm: Arc<ScriptedLlmClient>,
        max_request_bytes: usize,
    ) -> (CancellationToken, tokio::task::JoinHandle<Result<()>>) {
        let (listener, _) = create_listener_at(socket_path).unwrap();
        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(serve(listener, orchestrator(llm), shutdown.clone(), max_request_bytes));
        (shutdown, handle)
    }

    #[tokio::test]
    async fn test_create_listener_creates_parent_dir() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("subdir").join("protogen.sock");

        let (_, path) = create_listener_at(&socket_path).unwrap();
        assert_eq!(path, socket_path);
        assert!(socket_path.exists());
    }

    #[tokio::test]
    async fn test_create_listener_removes_stale_socket() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("protogen.sock");
        std::fs::write(&socket_path, "stale").unwrap();

        assert!(create_listener_at(&socket_path).is_ok());
    }

    #[test]
    fn test_cleanup_socket_removes_file() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("protogen.sock");
        std::fs::write(&socket_path, "test").unwrap();

        cleanup_socket(&socket_path);
        assert!(!socket_path.exists());
    }

    #[test]
    fn test_cleanup_socket_handles_missing_file() {
        let temp = TempDir::new().unwrap();
        cleanup_socket(&temp.path().join("nonexistent.sock"));
    }

    #[tokio::test]
    async fn test_ping_pong() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("test.sock");
        let (shutdown, handle) = start_server(&socket_path, Arc::new(ScriptedLlmClient::new(vec![])), 1024);

        let client = ProtogenClient::with_socket_path(socket_path);
        let version = client.ping().await.unwrap();
        assert_eq!(version, env!("GIT_DESCRIBE"));

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_command_runs_pipeline() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("test.sock");
        let llm = Arc::new(ScriptedLlmClient::with_texts([
            r#"{"agents":["design_qa"],"reason":"question"}"#,
            "Keep jump height near three tiles.",
        ]));
        let (shutdown, handle) = start_server(&socket_path, llm.clone(), 1024 * 1024);

        let client = ProtogenClient::with_socket_path(socket_path);
        let envelope = client.send_command(&Command::new("how high should I jump?", None)).await.unwrap();
        assert_eq!(envelope, ResponseEnvelope::text("Keep jump height near three tiles."));
        assert_eq!(llm.call_count(), 2);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_empty_prompt_is_rejected_without_backend_calls() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("test.sock");
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let (shutdown, handle) = start_server(&socket_path, llm.clone(), 1024);

        let client = ProtogenClient::with_socket_path(socket_path);
        let err = client.send_command(&Command::new("   ", None)).await.unwrap_err();
        assert!(err.to_string().contains("prompt is empty"));
        assert_eq!(llm.call_count(), 0);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_oversized_request_gets_error() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("test.sock");
        let llm = Arc::new(ScriptedLlmClient::new(vec![]));
        let (shutdown, handle) = start_server(&socket_path, llm.clone(), 64);

        let client = ProtogenClient::with_socket_path(socket_path);
        let long_prompt = "x".repeat(500);
        let err = client.send_command(&Command::new(long_prompt, None)).await.unwrap_err();
        assert!(err.to_string().contains("too large"));
        assert_eq!(llm.call_count(), 0);

        shutdown.cancel();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_stops_server() {
        let temp = TempDir::new().unwrap();
        let socket_path = temp.path().join("test.sock");
        let (shutdown, handle) = start_server(&socket_path, Arc::new(ScriptedLlmClient::new(vec![])), 1024);

        let client = ProtogenClient::with_socket_path(socket_path);
        client.shutdown().await.unwrap();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        assert!(shutdown.is_cancelled());
    }
}
