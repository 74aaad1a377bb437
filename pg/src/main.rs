//! Protogen - natural-language commands for the level editor
//!
//! CLI entry point: one-shot pipeline runs, routing inspection, and the local
//! command endpoint.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use eyre::{Context, Result};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use protogen::cli::{Cli, Command, generate_after_help};
use protogen::config::Config;
use protogen::ipc::{self, ProtogenClient};
use protogen::pipeline::{self, Orchestrator, RunError};

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("protogen")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > INFO
    let level_str = cli_log_level.or(config_log_level);
    let level = match level_str.map(|s| s.to_uppercase()) {
        Some(s) => match s.as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("protogen.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_for_help = Config::load(None).unwrap_or_default();
    let cmd = Cli::command().after_help(generate_after_help(&config_for_help));
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    info!(provider = %config.llm.provider, model = %config.llm.model, "protogen loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Ask { prompt, scene, pretty }) => {
            debug!("main: matched Ask command");
            cmd_ask(&config, &prompt, scene.as_deref(), pretty).await
        }
        Some(Command::Route { prompt, scene }) => {
            debug!("main: matched Route command");
            cmd_route(&config, &prompt, scene.as_deref()).await
        }
        Some(Command::Serve { socket }) => {
            debug!("main: matched Serve command");
            cmd_serve(&config, socket).await
        }
        Some(Command::Send { prompt, scene, socket }) => {
            debug!("main: matched Send command");
            cmd_send(&config, &prompt, scene.as_deref(), socket).await
        }
        Some(Command::Ping { socket }) => {
            debug!("main: matched Ping command");
            cmd_ping(&config, socket).await
        }
        Some(Command::Stop { socket }) => {
            debug!("main: matched Stop command");
            cmd_stop(&config, socket).await
        }
        None => {
            debug!("main: no command, printing help");
            Cli::command().after_help(generate_after_help(&config)).print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Build a pipeline command, rejecting blank prompts before any backend exists
fn build_command(prompt: &str, scene_path: Option<&Path>) -> Result<pipeline::Command> {
    debug!(?scene_path, "build_command: called");
    let command = pipeline::Command::new(prompt, read_scene(scene_path)?);
    if command.is_blank() {
        return Err(eyre::eyre!(RunError::EmptyPrompt));
    }
    Ok(command)
}

fn read_scene(scene_path: Option<&Path>) -> Result<Option<Value>> {
    let Some(path) = scene_path else {
        return Ok(None);
    };
    let content =
        fs::read_to_string(path).context(format!("Failed to read scene file {}", path.display()))?;
    let scene: Value =
        serde_json::from_str(&content).context(format!("Scene file {} is not valid JSON", path.display()))?;
    Ok(Some(scene))
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<()> {
    let out = if pretty {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .context("Failed to serialize output")?;
    println!("{}", out);
    Ok(())
}

/// Cancel `token` when Ctrl-C arrives
fn cancel_on_ctrl_c(token: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Ctrl-C received, cancelling");
            token.cancel();
        }
    });
}

fn build_orchestrator(config: &Config) -> Result<Orchestrator> {
    config.validate()?;
    Orchestrator::from_config(config)
}

async fn cmd_ask(config: &Config, prompt: &str, scene: Option<&Path>, pretty: bool) -> Result<()> {
    debug!(pretty, "cmd_ask: called");
    let command = build_command(prompt, scene)?;
    let orchestrator = build_orchestrator(config)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let envelope = orchestrator.run(&command, &cancel).await?;
    print_json(&envelope, pretty)
}

async fn cmd_route(config: &Config, prompt: &str, scene: Option<&Path>) -> Result<()> {
    debug!("cmd_route: called");
    let command = build_command(prompt, scene)?;
    let orchestrator = build_orchestrator(config)?;

    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let decision = orchestrator.route(&command, &cancel).await?;
    print_json(&decision, true)
}

async fn cmd_serve(config: &Config, socket: Option<PathBuf>) -> Result<()> {
    debug!(?socket, "cmd_serve: called");
    let orchestrator = Arc::new(build_orchestrator(config)?);
    let socket_path = socket.unwrap_or_else(|| config.server.resolved_socket_path());

    let (listener, socket_path) = ipc::create_listener_at(&socket_path)?;
    println!("Listening on {}", socket_path.display());
    info!(?socket_path, "cmd_serve: listening");

    let shutdown = CancellationToken::new();
    cancel_on_ctrl_c(shutdown.clone());

    let result = ipc::serve(listener, orchestrator, shutdown, config.server.max_request_bytes).await;
    ipc::cleanup_socket(&socket_path);
    println!("Server stopped");
    result
}

fn client_for(config: &Config, socket: Option<PathBuf>) -> ProtogenClient {
    ProtogenClient::with_socket_path(socket.unwrap_or_else(|| config.server.resolved_socket_path()))
}

async fn cmd_send(config: &Config, prompt: &str, scene: Option<&Path>, socket: Option<PathBuf>) -> Result<()> {
    debug!("cmd_send: called");
    let command = build_command(prompt, scene)?;
    let client = client_for(config, socket);
    if !client.socket_exists() {
        return Err(eyre::eyre!("No server is listening. Start one with `pg serve`."));
    }
    let envelope = client.send_command(&command).await?;
    print_json(&envelope, false)
}

async fn cmd_ping(config: &Config, socket: Option<PathBuf>) -> Result<()> {
    debug!("cmd_ping: called");
    let client = client_for(config, socket);
    let version = client.ping().await.context("Server is not responding")?;
    println!("Server is alive (version {})", version);
    Ok(())
}

async fn cmd_stop(config: &Config, socket: Option<PathBuf>) -> Result<()> {
    debug!("cmd_stop: called");
    let client = client_for(config, socket);
    if !client.socket_exists() {
        println!("Server is not running");
        return Ok(());
    }
    client.shutdown().await?;
    println!("Server stopping");
    Ok(())
}
