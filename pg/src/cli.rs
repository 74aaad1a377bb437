//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Config;

/// Protogen - natural-language commands for the level editor
#[derive(Parser)]
#[command(
    name = "pg",
    about = "Turns natural-language prompts into level-editor operations, assets and scripts",
    version = env!("GIT_DESCRIBE"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run one prompt through the pipeline and print the envelope
    Ask {
        /// The natural-language command
        prompt: String,

        /// JSON file describing the current scene
        #[arg(short, long)]
        scene: Option<PathBuf>,

        /// Pretty-print the envelope
        #[arg(short, long)]
        pretty: bool,
    },

    /// Show which agents a prompt would be routed to
    Route {
        /// The natural-language command
        prompt: String,

        /// JSON file describing the current scene
        #[arg(short, long)]
        scene: Option<PathBuf>,
    },

    /// Serve the command endpoint on a Unix socket
    Serve {
        /// Socket path (overrides config)
        #[arg(long)]
        socket: Option<PathBuf>,
    },

    /// Send a prompt to a running server
    Send {
        /// The natural-language command
        prompt: String,

        /// JSON file describing the current scene
        #[arg(short, long)]
        scene: Option<PathBuf>,

        /// Socket path (overrides config)
        #[arg(long)]
        socket: Option<PathBuf>,
    },

    /// Check if a server is alive
    Ping {
        /// Socket path (overrides config)
        #[arg(long)]
        socket: Option<PathBuf>,
    },

    /// Stop a running server
    Stop {
        /// Socket path (overrides config)
        #[arg(long)]
        socket: Option<PathBuf>,
    },
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("protogen")
        .join("logs")
        .join("protogen.log")
}

/// Generate the after_help text with backend key checks and the log path
pub fn generate_after_help(config: &Config) -> String {
    debug!("generate_after_help: called");
    let mut help = String::new();

    help.push_str("Backends:\n");
    let backends = [
        ("llm", &config.llm.provider, &config.llm.api_key_env, config.llm.api_key().is_some()),
        (
            "image",
            &config.image.provider,
            &config.image.api_key_env,
            config.image.api_key().is_some(),
        ),
    ];
    for (role, provider, key_env, has_key) in backends {
        let icon = if has_key { "\u{2705}" } else { "\u{274C}" };
        help.push_str(&format!("  {} {:<6} {:<10} {}\n", icon, role, provider, key_env));
    }

    help.push('\n');
    help.push_str(&format!(
        "Socket: {}\n",
        config.server.resolved_socket_path().display()
    ));
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));

    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["pg"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_cli_parse_ask() {
        let cli = Cli::parse_from(["pg", "ask", "add a green platform", "--pretty"]);
        match cli.command {
            Some(Command::Ask { prompt, scene, pretty }) => {
                assert_eq!(prompt, "add a green platform");
                assert!(scene.is_none());
                assert!(pretty);
            }
            _ => panic!("Expected Ask command"),
        }
    }

    #[test]
    fn test_cli_parse_route_with_scene() {
        let cli = Cli::parse_from(["pg", "route", "make it red", "-s", "scene.json"]);
        match cli.command {
            Some(Command::Route { prompt, scene }) => {
                assert_eq!(prompt, "make it red");
                assert_eq!(scene, Some(PathBuf::from("scene.json")));
            }
            _ => panic!("Expected Route command"),
        }
    }

    #[test]
    fn test_cli_parse_serve_with_socket() {
        let cli = Cli::parse_from(["pg", "serve", "--socket", "/tmp/pg.sock"]);
        assert!(matches!(
            cli.command,
            Some(Command::Serve { socket: Some(ref p) }) if p == &PathBuf::from("/tmp/pg.sock")
        ));
    }

    #[test]
    fn test_cli_parse_ping_and_stop() {
        assert!(matches!(
            Cli::parse_from(["pg", "ping"]).command,
            Some(Command::Ping { socket: None })
        ));
        assert!(matches!(
            Cli::parse_from(["pg", "stop"]).command,
            Some(Command::Stop { socket: None })
        ));
    }

    #[test]
    fn test_cli_with_config_and_log_level() {
        let cli = Cli::parse_from(["pg", "-c", "/path/to/protogen.yml", "-l", "debug", "ping"]);
        assert_eq!(cli.config, Some(PathBuf::from("/path/to/protogen.yml")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn test_after_help_lists_backends() {
        let help = generate_after_help(&Config::default());
        assert!(help.contains("Backends:"));
        assert!(help.contains("OPENAI_API_KEY"));
        assert!(help.contains("protogen.log"));
    }
}
