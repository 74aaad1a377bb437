//! Protogen configuration types and loading

use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[serde(rename = "log-level")]
    pub log_level: Option<String>,

    /// Completion backend configuration
    pub llm: LlmConfig,

    /// Image generation backend configuration
    pub image: ImageConfig,

    /// Pipeline tuning
    pub pipeline: PipelineConfig,

    /// Command endpoint configuration
    pub server: ServerConfig,
}

impl Config {
    /// Validate configuration before use
    ///
    /// Checks that the API key environment variables are set so startup fails
    /// with a clear message instead of on the first request.
    pub fn validate(&self) -> Result<()> {
        debug!("Config::validate: called");
        if self.llm.api_key().is_none() {
            return Err(eyre::eyre!(
                "LLM API key not found. Set the {} environment variable.",
                self.llm.api_key_env
            ));
        }
        if self.image.api_key().is_none() {
            return Err(eyre::eyre!(
                "Image API key not found. Set the {} environment variable.",
                self.image.api_key_env
            ));
        }
        Ok(())
    }

    /// Load configuration with fallback chain
    ///
    /// 1. Explicit path (errors are fatal)
    /// 2. `./.protogen.yml`
    /// 3. `~/.config/protogen/protogen.yml`
    /// 4. Built-in defaults
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        if let Some(path) = config_path {
            return Self::load_from_file(path).context(format!("Failed to load config from {}", path.display()));
        }

        for candidate in Self::default_locations() {
            if candidate.exists() {
                match Self::load_from_file(&candidate) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        tracing::warn!("Failed to load config from {}: {}", candidate.display(), e);
                    }
                }
            }
        }

        tracing::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    /// Read only the log level, before logging is initialized
    ///
    /// Errors are swallowed here; the full load reports them once logging is up.
    pub fn load_log_level(config_path: Option<&PathBuf>) -> Option<String> {
        let candidates = match config_path {
            Some(path) => vec![path.clone()],
            None => Self::default_locations(),
        };
        candidates
            .into_iter()
            .find(|p| p.exists())
            .and_then(|p| fs::read_to_string(p).ok())
            .and_then(|content| serde_yaml::from_str::<Self>(&content).ok())
            .and_then(|config| config.log_level)
    }

    fn default_locations() -> Vec<PathBuf> {
        let mut locations = vec![PathBuf::from(".protogen.yml")];
        if let Some(config_dir) = dirs::config_dir() {
            locations.push(config_dir.join("protogen").join("protogen.yml"));
        }
        locations
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path).context("Failed to read config file")?;

        let config: Self = serde_yaml::from_str(&content).context("Failed to parse config file")?;

        tracing::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}

/// Completion backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Provider name ("openai" or "anthropic")
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Maximum tokens per response
    #[serde(rename = "max-tokens")]
    pub max_tokens: u32,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl LlmConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-5-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            max_tokens: 16384,
            timeout_ms: 300_000,
        }
    }
}

/// Image generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageConfig {
    /// Provider name (currently only "openai" supported)
    pub provider: String,

    /// Model identifier
    pub model: String,

    /// Environment variable containing the API key
    #[serde(rename = "api-key-env")]
    pub api_key_env: String,

    /// API base URL
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Output size, e.g. "1024x1024"
    pub size: String,

    /// Output quality ("low", "medium", "high")
    pub quality: String,

    /// Request timeout in milliseconds
    #[serde(rename = "timeout-ms")]
    pub timeout_ms: u64,
}

impl ImageConfig {
    /// Read the API key from the configured environment variable
    pub fn api_key(&self) -> Option<String> {
        read_key(&self.api_key_env)
    }
}

impl Default for ImageConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            model: "gpt-image-1".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            base_url: "https://api.openai.com".to_string(),
            size: "1024x1024".to_string(),
            quality: "medium".to_string(),
            timeout_ms: 300_000,
        }
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Token cap for the routing call
    #[serde(rename = "router-max-tokens")]
    pub router_max_tokens: u32,

    /// Token cap for plan, synthesis, advice and script calls
    #[serde(rename = "stage-max-tokens")]
    pub stage_max_tokens: u32,

    /// Run independent bundle agents concurrently
    #[serde(rename = "parallel-bundle")]
    pub parallel_bundle: bool,

    /// Directory searched for prompt template overrides
    #[serde(rename = "prompt-dir")]
    pub prompt_dir: PathBuf,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            router_max_tokens: 512,
            stage_max_tokens: 4096,
            parallel_bundle: true,
            prompt_dir: PathBuf::from(".protogen/prompts"),
        }
    }
}

/// Command endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket path (defaults to the runtime directory)
    #[serde(rename = "socket-path")]
    pub socket_path: Option<PathBuf>,

    /// Largest accepted request line, in bytes
    #[serde(rename = "max-request-bytes")]
    pub max_request_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            socket_path: None,
            max_request_bytes: 1024 * 1024,
        }
    }
}

impl ServerConfig {
    /// Configured socket path, or the default one
    pub fn resolved_socket_path(&self) -> PathBuf {
        self.socket_path.clone().unwrap_or_else(crate::ipc::get_socket_path)
    }
}

fn read_key(env_name: &str) -> Option<String> {
    std::env::var(env_name).ok().filter(|k| !k.trim().is_empty())
}
