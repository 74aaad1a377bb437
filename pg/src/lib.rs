//! Protogen - natural-language command pipeline for a 2D level editor
//!
//! A prompt plus the editor's current scene goes in; one response envelope
//! comes out: scene-edit operations, advice text, a generated asset, a
//! generated script, or a bundle of those.
//!
//! # Modules
//!
//! - [`pipeline`] - Router, plan/synthesis stages, agents, sanitizer, validator, orchestrator
//! - [`llm`] - Completion backend trait and HTTP clients
//! - [`image`] - Image backend trait and HTTP client
//! - [`prompts`] - Prompt templates
//! - [`ipc`] - Local command endpoint
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface

pub mod cli;
pub mod config;
pub mod image;
pub mod ipc;
pub mod llm;
pub mod pipeline;
pub mod prompts;

pub use config::{Config, ImageConfig, LlmConfig, PipelineConfig, ServerConfig};
pub use image::{ImageClient, ImageError, ImageRequest, create_image_client};
pub use llm::{CompletionRequest, CompletionResponse, LlmClient, LlmError, create_client};
pub use pipeline::{Command, Orchestrator, ResponseEnvelope, RoutingDecision, RunError};
pub use prompts::{PromptContext, PromptLoader, Template};
