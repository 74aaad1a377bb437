//! Command routing
//!
//! Classifies a command into 1 to 3 agents. The backend's answer is untrusted,
//! so `post_process` enforces the decision invariants whatever it returns.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::complete_text;
use super::command::Command;
use super::error::PipelineError;
use super::sanitize::sanitize_json;
use crate::llm::LlmClient;
use crate::prompts::{PromptContext, PromptLoader, Template};

/// Largest number of agents one command may fan out to
pub const MAX_AGENTS: usize = 3;

/// The specialized handlers a command can be routed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    SceneEdit,
    DesignQa,
    AssetGen,
    ScriptGen,
}

impl AgentKind {
    pub const ALL: [AgentKind; 4] = [
        AgentKind::SceneEdit,
        AgentKind::DesignQa,
        AgentKind::AssetGen,
        AgentKind::ScriptGen,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AgentKind::SceneEdit => "scene_edit",
            AgentKind::DesignQa => "design_qa",
            AgentKind::AssetGen => "asset_gen",
            AgentKind::ScriptGen => "script_gen",
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        AgentKind::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| PipelineError::UnknownAgent(wanted.to_string()))
    }
}

/// What kind of image `asset_gen` should produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetMode {
    /// Single cutout subject on a transparent background
    Sprite,
    /// Opaque, seamless material filling the canvas
    Texture,
}

impl AssetMode {
    fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sprite" => Some(AssetMode::Sprite),
            "texture" => Some(AssetMode::Texture),
            _ => None,
        }
    }
}

/// Router output
///
/// `agents` holds 1 to 3 unique kinds in execution order; `asset_mode` is
/// present exactly when `asset_gen` is one of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingDecision {
    pub agents: Vec<AgentKind>,
    #[serde(rename = "assetMode", default, skip_serializing_if = "Option::is_none")]
    pub asset_mode: Option<AssetMode>,
    #[serde(default)]
    pub reason: String,
}

impl RoutingDecision {
    /// Decision for a single agent with no asset mode
    pub fn single(agent: AgentKind, reason: impl Into<String>) -> Self {
        let asset_mode = (agent == AgentKind::AssetGen).then_some(AssetMode::Texture);
        Self {
            agents: vec![agent],
            asset_mode,
            reason: reason.into(),
        }
    }

    /// Used when the classification backend cannot be reached
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::single(AgentKind::DesignQa, reason)
    }

    pub fn is_bundle(&self) -> bool {
        self.agents.len() > 1
    }
}

/// Enforce the decision invariants on raw backend text
pub fn post_process(raw: &str) -> RoutingDecision {
    debug!(raw_len = raw.len(), "post_process: called");
    let value: Value = match serde_json::from_str(&sanitize_json(raw)) {
        Ok(v) => v,
        Err(e) => {
            warn!(error = %e, "post_process: unparseable routing response, defaulting to scene_edit");
            return RoutingDecision::single(AgentKind::SceneEdit, "routing response was not valid JSON");
        }
    };

    let mut agents: Vec<AgentKind> = Vec::new();
    for entry in value.get("agents").and_then(Value::as_array).into_iter().flatten() {
        let Some(name) = entry.as_str().map(str::trim).filter(|s| !s.is_empty()) else {
            continue;
        };
        match name.parse::<AgentKind>() {
            Ok(kind) if !agents.contains(&kind) => agents.push(kind),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "post_process: dropping agent"),
        }
    }
    agents.truncate(MAX_AGENTS);

    if agents.is_empty() {
        debug!("post_process: no usable agents, defaulting to scene_edit");
        return RoutingDecision::single(AgentKind::SceneEdit, "no agents selected");
    }

    let asset_mode = if agents.contains(&AgentKind::AssetGen) {
        let declared = ["asset_mode", "assetMode"]
            .iter()
            .find_map(|key| value.get(*key).and_then(Value::as_str).and_then(AssetMode::parse));
        Some(declared.unwrap_or(AssetMode::Texture))
    } else {
        None
    };

    let reason = value
        .get("reason")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .trim()
        .to_string();

    RoutingDecision {
        agents,
        asset_mode,
        reason,
    }
}

/// Classifies commands through the completion backend
pub struct Router {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl Router {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    /// Classify a command
    ///
    /// Backend failures surface as `RouterUnavailable`; any reply, however
    /// garbled, yields a valid decision.
    pub async fn route(&self, command: &Command, cancel: &CancellationToken) -> Result<RoutingDecision, PipelineError> {
        debug!("Router::route: called");
        let system = self.prompts.load(Template::Router)?;
        let user = self
            .prompts
            .render(Template::RouterInput, &PromptContext::command(&command.text, command.scene_json()))?;

        let raw = match complete_text(self.llm.as_ref(), system, user, self.max_tokens, cancel).await {
            Ok(raw) => raw,
            Err(PipelineError::Backend(e)) => return Err(PipelineError::RouterUnavailable(e.to_string())),
            Err(e) => return Err(e),
        };

        let decision = post_process(&raw);
        info!(agents = ?decision.agents, asset_mode = ?decision.asset_mode, "Router::route: decided");
        Ok(decision)
    }
}
