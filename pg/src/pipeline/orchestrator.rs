//! Top-level pipeline state machine
//!
//! `Routing → SingleAgent | Bundle → Done`. Agent failures become `text`
//! envelopes; the only errors a run can return are `RunError`s.

use std::sync::Arc;

use eyre::{Context, Result};
use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use super::advisor::DesignAdvisor;
use super::assets::AssetGenerator;
use super::command::Command;
use super::envelope::ResponseEnvelope;
use super::error::{PipelineError, RunError};
use super::planner::PlanBuilder;
use super::router::{AgentKind, AssetMode, Router, RoutingDecision};
use super::script::ScriptGenerator;
use super::synthesizer::Synthesizer;
use crate::config::{Config, PipelineConfig};
use crate::image::{ImageClient, create_image_client};
use crate::llm::{LlmClient, create_client};
use crate::prompts::PromptLoader;

/// Sent when the planner found nothing to change
pub const EMPTY_PLAN_MESSAGE: &str = "The plan came back empty; there is nothing to change in the scene.";

#[derive(Debug)]
enum Stage {
    Routing,
    SingleAgent(RoutingDecision),
    Bundle(RoutingDecision),
    Done(ResponseEnvelope),
}

/// Runs commands through routing and the selected agents
pub struct Orchestrator {
    router: Router,
    planner: PlanBuilder,
    synthesizer: Synthesizer,
    advisor: DesignAdvisor,
    assets: AssetGenerator,
    scripts: ScriptGenerator,
    parallel_bundle: bool,
}

impl Orchestrator {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        images: Arc<dyn ImageClient>,
        prompts: Arc<PromptLoader>,
        config: &PipelineConfig,
    ) -> Self {
        debug!(parallel_bundle = config.parallel_bundle, "Orchestrator::new: called");
        let stage_tokens = config.stage_max_tokens;
        Self {
            router: Router::new(llm.clone(), prompts.clone(), config.router_max_tokens),
            planner: PlanBuilder::new(llm.clone(), prompts.clone(), stage_tokens),
            synthesizer: Synthesizer::new(llm.clone(), prompts.clone(), stage_tokens),
            advisor: DesignAdvisor::new(llm.clone(), prompts.clone(), stage_tokens),
            assets: AssetGenerator::new(images, prompts.clone()),
            scripts: ScriptGenerator::new(llm, prompts, stage_tokens),
            parallel_bundle: config.parallel_bundle,
        }
    }

    /// Build the backends named in the config and wire them up
    pub fn from_config(config: &Config) -> Result<Self> {
        debug!("Orchestrator::from_config: called");
        let llm = create_client(&config.llm).context("Failed to create completion client")?;
        let images = create_image_client(&config.image).context("Failed to create image client")?;
        let prompts = Arc::new(PromptLoader::new(&config.pipeline.prompt_dir));
        Ok(Self::new(llm, images, prompts, &config.pipeline))
    }

    /// Run one command to a single envelope
    pub async fn run(&self, command: &Command, cancel: &CancellationToken) -> Result<ResponseEnvelope, RunError> {
        if command.is_blank() {
            debug!("Orchestrator::run: rejecting empty prompt");
            return Err(RunError::EmptyPrompt);
        }

        let request_id = Uuid::now_v7();
        let span = info_span!("pipeline", %request_id);
        self.drive(command, cancel).instrument(span).await
    }

    /// Routing decision only, with the same fallback `run` applies
    pub async fn route(&self, command: &Command, cancel: &CancellationToken) -> Result<RoutingDecision, RunError> {
        if command.is_blank() {
            return Err(RunError::EmptyPrompt);
        }
        self.decide(command, cancel).await
    }

    async fn drive(&self, command: &Command, cancel: &CancellationToken) -> Result<ResponseEnvelope, RunError> {
        info!(prompt_len = command.text.len(), has_scene = command.scene.is_some(), "pipeline started");
        let mut stage = Stage::Routing;
        loop {
            if !matches!(stage, Stage::Done(_)) && cancel.is_cancelled() {
                info!("pipeline cancelled");
                return Err(RunError::Cancelled);
            }

            stage = match stage {
                Stage::Routing => {
                    let decision = self.decide(command, cancel).await?;
                    if decision.is_bundle() {
                        Stage::Bundle(decision)
                    } else {
                        Stage::SingleAgent(decision)
                    }
                }
                Stage::SingleAgent(decision) => Stage::Done(self.run_single(&decision, command, cancel).await?),
                Stage::Bundle(decision) => Stage::Done(self.run_bundle(&decision, command, cancel).await?),
                Stage::Done(envelope) => {
                    info!(kind = envelope.kind(), "pipeline finished");
                    return Ok(envelope);
                }
            };
        }
    }

    async fn decide(&self, command: &Command, cancel: &CancellationToken) -> Result<RoutingDecision, RunError> {
        match self.router.route(command, cancel).await {
            Ok(decision) => Ok(decision),
            Err(PipelineError::Cancelled) => Err(RunError::Cancelled),
            Err(e) => {
                warn!(error = %e, "routing failed, falling back to design_qa");
                Ok(RoutingDecision::fallback(format!("routing failed: {}", e)))
            }
        }
    }

    async fn run_single(
        &self,
        decision: &RoutingDecision,
        command: &Command,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope, RunError> {
        let kind = decision.agents.first().copied().unwrap_or(AgentKind::SceneEdit);
        info!(agent = %kind, "running single agent");
        let result = self.dispatch(kind, decision.asset_mode, command, &[], cancel).await;
        settle(kind, result)
    }

    /// Asset generation first, collecting paths; then everything else
    async fn run_bundle(
        &self,
        decision: &RoutingDecision,
        command: &Command,
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope, RunError> {
        info!(agents = ?decision.agents, "running bundle");
        let mut items = Vec::with_capacity(decision.agents.len());
        let mut asset_paths: Vec<String> = Vec::new();

        for kind in decision.agents.iter().copied().filter(|k| *k == AgentKind::AssetGen) {
            let envelope = settle(
                kind,
                self.dispatch(kind, decision.asset_mode, command, &[], cancel).await,
            )?;
            if let ResponseEnvelope::Asset(asset) = &envelope {
                asset_paths.push(asset.path.clone());
            }
            items.push(envelope);
        }

        if cancel.is_cancelled() {
            return Err(RunError::Cancelled);
        }

        let rest: Vec<AgentKind> = decision
            .agents
            .iter()
            .copied()
            .filter(|k| *k != AgentKind::AssetGen)
            .collect();
        debug!(asset_paths = asset_paths.len(), remaining = rest.len(), "run_bundle: asset phase done");

        let results = if self.parallel_bundle {
            join_all(
                rest.iter()
                    .map(|kind| self.dispatch(*kind, decision.asset_mode, command, &asset_paths, cancel)),
            )
            .await
        } else {
            let mut results = Vec::with_capacity(rest.len());
            for kind in &rest {
                if cancel.is_cancelled() {
                    return Err(RunError::Cancelled);
                }
                results.push(self.dispatch(*kind, decision.asset_mode, command, &asset_paths, cancel).await);
            }
            results
        };

        for (kind, result) in rest.into_iter().zip(results) {
            items.push(settle(kind, result)?);
        }
        Ok(ResponseEnvelope::bundle(items))
    }

    /// Run one agent
    async fn dispatch(
        &self,
        kind: AgentKind,
        asset_mode: Option<AssetMode>,
        command: &Command,
        asset_paths: &[String],
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope, PipelineError> {
        debug!(agent = %kind, "dispatch: called");
        match kind {
            AgentKind::SceneEdit => self.scene_edit(command, asset_paths, cancel).await,
            AgentKind::DesignQa => self.advisor.ask(&command.text, cancel).await.map(ResponseEnvelope::text),
            AgentKind::AssetGen => self
                .assets
                .generate(&command.text, asset_mode.unwrap_or(AssetMode::Texture), cancel)
                .await
                .map(ResponseEnvelope::from),
            AgentKind::ScriptGen => self.scripts.generate(command, cancel).await.map(ResponseEnvelope::from),
        }
    }

    async fn scene_edit(
        &self,
        command: &Command,
        asset_paths: &[String],
        cancel: &CancellationToken,
    ) -> Result<ResponseEnvelope, PipelineError> {
        let plan = self.planner.build_plan(command, asset_paths, cancel).await?;
        if plan.is_empty() {
            info!("scene_edit: empty plan");
            return Ok(ResponseEnvelope::text(EMPTY_PLAN_MESSAGE));
        }
        let doc = self.synthesizer.plan_to_ops(&plan, cancel).await?;
        Ok(ResponseEnvelope::ops(doc))
    }
}

/// Turn an agent result into an envelope; only cancellation escapes
fn settle(kind: AgentKind, result: Result<ResponseEnvelope, PipelineError>) -> Result<ResponseEnvelope, RunError> {
    match result {
        Ok(envelope) => Ok(envelope),
        Err(PipelineError::Cancelled) => Err(RunError::Cancelled),
        Err(e) => {
            warn!(agent = %kind, error = %e, "agent failed");
            Ok(ResponseEnvelope::text(format!("{} failed: {}", kind, e)))
        }
    }
}
