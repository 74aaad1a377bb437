//! Edit plan → validated operations

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::backend::complete_text;
use super::error::PipelineError;
use super::ops::OperationsDocument;
use super::plan::EditPlan;
use super::sanitize::sanitize_json;
use super::validate::try_validate_ops;
use crate::llm::LlmClient;
use crate::prompts::{PromptContext, PromptLoader, Template};

/// Turn sanitized backend text into a validated, color-normalized document
pub fn parse_ops(raw: &str) -> Result<OperationsDocument, PipelineError> {
    let clean = sanitize_json(raw);
    let value: Value = serde_json::from_str(&clean).map_err(|e| {
        debug!(error = %e, "parse_ops: sanitized text is not JSON");
        PipelineError::OpsMissing
    })?;

    if value.get("ops").is_none() {
        return Err(PipelineError::OpsMissing);
    }

    let mut doc = try_validate_ops(&value).map_err(|e| {
        warn!(error = %e, "parse_ops: operations rejected");
        PipelineError::OpsInvalidShape(e)
    })?;
    doc.normalize_colors();
    Ok(doc)
}

pub struct Synthesizer {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl Synthesizer {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    pub async fn plan_to_ops(
        &self,
        plan: &EditPlan,
        cancel: &CancellationToken,
    ) -> Result<OperationsDocument, PipelineError> {
        debug!(items = plan.item_count(), "Synthesizer::plan_to_ops: called");
        let system = self.prompts.load(Template::Synthesizer)?;
        let user = self
            .prompts
            .render(Template::SynthesizerInput, &PromptContext::plan(&plan.markup))?;

        let raw = complete_text(self.llm.as_ref(), system, user, self.max_tokens, cancel).await?;
        let doc = parse_ops(&raw)?;

        info!(ops = doc.ops.len(), "Synthesizer::plan_to_ops: operations ready");
        Ok(doc)
    }
}
