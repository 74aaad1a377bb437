//! Conceptual design questions → advice text

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::backend::complete_text;
use super::error::PipelineError;
use crate::llm::LlmClient;
use crate::prompts::{PromptLoader, Template};

/// Returned when the backend answers with nothing
pub const NO_USEFUL_ANSWER: &str = "I don't have a useful answer right now.";

pub struct DesignAdvisor {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl DesignAdvisor {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    pub async fn ask(&self, question: &str, cancel: &CancellationToken) -> Result<String, PipelineError> {
        debug!(question_len = question.len(), "DesignAdvisor::ask: called");
        let system = self.prompts.load(Template::Advisor)?;
        let answer = complete_text(self.llm.as_ref(), system, question.to_string(), self.max_tokens, cancel).await?;

        if answer.trim().is_empty() {
            debug!("DesignAdvisor::ask: empty answer, using fallback");
            return Ok(NO_USEFUL_ANSWER.to_string());
        }
        Ok(answer)
    }
}
