//! Cancellable completion calls shared by every stage

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::PipelineError;
use super::sanitize::strip_think_blocks;
use crate::llm::{CompletionRequest, LlmClient, StopReason};

/// Send one system + user exchange and return the cleaned reply text
///
/// Returns `Cancelled` without calling the backend if the token is already
/// cancelled, and abandons the in-flight call as soon as it fires.
pub(crate) async fn complete_text(
    llm: &dyn LlmClient,
    system: String,
    user: String,
    max_tokens: u32,
    cancel: &CancellationToken,
) -> Result<String, PipelineError> {
    debug!(%max_tokens, user_len = user.len(), "complete_text: called");
    if cancel.is_cancelled() {
        return Err(PipelineError::Cancelled);
    }

    let request = CompletionRequest::single_turn(system, user, max_tokens);
    let response = tokio::select! {
        biased;
        _ = cancel.cancelled() => {
            debug!("complete_text: cancelled while waiting for backend");
            return Err(PipelineError::Cancelled);
        }
        result = llm.complete(request) => result?,
    };

    if response.stop_reason == StopReason::MaxTokens {
        tracing::warn!("complete_text: response truncated at max tokens");
    }
    debug!(
        input_tokens = response.usage.input_tokens,
        output_tokens = response.usage.output_tokens,
        total_tokens = response.usage.total(),
        raw = ?response.content,
        "complete_text: received"
    );

    Ok(strip_think_blocks(response.content.as_deref().unwrap_or_default()))
}
