//! Pipeline error taxonomy

use thiserror::Error;

use crate::llm::LlmError;

/// Failure of a single agent or stage
///
/// Every variant except `Cancelled` is turned into a `text` envelope by the
/// orchestrator; none of them ever reaches the caller as an error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("router unavailable: {0}")]
    RouterUnavailable(String),

    #[error("the model did not return a <plan> document")]
    PlanMissing,

    #[error("plan markup is malformed: {0}")]
    PlanMalformed(String),

    #[error("the model did not return a JSON object with 'ops'")]
    OpsMissing,

    #[error("operations rejected: {0}")]
    OpsInvalidShape(String),

    #[error("asset generation failed: {0}")]
    AssetBackendFailure(String),

    #[error("unknown agent: {0}")]
    UnknownAgent(String),

    #[error("the model did not return a script")]
    ScriptMissing,

    #[error("completion backend error: {0}")]
    Backend(#[from] LlmError),

    #[error("prompt template error: {0}")]
    Prompt(String),

    #[error("cancelled")]
    Cancelled,
}

impl From<eyre::Report> for PipelineError {
    fn from(report: eyre::Report) -> Self {
        PipelineError::Prompt(format!("{:#}", report))
    }
}

/// The only ways a whole run can fail
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RunError {
    /// Caller precondition: the prompt was empty or whitespace
    #[error("prompt is empty")]
    EmptyPrompt,

    #[error("request cancelled")]
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_short_diagnostics() {
        assert_eq!(
            PipelineError::OpsInvalidShape("ops[0]: unknown operation: explode".to_string()).to_string(),
            "operations rejected: ops[0]: unknown operation: explode"
        );
        assert_eq!(RunError::EmptyPrompt.to_string(), "prompt is empty");
    }

    #[test]
    fn test_backend_conversion() {
        let err: PipelineError = LlmError::InvalidResponse("boom".to_string()).into();
        assert!(matches!(err, PipelineError::Backend(_)));
    }

    #[test]
    fn test_prompt_conversion() {
        let err: PipelineError = eyre::eyre!("Prompt template not found: planner").into();
        assert!(matches!(err, PipelineError::Prompt(ref m) if m.contains("planner")));
    }
}
