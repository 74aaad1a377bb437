//! Command + scene → Lua behavior script

use std::sync::Arc;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::backend::complete_text;
use super::command::Command;
use super::envelope::ScriptDescriptor;
use super::error::PipelineError;
use super::sanitize::sanitize_json;
use crate::llm::LlmClient;
use crate::prompts::{PromptContext, PromptLoader, Template};

pub const DEFAULT_SCRIPT_NAME: &str = "script.lua";

/// Extract `{fileName, code}` from backend text
pub fn parse_script(raw: &str) -> Result<ScriptDescriptor, PipelineError> {
    let value: Value = serde_json::from_str(&sanitize_json(raw)).map_err(|_| PipelineError::ScriptMissing)?;

    let code = value
        .get("code")
        .and_then(Value::as_str)
        .filter(|c| !c.trim().is_empty())
        .ok_or(PipelineError::ScriptMissing)?;

    let file_name = value
        .get("fileName")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(DEFAULT_SCRIPT_NAME);

    Ok(ScriptDescriptor {
        file_name: file_name.to_string(),
        code: code.to_string(),
    })
}

pub struct ScriptGenerator {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl ScriptGenerator {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    pub async fn generate(&self, command: &Command, cancel: &CancellationToken) -> Result<ScriptDescriptor, PipelineError> {
        debug!("ScriptGenerator::generate: called");
        let system = self.prompts.load(Template::Script)?;
        let user = self
            .prompts
            .render(Template::ScriptInput, &PromptContext::command(&command.text, command.scene_json()))?;

        let raw = complete_text(self.llm.as_ref(), system, user, self.max_tokens, cancel).await?;
        let script = parse_script(&raw)?;
        info!(file_name = %script.file_name, "ScriptGenerator::generate: script ready");
        Ok(script)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    #[test]
    fn test_parse_script() {
        let raw = "```json\n{\"kind\":\"script\",\"fileName\":\"patrol.lua\",\"code\":\"function on_update(dt)\\n  -- move\\nend\"}\n```";
        let script = parse_script(raw).unwrap();
        assert_eq!(script.file_name, "patrol.lua");
        assert!(script.code.starts_with("function on_update(dt)"));
    }

    #[test]
    fn test_parse_script_default_name() {
        let script = parse_script(r#"{"code":"function on_spawn() end","fileName":"  "}"#).unwrap();
        assert_eq!(script.file_name, DEFAULT_SCRIPT_NAME);
    }

    #[test]
    fn test_parse_script_missing_code() {
        assert!(matches!(parse_script(r#"{"fileName":"a.lua"}"#), Err(PipelineError::ScriptMissing)));
        assert!(matches!(parse_script(r#"{"code":"   "}"#), Err(PipelineError::ScriptMissing)));
        assert!(matches!(parse_script("print('hi')"), Err(PipelineError::ScriptMissing)));
    }

    #[tokio::test]
    async fn test_generate() {
        let llm = Arc::new(ScriptedLlmClient::with_texts([r#"{"fileName":"jump.lua","code":"function on_spawn() end"}"#]));
        let generator = ScriptGenerator::new(llm.clone(), Arc::new(PromptLoader::embedded_only()), 4096);

        let script = generator
            .generate(&Command::new("make the player jump on spawn", None), &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(script.file_name, "jump.lua");
        assert!(llm.requests()[0].user_text().unwrap().contains("make the player jump"));
    }
}
