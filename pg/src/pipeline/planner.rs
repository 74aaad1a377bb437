//! Command + scene → edit plan

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::backend::complete_text;
use super::command::Command;
use super::error::PipelineError;
use super::plan::EditPlan;
use super::sanitize::extract_plan_span;
use crate::llm::LlmClient;
use crate::prompts::{PromptContext, PromptLoader, Template};

/// Append an `[ASSETS]` block listing generated asset paths
///
/// Returns the text unchanged when there are no paths.
pub fn augment_with_assets(text: &str, asset_paths: &[String]) -> String {
    if asset_paths.is_empty() {
        return text.to_string();
    }

    let mut out = format!("{}\n\n[ASSETS]\n", text.trim_end());
    for (index, path) in asset_paths.iter().enumerate() {
        out.push_str(&format!("ASSET{}:{}\n", index + 1, path));
    }
    out.push_str("Use these paths as texturePath on the new or modified entities the request refers to.");
    out
}

pub struct PlanBuilder {
    llm: Arc<dyn LlmClient>,
    prompts: Arc<PromptLoader>,
    max_tokens: u32,
}

impl PlanBuilder {
    pub fn new(llm: Arc<dyn LlmClient>, prompts: Arc<PromptLoader>, max_tokens: u32) -> Self {
        Self {
            llm,
            prompts,
            max_tokens,
        }
    }

    /// Ask the backend for a `<plan>` and parse it
    ///
    /// Text outside the first `<plan` .. last `</plan>` span is discarded.
    pub async fn build_plan(
        &self,
        command: &Command,
        asset_paths: &[String],
        cancel: &CancellationToken,
    ) -> Result<EditPlan, PipelineError> {
        debug!(asset_count = asset_paths.len(), "PlanBuilder::build_plan: called");
        let system = self.prompts.load(Template::Planner)?;
        let context = PromptContext::command(augment_with_assets(&command.text, asset_paths), command.scene_json());
        let user = self.prompts.render(Template::PlannerInput, &context)?;

        let raw = complete_text(self.llm.as_ref(), system, user, self.max_tokens, cancel).await?;
        let span = extract_plan_span(&raw).ok_or(PipelineError::PlanMissing)?;
        let plan = EditPlan::parse(span)?;

        info!(items = plan.item_count(), "PlanBuilder::build_plan: plan ready");
        Ok(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ScriptedLlmClient;

    fn builder(replies: &[&str]) -> (Arc<ScriptedLlmClient>, PlanBuilder) {
        let llm = Arc::new(ScriptedLlmClient::with_texts(replies.iter().copied()));
        let builder = PlanBuilder::new(llm.clone(), Arc::new(PromptLoader::embedded_only()), 4096);
        (llm, builder)
    }

    #[test]
    fn test_augment_with_assets() {
        assert_eq!(augment_with_assets("paint it", &[]), "paint it");

        let text = augment_with_assets(
            "apply it ",
            &["Assets/Generated/a.png".to_string(), "Assets/Generated/b.png".to_string()],
        );
        assert!(text.starts_with("apply it\n\n[ASSETS]\n"));
        assert!(text.contains("ASSET1:Assets/Generated/a.png\n"));
        assert!(text.contains("ASSET2:Assets/Generated/b.png\n"));
        assert!(text.contains("texturePath"));
    }

    #[tokio::test]
    async fn test_build_plan_discards_surrounding_prose() {
        let (_, builder) = builder(&[
            "Here is the plan:\n<plan><add><item type=\"platform\" pos=\"64,96\" size=\"96,32\" color=\"green\"/></add><modify/><remove/></plan>\nDone!",
        ]);

        let plan = builder
            .build_plan(&Command::new("add a platform", None), &[], &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(plan.add.len(), 1);
        assert!(plan.markup.starts_with("<plan>"));
        assert!(plan.markup.ends_with("</plan>"));
    }

    #[tokio::test]
    async fn test_build_plan_missing() {
        let (_, builder) = builder(&["I cannot help with that."]);
        let result = builder
            .build_plan(&Command::new("add a platform", None), &[], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PipelineError::PlanMissing)));
    }

    #[tokio::test]
    async fn test_build_plan_self_closing_root_is_missing() {
        let (_, builder) = builder(&["<plan/>"]);
        let result = builder
            .build_plan(&Command::new("add a platform", None), &[], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PipelineError::PlanMissing)));
    }

    #[tokio::test]
    async fn test_build_plan_malformed() {
        let (_, builder) = builder(&["<plan><add><item></add></plan>"]);
        let result = builder
            .build_plan(&Command::new("add a platform", None), &[], &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(PipelineError::PlanMalformed(_))));
    }

    #[tokio::test]
    async fn test_build_plan_injects_assets() {
        let (llm, builder) = builder(&["<plan></plan>"]);
        builder
            .build_plan(
                &Command::new("apply the texture", None),
                &["Assets/Generated/stone.png".to_string()],
                &CancellationToken::new(),
            )
            .await
            .unwrap();

        let user = llm.requests()[0].user_text().unwrap().to_string();
        assert!(user.contains("[ASSETS]"));
        assert!(user.contains("ASSET1:Assets/Generated/stone.png"));
    }
}
