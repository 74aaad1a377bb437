//! Prompt Loader
//!
//! Loads prompt templates from the override directory or falls back to embedded defaults.

use std::path::PathBuf;

use eyre::{Result, eyre};
use handlebars::Handlebars;
use serde::Serialize;
use tracing::debug;

use super::embedded;

/// Every template the pipeline uses
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Template {
    Router,
    RouterInput,
    Planner,
    PlannerInput,
    Synthesizer,
    SynthesizerInput,
    Advisor,
    Script,
    ScriptInput,
    AssetTexture,
    AssetSprite,
}

impl Template {
    /// File stem of the template (`{name}.pmt`)
    pub fn name(&self) -> &'static str {
        match self {
            Self::Router => "router",
            Self::RouterInput => "router-input",
            Self::Planner => "planner",
            Self::PlannerInput => "planner-input",
            Self::Synthesizer => "synthesizer",
            Self::SynthesizerInput => "synthesizer-input",
            Self::Advisor => "advisor",
            Self::Script => "script",
            Self::ScriptInput => "script-input",
            Self::AssetTexture => "asset-texture",
            Self::AssetSprite => "asset-sprite",
        }
    }
}

impl std::fmt::Display for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Values available to user-message templates
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptContext {
    /// The user's command text (possibly with an `[ASSETS]` block appended)
    pub prompt: String,
    /// Scene JSON, or `null`
    pub scene: String,
    /// Extracted plan markup
    pub plan: String,
    /// Asset description
    pub description: String,
}

impl PromptContext {
    pub fn command(prompt: impl Into<String>, scene: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            scene: scene.into(),
            ..Self::default()
        }
    }

    pub fn plan(plan: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            ..Self::default()
        }
    }

    pub fn description(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }
}

/// Loads and renders prompt templates
pub struct PromptLoader {
    /// Handlebars template engine (escaping disabled; output goes to a model, not a browser)
    hbs: Handlebars<'static>,
    /// User override directory (e.g., `.protogen/prompts/`)
    override_dir: Option<PathBuf>,
}

impl PromptLoader {
    /// Create a loader that prefers templates found in `override_dir`
    pub fn new(override_dir: impl Into<PathBuf>) -> Self {
        let override_dir = override_dir.into();
        let exists = override_dir.is_dir();
        debug!(?override_dir, %exists, "PromptLoader::new: called");

        Self {
            hbs: Self::engine(),
            override_dir: exists.then_some(override_dir),
        }
    }

    /// Create a loader that only uses embedded prompts (for testing)
    pub fn embedded_only() -> Self {
        debug!("PromptLoader::embedded_only: called");
        Self {
            hbs: Self::engine(),
            override_dir: None,
        }
    }

    fn engine() -> Handlebars<'static> {
        let mut hbs = Handlebars::new();
        hbs.register_escape_fn(handlebars::no_escape);
        hbs
    }

    /// Load a template's raw text
    ///
    /// Checks in order:
    /// 1. User override: `{override_dir}/{name}.pmt`
    /// 2. Embedded fallback
    pub fn load(&self, template: Template) -> Result<String> {
        let name = template.name();
        debug!(%name, "PromptLoader::load: called");

        if let Some(ref dir) = self.override_dir {
            let path = dir.join(format!("{}.pmt", name));
            if path.exists() {
                debug!(?path, "PromptLoader::load: found in override directory");
                return std::fs::read_to_string(&path)
                    .map_err(|e| eyre!("Failed to read prompt override {}: {}", path.display(), e));
            }
        }

        embedded::get_embedded(name)
            .map(str::to_string)
            .ok_or_else(|| eyre!("Prompt template not found: {}", name))
    }

    /// Render a template with the given context
    pub fn render(&self, template: Template, context: &PromptContext) -> Result<String> {
        debug!(%template, "PromptLoader::render: called");
        let source = self.load(template)?;
        self.hbs
            .render_template(&source, context)
            .map_err(|e| eyre!("Failed to render template {}: {}", template, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_does_not_escape() {
        let loader = PromptLoader::embedded_only();
        let ctx = PromptContext::command("make a <red> & \"big\" box", r#"{"entities":[]}"#);

        let rendered = loader.render(Template::RouterInput, &ctx).unwrap();
        assert!(rendered.contains("make a <red> & \"big\" box"));
        assert!(rendered.contains(r#"{"entities":[]}"#));
    }

    #[test]
    fn test_every_template_loads() {
        let loader = PromptLoader::embedded_only();
        for template in [
            Template::Router,
            Template::RouterInput,
            Template::Planner,
            Template::PlannerInput,
            Template::Synthesizer,
            Template::SynthesizerInput,
            Template::Advisor,
            Template::Script,
            Template::ScriptInput,
            Template::AssetTexture,
            Template::AssetSprite,
        ] {
            assert!(loader.load(template).is_ok(), "missing {}", template);
        }
    }

    #[test]
    fn test_override_directory_wins() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("advisor.pmt"), "Answer like a pirate.").unwrap();

        let loader = PromptLoader::new(temp.path());
        assert_eq!(loader.load(Template::Advisor).unwrap(), "Answer like a pirate.");
        assert!(loader.load(Template::Router).unwrap().contains("routing agent"));
    }

    #[test]
    fn test_missing_override_directory_falls_back() {
        let loader = PromptLoader::new("/nonexistent/protogen/prompts");
        assert!(loader.load(Template::Planner).unwrap().contains("<plan>"));
    }

    #[test]
    fn test_render_reports_bad_template() {
        let temp = tempfile::tempdir().unwrap();
        std::fs::write(temp.path().join("router-input.pmt"), "{{#if prompt}}unclosed").unwrap();

        let loader = PromptLoader::new(temp.path());
        let result = loader.render(Template::RouterInput, &PromptContext::command("x", "null"));
        assert!(result.is_err());
    }
}
