//! Prompt Template System
//!
//! Loads and renders `.pmt` (prompt template) files for every pipeline stage.
//!
//! Template loading chain:
//! 1. `{pipeline.prompt-dir}/{name}.pmt` (user override)
//! 2. Embedded fallback in code
//!
//! User-message templates use Handlebars syntax for variable substitution.

pub mod embedded;
mod loader;

pub use loader::{PromptContext, PromptLoader, Template};
