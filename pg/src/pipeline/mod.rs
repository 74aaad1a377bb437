//! Command orchestration pipeline
//!
//! Router → (PlanBuilder → Synthesizer | DesignAdvisor | AssetGenerator |
//! ScriptGenerator) → response envelope. Untrusted model text passes through
//! `sanitize` and, for scene edits, `validate` before anything leaves.

mod advisor;
mod assets;
mod backend;
mod command;
mod envelope;
mod error;
mod ops;
mod orchestrator;
mod plan;
mod planner;
mod router;
pub mod sanitize;
mod script;
mod synthesizer;
mod validate;

pub use advisor::{DesignAdvisor, NO_USEFUL_ANSWER};
pub use assets::{AssetGenerator, GENERATED_ASSET_DIR, asset_file_name};
pub use command::Command;
pub use envelope::{AssetDescriptor, ResponseEnvelope, ScriptDescriptor};
pub use error::{PipelineError, RunError};
pub use ops::{Operation, OperationsDocument, TEXTURE_COMPONENT, Vec2, is_color_hex, normalize_color_hex};
pub use orchestrator::{EMPTY_PLAN_MESSAGE, Orchestrator};
pub use plan::{AddItem, EditPlan, ModifyItem, RemoveItem, parse_vec2};
pub use planner::{PlanBuilder, augment_with_assets};
pub use router::{AgentKind, AssetMode, MAX_AGENTS, Router, RoutingDecision, post_process};
pub use script::{DEFAULT_SCRIPT_NAME, ScriptGenerator, parse_script};
pub use synthesizer::{Synthesizer, parse_ops};
pub use validate::try_validate_ops;
