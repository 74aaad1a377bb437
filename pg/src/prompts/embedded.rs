//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

pub const ROUTER: &str = include_str!("../../prompts/router.pmt");
pub const ROUTER_INPUT: &str = include_str!("../../prompts/router-input.pmt");
pub const PLANNER: &str = include_str!("../../prompts/planner.pmt");
pub const PLANNER_INPUT: &str = include_str!("../../prompts/planner-input.pmt");
pub const SYNTHESIZER: &str = include_str!("../../prompts/synthesizer.pmt");
pub const SYNTHESIZER_INPUT: &str = include_str!("../../prompts/synthesizer-input.pmt");
pub const ADVISOR: &str = include_str!("../../prompts/advisor.pmt");
pub const SCRIPT: &str = include_str!("../../prompts/script.pmt");
pub const SCRIPT_INPUT: &str = include_str!("../../prompts/script-input.pmt");
pub const ASSET_TEXTURE: &str = include_str!("../../prompts/asset-texture.pmt");
pub const ASSET_SPRITE: &str = include_str!("../../prompts/asset-sprite.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    let found = match name {
        "router" => Some(ROUTER),
        "router-input" => Some(ROUTER_INPUT),
        "planner" => Some(PLANNER),
        "planner-input" => Some(PLANNER_INPUT),
        "synthesizer" => Some(SYNTHESIZER),
        "synthesizer-input" => Some(SYNTHESIZER_INPUT),
        "advisor" => Some(ADVISOR),
        "script" => Some(SCRIPT),
        "script-input" => Some(SCRIPT_INPUT),
        "asset-texture" => Some(ASSET_TEXTURE),
        "asset-sprite" => Some(ASSET_SPRITE),
        _ => None,
    };
    if found.is_none() {
        debug!(%name, "get_embedded: no match found");
    }
    found
}
