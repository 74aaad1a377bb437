//! Description + mode → generated image asset

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::envelope::AssetDescriptor;
use super::error::PipelineError;
use super::router::AssetMode;
use crate::image::{ImageClient, ImageRequest};
use crate::prompts::{PromptContext, PromptLoader, Template};

/// Project directory generated assets are saved under
pub const GENERATED_ASSET_DIR: &str = "Assets/Generated";

/// `yyyyMMdd_HHmmssfff.png` in UTC
pub fn asset_file_name(at: DateTime<Utc>) -> String {
    at.format("%Y%m%d_%H%M%S%3f.png").to_string()
}

pub struct AssetGenerator {
    images: Arc<dyn ImageClient>,
    prompts: Arc<PromptLoader>,
}

impl AssetGenerator {
    pub fn new(images: Arc<dyn ImageClient>, prompts: Arc<PromptLoader>) -> Self {
        Self { images, prompts }
    }

    /// Generate one image
    ///
    /// Every backend problem, including an empty payload, is reported as
    /// `AssetBackendFailure`.
    pub async fn generate(
        &self,
        description: &str,
        mode: AssetMode,
        cancel: &CancellationToken,
    ) -> Result<AssetDescriptor, PipelineError> {
        debug!(?mode, "AssetGenerator::generate: called");
        if description.trim().is_empty() {
            return Err(PipelineError::AssetBackendFailure("empty description".to_string()));
        }
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }

        let template = match mode {
            AssetMode::Texture => Template::AssetTexture,
            AssetMode::Sprite => Template::AssetSprite,
        };
        let prompt = self
            .prompts
            .render(template, &PromptContext::description(description.trim()))?;
        let request = ImageRequest {
            prompt,
            transparent_background: mode == AssetMode::Sprite,
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            result = self.images.generate(request) => result,
        };
        let data = result.map_err(|e| {
            warn!(error = %e, "AssetGenerator::generate: image backend failed");
            PipelineError::AssetBackendFailure(e.to_string())
        })?;
        if data.is_empty() {
            return Err(PipelineError::AssetBackendFailure(
                "image backend returned no data".to_string(),
            ));
        }

        let file_name = asset_file_name(Utc::now());
        let path = format!("{}/{}", GENERATED_ASSET_DIR, file_name);
        info!(%path, bytes = data.len(), "AssetGenerator::generate: asset ready");
        Ok(AssetDescriptor { file_name, path, data })
    }
}
