//! Image generation backend module

use std::sync::Arc;

use tracing::debug;

mod client;
mod error;
mod openai;

pub use client::{ImageClient, ImageRequest, ScriptedImageClient};
pub use error::ImageError;
pub use openai::OpenAIImageClient;

use crate::config::ImageConfig;

/// Create an image client based on the configured provider
pub fn create_image_client(config: &ImageConfig) -> Result<Arc<dyn ImageClient>, ImageError> {
    debug!(provider = %config.provider, model = %config.model, "create_image_client: called");
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAIImageClient::from_config(config)?)),
        other => Err(ImageError::UnknownProvider(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_provider() {
        let config = ImageConfig {
            provider: "midjourney".to_string(),
            ..ImageConfig::default()
        };
        assert!(matches!(create_image_client(&config), Err(ImageError::UnknownProvider(_))));
    }
}
