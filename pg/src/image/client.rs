//! ImageClient trait definition

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::debug;

use super::ImageError;

/// One image generation request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRequest {
    pub prompt: String,
    pub transparent_background: bool,
}

/// Image generation backend
///
/// Returns raw encoded image bytes (PNG for the OpenAI backend).
#[async_trait]
pub trait ImageClient: Send + Sync {
    async fn generate(&self, request: ImageRequest) -> Result<Vec<u8>, ImageError>;
}

/// Scripted image backend for tests
#[derive(Default)]
pub struct ScriptedImageClient {
    responses: Mutex<VecDeque<Result<Vec<u8>, ImageError>>>,
    requests: Mutex<Vec<ImageRequest>>,
}

impl ScriptedImageClient {
    pub fn new(responses: Vec<Result<Vec<u8>, ImageError>>) -> Self {
        debug!(response_count = %responses.len(), "ScriptedImageClient::new: called");
        Self {
            responses: Mutex::new(responses.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn requests(&self) -> Vec<ImageRequest> {
        self.requests.lock().map(|r| r.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ImageClient for ScriptedImageClient {
    async fn generate(&self, request: ImageRequest) -> Result<Vec<u8>, ImageError> {
        debug!(transparent = request.transparent_background, "ScriptedImageClient::generate: called");
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request);
        }
        let next = self.responses.lock().ok().and_then(|mut q| q.pop_front());
        next.unwrap_or_else(|| Err(ImageError::InvalidResponse("No more scripted images".to_string())))
    }
}
