//! Image backend error types

use thiserror::Error;

/// Errors that can occur while talking to an image backend
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("API error {status}: {message}")]
    ApiError { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Image backend returned an empty payload")]
    EmptyPayload,

    #[error("Failed to decode image payload: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("API key not found: set the {0} environment variable")]
    MissingApiKey(String),

    #[error("Unknown image provider: '{0}'. Supported: openai")]
    UnknownProvider(String),
}

impl ImageError {
    /// Check if this error is retryable
    pub fn is_retryable(&self) -> bool {
        match self {
            ImageError::ApiError { status, .. } => *status == 429 || *status >= 500,
            ImageError::Network(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable() {
        assert!(ImageError::ApiError { status: 503, message: String::new() }.is_retryable());
        assert!(ImageError::ApiError { status: 429, message: String::new() }.is_retryable());
        assert!(!ImageError::ApiError { status: 400, message: String::new() }.is_retryable());
        assert!(!ImageError::EmptyPayload.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = ImageError::MissingApiKey("OPENAI_API_KEY".to_string());
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }
}
