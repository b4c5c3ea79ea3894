//! Generative-text oracle used for classification, insights and alert copy.

pub mod gemini;

pub use gemini::{GeminiConfig, GeminiOracle};

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OracleError {
    #[error("oracle not configured: {0}")]
    NotConfigured(String),

    #[error("oracle transport error: {0}")]
    Transport(String),

    #[error("oracle API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("oracle returned no text")]
    EmptyResponse,
}

/// What the caller expects back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseMode {
    /// A JSON document (the model is asked for `application/json`)
    Json,
    Text,
}

impl ResponseMode {
    pub fn mime_type(&self) -> &'static str {
        match self {
            ResponseMode::Json => "application/json",
            ResponseMode::Text => "text/plain",
        }
    }
}

#[async_trait]
pub trait Oracle: Send + Sync {
    /// One prompt in, the model's text out. No retries at this layer.
    async fn generate(&self, prompt: &str, mode: ResponseMode) -> Result<String, OracleError>;
}
