use async_trait::async_trait;
use thiserror::Error;

pub mod client;
pub mod gemini;
pub mod image;

pub use client::LlmClient;
pub use gemini::GeminiBackend;
pub use image::ImageGenerator;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Model endpoint returned status {0}: {1}")]
    Api(u16, String),
    #[error("Model returned an empty response")]
    EmptyResponse,
}

/// Transport seam for the generative model. The production implementation
/// talks to the Gemini REST endpoint; tests substitute a scripted fake.
#[async_trait]
pub trait GenerativeBackend: Send + Sync {
    /// Sends `prompt` using `api_key` and returns the model's raw text.
    /// Timeouts, transport failures, and empty responses are all errors.
    async fn generate(&self, api_key: &str, prompt: &str) -> Result<String, LlmError>;
}
