pub mod openai;

use thiserror::Error;

/// Sampling knobs forwarded to the generation service.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_output_tokens: u32,
    pub top_p: f32,
    pub top_k: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self { temperature: 0.3, max_output_tokens: 2000, top_p: 0.8, top_k: 40 }
    }
}

impl GenerationConfig {
    pub fn with_temperature(temperature: f32) -> Self {
        Self { temperature, ..Self::default() }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Modality {
    Text,
    Vision { image: Vec<u8>, mime: String },
}

#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub prompt: String,
    pub modality: Modality,
    pub config: GenerationConfig,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>, config: GenerationConfig) -> Self {
        Self { prompt: prompt.into(), modality: Modality::Text, config }
    }

    pub fn vision(prompt: impl Into<String>, image: Vec<u8>, mime: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            modality: Modality::Vision { image, mime: mime.into() },
            config: GenerationConfig::default(),
        }
    }

    pub fn is_vision(&self) -> bool {
        matches!(self.modality, Modality::Vision { .. })
    }
}

/// Transport or quota failure reported by the generation service.
#[derive(Debug, Clone, Error)]
#[error("generation failed (status {status:?}): {message}")]
pub struct GenerationError {
    pub status: Option<u16>,
    pub message: String,
}

impl GenerationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { status: None, message: message.into() }
    }

    pub fn with_status(status: u16, message: impl Into<String>) -> Self {
        Self { status: Some(status), message: message.into() }
    }
}

#[async_trait::async_trait]
pub trait Generator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError>;
}
