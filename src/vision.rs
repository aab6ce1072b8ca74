use std::sync::LazyLock;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use regex::Regex;
use serde_json::Value;
use thiserror::Error;

use crate::content::ExtractedContent;
use crate::resilient::ResilientClient;

static JSON_OBJECT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)\{.*\}").unwrap());

const VISION_PROMPT: &str = r#"Analyze this image comprehensively:

1. Describe what you see in the image (objects, people, text, setting, etc.)
2. Extract any text visible in the image (OCR)
3. Identify any factual claims or statements that could be fact-checked

Return your response in this JSON format:
{
    "description": "Detailed description of the image",
    "extracted_text": "Any text found in the image",
    "factual_claims": "Any claims that can be fact-checked"
}"#;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("Invalid base64 image data: {0}")]
    InvalidImage(#[from] base64::DecodeError),
    #[error("Image data is empty")]
    Empty,
}

#[derive(Clone)]
pub struct ImageAnalyzer {
    client: ResilientClient,
}

impl ImageAnalyzer {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    /// `data` is base64, optionally wrapped in a `data:<mime>;base64,` URL.
    pub async fn analyze(&self, data: &str) -> Result<ExtractedContent, VisionError> {
        let (declared_mime, payload) = split_data_url(data.trim());
        let image = BASE64.decode(payload)?;
        if image.is_empty() {
            return Err(VisionError::Empty);
        }
        let mime = declared_mime.map(str::to_string).unwrap_or_else(|| sniff_mime(&image).to_string());
        tracing::info!(bytes = image.len(), mime = %mime, "analyzing image");

        let response = self.client.generate_vision(VISION_PROMPT, image, &mime).await;
        Ok(read_vision_response(&response))
    }
}

fn split_data_url(data: &str) -> (Option<&str>, &str) {
    data.strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map_or((None, data), |(mime, payload)| (Some(mime), payload))
}

fn sniff_mime(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "image/png",
        [b'G', b'I', b'F', b'8', ..] => "image/gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "image/webp",
        _ => "image/jpeg",
    }
}

/// Turns the model's image description into text to fact-check plus a context label.
pub fn read_vision_response(response: &str) -> ExtractedContent {
    let record = JSON_OBJECT
        .find(response)
        .and_then(|m| serde_json::from_str::<Value>(m.as_str()).ok())
        .filter(Value::is_object);

    let Some(record) = record else {
        tracing::debug!("vision response had no JSON object, using it verbatim");
        return ExtractedContent {
            text: response.to_string(),
            context: "Image analysis completed".to_string(),
        };
    };

    let description = string_field(&record, "description").unwrap_or_else(|| "Image analysis completed".to_string());
    let extracted = string_field(&record, "extracted_text").unwrap_or_else(|| "No text found in image".to_string());
    let claims = string_field(&record, "factual_claims").unwrap_or_default();
    ExtractedContent {
        text: format!("{extracted}. {claims}").trim().to_string(),
        context: format!("Image description: {description}"),
    }
}

fn string_field(record: &Value, key: &str) -> Option<String> {
    match record.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Array(items) => Some(
            items
                .iter()
                .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
                .collect::<Vec<_>>()
                .join(". "),
        ),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
