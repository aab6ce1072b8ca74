use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use async_openai::{
    error::OpenAIError,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestMessageContentPartImageArgs,
        ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
        ChatCompletionRequestUserMessageContent, CreateChatCompletionRequestArgs,
        CreateChatCompletionResponse, ImageDetail, ImageUrlArgs,
    },
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use nonzero_ext::nonzero;
use serde_json::Value;

use super::{GenerationError, GenerationRequest, Generator, Modality};
use crate::segments::truncate_chars;

/// Gemini's OpenAI-compatible surface.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash";

impl From<OpenAIError> for GenerationError {
    fn from(e: OpenAIError) -> Self {
        GenerationError::new(e.to_string())
    }
}

impl From<reqwest::Error> for GenerationError {
    fn from(e: reqwest::Error) -> Self {
        match e.status() {
            Some(status) => GenerationError::with_status(status.as_u16(), e.to_string()),
            None => GenerationError::new(e.to_string()),
        }
    }
}

/// Readable message from an error body. Handles the OpenAI shape `{"error": {...}}`
/// and Gemini's `[{"error": {...}}]`; anything else is quoted as-is.
fn api_error_message(body: &str) -> String {
    let v: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let err = match &v {
        Value::Array(items) => items.first().and_then(|e| e.get("error")),
        other => other.get("error"),
    };
    let Some(err) = err else {
        return truncate_chars(body.trim(), 200).to_string();
    };
    let message = err.get("message").and_then(Value::as_str).unwrap_or("unknown error");
    match err.get("status").or_else(|| err.get("type")).and_then(Value::as_str) {
        Some(kind) => format!("{kind}: {message}"),
        None => message.to_string(),
    }
}

/// Chat-completions backend. Requests and responses use the async-openai wire types;
/// the HTTP exchange is done here so every non-2xx status reaches the retry classifier.
#[derive(Clone)]
pub struct OpenAiGenerator {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    vision_model: String,
    limiter: Arc<DefaultDirectRateLimiter>,
}

impl OpenAiGenerator {
    pub fn new(
        model: String,
        vision_model: Option<String>,
        base_url: Option<String>,
        api_key: Option<String>,
        qps: u32,
        timeout_ms: u64,
    ) -> anyhow::Result<Self> {
        let base = base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http = reqwest::Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?;
        let quota = Quota::per_second(NonZeroU32::new(qps).unwrap_or(nonzero!(1u32)));
        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base.trim_end_matches('/')),
            api_key,
            vision_model: vision_model.unwrap_or_else(|| model.clone()),
            model,
            limiter: Arc::new(RateLimiter::direct(quota)),
        })
    }

    fn user_message(request: &GenerationRequest) -> Result<ChatCompletionRequestMessage, OpenAIError> {
        let content = match &request.modality {
            Modality::Text => ChatCompletionRequestUserMessageContent::Text(request.prompt.clone()),
            Modality::Vision { image, mime } => {
                let data_url = format!("data:{mime};base64,{}", BASE64.encode(image));
                let text = ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(request.prompt.clone())
                    .build()?;
                let picture = ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(ImageUrlArgs::default().url(data_url).detail(ImageDetail::Auto).build()?)
                    .build()?;
                ChatCompletionRequestUserMessageContent::Array(vec![text.into(), picture.into()])
            }
        };
        Ok(ChatCompletionRequestUserMessageArgs::default().content(content).build()?.into())
    }
}

#[async_trait::async_trait]
impl Generator for OpenAiGenerator {
    #[allow(deprecated)]
    async fn generate(&self, request: &GenerationRequest) -> Result<String, GenerationError> {
        self.limiter.until_ready().await;

        let model = if request.is_vision() { &self.vision_model } else { &self.model };
        // top_k has no OpenAI wire field; it stays in GenerationConfig for other backends.
        let req = CreateChatCompletionRequestArgs::default()
            .model(model.as_str())
            .messages(vec![Self::user_message(request)?])
            .temperature(request.config.temperature)
            .top_p(request.config.top_p)
            .max_tokens(request.config.max_output_tokens)
            .build()?;

        let mut call = self.http.post(&self.endpoint).json(&req);
        if let Some(key) = &self.api_key {
            call = call.bearer_auth(key);
        }
        let resp = call.send().await?;
        let status = resp.status();
        let body = resp.text().await?;
        if !status.is_success() {
            return Err(GenerationError::with_status(status.as_u16(), api_error_message(&body)));
        }

        let completion: CreateChatCompletionResponse = serde_json::from_str(&body)
            .map_err(|e| GenerationError::new(format!("malformed completion: {e}")))?;
        let text = completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| GenerationError::new("empty completion"))?;
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Router};

    use crate::llm::GenerationConfig;
    use crate::resilient::{classify, ErrorClass};
    use crate::tests::support::serve;

    async fn generator_replying(status: StatusCode, body: &'static str) -> OpenAiGenerator {
        let app = Router::new().route("/chat/completions", post(move || async move { (status, body) }));
        let addr = serve(app).await;
        OpenAiGenerator::new("test-model".into(), None, Some(format!("http://{addr}/")), Some("key".into()), 100, 5_000)
            .unwrap()
    }

    fn prompt() -> GenerationRequest {
        GenerationRequest::text("Claim: water is wet", GenerationConfig::default())
    }

    #[tokio::test]
    async fn openai_style_429_keeps_its_status() {
        let gen = generator_replying(
            StatusCode::TOO_MANY_REQUESTS,
            r#"{"error":{"message":"Too many requests, slow down","type":"requests","param":null,"code":null}}"#,
        )
        .await;
        let err = gen.generate(&prompt()).await.unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "requests: Too many requests, slow down");
        assert_eq!(classify(&err), ErrorClass::RateLimited);
    }

    #[tokio::test]
    async fn gemini_style_429_keeps_its_status() {
        let gen = generator_replying(
            StatusCode::TOO_MANY_REQUESTS,
            r#"[{"error":{"code":429,"message":"Resource has been exhausted.","status":"RESOURCE_EXHAUSTED"}}]"#,
        )
        .await;
        let err = gen.generate(&prompt()).await.unwrap_err();
        assert_eq!(err.status, Some(429));
        assert_eq!(err.message, "RESOURCE_EXHAUSTED: Resource has been exhausted.");
        assert_eq!(classify(&err), ErrorClass::RateLimited);
    }

    #[tokio::test]
    async fn server_error_is_not_a_rate_limit() {
        let gen = generator_replying(StatusCode::BAD_GATEWAY, "upstream went away").await;
        let err = gen.generate(&prompt()).await.unwrap_err();
        assert_eq!(err.status, Some(502));
        assert_eq!(err.message, "upstream went away");
        assert_eq!(classify(&err), ErrorClass::Other);
    }

    #[tokio::test]
    async fn completion_text_is_returned() {
        let gen = generator_replying(
            StatusCode::OK,
            r#"{"id":"c1","object":"chat.completion","created":0,"model":"test-model",
                "choices":[{"index":0,"message":{"role":"assistant","content":"{\"claims\":[]}"},"finish_reason":"stop"}]}"#,
        )
        .await;
        assert_eq!(gen.generate(&prompt()).await.unwrap(), r#"{"claims":[]}"#);
    }
}
