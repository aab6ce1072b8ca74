//! Retry-then-degrade wrapper around a [`Generator`].
//!
//! Every call returns text: either the service's answer or the deterministic
//! fallback for the request's modality once the attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use crate::fallback::{text_fallback, vision_fallback};
use crate::llm::{GenerationConfig, GenerationError, GenerationRequest, Generator};

const RATE_LIMIT_MARKERS: &[&str] = &["429", "resource exhausted", "resource_exhausted", "quota"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass { RateLimited, Other }

pub fn classify(err: &GenerationError) -> ErrorClass {
    if err.status == Some(429) {
        return ErrorClass::RateLimited;
    }
    let msg = err.message.to_lowercase();
    if RATE_LIMIT_MARKERS.iter().any(|m| msg.contains(m)) {
        ErrorClass::RateLimited
    } else {
        ErrorClass::Other
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    /// Rate-limited attempt `n` (0-based) waits `2^n * rate_limit_base`.
    pub rate_limit_base: Duration,
    pub other_wait: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_attempts: 3, rate_limit_base: Duration::from_secs(2), other_wait: Duration::from_secs(1) }
    }
}

impl RetryPolicy {
    pub fn with_max_attempts(max_attempts: u32) -> Self {
        Self { max_attempts, ..Self::default() }
    }

    pub fn wait(&self, class: ErrorClass, attempt: u32) -> Duration {
        match class {
            ErrorClass::RateLimited => self.rate_limit_base * 2u32.saturating_pow(attempt),
            ErrorClass::Other => self.other_wait,
        }
    }
}

#[derive(Debug)]
enum Attempt {
    Attempting(u32),
    Success(String),
    Degraded,
}

#[derive(Clone)]
pub struct ResilientClient {
    inner: Arc<dyn Generator>,
    policy: RetryPolicy,
}

impl ResilientClient {
    pub fn new(inner: Arc<dyn Generator>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub async fn generate_text(&self, prompt: &str, config: GenerationConfig) -> String {
        self.generate(&GenerationRequest::text(prompt, config)).await
    }

    pub async fn generate_vision(&self, prompt: &str, image: Vec<u8>, mime: &str) -> String {
        self.generate(&GenerationRequest::vision(prompt, image, mime)).await
    }

    pub async fn generate(&self, request: &GenerationRequest) -> String {
        self.generate_with_attempts(request, self.policy.max_attempts).await
    }

    pub async fn generate_with_attempts(&self, request: &GenerationRequest, max_attempts: u32) -> String {
        let mut state = if max_attempts == 0 { Attempt::Degraded } else { Attempt::Attempting(0) };
        loop {
            state = match state {
                Attempt::Attempting(n) => match self.inner.generate(request).await {
                    Ok(text) => {
                        tracing::debug!(attempt = n + 1, max_attempts, vision = request.is_vision(), "generation succeeded");
                        Attempt::Success(text)
                    }
                    Err(e) => {
                        let class = classify(&e);
                        if n + 1 >= max_attempts {
                            tracing::warn!(attempt = n + 1, max_attempts, ?class, error = %e, "generation retries exhausted");
                            Attempt::Degraded
                        } else {
                            let wait = self.policy.wait(class, n);
                            tracing::warn!(
                                attempt = n + 1,
                                max_attempts,
                                ?class,
                                wait_secs = wait.as_secs_f64(),
                                error = %e,
                                "generation failed, backing off"
                            );
                            tokio::time::sleep(wait).await;
                            Attempt::Attempting(n + 1)
                        }
                    }
                },
                Attempt::Success(text) => return text,
                Attempt::Degraded => {
                    tracing::warn!(vision = request.is_vision(), "using fallback generation");
                    return if request.is_vision() { vision_fallback() } else { text_fallback(&request.prompt) };
                }
            };
        }
    }
}
