use std::sync::Arc;
use std::time::Duration;

use clap::Args;

use crate::content::HttpContentExtractor;
use crate::llm::openai::{OpenAiGenerator, DEFAULT_MODEL};
use crate::pipeline::Engine;
use crate::ratelimit::RateLimitLedger;
use crate::resilient::{ResilientClient, RetryPolicy};

/// Generation backend and retry settings shared by every subcommand.
#[derive(Debug, Clone, Args)]
pub struct Settings {
    /// API key for the generation service
    #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
    /// OpenAI-compatible base URL (defaults to Gemini's)
    #[arg(long, env = "LLM_BASE_URL")]
    pub base_url: Option<String>,
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_MODEL)]
    pub model: String,
    /// Model for image input; falls back to --model
    #[arg(long, env = "VISION_MODEL")]
    pub vision_model: Option<String>,
    /// Attempts per generation call before degrading to heuristics
    #[arg(long, env = "LLM_MAX_RETRIES", default_value_t = 3)]
    pub max_retries: u32,
    /// Outbound generation requests per second
    #[arg(long, env = "LLM_QPS", default_value_t = 5)]
    pub llm_qps: u32,
    #[arg(long, env = "LLM_TIMEOUT_MS", default_value_t = 60_000)]
    pub timeout_ms: u64,
    #[arg(long, env = "FETCH_TIMEOUT_SECS", default_value_t = 15)]
    pub fetch_timeout_secs: u64,
    /// Requests allowed per caller within the rate-limit window
    #[arg(long, env = "RATE_LIMIT_MAX", default_value_t = 10)]
    pub rate_limit_max: usize,
    #[arg(long, env = "RATE_LIMIT_WINDOW_SECS", default_value_t = 60)]
    pub rate_limit_window_secs: u64,
}

impl Settings {
    pub fn engine(&self) -> anyhow::Result<Engine> {
        if self.api_key.is_none() {
            tracing::warn!("GEMINI_API_KEY not set; every analysis will run on fallback heuristics");
        }
        let generator = OpenAiGenerator::new(
            self.model.clone(),
            self.vision_model.clone(),
            self.base_url.clone(),
            self.api_key.clone(),
            self.llm_qps,
            self.timeout_ms,
        )?;
        let client = ResilientClient::new(Arc::new(generator), RetryPolicy::with_max_attempts(self.max_retries));
        let pages = HttpContentExtractor::new(Duration::from_secs(self.fetch_timeout_secs))?;
        tracing::info!(model = %self.model, max_retries = self.max_retries, "analysis engine configured");
        Ok(Engine::new(client, Arc::new(pages)))
    }

    pub fn ledger(&self) -> RateLimitLedger {
        RateLimitLedger::new(self.rate_limit_max, Duration::from_secs(self.rate_limit_window_secs))
    }
}
