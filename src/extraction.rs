use serde::Deserialize;
use serde_json::Value;

use crate::llm::GenerationConfig;
use crate::resilient::ResilientClient;
use crate::sanitize::{lenient, parse_structured};
use crate::segments::{split_sentences, truncate_chars};
use crate::types::{Claim, Parsed};

/// Model claims at or below this many chars are fragments.
const MIN_MODEL_CLAIM_CHARS: usize = 10;
const MIN_SENTENCE_CHARS: usize = 20;
const MAX_FALLBACK_SENTENCES: usize = 3;
const SYNTHETIC_CLAIM_CHARS: usize = 200;
/// A synthetic claim shorter than this carries nothing worth checking.
const MIN_SYNTHETIC_CLAIM_CHARS: usize = 50;

pub const TOO_BRIEF_CLAIM: &str =
    "The provided content may be too brief or lack specific factual claims that can be verified.";

#[derive(Debug, Deserialize)]
struct ExtractedClaims {
    #[serde(default, deserialize_with = "lenient::values")]
    claims: Vec<Value>,
}

fn build_extraction_prompt(text: &str) -> String {
    format!(
        r#"Analyze the following text and extract the main factual claims that can be fact-checked.

Text: {text}

Please respond with a JSON object containing:
{{
    "claims": [
        "claim 1 text",
        "claim 2 text",
        "claim 3 text"
    ],
    "total_claims": number
}}

Extract 2-5 specific, factual claims that can be verified. Focus on statements that make assertions about facts, statistics, events, or verifiable information."#
    )
}

#[derive(Clone)]
pub struct ClaimExtractor {
    client: ResilientClient,
}

impl ClaimExtractor {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    /// Ordered claims found in `text`. Never empty.
    pub async fn extract_claims(&self, text: &str) -> Vec<Claim> {
        let raw = self
            .client
            .generate_text(&build_extraction_prompt(text), GenerationConfig::with_temperature(0.3))
            .await;

        let claims = match parse_structured::<ExtractedClaims>(&raw) {
            Parsed::Parsed(rec) => {
                let claims = keep_substantive(rec.claims);
                if claims.is_empty() {
                    tracing::info!("model returned no usable claims, splitting sentences");
                    fallback_claims(text)
                } else {
                    claims
                }
            }
            Parsed::Unparsed(_) => {
                tracing::warn!("claim extraction response was not valid JSON, splitting sentences");
                fallback_claims(text)
            }
        };
        tracing::info!(claim_count = claims.len(), "claims extracted");
        claims
    }
}

fn keep_substantive(entries: Vec<Value>) -> Vec<Claim> {
    entries
        .into_iter()
        .filter_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()),
            _ => None,
        })
        .filter(|s| s.chars().count() > MIN_MODEL_CLAIM_CHARS)
        .collect()
}

/// Sentence split of the source, or a single synthetic claim when nothing qualifies.
pub fn fallback_claims(text: &str) -> Vec<Claim> {
    let sentences: Vec<Claim> = split_sentences(text, MIN_SENTENCE_CHARS)
        .into_iter()
        .take(MAX_FALLBACK_SENTENCES)
        .collect();
    if !sentences.is_empty() {
        return sentences;
    }

    let head = truncate_chars(text, SYNTHETIC_CLAIM_CHARS).trim();
    if head.chars().count() < MIN_SYNTHETIC_CLAIM_CHARS {
        vec![TOO_BRIEF_CLAIM.to_string()]
    } else {
        vec![head.to_string()]
    }
}
