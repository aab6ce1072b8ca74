use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::llm::GenerationConfig;
use crate::resilient::ResilientClient;
use crate::sanitize::{lenient, parse_structured, sanitize};
use crate::segments::truncate_chars;
use crate::types::{ClaimVerdict, Parsed, Verdict};

const CONTRADICTION_WORDS: &[&str] = &["false", "incorrect", "misleading", "contradicted"];
const SUPPORT_WORDS: &[&str] = &["true", "accurate", "supported", "verified"];

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("confidence score is not a number: {0}")]
    InvalidConfidence(Value),
}

/// The record the verification prompt asks for. Every field is optional upstream.
#[derive(Debug, Deserialize)]
struct VerificationRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    verdict: Option<String>,
    #[serde(default)]
    confidence_score: Option<Value>,
    #[serde(default, deserialize_with = "lenient::text")]
    detailed_analysis: Option<String>,
    #[serde(default, deserialize_with = "lenient::texts")]
    key_evidence_points: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    credibility_assessment: Option<String>,
}

fn build_verify_prompt(claim: &str) -> String {
    format!(
        r#"Perform a comprehensive fact-check analysis of the following claim:

Claim: {claim}

Please analyze this claim thoroughly and respond with a JSON object:
{{
    "verdict": "Supported|Contradicted|InsufficientInfo|Mixed",
    "confidence_score": 0.0-1.0,
    "detailed_analysis": "detailed explanation of your analysis",
    "search_suggestions": ["keyword 1", "keyword 2", "keyword 3"],
    "key_evidence_points": [
        "evidence point 1",
        "evidence point 2"
    ],
    "credibility_assessment": "assessment of claim's inherent credibility",
    "context_factors": "relevant context that affects verification"
}}

Guidelines:
- "Supported": The claim is factually accurate based on available evidence
- "Contradicted": The claim is factually incorrect or misleading
- "InsufficientInfo": Not enough reliable information to verify
- "Mixed": The claim contains both accurate and inaccurate elements

Consider source credibility patterns, historical precedent, logical consistency, available evidence patterns and common misinformation indicators."#
    )
}

#[derive(Clone)]
pub struct ClaimVerifier {
    client: ResilientClient,
}

impl ClaimVerifier {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    /// Always yields a verdict; failures become `InsufficientInfo` with the error as explanation.
    pub async fn verify(&self, claim: &str) -> ClaimVerdict {
        match self.try_verify(claim).await {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "claim verification failed");
                ClaimVerdict {
                    claim: claim.to_string(),
                    verdict: Verdict::InsufficientInfo,
                    confidence: None,
                    explanation: format!("Error during analysis: {e}"),
                    evidence_points: Vec::new(),
                }
            }
        }
    }

    async fn try_verify(&self, claim: &str) -> Result<ClaimVerdict, VerifyError> {
        let raw = self
            .client
            .generate_text(&build_verify_prompt(claim), GenerationConfig::with_temperature(0.2))
            .await;
        match parse_structured::<VerificationRecord>(&raw) {
            Parsed::Parsed(rec) => from_record(claim, rec),
            Parsed::Unparsed(raw) => {
                tracing::warn!("verification response was not valid JSON, using keyword analysis");
                Ok(from_raw_text(claim, &raw))
            }
        }
    }
}

fn from_record(claim: &str, rec: VerificationRecord) -> Result<ClaimVerdict, VerifyError> {
    let verdict = rec.verdict.as_deref().map(Verdict::from_label).unwrap_or(Verdict::InsufficientInfo);
    let confidence = match rec.confidence_score {
        None | Some(Value::Null) => 0.5,
        Some(v) => confidence_value(&v).ok_or(VerifyError::InvalidConfidence(v))?,
    };

    let analysis = rec.detailed_analysis.unwrap_or_else(|| "No analysis available".to_string());
    let mut explanation = format!("Analysis: {}", truncate_chars(&analysis, 200));
    if !rec.key_evidence_points.is_empty() {
        let head: Vec<&str> = rec.key_evidence_points.iter().take(2).map(String::as_str).collect();
        explanation.push_str(&format!(" | Evidence: {}", head.join("; ")));
    }
    if let Some(cred) = rec.credibility_assessment.filter(|c| !c.is_empty()) {
        explanation.push_str(&format!(" | Credibility: {}", truncate_chars(&cred, 100)));
    }

    Ok(ClaimVerdict {
        claim: claim.to_string(),
        verdict,
        confidence: Some(confidence),
        explanation,
        evidence_points: rec.key_evidence_points,
    })
}

fn confidence_value(v: &Value) -> Option<f64> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.clamp(0.0, 1.0))
}

/// Keyword read of a response that wasn't JSON.
pub fn keyword_verdict(raw: &str) -> (Verdict, f64) {
    let lower = raw.to_lowercase();
    if CONTRADICTION_WORDS.iter().any(|w| lower.contains(w)) {
        (Verdict::Contradicted, 0.7)
    } else if SUPPORT_WORDS.iter().any(|w| lower.contains(w)) {
        (Verdict::Supported, 0.7)
    } else {
        (Verdict::InsufficientInfo, 0.5)
    }
}

fn from_raw_text(claim: &str, raw: &str) -> ClaimVerdict {
    let (verdict, confidence) = keyword_verdict(raw);
    ClaimVerdict {
        claim: claim.to_string(),
        verdict,
        confidence: Some(confidence),
        explanation: sanitize(raw),
        evidence_points: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback::text_fallback;
    use crate::tests::support::FakeGenerator;

    fn verifier(reply: &'static str) -> ClaimVerifier {
        ClaimVerifier::new(FakeGenerator::always(reply).resilient())
    }

    #[tokio::test]
    async fn structured_record_maps_into_verdict() {
        let v = verifier(r#"{"verdict":"Contradicted","confidence_score":0.92,
            "detailed_analysis":"Satellite imagery shows a curved horizon.",
            "key_evidence_points":["Satellite photos","Circumnavigation","Lunar eclipses"],
            "credibility_assessment":"Very low"}"#)
            .verify("The earth is flat")
            .await;
        assert_eq!(v.verdict, Verdict::Contradicted);
        assert_eq!(v.confidence, Some(0.92));
        assert_eq!(
            v.explanation,
            "Analysis: Satellite imagery shows a curved horizon. | Evidence: Satellite photos; Circumnavigation | Credibility: Very low"
        );
        assert_eq!(v.evidence_points.len(), 3);
    }

    #[tokio::test]
    async fn missing_fields_get_defaults() {
        let v = verifier("{}").verify("Some claim here").await;
        assert_eq!(v.verdict, Verdict::InsufficientInfo);
        assert_eq!(v.confidence, Some(0.5));
        assert_eq!(v.explanation, "Analysis: No analysis available");
    }

    #[tokio::test]
    async fn unknown_label_maps_into_enum() {
        let v = verifier(r#"{"verdict":"Probably","confidence_score":"0.6"}"#).verify("c").await;
        assert_eq!(v.verdict, Verdict::InsufficientInfo);
        assert_eq!(v.confidence, Some(0.6));
    }

    #[tokio::test]
    async fn long_analysis_is_truncated() {
        let long = format!(r#"{{"verdict":"Supported","detailed_analysis":"{}"}}"#, "a".repeat(500));
        let v = ClaimVerifier::new(FakeGenerator::always_owned(long).resilient()).verify("c").await;
        assert_eq!(v.explanation.len(), "Analysis: ".len() + 200);
    }

    #[tokio::test]
    async fn null_evidence_keeps_the_model_verdict() {
        let v = verifier(r#"{"verdict":"Supported","confidence_score":0.9,
            "detailed_analysis":"Records confirm it; rumours that it is false were debunked.",
            "key_evidence_points":null}"#)
            .verify("c")
            .await;
        assert_eq!((v.verdict, v.confidence), (Verdict::Supported, Some(0.9)));
        assert_eq!(v.explanation, "Analysis: Records confirm it; rumours that it is false were debunked.");
        assert!(v.evidence_points.is_empty());
    }

    #[tokio::test]
    async fn mistyped_fields_keep_the_model_verdict() {
        let v = verifier(r#"{"verdict":"Contradicted","confidence_score":0.8,"detailed_analysis":42,
            "key_evidence_points":[{"point":"Ship logs"},"Eclipse shadows"],"credibility_assessment":["low"]}"#)
            .verify("c")
            .await;
        assert_eq!((v.verdict, v.confidence), (Verdict::Contradicted, Some(0.8)));
        assert_eq!(v.explanation, "Analysis: 42 | Evidence: Ship logs; Eclipse shadows");
        assert_eq!(v.evidence_points, vec!["Ship logs".to_string(), "Eclipse shadows".to_string()]);
    }

    #[tokio::test]
    async fn prose_response_uses_keywords() {
        let v = verifier("This statement is misleading and partly true.").verify("c").await;
        assert_eq!(v.verdict, Verdict::Contradicted);
        assert_eq!(v.confidence, Some(0.7));
        assert_eq!(v.explanation, "This statement is misleading and partly true.");

        let v = verifier("Historians consider this accurate.").verify("c").await;
        assert_eq!(v.verdict, Verdict::Supported);

        let v = verifier("No idea.").verify("c").await;
        assert_eq!((v.verdict, v.confidence), (Verdict::InsufficientInfo, Some(0.5)));
    }

    #[tokio::test]
    async fn bad_confidence_is_caught_at_the_boundary() {
        let v = verifier(r#"{"verdict":"Supported","confidence_score":"high"}"#).verify("c").await;
        assert_eq!(v.verdict, Verdict::InsufficientInfo);
        assert_eq!(v.confidence, None);
        assert!(v.explanation.starts_with("Error during analysis:"));
    }

    #[tokio::test]
    async fn fallback_generator_output_parses_as_record() {
        let prompt = build_verify_prompt("The earth is flat");
        let v = ClaimVerifier::new(FakeGenerator::always_owned(text_fallback(&prompt)).resilient())
            .verify("The earth is flat")
            .await;
        assert_eq!(v.verdict, Verdict::Contradicted);
        assert_eq!(v.confidence, Some(0.8));
        assert!(v.explanation.contains("commonly debunked"));
    }
}
