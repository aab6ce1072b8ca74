use serde::Deserialize;
use serde_json::Value;

use crate::llm::GenerationConfig;
use crate::resilient::ResilientClient;
use crate::sanitize::{lenient, parse_structured, sanitize};
use crate::scoring::{ratio_assessment, VerdictCounts};
use crate::segments::truncate_chars;
use crate::types::{AnalysisReport, ClaimVerdict, OverallVerdict, Parsed};

pub const NO_CLAIMS_SUMMARY: &str = "No factual claims could be identified in the provided content.";

#[derive(Debug, Deserialize)]
struct SynthesisRecord {
    #[serde(default, deserialize_with = "lenient::text")]
    overall_verdict: Option<String>,
    #[serde(default)]
    credibility_score: Option<Value>,
    #[serde(default, deserialize_with = "lenient::text")]
    summary: Option<String>,
    #[serde(default, deserialize_with = "lenient::texts")]
    key_findings: Vec<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    recommendation: Option<String>,
}

fn build_synthesis_prompt(breakdown: &[ClaimVerdict], context: &str) -> String {
    let claims = breakdown
        .iter()
        .map(|v| format!("Claim: {}\nVerdict: {}\nExplanation: {}\n", v.claim, v.verdict.as_str(), v.explanation))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        r#"Analyze the following fact-checking results and provide a comprehensive final assessment:

Claims Analysis:
{claims}

Original Context: {context}

Please respond with a JSON object:
{{
    "overall_verdict": "True|Mostly True|Mixed|Mostly False|False|Insufficient Information",
    "credibility_score": 0-100,
    "summary": "comprehensive summary of findings",
    "key_findings": [
        "finding 1",
        "finding 2"
    ],
    "reliability_indicators": "factors affecting overall reliability",
    "recommendation": "brief recommendation for readers"
}}

Scoring Guidelines:
- 85-100: True (overwhelming evidence supports claims)
- 70-84: Mostly True (majority of claims supported)
- 50-69: Mixed (conflicting evidence or partial accuracy)
- 25-49: Mostly False (majority of claims contradicted)
- 0-24: False (overwhelming evidence contradicts claims)"#
    )
}

#[derive(Clone)]
pub struct ReportSynthesizer {
    client: ResilientClient,
}

impl ReportSynthesizer {
    pub fn new(client: ResilientClient) -> Self {
        Self { client }
    }

    pub async fn synthesize(&self, breakdown: Vec<ClaimVerdict>, context: &str) -> AnalysisReport {
        let raw = self
            .client
            .generate_text(&build_synthesis_prompt(&breakdown, context), GenerationConfig::with_temperature(0.2))
            .await;

        let (score, overall_verdict, summary) = match parse_structured::<SynthesisRecord>(&raw) {
            Parsed::Parsed(rec) => match from_record(rec) {
                Some(assessment) => assessment,
                None => {
                    tracing::warn!("synthesis record lacks a usable verdict or score, using ratio fallback");
                    fallback_assessment(&breakdown, Some(&raw))
                }
            },
            Parsed::Unparsed(raw) => {
                tracing::warn!("synthesis response was not valid JSON, using ratio fallback");
                fallback_assessment(&breakdown, Some(&raw))
            }
        };

        tracing::info!(score, verdict = ?overall_verdict, claims = breakdown.len(), "report synthesized");
        AnalysisReport {
            score,
            overall_verdict,
            summary,
            breakdown,
            context: Some(context.to_string()).filter(|c| !c.is_empty()),
        }
    }
}

/// `None` when the record carries neither a verdict nor a usable score.
fn from_record(rec: SynthesisRecord) -> Option<(u8, OverallVerdict, String)> {
    if rec.overall_verdict.is_none() && rec.credibility_score.as_ref().map_or(true, Value::is_null) {
        return None;
    }
    let score = match rec.credibility_score {
        None | Some(Value::Null) => 50,
        Some(v) => score_value(&v)?,
    };
    let verdict = rec.overall_verdict.as_deref().map(OverallVerdict::from_label).unwrap_or(OverallVerdict::Mixed);

    let mut summary = rec.summary.unwrap_or_else(|| "Analysis completed".to_string());
    if !rec.key_findings.is_empty() {
        let head: Vec<&str> = rec.key_findings.iter().take(2).map(String::as_str).collect();
        summary.push_str(&format!(" Key findings: {}", head.join("; ")));
    }
    if let Some(advice) = rec.recommendation.filter(|r| !r.is_empty()) {
        summary.push(' ');
        summary.push_str(&advice);
    }
    Some((score, verdict, summary))
}

fn score_value(v: &Value) -> Option<u8> {
    let n = match v {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then(|| n.clamp(0.0, 100.0) as u8)
}

/// Deterministic report fields from verdict counts plus an excerpt of the raw response, if any.
pub fn fallback_assessment(breakdown: &[ClaimVerdict], raw: Option<&str>) -> (u8, OverallVerdict, String) {
    let counts = VerdictCounts::tally(breakdown);
    let (score, verdict) = ratio_assessment(&counts);
    if counts.total == 0 {
        return (score, verdict, NO_CLAIMS_SUMMARY.to_string());
    }

    let mut summary = format!(
        "Analysis of {} claims: {} supported, {} contradicted, {} inconclusive.",
        counts.total, counts.supported, counts.contradicted, counts.insufficient
    );
    if let Some(raw) = raw {
        summary.push_str(&format!(" {}...", truncate_chars(&sanitize(raw), 200)));
    }
    (score, verdict, summary)
}
