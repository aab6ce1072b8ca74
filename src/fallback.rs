//! Deterministic stand-ins for generation output when the service can't be reached.
//!
//! Output has the same JSON shape the verifier and image analyzer parse, so callers
//! don't need a separate code path for degraded responses.

use serde_json::json;

use crate::segments::{truncate_chars, truncate_with_ellipsis};
use crate::types::Verdict;

const CLAIM_MARKER: &str = "Claim:";

const FALSE_INDICATORS: &[&str] = &[
    "flat earth",
    "earth is flat",
    "vaccines cause autism",
    "microchips in vaccines",
    "5g causes cancer",
    "moon landing fake",
    "chemtrails",
    "nasa hiding",
];

const TRUE_INDICATORS: &[&str] = &[
    "water boils at 100",
    "paris capital france",
    "earth round",
    "vaccines prevent disease",
];

/// The claim a verification prompt is about, or the head of the prompt.
pub fn claim_from_prompt(prompt: &str) -> String {
    prompt
        .lines()
        .map(str::trim)
        .find_map(|line| line.strip_prefix(CLAIM_MARKER))
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| truncate_with_ellipsis(prompt, 200))
}

pub fn keyword_verdict(claim: &str) -> (Verdict, f64) {
    let lower = claim.to_lowercase();
    if FALSE_INDICATORS.iter().any(|i| lower.contains(i)) {
        (Verdict::Contradicted, 0.8)
    } else if TRUE_INDICATORS.iter().any(|i| lower.contains(i)) {
        (Verdict::Supported, 0.8)
    } else {
        (Verdict::InsufficientInfo, 0.5)
    }
}

pub fn text_fallback(prompt: &str) -> String {
    let claim = claim_from_prompt(prompt);
    let (verdict, confidence) = keyword_verdict(&claim);
    let analysis = match verdict {
        Verdict::Contradicted => "Limited analysis due to API constraints. This appears to be a commonly debunked claim.",
        Verdict::Supported => "Limited analysis due to API constraints. This appears to be a well-established fact.",
        _ => "Limited analysis due to API constraints. Unable to verify due to API limitations.",
    };
    let head = truncate_chars(&claim, 30);
    json!({
        "verdict": verdict.as_str(),
        "confidence_score": confidence,
        "detailed_analysis": analysis,
        "search_suggestions": [format!("verify {head}"), format!("fact check {head}")],
        "key_evidence_points": ["Analysis limited due to API constraints"],
        "credibility_assessment": "Limited assessment available",
        "context_factors": "API rate limiting prevented full analysis",
    })
    .to_string()
}

pub fn vision_fallback() -> String {
    json!({
        "image_description": "Image analysis unavailable due to API constraints",
        "claims_detected": ["Unable to analyze image content"],
        "potential_issues": ["API rate limiting prevented analysis"],
        "credibility_indicators": "Limited assessment available",
        "recommendation": "Please try again later when API quota is restored",
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn picks_first_claim_line() {
        let prompt = "Check this.\n   Claim: The earth is flat  \nClaim: second";
        assert_eq!(claim_from_prompt(prompt), "The earth is flat");
    }

    #[test]
    fn without_marker_uses_prompt_head() {
        let prompt = "x".repeat(250);
        let claim = claim_from_prompt(&prompt);
        assert_eq!(claim.len(), 203);
        assert!(claim.ends_with("..."));
    }

    #[test]
    fn keyword_lists_bias_verdicts() {
        assert_eq!(keyword_verdict("They say the EARTH IS FLAT"), (Verdict::Contradicted, 0.8));
        assert_eq!(keyword_verdict("Water boils at 100 degrees"), (Verdict::Supported, 0.8));
        assert_eq!(keyword_verdict("Paris is the capital of France"), (Verdict::InsufficientInfo, 0.5));
    }

    #[test]
    fn text_fallback_is_valid_json_even_with_quotes() {
        let out = text_fallback("Claim: he said \"chemtrails\" are real");
        let v: Value = serde_json::from_str(&out).unwrap();
        assert_eq!(v["verdict"], "Contradicted");
        assert_eq!(v["confidence_score"], 0.8);
        assert_eq!(v["search_suggestions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn vision_fallback_is_fixed() {
        let v: Value = serde_json::from_str(&vision_fallback()).unwrap();
        assert_eq!(v["claims_detected"][0], "Unable to analyze image content");
        assert_eq!(vision_fallback(), vision_fallback());
    }
}
