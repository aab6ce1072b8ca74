use serde::{Deserialize, Serialize};

/// A single atomic assertion pulled out of the analyzed text.
pub type Claim = String;

/// Per-claim verdict. Upstream labels that don't match collapse to `InsufficientInfo`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict { Supported, Contradicted, InsufficientInfo, Mixed }

impl Verdict {
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "supported" => Verdict::Supported,
            "contradicted" => Verdict::Contradicted,
            "mixed" => Verdict::Mixed,
            _ => Verdict::InsufficientInfo,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Supported => "Supported",
            Verdict::Contradicted => "Contradicted",
            Verdict::InsufficientInfo => "InsufficientInfo",
            Verdict::Mixed => "Mixed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClaimVerdict {
    pub claim: Claim,
    pub verdict: Verdict,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    pub explanation: String,
    #[serde(default)]
    pub evidence_points: Vec<String>,
}

/// Report-level verdict, serialized with the human-readable labels clients display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverallVerdict {
    #[serde(rename = "True")]
    True,
    #[serde(rename = "Mostly True")]
    MostlyTrue,
    #[serde(rename = "Mixed")]
    Mixed,
    #[serde(rename = "Mostly False")]
    MostlyFalse,
    #[serde(rename = "False")]
    False,
    #[serde(rename = "Insufficient Information")]
    InsufficientInformation,
}

impl OverallVerdict {
    pub fn from_label(label: &str) -> Self {
        match normalize_label(label).as_str() {
            "true" => OverallVerdict::True,
            "mostlytrue" => OverallVerdict::MostlyTrue,
            "mostlyfalse" => OverallVerdict::MostlyFalse,
            "false" => OverallVerdict::False,
            "insufficientinformation" | "insufficientinfo" => OverallVerdict::InsufficientInformation,
            _ => OverallVerdict::Mixed,
        }
    }
}

fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub score: u8,
    pub overall_verdict: OverallVerdict,
    pub summary: String,
    pub breakdown: Vec<ClaimVerdict>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputType { Text, Url, Image }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(rename = "inputType", alias = "type")]
    pub input_type: InputType,
    pub data: String,
}

/// Outcome of parsing an upstream response at a stage boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Parsed<T> {
    Parsed(T),
    Unparsed(String),
}
