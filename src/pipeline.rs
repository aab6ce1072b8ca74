use std::sync::Arc;

use crate::content::{ContentExtractor, ExtractedContent};
use crate::error::AnalyzeError;
use crate::extraction::ClaimExtractor;
use crate::resilient::ResilientClient;
use crate::segments::truncate_chars;
use crate::synthesis::ReportSynthesizer;
use crate::types::{AnalysisReport, AnalysisRequest, InputType};
use crate::verification::ClaimVerifier;
use crate::vision::ImageAnalyzer;

pub const TEXT_CONTEXT: &str = "Input was a raw text message.";

/// extract -> verify (one claim at a time, in order) -> synthesize
#[derive(Clone)]
pub struct Engine {
    extractor: ClaimExtractor,
    verifier: ClaimVerifier,
    synthesizer: ReportSynthesizer,
    images: ImageAnalyzer,
    pages: Arc<dyn ContentExtractor>,
}

impl Engine {
    pub fn new(client: ResilientClient, pages: Arc<dyn ContentExtractor>) -> Self {
        Self {
            extractor: ClaimExtractor::new(client.clone()),
            verifier: ClaimVerifier::new(client.clone()),
            synthesizer: ReportSynthesizer::new(client.clone()),
            images: ImageAnalyzer::new(client),
            pages,
        }
    }

    /// Input acquisition errors surface; everything after that degrades instead of failing.
    pub async fn analyze(&self, request: &AnalysisRequest) -> Result<AnalysisReport, AnalyzeError> {
        let content = match request.input_type {
            InputType::Text => ExtractedContent { text: request.data.clone(), context: TEXT_CONTEXT.to_string() },
            InputType::Url => self.pages.extract(request.data.trim()).await?,
            InputType::Image => self.images.analyze(&request.data).await?,
        };
        tracing::debug!(input_type = ?request.input_type, text = truncate_chars(&content.text, 200), "input acquired");

        if content.text.trim().is_empty() {
            return Err(AnalyzeError::EmptyInput);
        }
        Ok(self.analyze_text(&content.text, &content.context).await)
    }

    pub async fn analyze_text(&self, text: &str, context: &str) -> AnalysisReport {
        let claims = self.extractor.extract_claims(text).await;

        let mut breakdown = Vec::with_capacity(claims.len());
        for (i, claim) in claims.iter().enumerate() {
            tracing::info!(claim_index = i + 1, claims = claims.len(), claim = truncate_chars(claim, 50), "verifying claim");
            let verdict = self.verifier.verify(claim).await;
            tracing::debug!(claim_index = i + 1, verdict = ?verdict.verdict, "claim verified");
            breakdown.push(verdict);
        }

        self.synthesizer.synthesize(breakdown, context).await
    }
}
