//! Credibility analysis over an unreliable text-generation backend.
//!
//! Text is split into claims, each claim is verified, and the verdicts are folded
//! into one scored report. Every stage that talks to the model has a deterministic
//! fallback, so an analysis always ends with a well-formed [`types::AnalysisReport`].

pub mod config;
pub mod content;
pub mod error;
pub mod extraction;
pub mod fallback;
pub mod llm;
pub mod pipeline;
pub mod ratelimit;
pub mod resilient;
pub mod sanitize;
pub mod scoring;
pub mod segments;
pub mod server;
pub mod synthesis;
pub mod types;
pub mod verification;
pub mod vision;

#[cfg(test)]
mod tests;
