//! Narrative generator trait and error types.

use std::future::Future;

use thiserror::Error;
use wxagent_stats::{Observation, Summary};

/// Errors that can occur while generating a narrative.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no text")]
    EmptyResponse,

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Failed to build prompt: {0}")]
    Prompt(String),
}

/// Everything a generator needs to describe one analysis window.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeRequest<'a> {
    pub station_id: &'a str,
    pub days: u32,
    pub summary: &'a Summary,
    /// Oldest first, as returned by the data source.
    pub observations: &'a [Observation],
    /// Trimmed, non-empty user question.
    pub question: Option<&'a str>,
}

/// External text model that turns statistics into prose.
pub trait NarrativeGenerator: Send + Sync {
    /// Model identifier reported back to clients.
    fn model(&self) -> &str;

    fn generate(
        &self,
        request: &NarrativeRequest<'_>,
    ) -> impl Future<Output = Result<String, GenerationError>> + Send;
}
