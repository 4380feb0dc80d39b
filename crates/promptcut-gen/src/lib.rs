//! Generation-service contract
//!
//! The pipeline treats script generation as an external, unreliable
//! collaborator behind the [`GenerationClient`] trait: a request carries a
//! system instruction, user content, and a candidate count; a response is
//! zero or more candidate program texts. Clients are constructed explicitly
//! and injected — there is no module-level singleton.
//!
//! The contract tolerates all three failure shapes the service exhibits:
//! transport errors (a distinct error variant), empty candidate lists
//! (a valid response), and candidates wrapped in markdown fences
//! (stripped via [`strip_code_fences`]).

pub mod gemini;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

pub use gemini::GeminiClient;

/// One request to the generation service.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    /// Tool-specific system instruction (how to write scripts for this tool)
    pub system_instruction: String,
    /// Task, context, inputs/outputs, and any failure feedback
    pub user_content: String,
    /// Number of candidate programs to request
    pub candidate_count: usize,
}

impl GenerationRequest {
    /// Build a request for a single candidate.
    #[inline]
    #[must_use]
    pub fn new(system_instruction: impl Into<String>, user_content: impl Into<String>) -> Self {
        Self {
            system_instruction: system_instruction.into(),
            user_content: user_content.into(),
            candidate_count: 1,
        }
    }

    /// Request a specific number of candidates.
    #[inline]
    #[must_use]
    pub fn with_candidate_count(mut self, count: usize) -> Self {
        self.candidate_count = count.max(1);
        self
    }
}

/// Transport- or service-level generation failure.
///
/// Candidate-level problems (bad code) are not errors here — they come back
/// as candidates and fail validation downstream.
#[derive(Debug, thiserror::Error)]
pub enum GenerationServiceError {
    /// The request could not be completed (network, HTTP status, timeouts).
    #[error("generation request failed: {0}")]
    Transport(String),

    /// The service answered but the response could not be decoded.
    #[error("generation response malformed: {0}")]
    Malformed(String),

    /// The client is missing required configuration (e.g. an API key).
    #[error("generation service not configured: {0}")]
    Configuration(String),
}

/// A client of the external script-generation service.
#[async_trait]
pub trait GenerationClient: Send + Sync {
    /// Request up to `candidate_count` candidate program texts.
    ///
    /// An empty vector is a valid response; callers treat it as a failed
    /// attempt, not an error.
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<Vec<String>, GenerationServiceError>;
}

static OPENING_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^```[A-Za-z0-9_+.-]*[ \t]*\r?\n?").expect("valid fence regex"));

/// Strip a surrounding markdown code fence from a candidate, if present.
///
/// Models occasionally ignore the no-formatting instruction and wrap the
/// program in ```` ```python ```` fences; the wrapped body is the program.
#[must_use]
pub fn strip_code_fences(candidate: &str) -> String {
    let mut text = candidate.trim();
    if let Some(m) = OPENING_FENCE.find(text) {
        text = &text[m.end()..];
        if let Some(stripped) = text.trim_end().strip_suffix("```") {
            text = stripped;
        }
    }
    text.trim().to_string()
}
