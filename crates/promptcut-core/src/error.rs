//! Error types for the edit pipeline
//!
//! Provides error handling for:
//! - Plan synthesis failures (malformed decompositions, unknown tools)
//! - Script synthesis exhaustion (every attempt's evidence retained)
//! - Step execution failures, aggregated per edit
//! - Session store failures (missing sessions, invalid indices, corrupt
//!   history documents)

use promptcut_gen::GenerationServiceError;
use promptcut_plugins::SandboxFailure;

/// Cap on diagnostic text surfaced to users; full streams stay in logs.
const DIAGNOSTIC_LIMIT: usize = 600;

/// Truncate a diagnostic to a bounded, single-report-friendly length.
#[must_use]
pub fn truncate_diagnostic(detail: &str) -> String {
    if detail.len() <= DIAGNOSTIC_LIMIT {
        return detail.to_string();
    }
    let mut cut = DIAGNOSTIC_LIMIT;
    while !detail.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}... ({} bytes truncated)", &detail[..cut], detail.len() - cut)
}

/// One failed candidate from one synthesis attempt.
#[derive(Debug, Clone)]
pub struct FailedCandidate {
    /// 1-based attempt the candidate belongs to
    pub attempt: usize,
    /// The candidate program text
    pub script: String,
    /// Why it failed certification
    pub error: String,
}

/// Plan synthesis failure.
#[derive(Debug, thiserror::Error)]
pub enum PlanningError {
    /// The planner's decomposition was not valid JSON of the expected shape.
    #[error("malformed plan: {0}")]
    Malformed(String),

    /// The generation service failed while planning.
    #[error("planning service failed: {0}")]
    Service(#[from] GenerationServiceError),
}

/// Script synthesis failure for one step.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    /// Every attempt's candidates failed certification.
    #[error("no candidate passed validation after {attempts} attempts; last error: {last_error}")]
    ValidationExhausted {
        /// How many generation attempts were made
        attempts: usize,
        /// Every failing candidate, across all attempts, in order
        candidates: Vec<FailedCandidate>,
        /// The most recent failure, truncated for display
        last_error: String,
    },

    /// The generation service failed on every attempt.
    #[error("generation service failed: {0}")]
    Service(#[from] GenerationServiceError),
}

/// Failure of one executing step.
#[derive(Debug, thiserror::Error)]
pub enum StepError {
    /// A plan step named a tool that is not registered.
    #[error("unknown tool {0:?}")]
    UnknownTool(String),

    /// No certified script could be produced.
    #[error(transparent)]
    Synthesis(#[from] SynthesisError),

    /// The certified script failed against real session data.
    #[error("execution failed: {0}")]
    Execution(#[from] promptcut_exec::ExecutionError),

    /// The real run exceeded the configured bound.
    #[error("step timed out after {0}s against real data")]
    Timeout(u64),

    /// The run succeeded but the declared output never appeared.
    #[error("declared output {0:?} was not produced")]
    MissingOutput(String),

    /// Workspace preparation failed (temp dirs, script files).
    #[error("workspace error: {0}")]
    Workspace(String),
}

/// Failure of a whole edit, naming the step that sank it.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    /// Planning failed before any step ran.
    #[error("planning failed: {0}")]
    Planning(#[from] PlanningError),

    /// Step `step` of the plan failed; no artifact was promoted.
    #[error("step {step} ({task:?}) failed: {source}")]
    Step {
        /// 1-based ordinal of the failing step
        step: usize,
        /// The failing step's task description
        task: String,
        /// What went wrong
        #[source]
        source: StepError,
    },

    /// The session store rejected or could not record the edit.
    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Session store failure.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session with the given id exists under the sessions root.
    #[error("unknown session {0}")]
    UnknownSession(String),

    /// A requested base index is outside the retained history.
    #[error("invalid history index {index}; history spans 0..={tip}")]
    InvalidIndex {
        /// The requested index
        index: usize,
        /// The newest retained index
        tip: usize,
    },

    /// The persisted history document could not be read or parsed.
    #[error("corrupt history for session {session}: {detail}")]
    CorruptHistory {
        /// The session whose document is damaged
        session: String,
        /// What failed while loading it
        detail: String,
    },

    /// Filesystem operation against the session directory failed.
    #[error("session io error: {0}")]
    Io(#[from] std::io::Error),
}

impl SynthesisError {
    /// Every failing candidate retained by this error; empty for
    /// service-level failures.
    #[must_use]
    pub fn candidates(&self) -> &[FailedCandidate] {
        match self {
            SynthesisError::ValidationExhausted { candidates, .. } => candidates,
            SynthesisError::Service(_) => &[],
        }
    }
}

impl FailedCandidate {
    /// Record a candidate that failed sandbox certification.
    #[must_use]
    pub fn rejected(attempt: usize, script: impl Into<String>, failure: &SandboxFailure) -> Self {
        Self {
            attempt,
            script: script.into(),
            error: failure.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn short_diagnostics_pass_through() {
        assert_eq!(truncate_diagnostic("boom"), "boom");
    }

    #[test]
    fn long_diagnostics_are_bounded() {
        let long = "x".repeat(5000);
        let out = truncate_diagnostic(&long);
        assert!(out.len() < 700);
        assert!(out.contains("truncated"));
    }

    #[test]
    fn truncation_respects_utf8_boundaries() {
        let long = "é".repeat(3000);
        let out = truncate_diagnostic(&long);
        assert!(out.contains("truncated"));
    }

    #[test]
    fn edit_error_names_the_failing_step() {
        let err = EditError::Step {
            step: 2,
            task: "trim the clip".to_string(),
            source: StepError::UnknownTool("imagemagick".to_string()),
        };
        let message = err.to_string();
        assert!(message.contains("step 2"));
        assert!(message.contains("trim the clip"));
        assert!(message.contains("imagemagick"));
    }

    #[test]
    fn exhaustion_retains_every_candidate() {
        let err = SynthesisError::ValidationExhausted {
            attempts: 3,
            candidates: vec![
                FailedCandidate {
                    attempt: 1,
                    script: "bad()".to_string(),
                    error: "syntax error".to_string(),
                },
                FailedCandidate {
                    attempt: 2,
                    script: "worse()".to_string(),
                    error: "exit 1".to_string(),
                },
            ],
            last_error: "exit 1".to_string(),
        };
        assert_eq!(err.candidates().len(), 2);
    }
}
