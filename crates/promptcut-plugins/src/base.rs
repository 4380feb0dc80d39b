//! Plugin contract and sandbox verdicts

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;

/// Resolved logical-name → filename mapping for a step's inputs or outputs.
///
/// Ordered so injected bindings and log lines are deterministic.
pub type IoMap = BTreeMap<String, String>;

/// Why a candidate script failed sandbox certification.
///
/// Every variant's message is fed back to the generation service verbatim,
/// so each one carries enough detail for the next attempt to do better.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SandboxFailure {
    /// The script does not parse as Python.
    #[error("syntax error: {0}")]
    Syntax(String),

    /// The script exceeded the plugin's sandbox budget.
    #[error("script timed out after {0:?} in the sandbox")]
    Timeout(Duration),

    /// The script ran and exited nonzero.
    #[error("script failed in the sandbox (exit {code:?}): {stderr}")]
    Execution {
        /// Exit code, if the process was not killed by a signal
        code: Option<i32>,
        /// Captured standard error
        stderr: String,
    },

    /// The script finished but a declared output was never written.
    #[error("declared output {0:?} was not produced")]
    MissingOutput(String),

    /// A declared output exists but fails the plugin's integrity check.
    #[error("output {name:?} is corrupt: {detail}")]
    CorruptOutput {
        /// Logical output name
        name: String,
        /// What the integrity check observed
        detail: String,
    },

    /// The sandbox itself could not be prepared (not the script's fault).
    #[error("sandbox environment error: {0}")]
    Environment(String),
}

/// Outcome of one sandbox validation.
#[derive(Debug)]
pub enum Verdict {
    /// The script is certified to run against real session data.
    Pass,
    /// The script must not run; the failure explains why.
    Fail(SandboxFailure),
}

impl Verdict {
    /// True for [`Verdict::Pass`].
    #[inline]
    #[must_use]
    pub fn is_pass(&self) -> bool {
        matches!(self, Verdict::Pass)
    }
}

/// One tool the pipeline can synthesize scripts for.
///
/// The descriptor methods feed the planner (tool selection) and the
/// synthesizer (prompt assembly); `validate` certifies candidates in a
/// caller-owned sandbox directory populated with synthetic stand-ins.
#[async_trait]
pub trait ToolPlugin: Send + Sync {
    /// Unique human-readable name, used by plans to select the tool.
    fn name(&self) -> &str;

    /// What this tool is good at, for planner tool selection.
    fn description(&self) -> &str;

    /// System instruction for the generation service when writing scripts
    /// for this tool.
    fn generation_instructions(&self) -> &str;

    /// Environment the generated scripts may assume (binaries, libraries).
    fn prerequisites(&self) -> &str;

    /// How long a candidate may run in the sandbox.
    fn sandbox_timeout(&self) -> Duration;

    /// Certify `script` against stand-ins in `sandbox_dir`.
    ///
    /// `inputs` and `outputs` are the step's resolved logical-name →
    /// filename mappings; stand-ins for the inputs are created inside
    /// `sandbox_dir` and removed before this returns, on every path.
    async fn validate(
        &self,
        script: &str,
        sandbox_dir: &Path,
        inputs: &IoMap,
        outputs: &IoMap,
    ) -> Verdict;
}
