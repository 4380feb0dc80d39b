//! Core types for the edit pipeline
//!
//! Defines the fundamental types shared across the pipeline:
//! - Session identity and history records
//! - Plans and their steps
//! - The per-step context the synthesizer works from

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use promptcut_plugins::IoMap;

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub Uuid);

impl SessionId {
    /// Generate a new session ID.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse a session ID from its string form.
    pub fn parse(raw: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(raw)?))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One step of a plan: a task description and the tool to carry it out.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Step {
    /// What this step should accomplish, in natural language
    pub task: String,
    /// Name of the registered tool the step selects
    pub tool: String,
}

impl Step {
    /// Build a step.
    #[inline]
    #[must_use]
    pub fn new(task: impl Into<String>, tool: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            tool: tool.into(),
        }
    }
}

/// An ordered decomposition of one edit instruction.
///
/// May be empty: an instruction that requires no work is a valid no-op.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    /// Steps in execution order
    pub steps: Vec<Step>,
}

impl Plan {
    /// Plan with no steps.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Plan with a single step.
    #[inline]
    #[must_use]
    pub fn single(step: Step) -> Self {
        Self { steps: vec![step] }
    }

    /// Number of steps.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// True when the plan is a no-op.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Record of one successfully executed step, fed into later steps' context
/// and preserved in the history entry the edit produces.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletedStep {
    /// The step's task description
    pub task: String,
    /// The tool that carried it out
    pub tool: String,
    /// Resolved input bindings the script ran with
    pub inputs: IoMap,
    /// Resolved output bindings the script ran with
    pub outputs: IoMap,
    /// The exact certified script that ran
    pub script: String,
}

/// Everything the synthesizer knows when writing a script for one step.
#[derive(Debug, Clone)]
pub struct StepContext {
    /// The user's original instruction for the whole edit
    pub instruction: String,
    /// The full plan the step belongs to
    pub plan: Plan,
    /// 1-based position of this step in the plan
    pub step_number: usize,
    /// Steps already executed in this edit, in order
    pub completed: Vec<CompletedStep>,
    /// Resolved input bindings for this step
    pub inputs: IoMap,
    /// Resolved output bindings for this step
    pub outputs: IoMap,
}

impl StepContext {
    /// The step this context describes.
    #[must_use]
    pub fn step(&self) -> Option<&Step> {
        self.plan.steps.get(self.step_number.checked_sub(1)?)
    }
}

/// One entry of a session's version history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Monotonic position in the history (0 is the ingested original)
    pub index: usize,
    /// Filename of the script that produced this version (`edit{i}.py`);
    /// `None` for entry 0
    pub script: Option<String>,
    /// The instruction that produced this version ("ingest" for entry 0)
    pub prompt: String,
    /// Artifact filename of this version, relative to the session dir
    pub output: String,
    /// When the entry was created
    pub created_at: DateTime<Utc>,
    /// Step-by-step record of the edit, when it was multi-step
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<CompletedStep>,
}

/// Persisted history document (`history.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct History {
    /// Index of the entry the session currently points at
    pub current_index: usize,
    /// All retained entries, ordered by index
    pub history: Vec<HistoryEntry>,
}

impl History {
    /// History containing only the ingested original.
    #[must_use]
    pub fn initial(output: impl Into<String>) -> Self {
        Self {
            current_index: 0,
            history: vec![HistoryEntry {
                index: 0,
                script: None,
                prompt: "ingest".to_string(),
                output: output.into(),
                created_at: Utc::now(),
                steps: Vec::new(),
            }],
        }
    }

    /// The entry the session currently points at.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.history.iter().find(|e| e.index == self.current_index)
    }

    /// Index of the newest entry.
    #[must_use]
    pub fn tip(&self) -> usize {
        self.history.last().map_or(0, |e| e.index)
    }
}
