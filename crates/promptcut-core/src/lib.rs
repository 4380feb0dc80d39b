//! promptcut core - prompt-driven media editing pipeline
//!
//! The engine that:
//! - Plans a free-text instruction into tool steps
//! - Synthesizes a script per step through a generation service, with
//!   bounded retry and failure feedback
//! - Certifies every script in a sandbox before it touches session data
//! - Chains steps into one atomic edit
//! - Maintains a versioned, undoable session history
//!
//! # Example
//!
//! ```rust,ignore
//! use promptcut_core::{EngineConfig, SessionStore, SingleStepPlanner, Orchestrator};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::new();
//! let store = SessionStore::new(&config.sessions_dir);
//! let id = store.ingest(std::path::Path::new("upload.mp4")).await?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod planner;
pub mod session;
pub mod synthesizer;
pub mod types;

pub use config::{ConfigError, EngineConfig};
pub use error::{
    EditError, FailedCandidate, PlanningError, SessionError, StepError, SynthesisError,
};
pub use orchestrator::{EditOutcome, Orchestrator};
pub use planner::{LlmPlanner, Planner, SingleStepPlanner};
pub use session::{EditReport, SessionStore};
pub use synthesizer::ScriptSynthesizer;
pub use types::{CompletedStep, History, HistoryEntry, Plan, SessionId, Step, StepContext};
