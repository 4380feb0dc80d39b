//! Engine configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the edit engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Root directory session directories are created under
    pub sessions_dir: PathBuf,
    /// Interpreter used for generated scripts
    pub python: PathBuf,
    /// Generation attempts per step before giving up
    pub retry_budget: usize,
    /// Candidates requested per attempt after the first
    pub retry_candidates: usize,
    /// Bound on a certified script's run against real data, in seconds
    pub step_timeout_secs: u64,
    /// Tool used when planning does not decompose the instruction
    pub default_tool: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sessions_dir: PathBuf::from("sessions"),
            python: PathBuf::from("python3"),
            retry_budget: 3,
            retry_candidates: 3,
            step_timeout_secs: 600,
            default_tool: "ffmpeg".to_string(),
        }
    }
}

impl EngineConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the sessions root.
    #[inline]
    #[must_use]
    pub fn with_sessions_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.sessions_dir = dir.into();
        self
    }

    /// Set the script interpreter.
    #[inline]
    #[must_use]
    pub fn with_python(mut self, python: impl Into<PathBuf>) -> Self {
        self.python = python.into();
        self
    }

    /// Set the generation attempt budget (floor of 1).
    #[inline]
    #[must_use]
    pub fn with_retry_budget(mut self, budget: usize) -> Self {
        self.retry_budget = budget.max(1);
        self
    }

    /// Set the real-run bound.
    #[inline]
    #[must_use]
    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.step_timeout_secs = timeout.as_secs().max(1);
        self
    }

    /// Set the default tool name.
    #[inline]
    #[must_use]
    pub fn with_default_tool(mut self, tool: impl Into<String>) -> Self {
        self.default_tool = tool.into();
        self
    }

    /// The real-run bound as a [`Duration`].
    #[inline]
    #[must_use]
    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }

    /// Load configuration from a TOML file. Missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&raw).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
    }
}

/// Configuration loading failure.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("cannot read config {path:?}: {source}")]
    Read {
        /// The config path
        path: PathBuf,
        /// Underlying io error
        source: std::io::Error,
    },

    /// The file is not valid TOML of the expected shape.
    #[error("cannot parse config {path:?}: {detail}")]
    Parse {
        /// The config path
        path: PathBuf,
        /// Parser diagnostic
        detail: String,
    },
}
