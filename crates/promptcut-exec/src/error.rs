//! Error types for the execution layer

/// Failure while running a script through the [`crate::Executor`].
#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The script ran but exited with a nonzero status.
    #[error("script exited with status {}", code.map(|c| c.to_string()).unwrap_or_else(|| "signal".to_string()))]
    NonZeroExit {
        /// Exit code, `None` when terminated by a signal
        code: Option<i32>,
        /// Captured standard output
        stdout: String,
        /// Captured standard error
        stderr: String,
    },

    /// The run could not be established at all: relative script path,
    /// missing working directory, missing interpreter, and similar.
    #[error("could not run script: {0}")]
    Unexpected(String),
}

impl ExecutionError {
    /// Captured stderr, when the failure carries one.
    #[inline]
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::NonZeroExit { stderr, .. } => Some(stderr),
            Self::Unexpected(_) => None,
        }
    }
}

/// Failure while preparing stand-in assets for a sandbox.
#[derive(Debug, thiserror::Error)]
pub enum SandboxSetupError {
    /// A placeholder file could not be written.
    #[error("could not create placeholder '{filename}': {source}")]
    Placeholder {
        /// The stand-in filename
        filename: String,
        /// Underlying io error
        source: std::io::Error,
    },
}
