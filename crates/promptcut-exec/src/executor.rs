//! Script executor
//!
//! Runs a fully-formed script through an interpreter with a given working
//! directory, capturing both output streams on every path. The executor
//! imposes no timeout of its own; callers that need one wrap the call in
//! `tokio::time::timeout`.

use crate::error::ExecutionError;
use std::path::{Path, PathBuf};
use tokio::process::Command;

/// Captured output of a successful script run.
#[derive(Debug, Clone)]
pub struct ScriptOutput {
    /// Captured standard output
    pub stdout: String,
    /// Captured standard error
    pub stderr: String,
}

/// Runs scripts through a configurable interpreter.
#[derive(Debug, Clone)]
pub struct Executor {
    interpreter: PathBuf,
}

impl Executor {
    /// Create an executor using the default `python3` interpreter.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            interpreter: PathBuf::from("python3"),
        }
    }

    /// Create an executor for a specific interpreter binary.
    #[inline]
    #[must_use]
    pub fn with_interpreter(interpreter: impl Into<PathBuf>) -> Self {
        Self {
            interpreter: interpreter.into(),
        }
    }

    /// The configured interpreter.
    #[inline]
    #[must_use]
    pub fn interpreter(&self) -> &Path {
        &self.interpreter
    }

    /// Run `script` with `workdir` as its working directory.
    ///
    /// `script` must be an absolute path and `workdir` must exist; both are
    /// checked up front so a misconfigured call surfaces as
    /// [`ExecutionError::Unexpected`] rather than an interpreter error.
    pub async fn run_script(
        &self,
        script: &Path,
        workdir: &Path,
    ) -> Result<ScriptOutput, ExecutionError> {
        if !script.is_absolute() {
            return Err(ExecutionError::Unexpected(format!(
                "script path must be absolute, got '{}'",
                script.display()
            )));
        }
        if !workdir.is_dir() {
            return Err(ExecutionError::Unexpected(format!(
                "working directory '{}' does not exist",
                workdir.display()
            )));
        }

        tracing::debug!(
            script = %script.display(),
            workdir = %workdir.display(),
            "running script"
        );

        let output = Command::new(&self.interpreter)
            .arg(script)
            .current_dir(workdir)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                ExecutionError::Unexpected(format!(
                    "failed to launch '{}': {}",
                    self.interpreter.display(),
                    e
                ))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if output.status.success() {
            tracing::debug!(script = %script.display(), "script run succeeded");
            Ok(ScriptOutput { stdout, stderr })
        } else {
            tracing::warn!(
                script = %script.display(),
                code = ?output.status.code(),
                "script run failed"
            );
            Err(ExecutionError::NonZeroExit {
                code: output.status.code(),
                stdout,
                stderr,
            })
        }
    }
}

impl Default for Executor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sh() -> Executor {
        Executor::with_interpreter("/bin/sh")
    }

    #[tokio::test]
    async fn rejects_relative_script_path() {
        let dir = tempfile::tempdir().unwrap();
        let err = sh()
            .run_script(Path::new("script.sh"), dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Unexpected(_)));
    }

    #[tokio::test]
    async fn rejects_missing_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ok.sh");
        std::fs::write(&script, "exit 0\n").unwrap();
        let err = sh()
            .run_script(&script, &dir.path().join("nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Unexpected(_)));
    }

    #[tokio::test]
    async fn captures_stdout_on_success() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("hello.sh");
        std::fs::write(&script, "echo hello\necho oops >&2\n").unwrap();
        let out = sh().run_script(&script, dir.path()).await.unwrap();
        assert_eq!(out.stdout.trim(), "hello");
        assert_eq!(out.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn nonzero_exit_carries_streams() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "echo partial\necho bad >&2\nexit 3\n").unwrap();
        let err = sh().run_script(&script, dir.path()).await.unwrap_err();
        match err {
            ExecutionError::NonZeroExit {
                code,
                stdout,
                stderr,
            } => {
                assert_eq!(code, Some(3));
                assert_eq!(stdout.trim(), "partial");
                assert_eq!(stderr.trim(), "bad");
            }
            other => panic!("expected NonZeroExit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn runs_relative_to_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("touch.sh");
        std::fs::write(&script, "touch produced.txt\n").unwrap();
        sh().run_script(&script, dir.path()).await.unwrap();
        assert!(dir.path().join("produced.txt").exists());
    }

    #[tokio::test]
    async fn missing_interpreter_is_unexpected() {
        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("ok.sh");
        std::fs::write(&script, "exit 0\n").unwrap();
        let err = Executor::with_interpreter("/no/such/interpreter")
            .run_script(&script, dir.path())
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutionError::Unexpected(_)));
    }
}
