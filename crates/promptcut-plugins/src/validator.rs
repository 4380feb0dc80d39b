//! Shared sandbox validation machinery
//!
//! Every plugin variant certifies candidates the same way; only the budget
//! and the output integrity check differ. The sequence:
//!
//! 1. static parse (tree-sitter) — a script that does not parse never runs
//! 2. populate the sandbox with stand-ins for each declared input; media
//!    stand-ins mirror the probed metadata of the real file, which is
//!    expected to live in the sandbox directory's parent
//! 3. prepend the resolved `inputs`/`outputs` bindings, write the harnessed
//!    script into the sandbox, and run it there under the budget
//! 4. judge the exit and the declared outputs
//!
//! Synthetic files (stand-ins, the harnessed script, produced outputs) are
//! removed on every path; the sandbox directory itself is caller-owned.

use std::path::Path;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{debug, warn};

use promptcut_exec::probe::{is_media_readable, is_video_filename, probe_media};
use promptcut_exec::sandbox::{create_placeholder, create_stand_in_video, StandIns};
use promptcut_exec::syntax::check_python;
use promptcut_exec::{ExecutionError, Executor, MediaMetadata};

use crate::base::{IoMap, SandboxFailure, Verdict};

const HARNESS_FILENAME: &str = "sandbox_script.py";

/// How a plugin judges a declared output after a sandbox run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputCheck {
    /// The output only has to exist.
    Exists,
    /// Media outputs must be readable by `ffprobe`.
    MediaReadable,
    /// The output must parse as JSON.
    JsonWellFormed,
}

/// Prepend the resolved io mappings to `script` as Python bindings.
///
/// A JSON object of string pairs is also a valid Python dict literal, so
/// the maps are serialized once and spliced in as `inputs = {...}` /
/// `outputs = {...}` lines. Generated scripts are instructed to read these
/// names instead of hard-coding filenames.
#[must_use]
pub fn inject_io_bindings(script: &str, inputs: &IoMap, outputs: &IoMap) -> String {
    format!(
        "inputs = {}\noutputs = {}\n\n{}",
        python_dict(inputs),
        python_dict(outputs),
        script
    )
}

fn python_dict(map: &IoMap) -> String {
    serde_json::to_string(map).unwrap_or_else(|_| "{}".to_string())
}

/// Run the shared certification sequence for one candidate.
///
/// `sandbox_dir` must exist and should sit inside the directory holding the
/// step's real input files, so stand-ins can mirror their probed metadata.
/// Inputs that cannot be probed get default synthetic metadata rather than
/// failing the candidate.
pub async fn validate_in_sandbox(
    executor: &Executor,
    script: &str,
    sandbox_dir: &Path,
    inputs: &IoMap,
    outputs: &IoMap,
    budget: Duration,
    output_check: OutputCheck,
) -> Verdict {
    if let Err(issue) = check_python(script) {
        return Verdict::Fail(SandboxFailure::Syntax(issue.to_string()));
    }

    let sandbox_dir = match sandbox_dir.canonicalize() {
        Ok(dir) => dir,
        Err(e) => {
            return Verdict::Fail(SandboxFailure::Environment(format!(
                "sandbox directory unusable: {e}"
            )))
        }
    };
    let real_root = sandbox_dir.parent().map(Path::to_path_buf);

    let mut synthetic = StandIns::new();
    for filename in inputs.values() {
        let created = if is_video_filename(filename) {
            let metadata = match &real_root {
                Some(root) => probe_media(&root.join(filename))
                    .await
                    .unwrap_or_else(MediaMetadata::default),
                None => MediaMetadata::default(),
            };
            create_stand_in_video(&sandbox_dir, filename, &metadata).await
        } else {
            create_placeholder(&sandbox_dir, filename)
        };
        match created {
            Ok(path) => synthetic.track(path),
            Err(e) => {
                synthetic.cleanup();
                return Verdict::Fail(SandboxFailure::Environment(e.to_string()));
            }
        }
    }
    debug!(stand_ins = synthetic.len(), "sandbox populated");

    // Outputs the script writes are synthetic too; cleanup tolerates
    // files that were never created.
    for filename in outputs.values() {
        synthetic.track(sandbox_dir.join(filename));
    }

    let harnessed = inject_io_bindings(script, inputs, outputs);
    let script_path = sandbox_dir.join(HARNESS_FILENAME);
    if let Err(e) = std::fs::write(&script_path, &harnessed) {
        synthetic.cleanup();
        return Verdict::Fail(SandboxFailure::Environment(format!(
            "could not write sandbox script: {e}"
        )));
    }
    synthetic.track(script_path.clone());

    let run = timeout(budget, executor.run_script(&script_path, &sandbox_dir)).await;
    let verdict = match run {
        Err(_) => {
            warn!(budget_secs = budget.as_secs(), "sandbox run timed out");
            Verdict::Fail(SandboxFailure::Timeout(budget))
        }
        Ok(Err(ExecutionError::NonZeroExit { code, stderr, .. })) => {
            Verdict::Fail(SandboxFailure::Execution { code, stderr })
        }
        Ok(Err(ExecutionError::Unexpected(detail))) => {
            Verdict::Fail(SandboxFailure::Environment(detail))
        }
        Ok(Ok(_)) => judge_outputs(&sandbox_dir, outputs, output_check).await,
    };

    synthetic.cleanup();
    verdict
}

async fn judge_outputs(sandbox_dir: &Path, outputs: &IoMap, check: OutputCheck) -> Verdict {
    for (name, filename) in outputs {
        let path = sandbox_dir.join(filename);
        if !path.exists() {
            return Verdict::Fail(SandboxFailure::MissingOutput(filename.clone()));
        }
        match check {
            OutputCheck::Exists => {}
            OutputCheck::MediaReadable => {
                if is_video_filename(filename) && !is_media_readable(&path).await {
                    return Verdict::Fail(SandboxFailure::CorruptOutput {
                        name: name.clone(),
                        detail: "ffprobe cannot read the produced media".to_string(),
                    });
                }
            }
            OutputCheck::JsonWellFormed => {
                let raw = match std::fs::read_to_string(&path) {
                    Ok(raw) => raw,
                    Err(e) => {
                        return Verdict::Fail(SandboxFailure::CorruptOutput {
                            name: name.clone(),
                            detail: format!("output unreadable: {e}"),
                        })
                    }
                };
                if let Err(e) = serde_json::from_str::<serde_json::Value>(&raw) {
                    return Verdict::Fail(SandboxFailure::CorruptOutput {
                        name: name.clone(),
                        detail: format!("output is not valid json: {e}"),
                    });
                }
            }
        }
    }
    Verdict::Pass
}
