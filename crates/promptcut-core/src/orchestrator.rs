//! Plan orchestration
//!
//! Executes a plan as one atomic edit. All intermediate work happens in a
//! scoped temp directory under the session dir; nothing reaches the session
//! until every step has succeeded, so a failure at step *j* leaves the
//! session exactly as it was. Steps run sequentially because step *i*+1
//! consumes step *i*'s output.

use std::path::Path;
use std::time::Duration;

use tokio::time::timeout;
use tracing::{info, warn};

use promptcut_exec::Executor;
use promptcut_plugins::{inject_io_bindings, IoMap, PluginRegistry};

use crate::error::{EditError, StepError};
use crate::synthesizer::ScriptSynthesizer;
use crate::types::{CompletedStep, Plan, StepContext};

/// What a successful edit produced.
#[derive(Debug)]
pub struct EditOutcome {
    /// Filename of the promoted artifact, relative to the session dir
    pub artifact: String,
    /// The certified script of the final step
    pub script: String,
    /// Every step that ran, in order
    pub steps: Vec<CompletedStep>,
}

/// Drives a plan's steps through synthesis, certification, and real
/// execution, then promotes the result.
pub struct Orchestrator {
    registry: std::sync::Arc<PluginRegistry>,
    synthesizer: ScriptSynthesizer,
    executor: Executor,
    step_timeout: Duration,
}

impl Orchestrator {
    /// Orchestrator with the default 600 s real-run bound.
    #[must_use]
    pub fn new(
        registry: std::sync::Arc<PluginRegistry>,
        synthesizer: ScriptSynthesizer,
        executor: Executor,
    ) -> Self {
        Self {
            registry,
            synthesizer,
            executor,
            step_timeout: Duration::from_secs(600),
        }
    }

    /// Override the bound on each step's run against real data.
    #[inline]
    #[must_use]
    pub fn with_step_timeout(mut self, bound: Duration) -> Self {
        self.step_timeout = bound.max(Duration::from_secs(1));
        self
    }

    /// Execute `plan` against the session's current artifact.
    ///
    /// `current_artifact` is the filename (relative to `session_dir`) the
    /// first step reads; `next_index` is the version the edit will create,
    /// naming the promoted artifact `proxy{next_index}.mp4` and its script
    /// `edit{next_index - 1}.py`.
    ///
    /// Returns `Ok(None)` for an empty plan: a no-op edit that creates no
    /// version.
    pub async fn run_plan(
        &self,
        plan: &Plan,
        instruction: &str,
        session_dir: &Path,
        current_artifact: &str,
        next_index: usize,
    ) -> Result<Option<EditOutcome>, EditError> {
        if plan.is_empty() {
            info!("plan is empty; nothing to do");
            return Ok(None);
        }

        let chain = tempfile::Builder::new()
            .prefix("edit-")
            .tempdir_in(session_dir)
            .map_err(|e| step_error(1, plan, StepError::Workspace(e.to_string())))?;

        // The chain dir holds every real input a step reads, so sandbox
        // dirs created inside it can probe real metadata from its parent.
        std::fs::copy(
            session_dir.join(current_artifact),
            chain.path().join(current_artifact),
        )
        .map_err(|e| {
            step_error(
                1,
                plan,
                StepError::Workspace(format!("cannot stage {current_artifact}: {e}")),
            )
        })?;

        let total = plan.len();
        let final_artifact = format!("proxy{next_index}.mp4");
        let mut completed: Vec<CompletedStep> = Vec::with_capacity(total);
        let mut previous_output = current_artifact.to_string();

        for (ordinal, step) in plan.steps.iter().enumerate().map(|(i, s)| (i + 1, s)) {
            let plugin = self
                .registry
                .get(&step.tool)
                .ok_or_else(|| step_error(ordinal, plan, StepError::UnknownTool(step.tool.clone())))?;

            let output_name = if ordinal == total {
                final_artifact.clone()
            } else {
                format!("step{ordinal}_output.mp4")
            };
            let mut inputs = IoMap::new();
            inputs.insert("input".to_string(), previous_output.clone());
            let mut outputs = IoMap::new();
            outputs.insert("output".to_string(), output_name.clone());

            let context = StepContext {
                instruction: instruction.to_string(),
                plan: plan.clone(),
                step_number: ordinal,
                completed: completed.clone(),
                inputs: inputs.clone(),
                outputs: outputs.clone(),
            };

            let sandbox = chain.path().join(format!("sandbox{ordinal}"));
            std::fs::create_dir(&sandbox).map_err(|e| {
                step_error(ordinal, plan, StepError::Workspace(e.to_string()))
            })?;

            let script = self
                .synthesizer
                .synthesize(plugin.as_ref(), &context, &sandbox)
                .await
                .map_err(|e| step_error(ordinal, plan, StepError::Synthesis(e)))?;

            self.run_certified(&script, &inputs, &outputs, chain.path(), ordinal)
                .await
                .map_err(|e| step_error(ordinal, plan, e))?;

            if !chain.path().join(&output_name).exists() {
                return Err(step_error(
                    ordinal,
                    plan,
                    StepError::MissingOutput(output_name),
                ));
            }

            info!(step = ordinal, tool = %step.tool, output = %output_name, "step completed");
            completed.push(CompletedStep {
                task: step.task.clone(),
                tool: step.tool.clone(),
                inputs,
                outputs,
                script: script.clone(),
            });
            previous_output = output_name;
        }

        // Every step succeeded; promote into the session dir. The chain dir
        // lives inside the session dir, so rename stays on one filesystem.
        let script = completed
            .last()
            .map(|s| s.script.clone())
            .unwrap_or_default();
        std::fs::rename(
            chain.path().join(&final_artifact),
            session_dir.join(&final_artifact),
        )
        .map_err(|e| step_error(total, plan, StepError::Workspace(e.to_string())))?;
        let script_name = format!("edit{}.py", next_index.saturating_sub(1));
        std::fs::write(session_dir.join(&script_name), &script)
            .map_err(|e| step_error(total, plan, StepError::Workspace(e.to_string())))?;

        Ok(Some(EditOutcome {
            artifact: final_artifact,
            script,
            steps: completed,
        }))
    }

    /// Run one certified script against real data, bounded.
    async fn run_certified(
        &self,
        script: &str,
        inputs: &IoMap,
        outputs: &IoMap,
        chain_dir: &Path,
        ordinal: usize,
    ) -> Result<(), StepError> {
        let harnessed = inject_io_bindings(script, inputs, outputs);
        let script_path = chain_dir.join(format!("step{ordinal}.py"));
        std::fs::write(&script_path, &harnessed)
            .map_err(|e| StepError::Workspace(format!("cannot write step script: {e}")))?;
        let script_path = script_path
            .canonicalize()
            .map_err(|e| StepError::Workspace(e.to_string()))?;

        match timeout(
            self.step_timeout,
            self.executor.run_script(&script_path, chain_dir),
        )
        .await
        {
            Err(_) => {
                warn!(step = ordinal, "real run exceeded its bound");
                Err(StepError::Timeout(self.step_timeout.as_secs()))
            }
            Ok(Err(e)) => Err(StepError::Execution(e)),
            Ok(Ok(_)) => Ok(()),
        }
    }
}

fn step_error(ordinal: usize, plan: &Plan, source: StepError) -> EditError {
    let task = plan
        .steps
        .get(ordinal - 1)
        .map(|s| s.task.clone())
        .unwrap_or_default();
    EditError::Step {
        step: ordinal,
        task,
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn step_error_names_the_step() {
        let plan = Plan {
            steps: vec![crate::types::Step::new("flip it", "ffmpeg")],
        };
        let err = step_error(1, &plan, StepError::UnknownTool("ffmpeg".to_string()));
        match err {
            EditError::Step { step, task, .. } => {
                assert_eq!(step, 1);
                assert_eq!(task, "flip it");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
