//! Script synthesis
//!
//! Produces one certified script for one plan step. The loop is explicit
//! and bounded: each attempt requests candidates from the generation
//! service, strips formatting, and certifies them sequentially in the
//! sandbox; the first certified candidate wins. From the second attempt on,
//! the request carries a feedback block with every prior failing
//! candidate's code and error, so the service can correct itself instead of
//! repeating the mistake.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, warn};

use promptcut_gen::{strip_code_fences, GenerationClient, GenerationRequest};
use promptcut_plugins::{full_instructions, ToolPlugin, Verdict};

use crate::error::{truncate_diagnostic, FailedCandidate, SynthesisError};
use crate::types::StepContext;

/// Synthesizes certified scripts through a generation client.
pub struct ScriptSynthesizer {
    client: Arc<dyn GenerationClient>,
    retry_budget: usize,
    retry_candidates: usize,
}

impl ScriptSynthesizer {
    /// Synthesizer with the standard budget: 3 attempts, 3 candidates on
    /// retry attempts.
    #[must_use]
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self {
            client,
            retry_budget: 3,
            retry_candidates: 3,
        }
    }

    /// Override the attempt budget (floor of 1).
    #[inline]
    #[must_use]
    pub fn with_retry_budget(mut self, budget: usize) -> Self {
        self.retry_budget = budget.max(1);
        self
    }

    /// Override the candidates requested per retry attempt (floor of 1).
    #[inline]
    #[must_use]
    pub fn with_retry_candidates(mut self, candidates: usize) -> Self {
        self.retry_candidates = candidates.max(1);
        self
    }

    /// Produce one script certified by `plugin` for the step in `context`.
    ///
    /// `sandbox_dir` is a caller-owned directory inside the directory that
    /// holds the step's real inputs; certification populates and cleans it
    /// per candidate.
    pub async fn synthesize(
        &self,
        plugin: &dyn ToolPlugin,
        context: &StepContext,
        sandbox_dir: &Path,
    ) -> Result<String, SynthesisError> {
        let system_instruction = full_instructions(plugin);
        let mut failed: Vec<FailedCandidate> = Vec::new();
        let mut last_service_error = None;

        for attempt in 1..=self.retry_budget {
            let count = if attempt == 1 { 1 } else { self.retry_candidates };
            let request = GenerationRequest::new(
                system_instruction.clone(),
                build_user_content(context, &failed),
            )
            .with_candidate_count(count);

            debug!(tool = plugin.name(), attempt, candidates = count, "requesting candidates");
            let candidates = match self.client.generate(&request).await {
                Ok(candidates) => candidates,
                Err(e) => {
                    warn!(attempt, error = %e, "generation service failed");
                    last_service_error = Some(e);
                    continue;
                }
            };
            if candidates.is_empty() {
                warn!(attempt, "generation returned no candidates");
                continue;
            }

            for candidate in candidates {
                let script = strip_code_fences(&candidate);
                match plugin
                    .validate(&script, sandbox_dir, &context.inputs, &context.outputs)
                    .await
                {
                    Verdict::Pass => {
                        info!(tool = plugin.name(), attempt, "candidate certified");
                        return Ok(script);
                    }
                    Verdict::Fail(failure) => {
                        debug!(attempt, failure = %failure, "candidate rejected");
                        failed.push(FailedCandidate::rejected(attempt, script, &failure));
                    }
                }
            }
        }

        // Exhausted. If nothing ever validated because the service itself
        // kept failing, surface that rather than an empty exhaustion.
        if failed.is_empty() {
            if let Some(e) = last_service_error {
                return Err(SynthesisError::Service(e));
            }
        }
        let last_error = failed
            .last()
            .map(|c| truncate_diagnostic(&c.error))
            .unwrap_or_else(|| "no candidates were produced".to_string());
        Err(SynthesisError::ValidationExhausted {
            attempts: self.retry_budget,
            candidates: failed,
            last_error,
        })
    }
}

/// Assemble the user-facing request content for one attempt.
fn build_user_content(context: &StepContext, failed: &[FailedCandidate]) -> String {
    let mut content = String::new();

    content.push_str(&format!("Overall instruction: {}\n", context.instruction));
    if context.plan.len() > 1 {
        content.push_str(&format!(
            "This is step {} of {}:\n",
            context.step_number,
            context.plan.len()
        ));
        for (i, step) in context.plan.steps.iter().enumerate() {
            content.push_str(&format!("  {}. [{}] {}\n", i + 1, step.tool, step.task));
        }
    }
    if let Some(step) = context.step() {
        content.push_str(&format!("\nYour task: {}\n", step.task));
    }

    content.push_str(&format!(
        "\nThe script will run with these bindings already defined:\ninputs = {}\noutputs = {}\n",
        serde_json::to_string(&context.inputs).unwrap_or_else(|_| "{}".to_string()),
        serde_json::to_string(&context.outputs).unwrap_or_else(|_| "{}".to_string()),
    ));

    if !context.completed.is_empty() {
        content.push_str("\nSteps already completed in this edit:\n");
        for done in &context.completed {
            content.push_str(&format!(
                "- [{}] {} (outputs: {})\n",
                done.tool,
                done.task,
                serde_json::to_string(&done.outputs).unwrap_or_else(|_| "{}".to_string()),
            ));
        }
    }

    if !failed.is_empty() {
        content.push_str(
            "\nEarlier candidates failed validation. Write a corrected script; \
             do not repeat these mistakes.\n",
        );
        for candidate in failed {
            content.push_str(&format!(
                "\n--- attempt {} candidate ---\n{}\n--- its error ---\n{}\n",
                candidate.attempt,
                candidate.script,
                truncate_diagnostic(&candidate.error),
            ));
        }
    }

    content
}

#[cfg(test)]
mod tests {
    use super::*;
    use promptcut_plugins::IoMap;

    use crate::types::{Plan, Step};

    fn context() -> StepContext {
        let mut inputs = IoMap::new();
        inputs.insert("clip".to_string(), "proxy1.mp4".to_string());
        let mut outputs = IoMap::new();
        outputs.insert("result".to_string(), "step1_output.mp4".to_string());
        StepContext {
            instruction: "flip the video".to_string(),
            plan: Plan::single(Step::new("flip the video", "ffmpeg")),
            step_number: 1,
            completed: Vec::new(),
            inputs,
            outputs,
        }
    }

    #[test]
    fn first_attempt_content_has_no_feedback() {
        let content = build_user_content(&context(), &[]);
        assert!(content.contains("flip the video"));
        assert!(content.contains("proxy1.mp4"));
        assert!(content.contains("step1_output.mp4"));
        assert!(!content.contains("failed validation"));
    }

    #[test]
    fn retry_content_carries_every_prior_failure() {
        let failed = vec![
            FailedCandidate {
                attempt: 1,
                script: "bad_one()".to_string(),
                error: "exit 1: boom".to_string(),
            },
            FailedCandidate {
                attempt: 2,
                script: "bad_two()".to_string(),
                error: "output missing".to_string(),
            },
        ];
        let content = build_user_content(&context(), &failed);
        assert!(content.contains("bad_one()"));
        assert!(content.contains("exit 1: boom"));
        assert!(content.contains("bad_two()"));
        assert!(content.contains("output missing"));
    }

    #[test]
    fn multi_step_content_lists_the_whole_plan() {
        let mut ctx = context();
        ctx.plan = Plan {
            steps: vec![
                Step::new("probe the clip", "probe"),
                Step::new("flip the video", "ffmpeg"),
            ],
        };
        ctx.step_number = 2;
        let content = build_user_content(&ctx, &[]);
        assert!(content.contains("step 2 of 2"));
        assert!(content.contains("probe the clip"));
    }
}
