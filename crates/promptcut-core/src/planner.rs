//! Instruction planning
//!
//! Decomposes a free-text edit instruction into an ordered plan of tool
//! steps. Two planners exist:
//! - [`SingleStepPlanner`]: the whole instruction becomes one step on the
//!   default tool. This is the conservative path and the CLI default.
//! - [`LlmPlanner`]: asks the generation service for a JSON decomposition
//!   over the registered tools.

use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, warn};

use promptcut_gen::{strip_code_fences, GenerationClient, GenerationRequest};
use promptcut_plugins::PluginRegistry;

use crate::error::PlanningError;
use crate::types::{Plan, Step};

/// Turns an instruction into an ordered plan.
#[async_trait]
pub trait Planner: Send + Sync {
    /// Plan the given instruction over the registered tools.
    async fn plan(
        &self,
        instruction: &str,
        registry: &PluginRegistry,
    ) -> Result<Plan, PlanningError>;
}

/// Single-step planner: one step, one configured tool.
#[derive(Debug, Clone)]
pub struct SingleStepPlanner {
    default_tool: String,
}

impl SingleStepPlanner {
    /// Planner that assigns every instruction to `default_tool`.
    #[inline]
    #[must_use]
    pub fn new(default_tool: impl Into<String>) -> Self {
        Self {
            default_tool: default_tool.into(),
        }
    }
}

#[async_trait]
impl Planner for SingleStepPlanner {
    async fn plan(
        &self,
        instruction: &str,
        _registry: &PluginRegistry,
    ) -> Result<Plan, PlanningError> {
        if instruction.trim().is_empty() {
            return Ok(Plan::empty());
        }
        Ok(Plan::single(Step::new(instruction, &self.default_tool)))
    }
}

const PLANNER_INSTRUCTIONS: &str = "\
You decompose a media editing instruction into an ordered list of steps, \
each carried out by exactly one of the available tools. Respond with only a \
JSON array of objects with the keys \"task\" and \"tool\", no markdown and \
no commentary. Use as few steps as possible; an empty array means the \
instruction requires no work. The \"tool\" value must be one of the tool \
names listed.";

static JSON_ARRAY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\[.*\]").expect("valid array regex"));

/// LLM-backed planner: decomposes via the generation service.
pub struct LlmPlanner {
    client: Arc<dyn GenerationClient>,
}

impl LlmPlanner {
    /// Planner decomposing through `client`.
    #[inline]
    #[must_use]
    pub fn new(client: Arc<dyn GenerationClient>) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct RawStep {
    task: String,
    tool: String,
}

#[async_trait]
impl Planner for LlmPlanner {
    async fn plan(
        &self,
        instruction: &str,
        registry: &PluginRegistry,
    ) -> Result<Plan, PlanningError> {
        if instruction.trim().is_empty() {
            return Ok(Plan::empty());
        }

        let user_content = format!(
            "Available tools:\n{}\n\nInstruction: {}",
            registry.describe_all(),
            instruction
        );
        let request = GenerationRequest::new(PLANNER_INSTRUCTIONS, user_content);
        let candidates = self.client.generate(&request).await?;
        let answer = candidates
            .into_iter()
            .next()
            .ok_or_else(|| PlanningError::Malformed("empty planner response".to_string()))?;

        let plan = parse_plan(&answer)?;
        debug!(steps = plan.len(), "instruction decomposed");
        Ok(plan)
    }
}

/// Parse a planner response into a [`Plan`].
///
/// Tolerates fenced responses and surrounding prose by extracting the
/// outermost JSON array before decoding.
fn parse_plan(answer: &str) -> Result<Plan, PlanningError> {
    let cleaned = strip_code_fences(answer);
    let json = JSON_ARRAY
        .find(&cleaned)
        .map(|m| m.as_str())
        .unwrap_or(cleaned.as_str());

    let raw: Vec<RawStep> = serde_json::from_str(json)
        .map_err(|e| PlanningError::Malformed(format!("plan is not a json step array: {e}")))?;

    let steps = raw
        .into_iter()
        .map(|s| {
            if s.task.trim().is_empty() {
                warn!("planner produced a step with an empty task");
            }
            Step::new(s.task, s.tool)
        })
        .collect();
    Ok(Plan { steps })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn single_step_planner_wraps_the_instruction() {
        let registry = PluginRegistry::standard();
        let planner = SingleStepPlanner::new("ffmpeg");
        let plan = planner.plan("flip the video", &registry).await.unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].task, "flip the video");
        assert_eq!(plan.steps[0].tool, "ffmpeg");
    }

    #[tokio::test]
    async fn blank_instruction_is_a_no_op() {
        let registry = PluginRegistry::standard();
        let planner = SingleStepPlanner::new("ffmpeg");
        assert!(planner.plan("  ", &registry).await.unwrap().is_empty());
    }

    #[test]
    fn parse_plan_accepts_plain_json() {
        let plan = parse_plan(r#"[{"task": "probe the clip", "tool": "probe"}]"#).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.steps[0].tool, "probe");
    }

    #[test]
    fn parse_plan_strips_fences_and_prose() {
        let answer = "Here is the plan:\n```json\n[{\"task\": \"t\", \"tool\": \"ffmpeg\"}]\n```";
        let plan = parse_plan(answer).unwrap();
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn parse_plan_accepts_empty_array() {
        assert!(parse_plan("[]").unwrap().is_empty());
    }

    #[test]
    fn parse_plan_rejects_wrong_shape() {
        assert!(matches!(
            parse_plan("no plan here"),
            Err(PlanningError::Malformed(_))
        ));
        assert!(matches!(
            parse_plan(r#"[{"task": "t"}]"#),
            Err(PlanningError::Malformed(_))
        ));
    }
}
