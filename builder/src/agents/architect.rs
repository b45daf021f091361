//! Architect stage: expand a plan into an ordered task sequence.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, instrument};

use crate::core::types::{Plan, TaskPlan};
use crate::engine::ReasoningEngine;
use crate::errors::PipelineError;
use crate::io::prompt::PromptBuilder;

const TASK_PLAN_SCHEMA: &str = include_str!("../../schemas/task_plan.schema.json");

/// Architect-stage wrapper that owns the task-plan schema.
pub struct Architect {
    schema: Value,
}

impl Architect {
    pub fn new() -> Result<Self> {
        Ok(Self {
            schema: serde_json::from_str(TASK_PLAN_SCHEMA).context("parse task plan schema")?,
        })
    }

    /// Decompose `plan` into implementation steps.
    ///
    /// The plan is serialized losslessly into the directive; the returned
    /// task plan gets the originating plan attached for traceability. Fails
    /// with [`PipelineError::Architect`] when the engine yields no valid
    /// structured response.
    #[instrument(skip_all, fields(plan = %plan.name))]
    pub fn run<E: ReasoningEngine>(
        &self,
        engine: &E,
        prompts: &PromptBuilder,
        plan: &Plan,
    ) -> Result<TaskPlan> {
        let plan_json = serde_json::to_string_pretty(plan).context("serialize plan")?;
        let directive = prompts.architect(&plan_json)?;
        let value = engine
            .invoke_structured(&directive, &self.schema)
            .context("invoke architect engine")?
            .ok_or(PipelineError::Architect)?;
        let mut task_plan: TaskPlan =
            serde_json::from_value(value).context("deserialize task plan")?;
        task_plan.plan = Some(plan.clone());

        info!(steps = task_plan.implementation_steps.len(), "task plan produced");
        if let Ok(audit) = serde_json::to_string(&task_plan) {
            debug!(task_plan = %audit, "task plan detail");
        }
        Ok(task_plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{ScriptedEngine, ScriptedResponse, plan, task_plan_value};

    #[test]
    fn architect_attaches_the_originating_plan() {
        let engine = ScriptedEngine::new(vec![ScriptedResponse::Structured(Some(
            task_plan_value(&["index.html", "style.css"]),
        ))]);
        let architect = Architect::new().expect("architect");
        let source_plan = plan("static-site", &["index.html", "style.css"]);

        let task_plan = architect
            .run(&engine, &PromptBuilder::new(), &source_plan)
            .expect("task plan");

        assert_eq!(task_plan.implementation_steps.len(), 2);
        assert_eq!(task_plan.implementation_steps[0].filepath, "index.html");
        assert_eq!(task_plan.plan.as_ref().expect("plan").name, "static-site");
    }

    #[test]
    fn missing_engine_response_is_an_architect_error() {
        let engine = ScriptedEngine::new(vec![ScriptedResponse::Structured(None)]);
        let architect = Architect::new().expect("architect");

        let err = architect
            .run(&engine, &PromptBuilder::new(), &plan("app", &["a.txt"]))
            .expect_err("task plan");
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::Architect)
        ));
    }
}
