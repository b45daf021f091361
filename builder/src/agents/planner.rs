//! Plan stage: turn a free-text request into a structured plan.

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{info, instrument};

use crate::core::types::Plan;
use crate::engine::ReasoningEngine;
use crate::errors::PipelineError;
use crate::io::prompt::PromptBuilder;

const PLAN_SCHEMA: &str = include_str!("../../schemas/plan.schema.json");

/// Plan-stage wrapper that owns the plan schema.
pub struct Planner {
    schema: Value,
}

impl Planner {
    pub fn new() -> Result<Self> {
        Ok(Self {
            schema: serde_json::from_str(PLAN_SCHEMA).context("parse plan schema")?,
        })
    }

    /// Produce the plan for `request`.
    ///
    /// Fails with [`PipelineError::Planning`] when the engine yields no valid
    /// structured response.
    #[instrument(skip_all)]
    pub fn run<E: ReasoningEngine>(
        &self,
        engine: &E,
        prompts: &PromptBuilder,
        request: &str,
    ) -> Result<Plan> {
        let directive = prompts.planner(request)?;
        let value = engine
            .invoke_structured(&directive, &self.schema)
            .context("invoke planner engine")?
            .ok_or(PipelineError::Planning)?;
        let plan: Plan = serde_json::from_value(value).context("deserialize plan")?;
        info!(name = %plan.name, files = plan.files.len(), "plan produced");
        Ok(plan)
    }
}
