//! Orchestrator: plan stage → architect stage → execution loop.
//!
//! Stages run strictly in sequence on one logical thread. The execution loop
//! self-loops until the termination signal, observing the cooperative cancel
//! flag between steps (never mid-step) and the run-wide tool-call ceiling.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Result;
use tracing::{info, instrument, warn};

use crate::agents::architect::Architect;
use crate::agents::coder::{self, CoderConfig, StepOutcome};
use crate::agents::planner::Planner;
use crate::core::state::{ExecutionState, Signal};
use crate::core::types::Plan;
use crate::engine::ReasoningEngine;
use crate::io::prompt::PromptBuilder;
use crate::io::tools::ToolSet;
use crate::session::CallBudget;

/// Cooperative cancellation flag, checked between steps.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// How a pipeline run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Every implementation step completed.
    Completed,
    /// The user cancelled; no further activations were issued.
    Cancelled,
}

/// Summary of a pipeline run.
#[derive(Debug)]
pub struct RunOutcome {
    pub plan: Plan,
    pub steps_completed: usize,
    pub tool_calls_used: u32,
    pub status: RunStatus,
}

/// Run-level configuration for the orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Total worker tool calls allowed across the run.
    pub recursion_limit: u32,
    pub coder: CoderConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            recursion_limit: 100,
            coder: CoderConfig::default(),
        }
    }
}

/// Run the full pipeline for `request`.
///
/// `on_step` observes each completed activation; step failures and stage
/// failures propagate to the caller without advancing state, so a failed run
/// reports exactly where it stopped.
#[instrument(skip_all)]
pub fn run_pipeline<E: ReasoningEngine, F: FnMut(&StepOutcome)>(
    engine: &E,
    tools: &ToolSet,
    config: &PipelineConfig,
    request: &str,
    cancel: &CancelFlag,
    mut on_step: F,
) -> Result<RunOutcome> {
    let prompts = PromptBuilder::new();
    let planner = Planner::new()?;
    let architect = Architect::new()?;

    let plan = planner.run(engine, &prompts, request)?;
    let task_plan = architect.run(engine, &prompts, &plan)?;

    let budget = CallBudget::new(config.recursion_limit);
    let mut state = ExecutionState::new(task_plan);
    let mut steps_completed = 0usize;

    while state.signal() == Signal::Continue {
        if cancel.is_cancelled() {
            warn!(steps_completed, "cancelled between steps");
            return Ok(RunOutcome {
                plan,
                steps_completed,
                tool_calls_used: budget.used(),
                status: RunStatus::Cancelled,
            });
        }

        let outcome = coder::run_step(engine, tools, &prompts, &budget, &config.coder, &mut state)?;
        steps_completed += 1;
        on_step(&outcome);
    }

    info!(steps_completed, tool_calls = budget.used(), "pipeline complete");
    Ok(RunOutcome {
        plan,
        steps_completed,
        tool_calls_used: budget.used(),
        status: RunStatus::Completed,
    })
}
