//! Execution loop activations: drive one implementation step at a time.

use anyhow::{Result, anyhow};
use tracing::{info, instrument};

use crate::core::state::{ExecutionState, Signal};
use crate::engine::ReasoningEngine;
use crate::errors::PipelineError;
use crate::io::prompt::PromptBuilder;
use crate::io::tools::ToolSet;
use crate::session::{CallBudget, ToolEvent, ToolSession};

/// Per-step bound on worker tool calls.
#[derive(Debug, Clone)]
pub struct CoderConfig {
    pub max_tool_calls_per_step: usize,
}

impl Default for CoderConfig {
    fn default() -> Self {
        Self {
            max_tool_calls_per_step: 25,
        }
    }
}

/// Result of one successful execution-loop activation.
#[derive(Debug)]
pub struct StepOutcome {
    /// Index of the step that ran.
    pub index: usize,
    /// Target file of the step that ran.
    pub filepath: String,
    /// Tool invocations the worker performed, in order.
    pub invocations: Vec<ToolEvent>,
    /// Final textual response from the worker session.
    pub final_response: String,
    /// Signal after advancing past this step.
    pub signal: Signal,
}

/// Execute the current step of `state`.
///
/// Reads the target file's existing content, composes the worker directive,
/// and runs the bounded tool-call sub-session. On success the cursor advances
/// by exactly one. On failure the cursor is left untouched so the same step
/// can be re-activated, and the error is reported as
/// [`PipelineError::Step`] tagged with the step's index and filepath.
#[instrument(skip_all, fields(step = state.current_step_idx()))]
pub fn run_step<E: ReasoningEngine>(
    engine: &E,
    tools: &ToolSet,
    prompts: &PromptBuilder,
    budget: &CallBudget,
    config: &CoderConfig,
    state: &mut ExecutionState,
) -> Result<StepOutcome> {
    let index = state.current_step_idx();
    let step = state
        .current_step()
        .ok_or_else(|| anyhow!("no step to execute (loop already done)"))?
        .clone();

    let attempt = (|| -> Result<(Vec<ToolEvent>, String)> {
        let existing_content = tools.read_file(&step.filepath)?;
        let system_directive = prompts.coder_system()?;
        let task_directive = prompts.coder_task(&step, &existing_content)?;

        let mut session = ToolSession::new(tools, budget, config.max_tool_calls_per_step);
        let final_response =
            engine.invoke_with_tools(&system_directive, &task_directive, &mut session)?;
        Ok((session.into_events(), final_response))
    })();

    match attempt {
        Ok((invocations, final_response)) => {
            let signal = state.advance();
            info!(index, filepath = %step.filepath, calls = invocations.len(), "step completed");
            Ok(StepOutcome {
                index,
                filepath: step.filepath,
                invocations,
                final_response,
                signal,
            })
        }
        Err(source) => Err(PipelineError::step(index, &step.filepath, source).into()),
    }
}
