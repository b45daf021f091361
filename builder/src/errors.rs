//! Typed errors for the sandboxed tool layer and the pipeline stages.
//!
//! Errors propagate through `anyhow` with context attached; callers that need
//! to branch on a specific failure use `downcast_ref` on these types.

use thiserror::Error;

/// Errors produced by the sandboxed tool layer.
#[derive(Debug, Error)]
pub enum ToolError {
    /// A requested path resolves outside the project root. Never silently
    /// corrected.
    #[error("security violation: '{path}' resolves outside the project root")]
    SecurityViolation { path: String },

    /// A listing target resolved to something other than a directory.
    #[error("'{path}' is not a directory")]
    NotADirectory { path: String },

    /// A shell command exceeded its wall-clock budget. Carries whatever
    /// output was captured before the timeout fired.
    #[error("command timed out after {timeout_secs}s")]
    ExecutionTimeout {
        timeout_secs: u64,
        stdout: String,
        stderr: String,
    },

    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl ToolError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Errors produced by the orchestration stages.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The engine produced no valid structured plan.
    #[error("planner returned no valid plan")]
    Planning,

    /// The engine produced no valid task plan.
    #[error("architect returned no valid task plan")]
    Architect,

    /// A single implementation step's worker session failed. The execution
    /// state is left at the failing index so the step can be re-activated.
    #[error("step {index} ({filepath}) failed")]
    Step {
        index: usize,
        filepath: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The worker attempted an operation outside the tool protocol. Rejected
    /// before any filesystem mutation.
    #[error("protocol violation: {reason}")]
    ProtocolViolation { reason: String },

    /// The global tool-call ceiling for the run was exhausted.
    #[error("tool-call ceiling of {limit} exceeded")]
    CeilingExceeded { limit: u32 },

    /// A single step's tool-call bound was exhausted.
    #[error("worker used all {max_calls} tool calls for this step")]
    StepBudgetExhausted { max_calls: usize },
}

impl PipelineError {
    pub(crate) fn step(index: usize, filepath: &str, source: anyhow::Error) -> Self {
        Self::Step {
            index,
            filepath: filepath.to_string(),
            source: source.into(),
        }
    }

    pub(crate) fn protocol(reason: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            reason: reason.into(),
        }
    }
}
