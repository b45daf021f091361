//! Structured artifacts exchanged between pipeline stages.
//!
//! These types are stable contracts: the plan stage produces a [`Plan`] once
//! per run, the architect stage turns it into a [`TaskPlan`], and the
//! execution loop consumes the task plan one step at a time.

use serde::{Deserialize, Serialize};

/// Engineering plan for the requested project.
///
/// Immutable after the plan stage produces it; the architect stage reads it,
/// never writes it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub description: String,
    pub tech_stack: Vec<String>,
    pub features: Vec<String>,
    pub files: Vec<String>,
}

/// One unit of work: a target file and what to implement there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImplementationStep {
    /// Target file, relative to the project root.
    pub filepath: String,
    pub task_description: String,
}

/// Ordered implementation steps plus the originating plan.
///
/// Step order is fixed when the architect stage produces the sequence. The
/// plan back-reference is attached afterwards for traceability and never
/// alters step order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskPlan {
    pub implementation_steps: Vec<ImplementationStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<Plan>,
}
