//! Test-only scripted engine and fixture helpers.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::time::Duration;

use anyhow::{Result, anyhow};
use serde_json::{Value, json};

use crate::core::types::{ImplementationStep, Plan, TaskPlan};
use crate::engine::ReasoningEngine;
use crate::io::sandbox::PathSandbox;
use crate::io::tools::ToolSet;
use crate::session::ToolSession;

/// One scripted engine response.
pub enum ScriptedResponse {
    /// Returned from `invoke_structured` (`None` = "no valid response").
    Structured(Option<Value>),
    /// Tool calls to issue through the session, then the final text.
    ToolSession {
        calls: Vec<(String, Value)>,
        final_response: String,
    },
}

/// Engine double that replays a fixed sequence of responses in order and
/// records the directives it was given.
pub struct ScriptedEngine {
    script: RefCell<VecDeque<ScriptedResponse>>,
    last_user_directive: RefCell<Option<String>>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<ScriptedResponse>) -> Self {
        Self {
            script: RefCell::new(script.into()),
            last_user_directive: RefCell::new(None),
        }
    }

    /// The user directive of the most recent tool session, if any.
    pub fn last_user_directive(&self) -> Option<String> {
        self.last_user_directive.borrow().clone()
    }
}

impl ReasoningEngine for ScriptedEngine {
    fn invoke_structured(&self, _directive: &str, _schema: &Value) -> Result<Option<Value>> {
        match self.script.borrow_mut().pop_front() {
            Some(ScriptedResponse::Structured(value)) => Ok(value),
            Some(ScriptedResponse::ToolSession { .. }) => {
                Err(anyhow!("scripted engine expected a structured invocation"))
            }
            None => Err(anyhow!("scripted engine exhausted")),
        }
    }

    fn invoke_with_tools(
        &self,
        _system_directive: &str,
        user_directive: &str,
        session: &mut ToolSession<'_>,
    ) -> Result<String> {
        *self.last_user_directive.borrow_mut() = Some(user_directive.to_string());
        match self.script.borrow_mut().pop_front() {
            Some(ScriptedResponse::ToolSession {
                calls,
                final_response,
            }) => {
                for (name, args) in &calls {
                    session.dispatch(name, args)?;
                }
                Ok(final_response)
            }
            Some(ScriptedResponse::Structured(_)) => {
                Err(anyhow!("scripted engine expected a tool session"))
            }
            None => Err(anyhow!("scripted engine exhausted")),
        }
    }
}

/// Tool set over a fresh temporary project root with test-friendly limits.
pub fn test_tools() -> (tempfile::TempDir, ToolSet) {
    let temp = tempfile::tempdir().expect("tempdir");
    let sandbox = PathSandbox::create(&temp.path().join("project")).expect("sandbox");
    let tools = ToolSet::new(sandbox, Duration::from_secs(5), 100_000);
    (temp, tools)
}

/// Deterministic plan fixture.
pub fn plan(name: &str, files: &[&str]) -> Plan {
    Plan {
        name: name.to_string(),
        description: format!("{name} description"),
        tech_stack: vec!["html".to_string(), "css".to_string()],
        features: vec!["feature".to_string()],
        files: files.iter().map(|f| (*f).to_string()).collect(),
    }
}

/// Plan fixture as the JSON value an engine would return.
pub fn plan_value(name: &str, files: &[&str]) -> Value {
    serde_json::to_value(plan(name, files)).expect("serialize plan")
}

/// Deterministic implementation step for `filepath`.
pub fn step(filepath: &str) -> ImplementationStep {
    ImplementationStep {
        filepath: filepath.to_string(),
        task_description: format!("implement {filepath}"),
    }
}

/// Task plan with one step per filepath and no attached plan.
pub fn task_plan(files: &[&str]) -> TaskPlan {
    TaskPlan {
        implementation_steps: files.iter().map(|f| step(f)).collect(),
        plan: None,
    }
}

/// Task plan fixture as the JSON value an engine would return.
pub fn task_plan_value(files: &[&str]) -> Value {
    serde_json::to_value(task_plan(files)).expect("serialize task plan")
}

/// A `write_file` call for scripting tool sessions.
pub fn write_call(path: &str, content: &str) -> (String, Value) {
    (
        "write_file".to_string(),
        json!({"path": path, "content": content}),
    )
}
