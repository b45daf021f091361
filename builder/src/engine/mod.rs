//! Reasoning-engine adapter contract.
//!
//! The engine is an external collaborator: given a directive it either
//! returns a structured value conforming to a declared schema, or drives a
//! tool-call session to a final textual response. Adapters own schema
//! validation; a missing response and a validation failure are uniformly
//! "no valid response" (`None`). Tests use scripted engines that replay
//! predetermined responses without spawning processes.

pub mod cli;

use anyhow::{Context, Result};
use jsonschema::Draft;
use serde_json::Value;

use crate::session::ToolSession;

/// Abstraction over reasoning-engine backends.
pub trait ReasoningEngine {
    /// Return a value conforming to `schema`, or `None` when the engine
    /// yields nothing valid.
    fn invoke_structured(&self, directive: &str, schema: &Value) -> Result<Option<Value>>;

    /// Drive a tool-call session to completion and return the final textual
    /// response. Every tool call must be dispatched through `session`, which
    /// records the invocations performed and enforces the call bounds.
    fn invoke_with_tools(
        &self,
        system_directive: &str,
        user_directive: &str,
        session: &mut ToolSession<'_>,
    ) -> Result<String>;
}

/// Validate `instance` against a JSON Schema (Draft 2020-12), returning
/// human-readable violations. Empty means the instance conforms.
pub fn schema_violations(schema: &Value, instance: &Value) -> Result<Vec<String>> {
    let compiled = jsonschema::options()
        .with_draft(Draft::Draft202012)
        .build(schema)
        .context("compile json schema")?;
    Ok(compiled
        .iter_errors(instance)
        .map(|err| err.to_string())
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn schema_violations_is_empty_for_a_conforming_instance() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        });
        let violations =
            schema_violations(&schema, &json!({"name": "app"})).expect("validate");
        assert!(violations.is_empty());
    }

    #[test]
    fn schema_violations_reports_missing_required_fields() {
        let schema = json!({
            "type": "object",
            "required": ["name"],
            "properties": {"name": {"type": "string"}}
        });
        let violations = schema_violations(&schema, &json!({})).expect("validate");
        assert!(!violations.is_empty());
    }
}
