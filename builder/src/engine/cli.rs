//! Engine adapter that shells out to an external agent CLI.
//!
//! Structured mode writes the declared schema beside a per-invocation output
//! file, pipes the directive over stdin, and validates whatever the agent
//! wrote back. Tool mode drives one structured action per turn against the
//! worker-action schema and dispatches the requested calls through the
//! caller's session.

use std::cell::Cell;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::engine::{ReasoningEngine, schema_violations};
use crate::io::config::EngineConfig;
use crate::io::process::run_with_timeout;
use crate::session::ToolSession;

const WORKER_ACTION_SCHEMA: &str = include_str!("../../schemas/worker_action.schema.json");

/// Engine backed by a configurable agent command (default `codex exec`).
pub struct CliEngine {
    config: EngineConfig,
    state_dir: PathBuf,
    workdir: PathBuf,
    output_limit_bytes: usize,
    action_schema: Value,
    invocations: Cell<u64>,
}

impl CliEngine {
    /// `state_dir` receives per-invocation schema and output files;
    /// `workdir` is where the agent process runs.
    pub fn new(
        config: EngineConfig,
        state_dir: PathBuf,
        workdir: PathBuf,
        output_limit_bytes: usize,
    ) -> Result<Self> {
        fs::create_dir_all(&state_dir)
            .with_context(|| format!("create engine state dir {}", state_dir.display()))?;
        let action_schema =
            serde_json::from_str(WORKER_ACTION_SCHEMA).context("parse worker action schema")?;
        Ok(Self {
            config,
            state_dir,
            workdir,
            output_limit_bytes,
            action_schema,
            invocations: Cell::new(0),
        })
    }

    #[instrument(skip_all, fields(timeout_secs = self.config.invoke_timeout_secs))]
    fn invoke_once(&self, directive: &str, schema: &Value) -> Result<Option<Value>> {
        let seq = self.invocations.get() + 1;
        self.invocations.set(seq);
        let schema_path = self.state_dir.join(format!("invoke-{seq}.schema.json"));
        let output_path = self.state_dir.join(format!("invoke-{seq}.output.json"));

        let mut schema_buf = serde_json::to_string_pretty(schema).context("serialize schema")?;
        schema_buf.push('\n');
        fs::write(&schema_path, schema_buf)
            .with_context(|| format!("write schema {}", schema_path.display()))?;

        let (program, args) = self
            .config
            .command
            .split_first()
            .ok_or_else(|| anyhow!("engine command is empty"))?;
        let mut cmd = Command::new(program);
        cmd.args(args)
            .arg("--output-schema")
            .arg(&schema_path)
            .arg("--output-last-message")
            .arg(&output_path)
            .arg("-")
            .current_dir(&self.workdir);

        info!(program = %program, "invoking engine");
        let output = run_with_timeout(
            cmd,
            Some(directive.as_bytes()),
            Duration::from_secs(self.config.invoke_timeout_secs),
            self.output_limit_bytes,
        )
        .context("run engine command")?;

        if output.timed_out {
            return Err(anyhow!(
                "engine command timed out after {}s",
                self.config.invoke_timeout_secs
            ));
        }
        if !output.status.success() {
            return Err(anyhow!(
                "engine command failed with status {:?}: {}",
                output.status.code(),
                output.stderr_lossy()
            ));
        }

        if !output_path.exists() {
            warn!("engine wrote no output");
            return Ok(None);
        }
        let contents = fs::read_to_string(&output_path)
            .with_context(|| format!("read engine output {}", output_path.display()))?;
        let value: Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(err) => {
                warn!(%err, "engine output is not valid json");
                return Ok(None);
            }
        };
        let violations = schema_violations(schema, &value)?;
        if !violations.is_empty() {
            warn!(count = violations.len(), "engine output failed schema validation");
            debug!(?violations);
            return Ok(None);
        }
        Ok(Some(value))
    }
}

impl ReasoningEngine for CliEngine {
    fn invoke_structured(&self, directive: &str, schema: &Value) -> Result<Option<Value>> {
        self.invoke_once(directive, schema)
    }

    fn invoke_with_tools(
        &self,
        system_directive: &str,
        user_directive: &str,
        session: &mut ToolSession<'_>,
    ) -> Result<String> {
        let mut transcript = format!("{system_directive}\n\n{user_directive}");
        loop {
            let action = self
                .invoke_once(&transcript, &self.action_schema)?
                .ok_or_else(|| anyhow!("engine produced no valid worker action"))?;

            match action.get("action").and_then(Value::as_str).unwrap_or_default() {
                "final" => {
                    let text = action
                        .get("text")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string();
                    debug!("worker session finished");
                    return Ok(text);
                }
                "tool_call" => {
                    let tool = action
                        .get("tool")
                        .and_then(Value::as_str)
                        .ok_or_else(|| anyhow!("tool_call action without tool name"))?;
                    let args = action
                        .get("args")
                        .cloned()
                        .unwrap_or_else(|| Value::Object(serde_json::Map::new()));
                    let result = session.dispatch(tool, &args)?;
                    transcript.push_str(&format!("\n\n[{tool} result]\n{result}"));
                }
                other => return Err(anyhow!("unknown worker action '{other}'")),
            }
        }
    }
}
