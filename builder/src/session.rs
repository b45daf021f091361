//! Bounded tool-call sub-session for worker activations.
//!
//! The session is the only path from an engine-issued tool call to the
//! filesystem. It maps names onto a closed enumeration, rejects anything
//! outside the protocol before dispatch, and enforces both the per-step call
//! bound and the run-wide ceiling.

use std::cell::Cell;
use std::sync::LazyLock;

use anyhow::Result;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::errors::{PipelineError, ToolError};
use crate::io::tools::ToolSet;

/// Run-wide tool-call ceiling shared by every worker session.
///
/// Exhaustion is a hard stop reported as [`PipelineError::CeilingExceeded`],
/// never a silent truncation.
#[derive(Debug)]
pub struct CallBudget {
    limit: u32,
    used: Cell<u32>,
}

impl CallBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            used: Cell::new(0),
        }
    }

    pub fn used(&self) -> u32 {
        self.used.get()
    }

    fn spend(&self) -> Result<(), PipelineError> {
        if self.used.get() >= self.limit {
            return Err(PipelineError::CeilingExceeded { limit: self.limit });
        }
        self.used.set(self.used.get() + 1);
        Ok(())
    }
}

/// The closed set of operations a worker may invoke.
///
/// Internally issued calls are constructed from these variants directly;
/// engine-issued names outside the set fail [`ToolCall::parse`] as protocol
/// violations before anything executes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolCall {
    ReadFile { path: String },
    WriteFile { path: String, content: String },
    ListFiles { directory: String },
    GetCurrentDirectory,
}

impl ToolCall {
    /// Map an engine-issued tool name and argument object onto the closed
    /// set.
    pub fn parse(name: &str, args: &Value) -> Result<Self, PipelineError> {
        match name {
            "read_file" => Ok(Self::ReadFile {
                path: required_str(name, args, "path")?,
            }),
            "write_file" => Ok(Self::WriteFile {
                path: required_str(name, args, "path")?,
                content: required_str(name, args, "content")?,
            }),
            "list_files" => Ok(Self::ListFiles {
                directory: args
                    .get("directory")
                    .and_then(Value::as_str)
                    .unwrap_or(".")
                    .to_string(),
            }),
            "get_current_directory" => Ok(Self::GetCurrentDirectory),
            other => Err(PipelineError::protocol(format!("unknown tool '{other}'"))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "read_file",
            Self::WriteFile { .. } => "write_file",
            Self::ListFiles { .. } => "list_files",
            Self::GetCurrentDirectory => "get_current_directory",
        }
    }

    fn target(&self) -> Option<String> {
        match self {
            Self::ReadFile { path } | Self::WriteFile { path, .. } => Some(path.clone()),
            Self::ListFiles { directory } => Some(directory.clone()),
            Self::GetCurrentDirectory => None,
        }
    }
}

fn required_str(tool: &str, args: &Value, key: &str) -> Result<String, PipelineError> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| {
            PipelineError::protocol(format!("{tool} requires a string '{key}' argument"))
        })
}

/// Record of one dispatched invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolEvent {
    pub tool: &'static str,
    pub target: Option<String>,
}

/// One worker activation's view of the tool set.
pub struct ToolSession<'a> {
    tools: &'a ToolSet,
    budget: &'a CallBudget,
    max_calls: usize,
    calls: usize,
    events: Vec<ToolEvent>,
}

impl<'a> ToolSession<'a> {
    pub fn new(tools: &'a ToolSet, budget: &'a CallBudget, max_calls: usize) -> Self {
        Self {
            tools,
            budget,
            max_calls,
            calls: 0,
            events: Vec::new(),
        }
    }

    /// Tool invocations performed so far, in order.
    pub fn events(&self) -> &[ToolEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<ToolEvent> {
        self.events
    }

    /// Parse and execute one engine-issued tool call, returning the textual
    /// result the engine sees.
    ///
    /// Checked before anything touches the filesystem: the closed tool set,
    /// the patch-shape rejection for writes, the per-step bound, and the
    /// run-wide ceiling.
    #[instrument(skip_all, fields(tool = name))]
    pub fn dispatch(&mut self, name: &str, args: &Value) -> Result<String> {
        let call = ToolCall::parse(name, args)?;

        if let ToolCall::WriteFile { content, .. } = &call
            && looks_like_patch(content)
        {
            return Err(PipelineError::protocol(
                "write_file content is a diff/patch, expected full file content",
            )
            .into());
        }
        if self.calls >= self.max_calls {
            return Err(PipelineError::StepBudgetExhausted {
                max_calls: self.max_calls,
            }
            .into());
        }
        self.budget.spend()?;
        self.calls += 1;

        let result = match &call {
            ToolCall::ReadFile { path } => self.tools.read_file(path)?,
            ToolCall::WriteFile { path, content } => {
                self.tools.write_file_normalized(path, content)?
            }
            ToolCall::ListFiles { directory } => match self.tools.list_files(directory) {
                Ok(files) if files.is_empty() => "No files found.".to_string(),
                Ok(files) => files.join("\n"),
                // The worker sees a descriptive error value and may continue;
                // sandbox and I/O failures still abort the session.
                Err(err @ ToolError::NotADirectory { .. }) => format!("ERROR: {err}"),
                Err(err) => return Err(err.into()),
            },
            ToolCall::GetCurrentDirectory => {
                self.tools.project_root().to_string_lossy().into_owned()
            }
        };

        debug!(calls = self.calls, budget_used = self.budget.used(), "dispatched");
        self.events.push(ToolEvent {
            tool: call.name(),
            target: call.target(),
        });
        Ok(result)
    }
}

/// Unified-diff shaped content: a `diff --git` header, or the `---`/`+++`
/// file markers together with a `@@` hunk header.
fn looks_like_patch(content: &str) -> bool {
    static HUNK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^@@ -\d").unwrap());
    static OLD_FILE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^--- ").unwrap());
    static NEW_FILE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?m)^\+\+\+ ").unwrap());

    if content.trim_start().starts_with("diff --git ") {
        return true;
    }
    HUNK_RE.is_match(content) && OLD_FILE_RE.is_match(content) && NEW_FILE_RE.is_match(content)
}
