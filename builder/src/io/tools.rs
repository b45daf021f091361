//! Sandboxed file and process operations for the generated project.
//!
//! Every path-taking operation resolves its argument through the
//! [`PathSandbox`] first; there is no way to reach the filesystem around it.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tracing::{debug, instrument};
use walkdir::WalkDir;

use crate::errors::ToolError;
use crate::io::process::run_with_timeout;
use crate::io::sandbox::PathSandbox;

/// Outcome of a completed (non-timed-out) shell command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRun {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Sandboxed tool surface for one run.
#[derive(Debug)]
pub struct ToolSet {
    sandbox: PathSandbox,
    command_timeout: Duration,
    output_limit_bytes: usize,
}

impl ToolSet {
    pub fn new(sandbox: PathSandbox, command_timeout: Duration, output_limit_bytes: usize) -> Self {
        Self {
            sandbox,
            command_timeout,
            output_limit_bytes,
        }
    }

    /// The canonical project root. Pure, side-effect-free.
    pub fn project_root(&self) -> &Path {
        self.sandbox.root()
    }

    /// Read a file as UTF-8.
    ///
    /// A missing file yields an empty string, not an error: "not yet created"
    /// is a normal state for a target file the worker is about to write.
    #[instrument(skip(self))]
    pub fn read_file(&self, path: &str) -> Result<String, ToolError> {
        let resolved = self.sandbox.resolve(path)?;
        if !resolved.exists() {
            return Ok(String::new());
        }
        fs::read_to_string(&resolved)
            .map_err(|err| ToolError::io(format!("read {}", resolved.display()), err))
    }

    /// Create parent directories as needed and overwrite `path` with
    /// `content`, verbatim.
    #[instrument(skip(self, content), fields(bytes = content.len()))]
    pub fn write_file(&self, path: &str, content: &str) -> Result<String, ToolError> {
        let resolved = self.sandbox.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent)
                .map_err(|err| ToolError::io(format!("create {}", parent.display()), err))?;
        }
        fs::write(&resolved, content)
            .map_err(|err| ToolError::io(format!("write {}", resolved.display()), err))?;
        debug!(path = %resolved.display(), "wrote file");
        Ok(format!("WROTE:{}", resolved.display()))
    }

    /// Like [`ToolSet::write_file`], but content that parses as a top-level
    /// JSON object is re-serialized pretty-printed first.
    ///
    /// This is the explicit opt-in form of the normalization the worker's
    /// write path uses; arrays, scalars, and non-JSON text are written
    /// verbatim either way, so callers must not rely on a byte-for-byte echo
    /// of object-shaped input.
    pub fn write_file_normalized(&self, path: &str, content: &str) -> Result<String, ToolError> {
        match normalize_json_object(content) {
            Some(normalized) => self.write_file(path, &normalized),
            None => self.write_file(path, content),
        }
    }

    /// Recursively enumerate regular files under `directory`, as paths
    /// relative to the project root, sorted for stability.
    #[instrument(skip(self))]
    pub fn list_files(&self, directory: &str) -> Result<Vec<String>, ToolError> {
        let resolved = self.sandbox.resolve(directory)?;
        if !resolved.is_dir() {
            return Err(ToolError::NotADirectory {
                path: directory.to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&resolved) {
            let entry = entry
                .map_err(|err| ToolError::io(format!("walk {}", resolved.display()), err.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(self.sandbox.root())
                .unwrap_or(entry.path());
            files.push(relative.to_string_lossy().into_owned());
        }
        files.sort();
        Ok(files)
    }

    /// Execute `cmd` through the shell, rooted at `cwd` (project root when
    /// `None`), under a hard wall-clock timeout.
    ///
    /// Fails with [`ToolError::ExecutionTimeout`] when the budget elapses,
    /// carrying whatever output was captured before the kill.
    #[instrument(skip(self))]
    pub fn run_command(
        &self,
        cmd: &str,
        cwd: Option<&str>,
        timeout: Option<Duration>,
    ) -> Result<CommandRun, ToolError> {
        let workdir = match cwd {
            Some(dir) => self.sandbox.resolve(dir)?,
            None => self.sandbox.root().to_path_buf(),
        };
        let timeout = timeout.unwrap_or(self.command_timeout);

        let mut command = Command::new("sh");
        command.arg("-c").arg(cmd).current_dir(&workdir);

        let output = run_with_timeout(command, None, timeout, self.output_limit_bytes)
            .map_err(|err| {
                ToolError::io(
                    format!("run '{cmd}'"),
                    std::io::Error::other(format!("{err:#}")),
                )
            })?;

        if output.timed_out {
            return Err(ToolError::ExecutionTimeout {
                timeout_secs: timeout.as_secs(),
                stdout: output.stdout_lossy(),
                stderr: output.stderr_lossy(),
            });
        }

        Ok(CommandRun {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: output.stdout_lossy(),
            stderr: output.stderr_lossy(),
        })
    }
}

/// Re-serialize `content` pretty-printed when it parses as a top-level JSON
/// object; `None` for everything else.
pub fn normalize_json_object(content: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(content).ok()?;
    if !value.is_object() {
        return None;
    }
    serde_json::to_string_pretty(&value).ok()
}
