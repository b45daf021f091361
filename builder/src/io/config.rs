//! Builder configuration stored in `builder.toml`.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

/// Builder configuration (TOML).
///
/// This file is intended to be edited by humans and must remain stable and
/// automatable. Missing fields default to sensible values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BuilderConfig {
    /// Directory the whole run may write into, created if absent.
    pub project_root: PathBuf,

    /// Total worker tool calls allowed across a run.
    pub recursion_limit: u32,

    /// Worker tool calls allowed within a single step.
    pub step_tool_call_limit: usize,

    /// Wall-clock budget for a single shell command, in seconds.
    pub command_timeout_secs: u64,

    /// Truncate captured subprocess output beyond this many bytes.
    pub output_limit_bytes: usize,

    pub engine: EngineConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Agent command for engine invocations (e.g. `["codex","exec"]`).
    /// The structured-output flags and directive are appended per call.
    pub command: Vec<String>,

    /// Wall-clock budget for one engine invocation, in seconds.
    pub invoke_timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            command: vec![
                "codex".to_string(),
                "exec".to_string(),
                "--skip-git-repo-check".to_string(),
            ],
            invoke_timeout_secs: 10 * 60,
        }
    }
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            project_root: PathBuf::from("generated_project"),
            recursion_limit: 100,
            step_tool_call_limit: 25,
            command_timeout_secs: 30,
            output_limit_bytes: 100_000,
            engine: EngineConfig::default(),
        }
    }
}

impl BuilderConfig {
    pub fn validate(&self) -> Result<()> {
        if self.project_root.as_os_str().is_empty() {
            return Err(anyhow!("project_root must not be empty"));
        }
        if self.recursion_limit == 0 {
            return Err(anyhow!("recursion_limit must be > 0"));
        }
        if self.step_tool_call_limit == 0 {
            return Err(anyhow!("step_tool_call_limit must be > 0"));
        }
        if self.command_timeout_secs == 0 {
            return Err(anyhow!("command_timeout_secs must be > 0"));
        }
        if self.output_limit_bytes == 0 {
            return Err(anyhow!("output_limit_bytes must be > 0"));
        }
        if self.engine.command.is_empty() || self.engine.command[0].trim().is_empty() {
            return Err(anyhow!("engine.command must be a non-empty array"));
        }
        if self.engine.invoke_timeout_secs == 0 {
            return Err(anyhow!("engine.invoke_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `BuilderConfig::default()`.
pub fn load_config(path: &Path) -> Result<BuilderConfig> {
    if !path.exists() {
        let cfg = BuilderConfig::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: BuilderConfig =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &BuilderConfig) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');

    let parent = path
        .parent()
        .with_context(|| format!("config path missing parent {}", path.display()))?;
    fs::create_dir_all(parent).with_context(|| format!("create directory {}", parent.display()))?;
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, buf)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_missing_returns_default() {
        let temp = tempfile::tempdir().expect("tempdir");
        let cfg = load_config(&temp.path().join("missing.toml")).expect("load");
        assert_eq!(cfg, BuilderConfig::default());
    }

    #[test]
    fn write_then_load_round_trips() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("builder.toml");
        let cfg = BuilderConfig {
            recursion_limit: 42,
            ..BuilderConfig::default()
        };
        write_config(&path, &cfg).expect("write");
        let loaded = load_config(&path).expect("load");
        assert_eq!(loaded, cfg);
    }

    #[test]
    fn zero_recursion_limit_fails_validation() {
        let cfg = BuilderConfig {
            recursion_limit: 0,
            ..BuilderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn empty_engine_command_fails_validation() {
        let cfg = BuilderConfig {
            engine: EngineConfig {
                command: Vec::new(),
                ..EngineConfig::default()
            },
            ..BuilderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }
}
