//! Plan-driven project builder CLI.
//!
//! Takes a free-text project request, produces a plan and an ordered task
//! sequence, then executes the steps one at a time into a sandboxed project
//! root (default `generated_project/`).

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::Parser;

use builder::agents::coder::CoderConfig;
use builder::engine::cli::CliEngine;
use builder::exit_codes;
use builder::io::config::load_config;
use builder::io::sandbox::PathSandbox;
use builder::io::tools::ToolSet;
use builder::logging;
use builder::pipeline::{CancelFlag, PipelineConfig, RunStatus, run_pipeline};

#[derive(Parser)]
#[command(name = "builder", version, about = "Plan-driven project builder")]
struct Cli {
    /// Free-text project request. Prompted on stdin when omitted.
    prompt: Option<String>,

    /// Total worker tool calls allowed across the run.
    #[arg(short = 'r', long)]
    recursion_limit: Option<u32>,

    /// Directory the generated project is written into.
    #[arg(long)]
    project_root: Option<PathBuf>,

    /// Path to the builder config file.
    #[arg(long, default_value = "builder.toml")]
    config: PathBuf,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{err:#}");
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let mut cfg = load_config(&cli.config)?;
    if let Some(limit) = cli.recursion_limit {
        cfg.recursion_limit = limit;
    }
    if let Some(root) = cli.project_root {
        cfg.project_root = root;
    }
    cfg.validate()?;

    let request = match cli.prompt {
        Some(prompt) => prompt,
        None => prompt_for_request()?,
    };

    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    ctrlc::set_handler(move || handler_flag.cancel()).context("install interrupt handler")?;

    let sandbox = PathSandbox::create(&cfg.project_root)?;
    let tools = ToolSet::new(
        sandbox,
        Duration::from_secs(cfg.command_timeout_secs),
        cfg.output_limit_bytes,
    );
    let engine = CliEngine::new(
        cfg.engine.clone(),
        PathBuf::from(".builder"),
        tools.project_root().to_path_buf(),
        cfg.output_limit_bytes,
    )?;

    let pipeline_config = PipelineConfig {
        recursion_limit: cfg.recursion_limit,
        coder: CoderConfig {
            max_tool_calls_per_step: cfg.step_tool_call_limit,
        },
    };

    let outcome = run_pipeline(&engine, &tools, &pipeline_config, &request, &cancel, |step| {
        println!("[step {}] {}", step.index + 1, step.filepath);
    })?;

    match outcome.status {
        RunStatus::Cancelled => {
            println!("Operation cancelled by user.");
            Ok(exit_codes::OK)
        }
        RunStatus::Completed => {
            println!(
                "Project '{}' generated: {} steps, {} tool calls, root {}",
                outcome.plan.name,
                outcome.steps_completed,
                outcome.tool_calls_used,
                tools.project_root().display()
            );
            Ok(exit_codes::OK)
        }
    }
}

fn prompt_for_request() -> Result<String> {
    print!("Enter your project prompt: ");
    std::io::stdout().flush().context("flush stdout")?;
    let mut line = String::new();
    std::io::stdin()
        .lock()
        .read_line(&mut line)
        .context("read project prompt")?;
    let request = line.trim().to_string();
    if request.is_empty() {
        bail!("empty project prompt");
    }
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prompt_and_recursion_limit() {
        let cli = Cli::parse_from(["builder", "Build a todo app", "-r", "50"]);
        assert_eq!(cli.prompt.as_deref(), Some("Build a todo app"));
        assert_eq!(cli.recursion_limit, Some(50));
    }

    #[test]
    fn parse_defaults() {
        let cli = Cli::parse_from(["builder"]);
        assert!(cli.prompt.is_none());
        assert!(cli.recursion_limit.is_none());
        assert!(cli.project_root.is_none());
        assert_eq!(cli.config, PathBuf::from("builder.toml"));
    }

    #[test]
    fn parse_project_root_override() {
        let cli = Cli::parse_from(["builder", "req", "--project-root", "/tmp/site"]);
        assert_eq!(cli.project_root, Some(PathBuf::from("/tmp/site")));
    }
}
