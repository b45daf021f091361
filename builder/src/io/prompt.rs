//! Directive rendering for the pipeline stages.

use anyhow::{Context, Result};
use minijinja::{Environment, context};

use crate::core::types::ImplementationStep;

const PLANNER_TEMPLATE: &str = include_str!("prompts/planner.md");
const ARCHITECT_TEMPLATE: &str = include_str!("prompts/architect.md");
const CODER_SYSTEM_TEMPLATE: &str = include_str!("prompts/coder_system.md");
const CODER_TASK_TEMPLATE: &str = include_str!("prompts/coder_task.md");

/// Template engine wrapper around minijinja.
pub struct PromptBuilder {
    env: Environment<'static>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.add_template("planner", PLANNER_TEMPLATE)
            .expect("planner template should be valid");
        env.add_template("architect", ARCHITECT_TEMPLATE)
            .expect("architect template should be valid");
        env.add_template("coder_system", CODER_SYSTEM_TEMPLATE)
            .expect("coder system template should be valid");
        env.add_template("coder_task", CODER_TASK_TEMPLATE)
            .expect("coder task template should be valid");
        Self { env }
    }

    /// Directive asking for a structured plan for `user_prompt`.
    pub fn planner(&self, user_prompt: &str) -> Result<String> {
        let template = self.env.get_template("planner")?;
        template
            .render(context! { user_prompt => user_prompt.trim() })
            .context("render planner directive")
    }

    /// Directive asking for the task decomposition of `plan_json`.
    pub fn architect(&self, plan_json: &str) -> Result<String> {
        let template = self.env.get_template("architect")?;
        template
            .render(context! { plan_json => plan_json })
            .context("render architect directive")
    }

    /// System directive for the tool-using worker.
    pub fn coder_system(&self) -> Result<String> {
        let template = self.env.get_template("coder_system")?;
        template.render(context! {}).context("render coder system directive")
    }

    /// Per-step worker directive embedding the task and the target file's
    /// current content.
    pub fn coder_task(&self, step: &ImplementationStep, existing_content: &str) -> Result<String> {
        let template = self.env.get_template("coder_task")?;
        template
            .render(context! {
                task_description => step.task_description.as_str(),
                filepath => step.filepath.as_str(),
                existing_content => existing_content,
            })
            .context("render coder task directive")
    }
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::step;

    #[test]
    fn planner_directive_embeds_the_request() {
        let prompts = PromptBuilder::new();
        let rendered = prompts.planner("Build a two-page static site").expect("render");
        assert!(rendered.contains("PLANNER"));
        assert!(rendered.contains("Build a two-page static site"));
    }

    #[test]
    fn architect_directive_embeds_the_plan_json() {
        let prompts = PromptBuilder::new();
        let rendered = prompts.architect(r#"{"name":"site"}"#).expect("render");
        assert!(rendered.contains("ARCHITECT"));
        assert!(rendered.contains(r#"{"name":"site"}"#));
    }

    #[test]
    fn coder_system_directive_lists_exactly_the_worker_tools() {
        let prompts = PromptBuilder::new();
        let rendered = prompts.coder_system().expect("render");
        for tool in ["read_file", "write_file", "list_files", "get_current_directory"] {
            assert!(rendered.contains(tool), "{tool}");
        }
        assert!(rendered.contains("Never respond with a diff or patch"));
    }

    #[test]
    fn coder_task_directive_embeds_task_file_and_existing_content() {
        let prompts = PromptBuilder::new();
        let rendered = prompts
            .coder_task(&step("index.html"), "<html>old</html>")
            .expect("render");
        assert!(rendered.contains("index.html"));
        assert!(rendered.contains("<html>old</html>"));
        assert!(rendered.contains("write_file"));
    }
}
