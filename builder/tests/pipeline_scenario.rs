//! Pipeline-level scenario tests with a scripted engine.
//!
//! These drive `run_pipeline` end to end: plan stage → architect stage →
//! execution loop, verifying termination, file materialization, cooperative
//! cancellation, and ceiling enforcement.

use std::time::Duration;

use builder::errors::PipelineError;
use builder::io::sandbox::PathSandbox;
use builder::io::tools::ToolSet;
use builder::pipeline::{CancelFlag, PipelineConfig, RunStatus, run_pipeline};
use builder::test_support::{
    ScriptedEngine, ScriptedResponse, plan_value, task_plan_value, write_call,
};

fn scripted_tools() -> (tempfile::TempDir, ToolSet) {
    let temp = tempfile::tempdir().expect("tempdir");
    let sandbox = PathSandbox::create(&temp.path().join("generated_project")).expect("sandbox");
    let tools = ToolSet::new(sandbox, Duration::from_secs(5), 100_000);
    (temp, tools)
}

/// Full scenario: a two-page static site runs to DONE after exactly one
/// activation per step, and every target file exists non-empty afterwards.
#[test]
fn static_site_request_runs_to_done_with_all_files_written() {
    let files = ["index.html", "about.html", "style.css"];
    let mut script = vec![
        ScriptedResponse::Structured(Some(plan_value("static-site", &files))),
        ScriptedResponse::Structured(Some(task_plan_value(&files))),
    ];
    for file in &files {
        script.push(ScriptedResponse::ToolSession {
            calls: vec![write_call(file, &format!("content of {file}"))],
            final_response: format!("implemented {file}"),
        });
    }
    let engine = ScriptedEngine::new(script);
    let (_temp, tools) = scripted_tools();

    let mut observed_steps = Vec::new();
    let outcome = run_pipeline(
        &engine,
        &tools,
        &PipelineConfig::default(),
        "Build a two-page static site",
        &CancelFlag::new(),
        |step| observed_steps.push(step.index),
    )
    .expect("pipeline");

    assert_eq!(outcome.status, RunStatus::Completed);
    assert_eq!(outcome.steps_completed, 3);
    assert_eq!(outcome.plan.name, "static-site");
    assert_eq!(outcome.tool_calls_used, 3);
    assert_eq!(observed_steps, vec![0, 1, 2]);
    for file in &files {
        let content = tools.read_file(file).expect("read");
        assert!(!content.is_empty(), "{file} should be non-empty");
    }
}

/// Cancellation set during a step is honored before the next activation:
/// the run exits cleanly with no error and no further file writes.
#[test]
fn cancellation_between_steps_stops_cleanly() {
    let files = ["index.html", "about.html"];
    let engine = ScriptedEngine::new(vec![
        ScriptedResponse::Structured(Some(plan_value("static-site", &files))),
        ScriptedResponse::Structured(Some(task_plan_value(&files))),
        ScriptedResponse::ToolSession {
            calls: vec![write_call("index.html", "<html></html>")],
            final_response: "implemented index.html".to_string(),
        },
    ]);
    let (_temp, tools) = scripted_tools();
    let cancel = CancelFlag::new();

    let cancel_in_step = cancel.clone();
    let outcome = run_pipeline(
        &engine,
        &tools,
        &PipelineConfig::default(),
        "Build a two-page static site",
        &cancel,
        |_| cancel_in_step.cancel(),
    )
    .expect("pipeline");

    assert_eq!(outcome.status, RunStatus::Cancelled);
    assert_eq!(outcome.steps_completed, 1);
    assert!(!tools.read_file("index.html").expect("read").is_empty());
    assert_eq!(tools.read_file("about.html").expect("read"), "");
}

/// A planner failure is fatal to the run before any file is touched.
#[test]
fn planner_failure_aborts_the_run() {
    let engine = ScriptedEngine::new(vec![ScriptedResponse::Structured(None)]);
    let (_temp, tools) = scripted_tools();

    let err = run_pipeline(
        &engine,
        &tools,
        &PipelineConfig::default(),
        "anything",
        &CancelFlag::new(),
        |_| {},
    )
    .expect_err("pipeline");

    assert!(matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Planning)
    ));
    assert!(tools.list_files(".").expect("list").is_empty());
}

/// Exhausting the run-wide ceiling mid-step surfaces as a step error carrying
/// the ceiling cause, and the failing step's index and filepath.
#[test]
fn ceiling_exhaustion_is_a_hard_stop_with_step_context() {
    let files = ["index.html", "about.html"];
    let engine = ScriptedEngine::new(vec![
        ScriptedResponse::Structured(Some(plan_value("static-site", &files))),
        ScriptedResponse::Structured(Some(task_plan_value(&files))),
        ScriptedResponse::ToolSession {
            calls: vec![write_call("index.html", "<html></html>")],
            final_response: "implemented index.html".to_string(),
        },
        ScriptedResponse::ToolSession {
            calls: vec![write_call("about.html", "<html></html>")],
            final_response: "unreachable".to_string(),
        },
    ]);
    let (_temp, tools) = scripted_tools();

    let err = run_pipeline(
        &engine,
        &tools,
        &PipelineConfig {
            recursion_limit: 1,
            ..PipelineConfig::default()
        },
        "Build a two-page static site",
        &CancelFlag::new(),
        |_| {},
    )
    .expect_err("pipeline");

    match err.downcast_ref::<PipelineError>() {
        Some(PipelineError::Step { index, filepath, .. }) => {
            assert_eq!(*index, 1);
            assert_eq!(filepath, "about.html");
        }
        other => panic!("expected step error, got {other:?}"),
    }
    assert!(format!("{err:#}").contains("ceiling"));
}
