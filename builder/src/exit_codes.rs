//! Stable exit codes for the builder CLI.

/// Run completed, or the user cancelled mid-run.
pub const OK: i32 = 0;
/// Any unhandled error (planning, architecture, step execution, tooling).
pub const ERROR: i32 = 1;
