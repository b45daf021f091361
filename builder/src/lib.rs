//! Plan-driven code-generation pipeline.
//!
//! A free-text request is decomposed into a structured plan, the plan into an
//! ordered sequence of per-file implementation steps, and each step is
//! executed by a tool-restricted worker that only touches files inside a
//! sandboxed project root. The architecture enforces a strict separation:
//!
//! - **[`core`]**: Pure data model and execution-loop state. No I/O, fully
//!   testable in isolation.
//! - **[`io`]**: Side-effecting operations (path sandbox, file and process
//!   tools, config, prompt rendering). Isolated to enable scripted doubles
//!   in tests.
//! - **[`engine`]**: The reasoning-engine adapter contract and its CLI-backed
//!   production implementation.
//! - **[`agents`]**, **[`session`]**, **[`pipeline`]**: stage orchestration
//!   and the bounded per-step tool-call sub-session.

pub mod agents;
pub mod core;
pub mod engine;
pub mod errors;
pub mod exit_codes;
pub mod io;
pub mod logging;
pub mod pipeline;
pub mod session;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
