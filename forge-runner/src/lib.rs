//! # forge-runner
//!
//! Drives a root agent for one user message: loads the session, records the
//! user turn, runs the agent and appends every event it produces to the
//! session before handing it to the caller.

mod context;
mod runner;

pub use context::InvocationContext;
pub use runner::{Runner, RunnerConfig};
