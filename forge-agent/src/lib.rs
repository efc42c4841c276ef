//! # forge-agent
//!
//! Agents for lesson-forge:
//!
//! - [`LlmAgent`] - one model-driven stage with instruction, tools and an
//!   optional `output_key` that stores its final text in session state
//! - [`LoopAgent`] - repeats its sub-agents until one escalates or the
//!   iteration budget runs out
//! - [`SequentialAgent`] - runs its sub-agents once, in order

mod llm_agent;
pub mod workflow;

pub use llm_agent::{DEFAULT_MAX_MODEL_CALLS, LlmAgent, LlmAgentBuilder};
pub use workflow::{LoopAgent, SequentialAgent};
