//! # google-search-agent
//!
//! A single LLM agent grounded in Gemini's built-in Google Search.

use forge_agent::{LlmAgent, LlmAgentBuilder};
use forge_core::{Llm, Result};
use forge_tool::GoogleSearchTool;
use std::sync::Arc;

pub const AGENT_NAME: &str = "google_search_agent";
pub const DESCRIPTION: &str = "Professional search assistant with Google Search capabilities.";
pub const INSTRUCTION: &str = "Answer questions using Google Search when needed. Always cite sources.";

pub fn build_google_search_agent(model: Arc<dyn Llm>) -> Result<LlmAgent> {
    LlmAgentBuilder::new(AGENT_NAME)
        .description(DESCRIPTION)
        .model(model)
        .instruction(INSTRUCTION)
        .tool(Arc::new(GoogleSearchTool::new()))
        .build()
}
