//! Span helpers for agent, model, tool and validation work

use tracing::Span;

pub fn agent_run_span(agent_name: &str, invocation_id: &str) -> Span {
    tracing::info_span!("agent.run", agent.name = agent_name, invocation.id = invocation_id)
}

pub fn model_call_span(model_name: &str) -> Span {
    tracing::info_span!("model.call", model.name = model_name)
}

pub fn tool_execute_span(tool_name: &str) -> Span {
    tracing::info_span!("tool.execute", tool.name = tool_name)
}

/// Span for one external validation tool run against a generated file.
pub fn validation_span(tool: &str, file: &str) -> Span {
    tracing::info_span!("validation", tool = tool, file = file)
}
