use async_stream::stream;
use async_trait::async_trait;
use forge_core::{Agent, EventStream, InvocationContext, Result};
use forge_telemetry::agent_run_span;
use std::sync::Arc;
use tracing::Instrument;

/// Upper bound used when no iteration count is configured.
pub const DEFAULT_LOOP_MAX_ITERATIONS: u32 = 1000;

/// Loop agent executes sub-agents repeatedly for N iterations or until escalation
pub struct LoopAgent {
    name: String,
    description: String,
    sub_agents: Vec<Arc<dyn Agent>>,
    max_iterations: u32,
}

impl LoopAgent {
    pub fn new(name: impl Into<String>, sub_agents: Vec<Arc<dyn Agent>>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            sub_agents,
            max_iterations: DEFAULT_LOOP_MAX_ITERATIONS,
        }
    }

    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    pub fn with_max_iterations(mut self, max: u32) -> Self {
        self.max_iterations = max;
        self
    }

    pub fn max_iterations(&self) -> u32 {
        self.max_iterations
    }
}

#[async_trait]
impl Agent for LoopAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &self.sub_agents
    }

    async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        let sub_agents = self.sub_agents.clone();
        let max_iterations = self.max_iterations;
        let agent_name = self.name.clone();
        let span = agent_run_span(&self.name, ctx.invocation_id());

        let s = stream! {
            use futures::StreamExt;

            for iteration in 1..=max_iterations {
                tracing::debug!(agent.name = %agent_name, iteration, "loop iteration");
                let mut should_exit = false;

                for agent in &sub_agents {
                    if ctx.ended() {
                        return;
                    }
                    let mut stream = match agent.run(ctx.clone()).instrument(span.clone()).await {
                        Ok(stream) => stream,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    };

                    while let Some(result) = stream.next().instrument(span.clone()).await {
                        match result {
                            Ok(event) => {
                                if event.actions.escalate {
                                    should_exit = true;
                                }
                                yield Ok(event);
                            }
                            Err(e) => {
                                yield Err(e);
                                return;
                            }
                        }
                    }

                    if should_exit {
                        break;
                    }
                }

                if should_exit {
                    tracing::info!(agent.name = %agent_name, iteration, "loop exited on escalation");
                    break;
                }
            }
        };

        Ok(Box::pin(s))
    }
}
