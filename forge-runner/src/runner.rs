use crate::InvocationContext;
use async_stream::stream;
use forge_core::{
    Agent, Content, Event, EventStream, InvocationContext as _, LlmResponse, Result,
};
use forge_session::{CreateRequest, GetRequest, SessionService};
use std::collections::HashMap;
use std::sync::Arc;

pub struct RunnerConfig {
    pub app_name: String,
    pub agent: Arc<dyn Agent>,
    pub session_service: Arc<dyn SessionService>,
}

pub struct Runner {
    app_name: String,
    root_agent: Arc<dyn Agent>,
    session_service: Arc<dyn SessionService>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Result<Self> {
        Ok(Self {
            app_name: config.app_name,
            root_agent: config.agent,
            session_service: config.session_service,
        })
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn root_agent(&self) -> Arc<dyn Agent> {
        self.root_agent.clone()
    }

    /// Runs the root agent for one user message. A session that does not
    /// exist yet is created under `session_id`.
    pub async fn run(
        &self,
        user_id: String,
        session_id: String,
        user_content: Content,
    ) -> Result<EventStream> {
        let app_name = self.app_name.clone();
        let session_service = self.session_service.clone();
        let root_agent = self.root_agent.clone();

        let s = stream! {
            let existing = session_service
                .get(GetRequest {
                    app_name: app_name.clone(),
                    user_id: user_id.clone(),
                    session_id: session_id.clone(),
                })
                .await;
            let session = match existing {
                Ok(session) => session,
                Err(_) => {
                    let created = session_service
                        .create(CreateRequest {
                            app_name: app_name.clone(),
                            user_id: user_id.clone(),
                            session_id: Some(session_id.clone()),
                            state: HashMap::new(),
                        })
                        .await;
                    match created {
                        Ok(session) => session,
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            };

            let invocation_id = format!("inv-{}", uuid::Uuid::new_v4());
            tracing::info!(
                invocation.id = %invocation_id,
                agent.name = root_agent.name(),
                session.id = %session_id,
                "invocation started"
            );
            let ctx = Arc::new(InvocationContext::new(
                invocation_id.clone(),
                root_agent.clone(),
                user_content.clone(),
                session,
            ));

            let mut user_event = Event::new(&invocation_id).with_author("user");
            user_event.llm_response = LlmResponse::new(user_content.clone());
            if let Err(e) = session_service.append_event(&session_id, user_event).await {
                yield Err(e);
                return;
            }

            let mut agent_stream = match root_agent.run(ctx.clone()).await {
                Ok(s) => s,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            use futures::StreamExt;
            while let Some(result) = agent_stream.next().await {
                match result {
                    Ok(event) => {
                        // recorded before the caller sees it, so the next
                        // agent step reads the updated state
                        if let Err(e) = session_service.append_event(&session_id, event.clone()).await {
                            yield Err(e);
                            return;
                        }
                        yield Ok(event);
                        if ctx.ended() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(invocation.id = %invocation_id, error = %e, "invocation failed");
                        yield Err(e);
                        return;
                    }
                }
            }
            tracing::info!(invocation.id = %invocation_id, "invocation finished");
        };

        Ok(Box::pin(s))
    }
}
