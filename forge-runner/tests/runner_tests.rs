use async_stream::stream;
use async_trait::async_trait;
use forge_core::{
    Agent, Content, Event, EventStream, ForgeError, InvocationContext, Result,
};
use forge_runner::{Runner, RunnerConfig};
use forge_session::{CreateRequest, GetRequest, InMemorySessionService, SessionService};
use futures::StreamExt;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;

/// Writes a counter into state, then reports what it read back from the
/// live session on its second event.
struct CountingAgent;

#[async_trait]
impl Agent for CountingAgent {
    fn name(&self) -> &str {
        "counter"
    }
    fn description(&self) -> &str {
        "test agent"
    }
    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &[]
    }
    async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        let s = stream! {
            let mut first = Event::new(ctx.invocation_id()).with_author("counter");
            first.actions.state_delta.insert("count".to_string(), json!(1));
            yield Ok(first);

            let seen = ctx.session().state().get("count");
            let mut second = Event::new(ctx.invocation_id()).with_author("counter");
            second.set_content(Content::new("model").with_text(format!("seen={:?}", seen)));
            yield Ok(second);
        };
        Ok(Box::pin(s))
    }
}

struct FailingAgent;

#[async_trait]
impl Agent for FailingAgent {
    fn name(&self) -> &str {
        "failing"
    }
    fn description(&self) -> &str {
        ""
    }
    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &[]
    }
    async fn run(&self, _ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        let s = stream! {
            yield Err(ForgeError::Agent("boom".to_string()));
        };
        Ok(Box::pin(s))
    }
}

fn runner(agent: Arc<dyn Agent>, service: Arc<InMemorySessionService>) -> Runner {
    Runner::new(RunnerConfig { app_name: "lesson-forge".to_string(), agent, session_service: service })
        .unwrap()
}

#[tokio::test]
async fn test_events_are_recorded_before_they_are_yielded() {
    let service = Arc::new(InMemorySessionService::new());
    let runner = runner(Arc::new(CountingAgent), service.clone());

    let mut stream = runner
        .run("user".to_string(), "s1".to_string(), Content::new("user").with_text("go"))
        .await
        .unwrap();

    let mut texts = Vec::new();
    while let Some(event) = stream.next().await {
        let event = event.unwrap();
        if let Some(content) = event.content() {
            texts.push(content.text());
        }
    }
    assert_eq!(texts, vec!["seen=Some(Number(1))".to_string()]);

    let session = service
        .get(GetRequest {
            app_name: "lesson-forge".to_string(),
            user_id: "user".to_string(),
            session_id: "s1".to_string(),
        })
        .await
        .unwrap();
    let events = session.events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].author, "user");
    assert_eq!(events[0].content().unwrap().text(), "go");
    assert_eq!(session.state().get("count"), Some(json!(1)));
}

#[tokio::test]
async fn test_existing_session_is_reused() {
    let service = Arc::new(InMemorySessionService::new());
    let mut state = HashMap::new();
    state.insert("preset".to_string(), json!("yes"));
    service
        .create(CreateRequest {
            app_name: "lesson-forge".to_string(),
            user_id: "user".to_string(),
            session_id: Some("s1".to_string()),
            state,
        })
        .await
        .unwrap();

    let runner = runner(Arc::new(CountingAgent), service.clone());
    let stream = runner
        .run("user".to_string(), "s1".to_string(), Content::new("user").with_text("go"))
        .await
        .unwrap();
    let events: Vec<_> = stream.collect().await;
    assert_eq!(events.len(), 2);

    let session = service
        .get(GetRequest {
            app_name: "lesson-forge".to_string(),
            user_id: "user".to_string(),
            session_id: "s1".to_string(),
        })
        .await
        .unwrap();
    assert_eq!(session.state().get("preset"), Some(json!("yes")));
}

#[tokio::test]
async fn test_agent_error_ends_stream() {
    let service = Arc::new(InMemorySessionService::new());
    let runner = runner(Arc::new(FailingAgent), service);
    let results: Vec<_> = runner
        .run("user".to_string(), "s1".to_string(), Content::new("user").with_text("go"))
        .await
        .unwrap()
        .collect()
        .await;
    assert_eq!(results.len(), 1);
    assert!(matches!(results[0], Err(ForgeError::Agent(_))));
}
