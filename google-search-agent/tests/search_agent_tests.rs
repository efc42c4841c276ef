use forge_core::{Agent, Content, IncludeContents, LlmResponse};
use forge_model::MockLlm;
use forge_runner::{Runner, RunnerConfig};
use forge_session::InMemorySessionService;
use futures::StreamExt;
use google_search_agent::{INSTRUCTION, build_google_search_agent};
use std::sync::Arc;

#[test]
fn test_agent_definition() {
    let agent = build_google_search_agent(Arc::new(MockLlm::new("mock"))).unwrap();
    assert_eq!(agent.name(), "google_search_agent");
    assert_eq!(agent.description(), "Professional search assistant with Google Search capabilities.");
    assert_eq!(agent.instruction(), "Answer questions using Google Search when needed. Always cite sources.");
    assert_eq!(agent.tool_names(), vec!["google_search"]);
    assert!(agent.output_key().is_none());
    assert_eq!(agent.include_contents(), IncludeContents::Default);
}

#[tokio::test]
async fn test_search_is_declared_as_builtin() {
    let model = Arc::new(
        MockLlm::new("mock")
            .with_response(LlmResponse::new(Content::new("model").with_text("Rust 1.0 shipped in 2015 [1]."))),
    );
    let agent = build_google_search_agent(model.clone()).unwrap();
    let runner = Runner::new(RunnerConfig {
        app_name: "lesson-forge".to_string(),
        agent: Arc::new(agent),
        session_service: Arc::new(InMemorySessionService::new()),
    })
    .unwrap();

    let events: Vec<_> = runner
        .run("user".to_string(), "s1".to_string(), Content::new("user").with_text("When did Rust 1.0 ship?"))
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    let event = events[0].as_ref().unwrap();
    assert_eq!(event.author, "google_search_agent");

    let request = &model.requests()[0];
    assert_eq!(request.system_instruction.as_deref(), Some(INSTRUCTION));
    assert!(request.tools.is_empty());
    assert_eq!(request.builtin_tools, vec!["google_search".to_string()]);
}
