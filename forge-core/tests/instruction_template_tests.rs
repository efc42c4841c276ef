use async_trait::async_trait;
use forge_core::{
    Agent, Content, Event, EventStream, ForgeError, InvocationContext, ReadonlyContext, Result,
    Session, State, inject_session_state,
};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Arc;

struct MockState {
    data: HashMap<String, Value>,
}

impl State for MockState {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.get(key).cloned()
    }
    fn all(&self) -> HashMap<String, Value> {
        self.data.clone()
    }
}

struct MockSession {
    state: MockState,
}

impl Session for MockSession {
    fn id(&self) -> &str {
        "session-1"
    }
    fn app_name(&self) -> &str {
        "lesson-forge"
    }
    fn user_id(&self) -> &str {
        "user"
    }
    fn state(&self) -> &dyn State {
        &self.state
    }
    fn events(&self) -> Vec<Event> {
        Vec::new()
    }
}

struct NoopAgent;

#[async_trait]
impl Agent for NoopAgent {
    fn name(&self) -> &str {
        "noop"
    }
    fn description(&self) -> &str {
        ""
    }
    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &[]
    }
    async fn run(&self, _ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        Ok(Box::pin(futures::stream::empty()))
    }
}

struct MockContext {
    session: MockSession,
    content: Content,
}

impl MockContext {
    fn with_state(pairs: &[(&str, Value)]) -> Self {
        let data = pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
        Self { session: MockSession { state: MockState { data } }, content: Content::new("user") }
    }
}

impl ReadonlyContext for MockContext {
    fn invocation_id(&self) -> &str {
        "inv-1"
    }
    fn agent_name(&self) -> &str {
        "lesson_planner"
    }
    fn user_id(&self) -> &str {
        "user"
    }
    fn app_name(&self) -> &str {
        "lesson-forge"
    }
    fn session_id(&self) -> &str {
        "session-1"
    }
    fn user_content(&self) -> &Content {
        &self.content
    }
}

impl InvocationContext for MockContext {
    fn agent(&self) -> Arc<dyn Agent> {
        Arc::new(NoopAgent)
    }
    fn session(&self) -> &dyn Session {
        &self.session
    }
    fn end_invocation(&self) {}
    fn ended(&self) -> bool {
        false
    }
}

#[test]
fn test_string_values_inserted_raw() {
    let ctx = MockContext::with_state(&[("lesson_plan", json!("Lesson 04: binary search"))]);
    let result = inject_session_state(&ctx, "Plan:\n{lesson_plan}\nGo.").unwrap();
    assert_eq!(result, "Plan:\nLesson 04: binary search\nGo.");
}

#[test]
fn test_non_string_values_use_json_text() {
    let ctx = MockContext::with_state(&[("count", json!(3)), ("flags", json!([1, 2]))]);
    let result = inject_session_state(&ctx, "{count} / {flags}").unwrap();
    assert_eq!(result, "3 / [1,2]");
}

#[test]
fn test_missing_required_variable_errors() {
    let ctx = MockContext::with_state(&[]);
    let err = inject_session_state(&ctx, "Use {lesson_plan}").unwrap_err();
    assert!(matches!(err, ForgeError::Agent(ref msg) if msg == "State variable 'lesson_plan' not found"));
}

#[test]
fn test_optional_variable_missing_becomes_empty() {
    let ctx = MockContext::with_state(&[]);
    let result = inject_session_state(&ctx, "Feedback: [{validation_feedback?}]").unwrap();
    assert_eq!(result, "Feedback: []");
}

#[test]
fn test_prefixed_keys() {
    let ctx = MockContext::with_state(&[
        ("user:name", json!("Ada")),
        ("app:study_base", json!("/home/ada/study")),
    ]);
    let result = inject_session_state(&ctx, "{user:name} at {app:study_base}").unwrap();
    assert_eq!(result, "Ada at /home/ada/study");
}

#[test]
fn test_non_identifier_braces_left_literal() {
    let ctx = MockContext::with_state(&[]);
    let template = "def f() -> dict[str, int]: return {1: 2} or {a-b} or {bad:prefix}";
    let result = inject_session_state(&ctx, template).unwrap();
    assert_eq!(result, template);
}

#[test]
fn test_template_without_placeholders_unchanged() {
    let ctx = MockContext::with_state(&[("x", json!("y"))]);
    assert_eq!(inject_session_state(&ctx, "no placeholders").unwrap(), "no placeholders");
    assert_eq!(inject_session_state(&ctx, "").unwrap(), "");
}
