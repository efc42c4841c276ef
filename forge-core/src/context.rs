use crate::{Agent, Event, types::Content};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[async_trait]
pub trait ReadonlyContext: Send + Sync {
    fn invocation_id(&self) -> &str;
    fn agent_name(&self) -> &str;
    fn user_id(&self) -> &str;
    fn app_name(&self) -> &str;
    fn session_id(&self) -> &str;
    fn user_content(&self) -> &Content;
}

/// Read access to session state. Writes go through `EventActions::state_delta`
/// and are applied when the event is appended to the session.
pub trait State: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn all(&self) -> HashMap<String, Value>;
}

pub trait Session: Send + Sync {
    fn id(&self) -> &str;
    fn app_name(&self) -> &str;
    fn user_id(&self) -> &str;
    fn state(&self) -> &dyn State;
    /// Events appended so far, oldest first.
    fn events(&self) -> Vec<Event>;
}

#[async_trait]
pub trait InvocationContext: ReadonlyContext {
    /// The root agent of this invocation.
    fn agent(&self) -> Arc<dyn Agent>;
    /// Live view of the session; reflects events appended earlier in the
    /// same invocation.
    fn session(&self) -> &dyn Session;
    fn end_invocation(&self);
    fn ended(&self) -> bool;
}

/// Which conversation history an LLM agent sends to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IncludeContents {
    /// Replay the session history.
    #[default]
    Default,
    /// Send only the current user message.
    None,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_include_contents_default() {
        assert_eq!(IncludeContents::default(), IncludeContents::Default);
        assert_ne!(IncludeContents::Default, IncludeContents::None);
    }
}
