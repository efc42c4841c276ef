use crate::model::LlmResponse;
use crate::types::Content;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

// State scope prefixes
pub const KEY_PREFIX_APP: &str = "app:";
pub const KEY_PREFIX_TEMP: &str = "temp:";
pub const KEY_PREFIX_USER: &str = "user:";

/// A single step of an invocation: a user message, a model reply, a tool
/// response or a pure state update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub invocation_id: String,
    pub author: String,
    /// Access content via `event.llm_response.content` or [`Event::content`].
    #[serde(flatten)]
    pub llm_response: LlmResponse,
    pub actions: EventActions,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventActions {
    pub state_delta: HashMap<String, serde_json::Value>,
    pub skip_summarization: bool,
    pub escalate: bool,
}

impl Event {
    pub fn new(invocation_id: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp: Utc::now(),
            invocation_id: invocation_id.into(),
            author: String::new(),
            llm_response: LlmResponse::default(),
            actions: EventActions::default(),
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn content(&self) -> Option<&Content> {
        self.llm_response.content.as_ref()
    }

    pub fn set_content(&mut self, content: Content) {
        self.llm_response.content = Some(content);
    }

    /// True when the event carries model text and no pending function call.
    pub fn is_final_response(&self) -> bool {
        self.content()
            .map(|c| !c.has_function_calls() && !c.text().is_empty() && c.role == "model")
            .unwrap_or(false)
    }
}
