use async_trait::async_trait;
use forge_core::{ForgeError, Result, Tool, ToolContext};
use serde_json::Value;
use std::sync::Arc;

/// Gemini's search grounding. The model runs the search itself; the tool is
/// only declared in the request.
#[derive(Default)]
pub struct GoogleSearchTool;

impl GoogleSearchTool {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Tool for GoogleSearchTool {
    fn name(&self) -> &str {
        "google_search"
    }

    fn description(&self) -> &str {
        "Performs a Google search to retrieve information from the web."
    }

    fn is_builtin(&self) -> bool {
        true
    }

    async fn execute(&self, _ctx: Arc<dyn ToolContext>, _args: Value) -> Result<Value> {
        Err(ForgeError::Tool("google_search is executed by the model provider".to_string()))
    }
}
