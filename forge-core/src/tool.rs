use crate::{EventActions, ReadonlyContext, Result, State};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;

    /// Builtin tools are executed by the model provider, never locally.
    fn is_builtin(&self) -> bool {
        false
    }
    fn parameters_schema(&self) -> Option<Value> {
        None
    }
    async fn execute(&self, ctx: Arc<dyn ToolContext>, args: Value) -> Result<Value>;
}

#[async_trait]
pub trait ToolContext: ReadonlyContext {
    fn function_call_id(&self) -> &str;
    fn state(&self) -> &dyn State;
    /// Snapshot of the actions recorded so far for this call.
    fn actions(&self) -> EventActions;
    fn set_actions(&self, actions: EventActions);

    /// Records a state write; it lands in the session when the tool's
    /// response event is appended.
    fn set_state(&self, key: &str, value: Value) {
        let mut actions = self.actions();
        actions.state_delta.insert(key.to_string(), value);
        self.set_actions(actions);
    }
}
