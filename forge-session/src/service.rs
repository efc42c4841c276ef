use forge_core::{Event, Result, Session};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct CreateRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: Option<String>,
    pub state: HashMap<String, Value>,
}

#[derive(Debug, Clone)]
pub struct GetRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

#[derive(Debug, Clone)]
pub struct ListRequest {
    pub app_name: String,
    pub user_id: String,
}

#[derive(Debug, Clone)]
pub struct DeleteRequest {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

#[async_trait]
pub trait SessionService: Send + Sync {
    async fn create(&self, req: CreateRequest) -> Result<Arc<dyn Session>>;
    async fn get(&self, req: GetRequest) -> Result<Arc<dyn Session>>;
    async fn list(&self, req: ListRequest) -> Result<Vec<Arc<dyn Session>>>;
    async fn delete(&self, req: DeleteRequest) -> Result<()>;
    /// Records the event and applies its state delta. `temp:` keys are
    /// dropped before storage.
    async fn append_event(&self, session_id: &str, event: Event) -> Result<()>;
}
