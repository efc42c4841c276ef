use crate::{
    CreateRequest, DeleteRequest, Event, GetRequest, KEY_PREFIX_APP, KEY_PREFIX_TEMP,
    KEY_PREFIX_USER, ListRequest, Session, SessionService, State,
};
use async_trait::async_trait;
use forge_core::{ForgeError, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

type StateMap = HashMap<String, Value>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct SessionId {
    app_name: String,
    user_id: String,
    session_id: String,
}

impl SessionId {
    fn key(&self) -> String {
        format!("{}:{}:{}", self.app_name, self.user_id, self.session_id)
    }
}

#[derive(Default)]
struct SessionData {
    events: Vec<Event>,
    /// Session keys plus `app:`/`user:` keys under their prefixed names.
    state: StateMap,
}

pub struct InMemorySession {
    id: SessionId,
    data: RwLock<SessionData>,
}

impl Session for InMemorySession {
    fn id(&self) -> &str {
        &self.id.session_id
    }

    fn app_name(&self) -> &str {
        &self.id.app_name
    }

    fn user_id(&self) -> &str {
        &self.id.user_id
    }

    fn state(&self) -> &dyn State {
        self
    }

    fn events(&self) -> Vec<Event> {
        self.data.read().unwrap_or_else(PoisonError::into_inner).events.clone()
    }
}

impl State for InMemorySession {
    fn get(&self, key: &str) -> Option<Value> {
        self.data.read().unwrap_or_else(PoisonError::into_inner).state.get(key).cloned()
    }

    fn all(&self) -> HashMap<String, Value> {
        self.data.read().unwrap_or_else(PoisonError::into_inner).state.clone()
    }
}

/// Keeps sessions in process memory. `app:` state is shared by all sessions
/// of an app and `user:` state by all sessions of a user.
pub struct InMemorySessionService {
    sessions: RwLock<HashMap<String, Arc<InMemorySession>>>,
    app_state: RwLock<HashMap<String, StateMap>>,
    user_state: RwLock<HashMap<(String, String), StateMap>>,
}

impl InMemorySessionService {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            app_state: RwLock::new(HashMap::new()),
            user_state: RwLock::new(HashMap::new()),
        }
    }

    fn split_deltas(delta: &StateMap) -> (StateMap, StateMap, StateMap) {
        let mut app_delta = StateMap::new();
        let mut user_delta = StateMap::new();
        let mut session_delta = StateMap::new();

        for (key, value) in delta {
            if let Some(clean_key) = key.strip_prefix(KEY_PREFIX_APP) {
                app_delta.insert(clean_key.to_string(), value.clone());
            } else if let Some(clean_key) = key.strip_prefix(KEY_PREFIX_USER) {
                user_delta.insert(clean_key.to_string(), value.clone());
            } else if !key.starts_with(KEY_PREFIX_TEMP) {
                session_delta.insert(key.clone(), value.clone());
            }
        }

        (app_delta, user_delta, session_delta)
    }

    fn shared_state(&self, app_name: &str, user_id: &str) -> (StateMap, StateMap) {
        let app = self
            .app_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(app_name)
            .cloned()
            .unwrap_or_default();
        let user = self
            .user_state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&(app_name.to_string(), user_id.to_string()))
            .cloned()
            .unwrap_or_default();
        (app, user)
    }

    fn merge_shared(state: &mut StateMap, app: &StateMap, user: &StateMap) {
        for (k, v) in app {
            state.insert(format!("{}{}", KEY_PREFIX_APP, k), v.clone());
        }
        for (k, v) in user {
            state.insert(format!("{}{}", KEY_PREFIX_USER, k), v.clone());
        }
    }

    fn store_shared(&self, app_name: &str, user_id: &str, app: StateMap, user: StateMap) {
        if !app.is_empty() {
            self.app_state
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry(app_name.to_string())
                .or_default()
                .extend(app);
        }
        if !user.is_empty() {
            self.user_state
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .entry((app_name.to_string(), user_id.to_string()))
                .or_default()
                .extend(user);
        }
    }

    fn find(&self, session_id: &str) -> Option<Arc<InMemorySession>> {
        self.sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|s| s.id.session_id == session_id)
            .cloned()
    }
}

impl Default for InMemorySessionService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionService for InMemorySessionService {
    async fn create(&self, req: CreateRequest) -> Result<Arc<dyn Session>> {
        let session_id = req.session_id.unwrap_or_else(|| Uuid::new_v4().to_string());
        let id = SessionId { app_name: req.app_name, user_id: req.user_id, session_id };

        let (app_delta, user_delta, mut state) = Self::split_deltas(&req.state);
        self.store_shared(&id.app_name, &id.user_id, app_delta, user_delta);
        let (app, user) = self.shared_state(&id.app_name, &id.user_id);
        Self::merge_shared(&mut state, &app, &user);

        let session = Arc::new(InMemorySession {
            id: id.clone(),
            data: RwLock::new(SessionData { events: Vec::new(), state }),
        });
        self.sessions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.key(), session.clone());

        tracing::debug!(session.id = %id.session_id, app = %id.app_name, "session created");
        Ok(session)
    }

    async fn get(&self, req: GetRequest) -> Result<Arc<dyn Session>> {
        let id = SessionId {
            app_name: req.app_name,
            user_id: req.user_id,
            session_id: req.session_id,
        };
        let session = self
            .sessions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id.key())
            .cloned()
            .ok_or_else(|| ForgeError::Session(format!("session not found: {}", id.session_id)))?;

        let (app, user) = self.shared_state(&id.app_name, &id.user_id);
        {
            let mut data = session.data.write().unwrap_or_else(PoisonError::into_inner);
            Self::merge_shared(&mut data.state, &app, &user);
        }
        Ok(session)
    }

    async fn list(&self, req: ListRequest) -> Result<Vec<Arc<dyn Session>>> {
        let sessions = self.sessions.read().unwrap_or_else(PoisonError::into_inner);
        Ok(sessions
            .values()
            .filter(|s| s.id.app_name == req.app_name && s.id.user_id == req.user_id)
            .map(|s| s.clone() as Arc<dyn Session>)
            .collect())
    }

    async fn delete(&self, req: DeleteRequest) -> Result<()> {
        let id = SessionId {
            app_name: req.app_name,
            user_id: req.user_id,
            session_id: req.session_id,
        };
        self.sessions.write().unwrap_or_else(PoisonError::into_inner).remove(&id.key());
        Ok(())
    }

    async fn append_event(&self, session_id: &str, mut event: Event) -> Result<()> {
        event.actions.state_delta.retain(|k, _| !k.starts_with(KEY_PREFIX_TEMP));

        let session = self
            .find(session_id)
            .ok_or_else(|| ForgeError::Session(format!("session not found: {}", session_id)))?;

        let (app_delta, user_delta, session_delta) =
            Self::split_deltas(&event.actions.state_delta);
        {
            let mut data = session.data.write().unwrap_or_else(PoisonError::into_inner);
            data.state.extend(session_delta);
            Self::merge_shared(&mut data.state, &app_delta, &user_delta);
            data.events.push(event);
        }
        self.store_shared(&session.id.app_name, &session.id.user_id, app_delta, user_delta);
        Ok(())
    }
}
