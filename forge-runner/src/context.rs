use forge_core::{
    Agent, Content, InvocationContext as InvocationContextTrait, ReadonlyContext, Session,
};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

pub struct InvocationContext {
    invocation_id: String,
    agent: Arc<dyn Agent>,
    user_id: String,
    app_name: String,
    session_id: String,
    user_content: Content,
    session: Arc<dyn Session>,
    ended: Arc<AtomicBool>,
}

impl InvocationContext {
    pub fn new(
        invocation_id: String,
        agent: Arc<dyn Agent>,
        user_content: Content,
        session: Arc<dyn Session>,
    ) -> Self {
        Self {
            invocation_id,
            agent,
            user_id: session.user_id().to_string(),
            app_name: session.app_name().to_string(),
            session_id: session.id().to_string(),
            user_content,
            session,
            ended: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl ReadonlyContext for InvocationContext {
    fn invocation_id(&self) -> &str {
        &self.invocation_id
    }

    fn agent_name(&self) -> &str {
        self.agent.name()
    }

    fn user_id(&self) -> &str {
        &self.user_id
    }

    fn app_name(&self) -> &str {
        &self.app_name
    }

    fn session_id(&self) -> &str {
        &self.session_id
    }

    fn user_content(&self) -> &Content {
        &self.user_content
    }
}

impl InvocationContextTrait for InvocationContext {
    fn agent(&self) -> Arc<dyn Agent> {
        self.agent.clone()
    }

    fn session(&self) -> &dyn Session {
        self.session.as_ref()
    }

    fn end_invocation(&self) {
        self.ended.store(true, Ordering::SeqCst);
    }

    fn ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }
}
