use async_stream::stream;
use async_trait::async_trait;
use forge_core::{
    Agent, Content, Event, EventActions, EventStream, ForgeError, GenerateContentConfig,
    IncludeContents, InvocationContext, Llm, LlmRequest, Part, ReadonlyContext, Result, State,
    Tool, ToolContext, inject_session_state,
};
use forge_telemetry::{agent_run_span, model_call_span, tool_execute_span};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::Instrument;

/// Model round-trips one agent turn may make before it is aborted.
pub const DEFAULT_MAX_MODEL_CALLS: u32 = 10;

pub struct LlmAgent {
    name: String,
    description: String,
    model: Arc<dyn Llm>,
    instruction: String,
    disallow_transfer_to_parent: bool,
    disallow_transfer_to_peers: bool,
    include_contents: IncludeContents,
    generate_content_config: Option<GenerateContentConfig>,
    tools: Vec<Arc<dyn Tool>>,
    output_key: Option<String>,
    max_model_calls: u32,
}

impl std::fmt::Debug for LlmAgent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmAgent")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("model", &self.model.name())
            .field("output_key", &self.output_key)
            .field("tools_count", &self.tools.len())
            .finish()
    }
}

impl LlmAgent {
    pub fn instruction(&self) -> &str {
        &self.instruction
    }

    pub fn output_key(&self) -> Option<&str> {
        self.output_key.as_deref()
    }

    pub fn include_contents(&self) -> IncludeContents {
        self.include_contents
    }

    pub fn generate_content_config(&self) -> Option<&GenerateContentConfig> {
        self.generate_content_config.as_ref()
    }

    pub fn tools(&self) -> &[Arc<dyn Tool>] {
        &self.tools
    }

    pub fn tool_names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn disallow_transfer_to_parent(&self) -> bool {
        self.disallow_transfer_to_parent
    }

    pub fn disallow_transfer_to_peers(&self) -> bool {
        self.disallow_transfer_to_peers
    }

    pub fn max_model_calls(&self) -> u32 {
        self.max_model_calls
    }
}

pub struct LlmAgentBuilder {
    name: String,
    description: Option<String>,
    model: Option<Arc<dyn Llm>>,
    instruction: Option<String>,
    disallow_transfer_to_parent: bool,
    disallow_transfer_to_peers: bool,
    include_contents: IncludeContents,
    generate_content_config: Option<GenerateContentConfig>,
    tools: Vec<Arc<dyn Tool>>,
    output_key: Option<String>,
    max_model_calls: u32,
}

impl LlmAgentBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            instruction: None,
            disallow_transfer_to_parent: false,
            disallow_transfer_to_peers: false,
            include_contents: IncludeContents::Default,
            generate_content_config: None,
            tools: Vec::new(),
            output_key: None,
            max_model_calls: DEFAULT_MAX_MODEL_CALLS,
        }
    }

    pub fn description(mut self, desc: impl Into<String>) -> Self {
        self.description = Some(desc.into());
        self
    }

    pub fn model(mut self, model: Arc<dyn Llm>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn instruction(mut self, instruction: impl Into<String>) -> Self {
        self.instruction = Some(instruction.into());
        self
    }

    pub fn disallow_transfer_to_parent(mut self, disallow: bool) -> Self {
        self.disallow_transfer_to_parent = disallow;
        self
    }

    pub fn disallow_transfer_to_peers(mut self, disallow: bool) -> Self {
        self.disallow_transfer_to_peers = disallow;
        self
    }

    pub fn include_contents(mut self, include: IncludeContents) -> Self {
        self.include_contents = include;
        self
    }

    pub fn generate_content_config(mut self, config: GenerateContentConfig) -> Self {
        self.generate_content_config = Some(config);
        self
    }

    pub fn output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn tool(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.push(tool);
        self
    }

    pub fn max_model_calls(mut self, max: u32) -> Self {
        self.max_model_calls = max;
        self
    }

    pub fn build(self) -> Result<LlmAgent> {
        let model = self.model.ok_or_else(|| ForgeError::Agent("Model is required".to_string()))?;

        Ok(LlmAgent {
            name: self.name,
            description: self.description.unwrap_or_default(),
            model,
            instruction: self.instruction.unwrap_or_default(),
            disallow_transfer_to_parent: self.disallow_transfer_to_parent,
            disallow_transfer_to_peers: self.disallow_transfer_to_peers,
            include_contents: self.include_contents,
            generate_content_config: self.generate_content_config,
            tools: self.tools,
            output_key: self.output_key,
            max_model_calls: self.max_model_calls,
        })
    }
}

/// Context handed to a tool call. State reads see the session plus any
/// writes made earlier in the same model turn.
struct AgentToolContext {
    parent_ctx: Arc<dyn InvocationContext>,
    agent_name: String,
    function_call_id: String,
    pending: HashMap<String, Value>,
    actions: Mutex<EventActions>,
}

impl AgentToolContext {
    fn new(
        parent_ctx: Arc<dyn InvocationContext>,
        agent_name: String,
        function_call_id: String,
        pending: HashMap<String, Value>,
    ) -> Self {
        Self {
            parent_ctx,
            agent_name,
            function_call_id,
            pending,
            actions: Mutex::new(EventActions::default()),
        }
    }
}

impl ReadonlyContext for AgentToolContext {
    fn invocation_id(&self) -> &str {
        self.parent_ctx.invocation_id()
    }

    fn agent_name(&self) -> &str {
        &self.agent_name
    }

    fn user_id(&self) -> &str {
        self.parent_ctx.user_id()
    }

    fn app_name(&self) -> &str {
        self.parent_ctx.app_name()
    }

    fn session_id(&self) -> &str {
        self.parent_ctx.session_id()
    }

    fn user_content(&self) -> &Content {
        self.parent_ctx.user_content()
    }
}

impl State for AgentToolContext {
    fn get(&self, key: &str) -> Option<Value> {
        let own = self
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state_delta
            .get(key)
            .cloned();
        own.or_else(|| self.pending.get(key).cloned())
            .or_else(|| self.parent_ctx.session().state().get(key))
    }

    fn all(&self) -> HashMap<String, Value> {
        let mut all = self.parent_ctx.session().state().all();
        all.extend(self.pending.clone());
        all.extend(
            self.actions.lock().unwrap_or_else(PoisonError::into_inner).state_delta.clone(),
        );
        all
    }
}

impl ToolContext for AgentToolContext {
    fn function_call_id(&self) -> &str {
        &self.function_call_id
    }

    fn state(&self) -> &dyn State {
        self
    }

    fn actions(&self) -> EventActions {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_actions(&self, actions: EventActions) {
        *self.actions.lock().unwrap_or_else(PoisonError::into_inner) = actions;
    }
}

fn describe_for_context(author: &str, content: &Content) -> Option<Content> {
    let mut converted = Content::new("user").with_text("For context:");
    for part in &content.parts {
        let text = match part {
            Part::Text { text } if text.trim().is_empty() => continue,
            Part::Text { text } => format!("[{}] said: {}", author, text),
            Part::FunctionCall { name, args, .. } => {
                format!("[{}] called tool `{}` with parameters: {}", author, name, args)
            }
            Part::FunctionResponse { function_response, .. } => format!(
                "[{}] `{}` tool returned result: {}",
                author, function_response.name, function_response.response
            ),
        };
        converted.parts.push(Part::text_part(text));
    }
    (converted.parts.len() > 1).then_some(converted)
}

/// Rebuilds the conversation for `agent_name` from session events. User
/// turns and the agent's own turns are replayed verbatim; other agents'
/// output is rewritten as user-side context.
fn history_contents(events: &[Event], agent_name: &str) -> Vec<Content> {
    events
        .iter()
        .filter_map(|event| {
            let content = event.content()?;
            if content.parts.is_empty() {
                return None;
            }
            if event.author == "user" || event.author == agent_name {
                Some(content.clone())
            } else {
                describe_for_context(&event.author, content)
            }
        })
        .collect()
}

fn tool_declaration(tool: &dyn Tool) -> Value {
    let mut decl = json!({
        "name": tool.name(),
        "description": tool.description(),
    });
    if let Some(schema) = tool.parameters_schema() {
        decl["parameters"] = schema;
    }
    decl
}

#[async_trait]
impl Agent for LlmAgent {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn sub_agents(&self) -> &[Arc<dyn Agent>] {
        &[]
    }

    async fn run(&self, ctx: Arc<dyn InvocationContext>) -> Result<EventStream> {
        let agent_name = self.name.clone();
        let model = self.model.clone();
        let instruction = self.instruction.clone();
        let include_contents = self.include_contents;
        let config = self.generate_content_config.clone();
        let tools = self.tools.clone();
        let output_key = self.output_key.clone();
        let max_model_calls = self.max_model_calls;
        let span = agent_run_span(&self.name, ctx.invocation_id());

        let s = stream! {
            use futures::StreamExt;

            tracing::info!(parent: &span, include = ?include_contents, "agent started");
            let system_instruction = match inject_session_state(ctx.as_ref(), &instruction) {
                Ok(text) => text,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };

            let mut contents = match include_contents {
                IncludeContents::Default => history_contents(&ctx.session().events(), &agent_name),
                IncludeContents::None => vec![ctx.user_content().clone()],
            };

            let declarations: Vec<Value> = tools
                .iter()
                .filter(|t| !t.is_builtin())
                .map(|t| tool_declaration(t.as_ref()))
                .collect();
            let builtin_tools: Vec<String> =
                tools.iter().filter(|t| t.is_builtin()).map(|t| t.name().to_string()).collect();

            let mut model_calls = 0u32;
            loop {
                if model_calls >= max_model_calls {
                    yield Err(ForgeError::Agent(format!(
                        "agent '{}' exceeded {} model calls",
                        agent_name, max_model_calls
                    )));
                    return;
                }
                model_calls += 1;

                let request = LlmRequest {
                    model: model.name().to_string(),
                    system_instruction: Some(system_instruction.clone()),
                    contents: contents.clone(),
                    config: config.clone(),
                    tools: declarations.clone(),
                    builtin_tools: builtin_tools.clone(),
                };

                tracing::debug!(agent.name = %agent_name, call = model_calls, "calling model");
                let call_span = span.in_scope(|| model_call_span(model.name()));
                let mut responses = match model
                    .generate_content(request, false)
                    .instrument(call_span.clone())
                    .await
                {
                    Ok(stream) => stream,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };

                let mut final_response = None;
                while let Some(item) = responses.next().instrument(call_span.clone()).await {
                    match item {
                        Ok(response) if !response.partial => final_response = Some(response),
                        Ok(_) => {}
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }

                let Some(response) = final_response else {
                    yield Err(ForgeError::Model(format!("{}: empty response stream", model.name())));
                    return;
                };
                if response.content.is_none() {
                    if let Some(message) = &response.error_message {
                        yield Err(ForgeError::Model(message.clone()));
                        return;
                    }
                }

                let mut content = response.content.clone().unwrap_or_else(|| Content::new("model"));
                content.role = "model".to_string();

                let mut model_event = Event::new(ctx.invocation_id()).with_author(agent_name.clone());
                model_event.llm_response = response;
                model_event.set_content(content.clone());
                yield Ok(model_event);
                contents.push(content.clone());

                let calls: Vec<(String, Value)> = content
                    .function_calls()
                    .map(|(name, args)| (name.to_string(), args.clone()))
                    .collect();

                if calls.is_empty() {
                    if let Some(key) = &output_key {
                        let mut state_event =
                            Event::new(ctx.invocation_id()).with_author(agent_name.clone());
                        state_event.actions.state_delta.insert(key.clone(), json!(content.text()));
                        yield Ok(state_event);
                    }
                    return;
                }

                let mut response_content = Content::new("function");
                let mut merged = EventActions::default();
                for (idx, (name, args)) in calls.into_iter().enumerate() {
                    let call_id = format!("{}-{}-{}-{}", ctx.invocation_id(), name, model_calls, idx);
                    let tool_ctx = Arc::new(AgentToolContext::new(
                        ctx.clone(),
                        agent_name.clone(),
                        call_id,
                        merged.state_delta.clone(),
                    ));

                    let result = match tools.iter().find(|t| t.name() == name) {
                        Some(tool) if !tool.is_builtin() => {
                            match tool
                                .execute(tool_ctx.clone(), args)
                                .instrument(span.in_scope(|| tool_execute_span(&name)))
                                .await
                            {
                                Ok(value) => value,
                                Err(e) => {
                                    tracing::warn!(tool.name = %name, error = %e, "tool failed");
                                    json!({ "error": e.to_string() })
                                }
                            }
                        }
                        Some(_) => json!({ "error": format!("Tool '{}' runs inside the model", name) }),
                        None => json!({ "error": format!("Tool '{}' not found", name) }),
                    };

                    let actions = tool_ctx.actions();
                    merged.state_delta.extend(actions.state_delta);
                    merged.escalate |= actions.escalate;
                    merged.skip_summarization |= actions.skip_summarization;
                    response_content.parts.push(Part::function_response(name, result));
                }

                let stop = merged.escalate || merged.skip_summarization;
                let mut tool_event = Event::new(ctx.invocation_id()).with_author(agent_name.clone());
                tool_event.set_content(response_content.clone());
                tool_event.actions = merged;
                yield Ok(tool_event);
                contents.push(response_content);

                if stop {
                    return;
                }
            }
        };

        Ok(Box::pin(s))
    }
}
