use async_trait::async_trait;
use forge_core::{
    Content, FinishReason, ForgeError, Llm, LlmRequest, LlmResponse, LlmResponseStream, Part,
    Result, UsageMetadata,
};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::{Map, Value, json};

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Gemini over the Google AI Studio REST API.
pub struct GeminiModel {
    http_client: reqwest::Client,
    base_url: String,
    model_name: String,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, model, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        let value = HeaderValue::from_str(&api_key)
            .map_err(|e| ForgeError::Config(format!("invalid API key: {}", e)))?;
        let headers =
            HeaderMap::from_iter([(HeaderName::from_static("x-goog-api-key"), value)]);
        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ForgeError::Model(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model_name: model.into(),
        })
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.base_url,
            model.trim_start_matches("models/")
        )
    }
}

fn convert_part(part: &Part) -> Value {
    match part {
        Part::Text { text } => json!({ "text": text }),
        Part::FunctionCall { name, args, .. } => {
            json!({ "functionCall": { "name": name, "args": args } })
        }
        Part::FunctionResponse { function_response, .. } => {
            // the API only accepts an object as the response payload
            let response = match &function_response.response {
                Value::Object(_) => function_response.response.clone(),
                other => json!({ "result": other }),
            };
            json!({ "functionResponse": { "name": function_response.name, "response": response } })
        }
    }
}

fn convert_content(content: &Content) -> Value {
    let role = match content.role.as_str() {
        "model" => "model",
        _ => "user",
    };
    let parts: Vec<Value> = content.parts.iter().map(convert_part).collect();
    json!({ "role": role, "parts": parts })
}

/// Builds the `generateContent` JSON body for a request.
pub fn build_request_body(req: &LlmRequest) -> Value {
    let mut body = Map::new();
    let contents: Vec<Value> =
        req.contents.iter().filter(|c| !c.parts.is_empty()).map(convert_content).collect();
    body.insert("contents".into(), Value::Array(contents));

    if let Some(instruction) = req.system_instruction.as_deref().filter(|s| !s.is_empty()) {
        body.insert("systemInstruction".into(), json!({ "parts": [{ "text": instruction }] }));
    }

    if let Some(config) = &req.config {
        let mut generation = Map::new();
        if let Some(t) = config.temperature {
            generation.insert("temperature".into(), json!(t));
        }
        if let Some(p) = config.top_p {
            generation.insert("topP".into(), json!(p));
        }
        if let Some(k) = config.top_k {
            generation.insert("topK".into(), json!(k));
        }
        if let Some(m) = config.max_output_tokens {
            generation.insert("maxOutputTokens".into(), json!(m));
        }
        if !generation.is_empty() {
            body.insert("generationConfig".into(), Value::Object(generation));
        }
    }

    let mut tools = Vec::new();
    if !req.tools.is_empty() {
        tools.push(json!({ "functionDeclarations": req.tools }));
    }
    for builtin in &req.builtin_tools {
        match builtin.as_str() {
            "google_search" => tools.push(json!({ "googleSearch": {} })),
            other => tracing::warn!(tool = other, "unsupported builtin tool skipped"),
        }
    }
    if !tools.is_empty() {
        body.insert("tools".into(), Value::Array(tools));
    }

    Value::Object(body)
}

fn convert_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::MaxTokens,
        "SAFETY" => FinishReason::Safety,
        "RECITATION" => FinishReason::Recitation,
        _ => FinishReason::Other,
    }
}

/// Maps a `generateContent` response body onto an [`LlmResponse`].
pub fn convert_response(resp: &Value) -> Result<LlmResponse> {
    if let Some(error) = resp.get("error") {
        return Err(ForgeError::Model(error.to_string()));
    }

    let candidate = resp.get("candidates").and_then(|c| c.get(0));

    let content = candidate
        .and_then(|c| c.get("content"))
        .and_then(|c| c.get("parts"))
        .and_then(Value::as_array)
        .map(|parts| {
            let converted: Vec<Part> = parts
                .iter()
                .filter_map(|p| {
                    if p.get("thought").and_then(Value::as_bool).unwrap_or(false) {
                        return None;
                    }
                    if let Some(text) = p.get("text").and_then(Value::as_str) {
                        return Some(Part::text_part(text));
                    }
                    let call = p.get("functionCall")?;
                    let name = call.get("name").and_then(Value::as_str)?;
                    let args = call.get("args").cloned().unwrap_or_else(|| json!({}));
                    Some(Part::function_call(name, args))
                })
                .collect();
            Content { role: "model".to_string(), parts: converted }
        });

    let usage_metadata = resp.get("usageMetadata").map(|u| {
        let count = |key: &str| u.get(key).and_then(Value::as_i64).unwrap_or(0) as i32;
        UsageMetadata {
            prompt_token_count: count("promptTokenCount"),
            candidates_token_count: count("candidatesTokenCount"),
            total_token_count: count("totalTokenCount"),
        }
    });

    let finish_reason = candidate
        .and_then(|c| c.get("finishReason"))
        .and_then(Value::as_str)
        .map(convert_finish_reason);

    let error_message = match (&content, resp.get("promptFeedback")) {
        (None, Some(feedback)) => Some(feedback.to_string()),
        _ => None,
    };

    Ok(LlmResponse {
        content,
        usage_metadata,
        finish_reason,
        partial: false,
        turn_complete: true,
        error_code: None,
        error_message,
    })
}

#[async_trait]
impl Llm for GeminiModel {
    fn name(&self) -> &str {
        &self.model_name
    }

    #[tracing::instrument(skip_all, fields(model = %self.model_name))]
    async fn generate_content(&self, req: LlmRequest, _stream: bool) -> Result<LlmResponseStream> {
        let model = if req.model.is_empty() { self.model_name.as_str() } else { req.model.as_str() };
        let body = build_request_body(&req);
        tracing::debug!(contents = req.contents.len(), tools = req.tools.len(), "calling Gemini");

        let response = self
            .http_client
            .post(self.endpoint(model))
            .json(&body)
            .send()
            .await
            .map_err(|e| ForgeError::Model(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let description = response.text().await.unwrap_or_default();
            return Err(ForgeError::Model(format!("HTTP {}: {}", status.as_u16(), description)));
        }

        let json: Value = response.json().await.map_err(|e| ForgeError::Model(e.to_string()))?;
        let llm_response = convert_response(&json)?;
        if let Some(usage) = &llm_response.usage_metadata {
            tracing::debug!(total_tokens = usage.total_token_count, "Gemini response received");
        }

        let stream = async_stream::stream! {
            yield Ok(llm_response);
        };
        Ok(Box::pin(stream))
    }
}
