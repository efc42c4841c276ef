use forge_core::{Content, FinishReason, GenerateContentConfig, LlmRequest, Part};
use forge_model::gemini::{build_request_body, convert_response};
use serde_json::json;

#[test]
fn test_request_body_roles_and_system_instruction() {
    let req = LlmRequest::new(
        "gemini-2.5-flash",
        vec![
            Content::new("user").with_text("Create lesson 4"),
            Content::new("model").with_part(Part::function_call("list_lessons", json!({}))),
            Content::new("function")
                .with_part(Part::function_response("list_lessons", json!("01_intro.py"))),
        ],
    )
    .with_system_instruction("You are a lesson planner.");

    let body = build_request_body(&req);
    assert_eq!(body["systemInstruction"]["parts"][0]["text"], "You are a lesson planner.");

    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["functionCall"]["name"], "list_lessons");
    // function responses travel as user turns with an object payload
    assert_eq!(contents[2]["role"], "user");
    assert_eq!(
        contents[2]["parts"][0]["functionResponse"]["response"],
        json!({"result": "01_intro.py"})
    );
    assert!(body.get("tools").is_none());
    assert!(body.get("generationConfig").is_none());
}

#[test]
fn test_request_body_tools_and_config() {
    let mut req = LlmRequest::new("m", vec![Content::new("user").with_text("search")])
        .with_config(GenerateContentConfig {
            temperature: Some(0.2),
            max_output_tokens: Some(1024),
            ..Default::default()
        });
    req.tools.push(json!({
        "name": "read_template",
        "description": "Read a template",
        "parameters": {"type": "object", "properties": {}}
    }));
    req.builtin_tools.push("google_search".to_string());

    let body = build_request_body(&req);
    assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
    assert!(body["generationConfig"].get("topK").is_none());
    let tools = body["tools"].as_array().unwrap();
    assert_eq!(tools[0]["functionDeclarations"][0]["name"], "read_template");
    assert_eq!(tools[1], json!({"googleSearch": {}}));
}

#[test]
fn test_empty_contents_are_skipped() {
    let req = LlmRequest::new(
        "m",
        vec![Content::new("user"), Content::new("user").with_text("hello")],
    );
    let body = build_request_body(&req);
    assert_eq!(body["contents"].as_array().unwrap().len(), 1);
    assert!(body.get("systemInstruction").is_none());
}

#[test]
fn test_convert_text_and_function_call_response() {
    let resp = json!({
        "candidates": [{
            "content": {
                "role": "model",
                "parts": [
                    {"text": "thinking...", "thought": true},
                    {"text": "Running checks."},
                    {"functionCall": {"name": "run_ruff_format", "args": {"project_name": "dsa"}}}
                ]
            },
            "finishReason": "STOP"
        }],
        "usageMetadata": {"promptTokenCount": 10, "candidatesTokenCount": 5, "totalTokenCount": 15}
    });

    let converted = convert_response(&resp).unwrap();
    let content = converted.content.unwrap();
    assert_eq!(content.role, "model");
    assert_eq!(content.parts.len(), 2);
    assert_eq!(content.text(), "Running checks.");
    let calls: Vec<_> = content.function_calls().collect();
    assert_eq!(calls[0].0, "run_ruff_format");
    assert_eq!(calls[0].1["project_name"], "dsa");
    assert_eq!(converted.finish_reason, Some(FinishReason::Stop));
    assert_eq!(converted.usage_metadata.unwrap().total_token_count, 15);
}

#[test]
fn test_convert_blocked_prompt() {
    let resp = json!({"promptFeedback": {"blockReason": "SAFETY"}});
    let converted = convert_response(&resp).unwrap();
    assert!(converted.content.is_none());
    assert!(converted.error_message.unwrap().contains("SAFETY"));
}

#[test]
fn test_convert_error_body() {
    let resp = json!({"error": {"code": 400, "message": "API key not valid"}});
    assert!(convert_response(&resp).is_err());
}
