use crate::{ForgeError, InvocationContext, Result};
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Matches `{name}` placeholders, swallowing doubled braces so `{{x}}` is
/// seen as a single match.
static PLACEHOLDER_REGEX: OnceLock<Option<Regex>> = OnceLock::new();

fn placeholder_regex() -> Option<&'static Regex> {
    PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"\{+[^{}]*\}+").ok()).as_ref()
}

/// Letter or underscore first, then letters, digits or underscores.
fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) if first.is_alphabetic() || first == '_' => {
            chars.all(|c| c.is_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

fn is_valid_state_name(var_name: &str) -> bool {
    match var_name.split_once(':') {
        None => is_identifier(var_name),
        Some((prefix, rest)) => {
            matches!(prefix, "app" | "user" | "temp") && is_identifier(rest)
        }
    }
}

fn render_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn replace_match(ctx: &dyn InvocationContext, match_str: &str) -> Result<String> {
    let var_name = match_str.trim_matches(|c| c == '{' || c == '}').trim();

    let (var_name, optional) = match var_name.strip_suffix('?') {
        Some(name) => (name, true),
        None => (var_name, false),
    };

    if !is_valid_state_name(var_name) {
        return Ok(match_str.to_string());
    }

    match ctx.session().state().get(var_name) {
        Some(value) => Ok(render_value(&value)),
        None if optional => Ok(String::new()),
        None => Err(ForgeError::Agent(format!("State variable '{}' not found", var_name))),
    }
}

/// Injects session state values into an instruction template.
///
/// - `{var_name}` - required state value, errors when missing
/// - `{var_name?}` - optional, replaced by an empty string when missing
/// - `{app:var}`, `{user:var}`, `{temp:var}` - prefixed state keys
///
/// String values are inserted as-is; other JSON values use their compact
/// JSON text. Braces that do not enclose a valid state name are kept
/// literally, so code samples in instructions survive.
pub fn inject_session_state(ctx: &dyn InvocationContext, template: &str) -> Result<String> {
    let Some(regex) = placeholder_regex() else {
        return Ok(template.to_string());
    };
    let mut result = String::with_capacity(template.len());
    let mut last_end = 0;

    for found in regex.find_iter(template) {
        let range = found.range();
        result.push_str(&template[last_end..range.start]);
        result.push_str(&replace_match(ctx, found.as_str())?);
        last_end = range.end;
    }

    result.push_str(&template[last_end..]);
    Ok(result)
}
