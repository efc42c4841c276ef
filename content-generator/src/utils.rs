use regex::Regex;
use std::sync::OnceLock;

// Both fences must match; backticks inside docstrings are left alone.
const OPENING_FENCE: &str = r"^`{3,}[^\S\n]*[A-Za-z0-9_]*[^\S\n]*\n";
const CLOSING_FENCE: &str = r"\n[^\S\n]*`{3,}[^\S\n]*$";

fn fences() -> Option<&'static (Regex, Regex)> {
    static FENCES: OnceLock<Option<(Regex, Regex)>> = OnceLock::new();
    FENCES
        .get_or_init(|| Some((Regex::new(OPENING_FENCE).ok()?, Regex::new(CLOSING_FENCE).ok()?)))
        .as_ref()
}

/// Removes markdown code fences wrapping model output, then trims.
pub fn strip_code_fences(text: &str) -> String {
    let stripped = text.trim();
    let Some((opening, closing)) = fences() else {
        return stripped.to_string();
    };

    if opening.is_match(stripped) && closing.is_match(stripped) {
        let without_open = opening.replace(stripped, "");
        let without_close = closing.replace(&without_open, "");
        return without_close.trim().to_string();
    }
    stripped.to_string()
}
