const MAX_VISIBLE_CHARS: usize = 100;

const SECRET_MARKERS: [&str; 4] = ["Bearer ", "api_key=", "\"api_key\":\"", "token="];

/// Shortens free text (prompts, provider error bodies) for logging and masks
/// credentials that providers sometimes echo back.
pub fn sanitize_for_log(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return String::from("[EMPTY]");
    }

    let total = trimmed.chars().count();
    let visible = if total > MAX_VISIBLE_CHARS {
        let head: String = trimmed.chars().take(MAX_VISIBLE_CHARS).collect();
        format!("{head}... ({total} chars total)")
    } else {
        trimmed.to_string()
    };

    SECRET_MARKERS
        .iter()
        .fold(visible, |acc, marker| redact_after(&acc, marker))
}

fn redact_after(text: &str, marker: &str) -> String {
    let Some(idx) = text.find(marker) else {
        return text.to_string();
    };
    let start = idx + marker.len();
    let end = text[start..]
        .find(|c: char| c.is_whitespace() || matches!(c, '&' | '"' | '\'' | ','))
        .map_or(text.len(), |i| start + i);
    format!("{}[REDACTED]{}", &text[..start], &text[end..])
}
