use reqwest::StatusCode;
use serde_json::Value as JsonValue;

/// Pulls the human-readable message out of an error response.
///
/// The remote API is inconsistent about where it puts the message, so the known shapes are
/// tried in order: `message`, `error` as a string, `error.message`, `errors[0].message`.
/// Falls back to the status reason phrase.
pub fn extract_remote_message(body: &str, status: u16) -> String {
    serde_json::from_str::<JsonValue>(body)
        .ok()
        .and_then(|json| message_from_json(&json))
        .unwrap_or_else(|| fallback_message(status))
}

fn message_from_json(json: &JsonValue) -> Option<String> {
    let candidates = [
        json.get("message"),
        json.get("error").filter(|e| e.is_string()),
        json.get("error").and_then(|e| e.get("message")),
        json.get("errors")
            .and_then(|e| e.get(0))
            .and_then(|e| e.get("message")),
    ];
    candidates
        .into_iter()
        .flatten()
        .filter_map(JsonValue::as_str)
        .map(str::trim)
        .find(|m| !m.is_empty())
        .map(str::to_string)
}

fn fallback_message(status: u16) -> String {
    StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
        .map(|reason| format!("HTTP {} {}", status, reason))
        .unwrap_or_else(|| format!("HTTP {}", status))
}
