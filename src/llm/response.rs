//! Extraction of generated text from `generateContent` responses
//!
//! Every outcome is a user-visible string. Missing fields map to fixed
//! sentinels and non-200 statuses to an error line carrying the raw body,
//! so callers always have something to show.

use serde_json::Value;

pub const NO_CANDIDATES: &str = "No candidates found in the response.";
pub const NO_CONTENT_PARTS: &str = "No content parts found.";

/// Emphasis marker stripped from generated text
const EMPHASIS: &str = "**";

pub struct ResponseParser;

impl ResponseParser {
    /// Turn an HTTP status and raw body into display text
    pub fn parse_body(status: u16, body: &str) -> String {
        if status != 200 {
            return format!("Error: {status}\n{body}");
        }

        match serde_json::from_str::<Value>(body) {
            Ok(value) => Self::parse_value(&value),
            Err(e) => format!("Error: malformed response ({e})\n{body}"),
        }
    }

    /// Walk `candidates[0].content.parts[*].text`, tolerating any missing level.
    ///
    /// Only the first candidate is used. Part texts have `**` removed and are
    /// joined with a newline; a part without text contributes an empty line.
    pub fn parse_value(response: &Value) -> String {
        let first = match response.get("candidates").and_then(Value::as_array) {
            Some(candidates) if !candidates.is_empty() => &candidates[0],
            _ => return NO_CANDIDATES.to_string(),
        };

        let parts = match first
            .get("content")
            .and_then(|content| content.get("parts"))
            .and_then(Value::as_array)
        {
            Some(parts) if !parts.is_empty() => parts,
            _ => return NO_CONTENT_PARTS.to_string(),
        };

        parts
            .iter()
            .map(|part| {
                part.get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .replace(EMPHASIS, "")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}
