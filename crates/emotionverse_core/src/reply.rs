//! crates/emotionverse_core/src/reply.rs
//!
//! Pulls the assistant's text out of a raw model reply body.
//!
//! Extractors are tried in order and the first hit wins. A body none of them
//! understands degrades to a placeholder instead of failing the turn.

use serde_json::Value;
use tracing::debug;

pub const THINKING_PLACEHOLDER: &str = "Hmm... I'm thinking 🤔";

type Extractor = fn(&Value) -> Option<String>;

const EXTRACTORS: &[(&str, Extractor)] = &[
    ("output_text", direct_output_text),
    ("output_message", first_message_item),
    ("chat_choice", first_chat_choice),
];

/// Returns the reply text, or the placeholder when nothing usable is found.
pub fn extract_reply(body: &Value) -> String {
    EXTRACTORS
        .iter()
        .find_map(|(name, extract)| {
            let text = extract(body)?;
            debug!(extractor = *name, "Extracted model reply");
            Some(text)
        })
        .unwrap_or_else(|| THINKING_PLACEHOLDER.to_string())
}

fn non_empty(text: &str) -> Option<String> {
    (!text.is_empty()).then(|| text.to_string())
}

/// `{ "output_text": "..." }`
fn direct_output_text(body: &Value) -> Option<String> {
    body.get("output_text")?.as_str().and_then(non_empty)
}

/// `{ "output": [ { "type": "message", "content": [ { "text": "..." } ] } ] }`
///
/// Only the first message item is considered.
fn first_message_item(body: &Value) -> Option<String> {
    let message = body
        .get("output")?
        .as_array()?
        .iter()
        .find(|item| item.get("type").and_then(Value::as_str) == Some("message"))?;

    message
        .get("content")?
        .as_array()?
        .first()?
        .get("text")?
        .as_str()
        .and_then(non_empty)
}

/// `{ "choices": [ { "message": { "content": "..." } } ] }`
fn first_chat_choice(body: &Value) -> Option<String> {
    body.get("choices")?
        .as_array()?
        .first()?
        .get("message")?
        .get("content")?
        .as_str()
        .and_then(non_empty)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn direct_output_text_is_used_verbatim() {
        let body = json!({ "output_text": "  I feel SO bright today!  " });
        assert_eq!(extract_reply(&body), "  I feel SO bright today!  ");
    }

    #[test]
    fn direct_field_beats_nested_items() {
        let body = json!({
            "output_text": "direct",
            "output": [{ "type": "message", "content": [{ "text": "nested" }] }]
        });
        assert_eq!(extract_reply(&body), "direct");
    }

    #[test]
    fn falls_back_to_first_tagged_message_item() {
        let body = json!({
            "output": [
                { "type": "reasoning", "summary": [] },
                { "type": "message", "content": [
                    { "type": "output_text", "text": "sigh... it's quiet" },
                    { "type": "output_text", "text": "ignored" }
                ]},
                { "type": "message", "content": [{ "text": "later message" }] }
            ]
        });
        assert_eq!(extract_reply(&body), "sigh... it's quiet");
    }

    #[test]
    fn first_message_without_text_does_not_scan_further() {
        let body = json!({
            "output": [
                { "type": "message", "content": [] },
                { "type": "message", "content": [{ "text": "second" }] }
            ]
        });
        assert_eq!(extract_reply(&body), THINKING_PLACEHOLDER);
    }

    #[test]
    fn reads_chat_completion_choices() {
        let body = json!({ "choices": [{ "message": { "role": "assistant", "content": "ugh. fine." } }] });
        assert_eq!(extract_reply(&body), "ugh. fine.");
    }

    #[test]
    fn unknown_shapes_degrade_to_placeholder() {
        for body in [
            json!(null),
            json!("plain string"),
            json!({ "output_text": "" }),
            json!({ "output_text": 42 }),
            json!({ "output": "not an array" }),
            json!({ "output": [{ "type": "message", "content": [{ "text": null }] }] }),
            json!({ "choices": [] }),
        ] {
            assert_eq!(extract_reply(&body), THINKING_PLACEHOLDER, "body: {body}");
        }
    }
}
