//! Turning free-form LLM replies into JSON documents.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::{Map, Value};

use crate::llm::{CompletionError, TextGenerator};

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^```[a-zA-Z0-9_-]*\s*").unwrap());
static CLOSING_FENCE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s*```$").unwrap());

#[derive(Debug, thiserror::Error)]
pub enum ResponseError {
    #[error("no JSON object/array found in text")]
    NoJsonFound,
    #[error("malformed JSON after repair: {0}")]
    Malformed(String),
    #[error(transparent)]
    Completion(#[from] CompletionError),
}

/// Remove a surrounding Markdown code fence, if any.
pub fn strip_code_fences(text: &str) -> String {
    let t = text.trim();
    if !t.starts_with("```") {
        return t.to_string();
    }
    let t = OPENING_FENCE.replace(t, "");
    let t = CLOSING_FENCE.replace(&t, "");
    t.trim().to_string()
}

/// The first `{`..last `}` span, or failing that the first `[`..last `]` span.
pub fn extract_json(text: &str) -> Result<String, ResponseError> {
    let t = strip_code_fences(text);
    span(&t, '{', '}')
        .or_else(|| span(&t, '[', ']'))
        .map(str::to_string)
        .ok_or(ResponseError::NoJsonFound)
}

fn span(text: &str, open: char, close: char) -> Option<&str> {
    let start = text.find(open)?;
    let end = text.rfind(close)?;
    (end > start).then(|| &text[start..=end])
}

/// Parse a JSON document, wrapping a top-level array as `{"applications": [..]}`.
fn parse_document(json: &str) -> Result<Map<String, Value>, String> {
    match serde_json::from_str::<Value>(json).map_err(|e| e.to_string())? {
        Value::Object(map) => Ok(map),
        Value::Array(items) => {
            let mut map = Map::new();
            map.insert("applications".to_string(), Value::Array(items));
            Ok(map)
        }
        other => Err(format!("unexpected top-level JSON value: {other}")),
    }
}

fn repair_prompt(broken: &str) -> String {
    format!(
        "Fix the following text so that it becomes VALID JSON.\n\
         Do not explain anything. Output ONLY JSON.\n\n\
         TEXT:\n{broken}"
    )
}

/// Extract and parse a reply, asking the generator for one repair on failure.
pub async fn parse_robust(
    raw: &str,
    generator: &dyn TextGenerator,
) -> Result<Map<String, Value>, ResponseError> {
    let json = extract_json(raw)?;
    match parse_document(&json) {
        Ok(doc) => Ok(doc),
        Err(reason) => {
            tracing::debug!(%reason, "Reply is not valid JSON, requesting repair");
            let fixed = generator.generate(&repair_prompt(&json)).await?;
            let fixed = extract_json(fixed.trim())?;
            parse_document(&fixed).map_err(ResponseError::Malformed)
        }
    }
}
