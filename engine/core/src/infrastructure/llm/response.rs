// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Tolerant JSON extraction from model output
//
// Models wrap JSON in code fences or surround it with prose. Accepted forms:
// raw object, ```json fenced object, ``` fenced object, and an object embedded
// in text (first '{' to last '}').

use serde_json::{Map, Value};

use crate::domain::providers::ProviderError;

pub fn parse_json_object(text: &str) -> Result<Map<String, Value>, ProviderError> {
    let cleaned = strip_code_fence(text.trim());

    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => return Ok(map),
        Ok(other) => {
            return Err(ProviderError::MalformedResponse(format!(
                "expected JSON object, got {}",
                json_type_name(&other)
            )))
        }
        Err(_) => {}
    }

    if let (Some(start), Some(end)) = (cleaned.find('{'), cleaned.rfind('}')) {
        if end > start {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&cleaned[start..=end]) {
                return Ok(map);
            }
        }
    }

    Err(ProviderError::MalformedResponse(format!(
        "could not parse model output as JSON: {}",
        truncate(text, 500)
    )))
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop the info string (```json) line
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => return text,
    };
    let body = body.trim_end();
    body.strip_suffix("```").unwrap_or(body).trim()
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_object() {
        let map = parse_json_object(r#"{"score": 3}"#).unwrap();
        assert_eq!(map["score"], 3);
    }

    #[test]
    fn test_fenced_object() {
        let map = parse_json_object("```json\n{\"score\": 4, \"reasoning\": \"ok\"}\n```").unwrap();
        assert_eq!(map["reasoning"], "ok");

        let map = parse_json_object("```\n{\"score\": 2}\n```").unwrap();
        assert_eq!(map["score"], 2);
    }

    #[test]
    fn test_object_embedded_in_prose() {
        let map = parse_json_object("Here is my verdict:\n{\"score\": 5}\nThanks!").unwrap();
        assert_eq!(map["score"], 5);
    }

    #[test]
    fn test_non_object_is_rejected() {
        assert!(matches!(
            parse_json_object("[1, 2]"),
            Err(ProviderError::MalformedResponse(_))
        ));
        assert!(parse_json_object("no json here").is_err());
    }
}
