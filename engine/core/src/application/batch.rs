// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! JSONL batch input: one JSON object per line, blank lines skipped, line
//! numbers 1-based so errors point at the offending row of the file.

use serde::de::DeserializeOwned;

/// A parsed row, or the reason it could not be parsed
#[derive(Debug)]
pub struct JsonlRow<T> {
    pub line: usize,
    pub record: Result<T, String>,
}

pub fn parse_jsonl<T: DeserializeOwned>(content: &str) -> Vec<JsonlRow<T>> {
    content
        .lines()
        .enumerate()
        .filter(|(_, raw)| !raw.trim().is_empty())
        .map(|(idx, raw)| JsonlRow {
            line: idx + 1,
            record: serde_json::from_str(raw.trim()).map_err(|e| format!("Invalid JSON: {}", e)),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::FeedbackInput;

    #[test]
    fn test_blank_lines_are_skipped_but_counted() {
        let content = "{\"input_text\":\"a\",\"expert_feedback\":\"b\",\"expert_score\":1}\n\n   \n\
                       {\"input_text\":\"c\",\"expert_feedback\":\"d\",\"expert_score\":2}\n";
        let rows: Vec<JsonlRow<FeedbackInput>> = parse_jsonl(content);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].line, 1);
        assert_eq!(rows[1].line, 4);
        assert!(rows.iter().all(|r| r.record.is_ok()));
    }

    #[test]
    fn test_malformed_row_is_reported_not_fatal() {
        let content = "not json\n{\"input_text\":\"a\",\"expert_feedback\":\"b\",\"expert_score\":1}";
        let rows: Vec<JsonlRow<FeedbackInput>> = parse_jsonl(content);
        assert_eq!(rows.len(), 2);
        assert!(rows[0].record.as_ref().unwrap_err().starts_with("Invalid JSON"));
        assert!(rows[1].record.is_ok());
    }

    #[test]
    fn test_missing_required_field_is_an_error() {
        let rows: Vec<JsonlRow<FeedbackInput>> = parse_jsonl("{\"input_text\":\"a\",\"expert_score\":1}");
        assert!(rows[0].record.is_err());
    }
}
