// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Judge
//!
//! A judge is a named evaluator: a criterion, free-text instructions and an
//! integer score range. Judges are owned by the judge repository and are
//! immutable once created.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::error::{MemAlignError, MemAlignResult};

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]*[a-z0-9])?$").expect("judge name pattern is valid")
    })
}

/// Validated judge name: lowercase alphanumeric with inner hyphens
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct JudgeName(String);

impl JudgeName {
    pub fn parse(name: impl Into<String>) -> MemAlignResult<Self> {
        let name = name.into();
        if !name_pattern().is_match(&name) {
            return Err(MemAlignError::validation(format!(
                "Judge name '{}' must be lowercase alphanumeric with hyphens, \
                 and cannot start or end with a hyphen",
                name
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for JudgeName {
    type Error = MemAlignError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<JudgeName> for String {
    fn from(value: JudgeName) -> Self {
        value.0
    }
}

impl fmt::Display for JudgeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Inclusive integer score bounds; at least two distinct values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreRange {
    pub min: i64,
    pub max: i64,
}

impl ScoreRange {
    pub fn new(min: i64, max: i64) -> MemAlignResult<Self> {
        if max <= min {
            return Err(MemAlignError::validation(format!(
                "Score range [{}, {}] must span at least two values (max > min)",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn contains(&self, score: i64) -> bool {
        score >= self.min && score <= self.max
    }

    /// Validates a caller-supplied score, naming the field in the error
    pub fn check(&self, field: &str, score: i64) -> MemAlignResult<()> {
        if !self.contains(score) {
            return Err(MemAlignError::validation(format!(
                "{} {} is outside the judge's range [{}, {}]",
                field, score, self.min, self.max
            )));
        }
        Ok(())
    }
}

impl Default for ScoreRange {
    fn default() -> Self {
        Self { min: 1, max: 5 }
    }
}

impl fmt::Display for ScoreRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.min, self.max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Judge {
    pub name: JudgeName,
    pub criterion: String,
    pub instructions: String,
    pub score_range: ScoreRange,
    pub created_at: DateTime<Utc>,
}

impl Judge {
    pub fn new(
        name: &str,
        criterion: impl Into<String>,
        instructions: impl Into<String>,
        min_score: i64,
        max_score: i64,
    ) -> MemAlignResult<Self> {
        let name = JudgeName::parse(name)?;
        let score_range = ScoreRange::new(min_score, max_score)?;
        let criterion = criterion.into();
        if criterion.trim().is_empty() {
            return Err(MemAlignError::validation("Judge criterion cannot be empty"));
        }

        Ok(Self {
            name,
            criterion,
            instructions: instructions.into(),
            score_range,
            created_at: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        for name in ["safety", "a", "code-quality", "v2-judge-9"] {
            assert!(JudgeName::parse(name).is_ok(), "{} should be valid", name);
        }
    }

    #[test]
    fn test_invalid_names() {
        for name in ["", "-safety", "safety-", "Safety", "has space", "under_score"] {
            let err = JudgeName::parse(name).unwrap_err();
            assert!(matches!(err, MemAlignError::Validation(_)), "{} should be rejected", name);
        }
    }

    #[test]
    fn test_score_range_requires_two_values() {
        assert!(ScoreRange::new(1, 2).is_ok());
        assert!(ScoreRange::new(3, 3).is_err());
        assert!(ScoreRange::new(5, 1).is_err());
    }

    #[test]
    fn test_score_range_is_inclusive() {
        let range = ScoreRange::new(1, 5).unwrap();
        assert!(range.contains(1));
        assert!(range.contains(5));
        assert!(!range.contains(0));
        assert!(!range.contains(6));
        assert!(range.check("expert_score", 6).is_err());
    }

    #[test]
    fn test_judge_name_deserialization_validates() {
        let ok: Result<JudgeName, _> = serde_json::from_str("\"safety\"");
        assert!(ok.is_ok());
        let bad: Result<JudgeName, _> = serde_json::from_str("\"Not Valid\"");
        assert!(bad.is_err());
    }

    #[test]
    fn test_judge_new_validates_everything() {
        assert!(Judge::new("safety", "safety", "be careful", 1, 5).is_ok());
        assert!(Judge::new("Safety", "safety", "", 1, 5).is_err());
        assert!(Judge::new("safety", "safety", "", 1, 1).is_err());
        assert!(Judge::new("safety", "  ", "", 1, 5).is_err());
    }
}
