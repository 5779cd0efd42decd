//! Answer matching for typed answers.
//!
//! An expected answer may list several senses separated by `・`, `、`, `,`,
//! `／` or `/`. The learner's answer is accepted when, after normalization,
//! it contains one of the senses or is contained in one. Partial and
//! over-complete answers therefore both count.

use serde::{Deserialize, Serialize};

use crate::normalize::normalize;
use crate::types::FoldDirection;

/// Delimiters between senses of an expected answer.
pub const SENSE_DELIMITERS: &[char] = &['・', '、', ',', '／', '/'];

/// Result of judging a typed answer against the expected answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchResult {
    /// Whether the answer is considered correct.
    pub is_correct: bool,
    /// Normalized typed answer.
    pub typed_normalized: String,
    /// Normalized, non-empty senses of the expected answer.
    pub alternatives: Vec<String>,
    /// The first sense that matched, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matched: Option<String>,
}

/// Split an expected answer into normalized, non-empty senses.
pub fn expected_alternatives(expected: &str, fold: FoldDirection) -> Vec<String> {
    expected
        .split(SENSE_DELIMITERS)
        .map(|sense| normalize(sense, fold))
        .filter(|sense| !sense.is_empty())
        .collect()
}

/// Judge `typed` against `expected`.
pub fn judge_answer(expected: &str, typed: &str, fold: FoldDirection) -> MatchResult {
    let alternatives = expected_alternatives(expected, fold);
    let typed_normalized = normalize(typed, fold);

    let matched = if typed_normalized.is_empty() {
        None
    } else {
        alternatives
            .iter()
            .find(|e| typed_normalized.contains(e.as_str()) || e.contains(typed_normalized.as_str()))
            .cloned()
    };

    MatchResult {
        is_correct: matched.is_some(),
        typed_normalized,
        alternatives,
        matched,
    }
}

/// Shorthand for `judge_answer(..).is_correct`.
pub fn judge(expected: &str, typed: &str, fold: FoldDirection) -> bool {
    judge_answer(expected, typed, fold).is_correct
}
