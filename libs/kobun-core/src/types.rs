//! Core types for the vocabulary quiz.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// One row of the question bank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: String,
    pub prompt: String,
    pub expected_answer: String,
}

/// A judged answer. Created once per question and never mutated.
///
/// Serialized with the short keys the results spreadsheet expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptRecord {
    #[serde(rename = "no")]
    pub question_id: String,
    #[serde(rename = "q")]
    pub prompt: String,
    #[serde(rename = "expected")]
    pub expected_answer: String,
    #[serde(rename = "given")]
    pub given_answer: String,
    #[serde(rename = "ok")]
    pub is_correct: bool,
}

/// Session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Waiting for an answer to the current question.
    Quiz,
    /// Showing the verdict for the most recent attempt.
    Feedback,
    /// Full history table.
    Summary,
    /// Aggregate score and restart actions.
    Result,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Quiz => "quiz",
            Self::Feedback => "feedback",
            Self::Summary => "summary",
            Self::Result => "result",
        }
    }

    /// Phases from which a finished session can be restarted or submitted.
    pub fn is_finished(&self) -> bool {
        matches!(self, Self::Summary | Self::Result)
    }
}

/// Direction of the 0x60 kana shift applied during normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FoldDirection {
    KatakanaToHiragana,
    HiraganaToKatakana,
}

impl Default for FoldDirection {
    fn default() -> Self {
        Self::KatakanaToHiragana
    }
}

impl FoldDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::KatakanaToHiragana => "katakana_to_hiragana",
            Self::HiraganaToKatakana => "hiragana_to_katakana",
        }
    }
}

impl FromStr for FoldDirection {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "katakana_to_hiragana" | "hiragana" => Ok(Self::KatakanaToHiragana),
            "hiragana_to_katakana" | "katakana" => Ok(Self::HiraganaToKatakana),
            other => Err(ConfigError::UnknownFoldDirection(other.to_string())),
        }
    }
}

/// How the results sink reports delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkMode {
    /// The endpoint answers with a readable status; non-2xx counts as failure.
    Confirmable,
    /// Opaque delivery; a completed send is reported as sent.
    FireAndForget,
}

impl Default for SinkMode {
    fn default() -> Self {
        Self::FireAndForget
    }
}

impl SinkMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmable => "confirmable",
            Self::FireAndForget => "fire_and_forget",
        }
    }
}

impl FromStr for SinkMode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "confirmable" => Ok(Self::Confirmable),
            "fire_and_forget" | "no_cors" => Ok(Self::FireAndForget),
            other => Err(ConfigError::UnknownSinkMode(other.to_string())),
        }
    }
}

/// Quiz configuration shared by every session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizConfig {
    pub fold: FoldDirection,
    pub session_size: usize,
    pub skip_header: bool,
    pub sink_mode: SinkMode,
    pub duration_secs: u32,
}

impl Default for QuizConfig {
    fn default() -> Self {
        Self {
            fold: FoldDirection::default(),
            session_size: 20,
            skip_header: true,
            sink_mode: SinkMode::default(),
            duration_secs: 5 * 60,
        }
    }
}

/// Aggregate score of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Score {
    pub total: usize,
    pub correct: usize,
    pub percent: u32,
}

impl Score {
    /// Score `history` against `total` questions. A zero total scores 0%.
    pub fn from_history(history: &[AttemptRecord], total: usize) -> Self {
        let correct = history.iter().filter(|a| a.is_correct).count();
        let percent = (100.0 * correct as f64 / total.max(1) as f64).round() as u32;
        Self {
            total,
            correct,
            percent,
        }
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{} ({}%)", self.correct, self.total, self.percent)
    }
}
