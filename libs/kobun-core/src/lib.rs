//! Core quiz library for classical Japanese vocabulary drills.
//!
//! Provides:
//! - CSV loader for question banks
//! - Answer normalization (whitespace, punctuation, kana folding)
//! - Lenient multi-sense answer matching
//! - Non-repeating random question sampling
//! - The quiz session state machine and score aggregation
//! - The finished-session payload handed to the results sink

pub mod bank;
pub mod error;
pub mod matching;
pub mod normalize;
pub mod parser;
pub mod results;
pub mod sampler;
pub mod session;
pub mod types;

pub use bank::QuestionBank;
pub use error::{ConfigError, LoadError, Result};
pub use matching::{expected_alternatives, judge, judge_answer, MatchResult};
pub use normalize::normalize;
pub use parser::parse;
pub use results::{format_timestamp, PendingResult, ResultPayload, SinkStatus};
pub use sampler::{sample, shuffle};
pub use session::{QuizSession, Tick};
pub use types::{
    AttemptRecord, FoldDirection, Phase, QuestionRecord, QuizConfig, Score, SinkMode,
};
