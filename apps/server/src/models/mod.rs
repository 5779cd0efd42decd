//! API request and response types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Re-export shared types from kobun-core
pub use kobun_core::{
    AttemptRecord, FoldDirection, MatchResult, Phase, Score, SinkMode, SinkStatus,
};

use crate::services::quiz::SessionEntry;

// === Requests ===

/// Request to start a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub student_name: String,
    /// Overrides the configured session size (e.g. 20 or 40).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<usize>,
}

/// Request to replace the draft answer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRequest {
    pub draft: String,
}

/// Request to submit an answer. Without `answer` the draft is submitted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnswerRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
}

// === Responses ===

/// Response after starting a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionResponse {
    pub session_id: Uuid,
    pub session: SessionView,
}

/// Question bank and quiz settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BankInfoResponse {
    pub subject: String,
    pub question_count: usize,
    pub session_size: usize,
    pub duration_secs: u32,
    pub fold: FoldDirection,
    pub sink_mode: SinkMode,
}

/// Question as shown while answering; the expected answer stays hidden.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionView {
    pub id: String,
    pub prompt: String,
}

/// Verdict shown after a submit, or once more after a timeout.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedbackView {
    pub attempt: AttemptRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<MatchResult>,
    /// Advancing leads to the summary.
    pub is_final: bool,
}

/// Delivery state of the last submitted result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryView {
    pub status: String,
    pub can_resend: bool,
}

/// Everything a client needs to render a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub student_name: String,
    pub phase: Phase,
    pub current_index: usize,
    pub total_questions: usize,
    pub progress_percent: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub question: Option<QuestionView>,
    pub draft: String,
    pub remaining_secs: u32,
    /// Countdown as `MM:SS`.
    pub remaining_display: String,
    pub timed_out: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<FeedbackView>,
    /// Full history, only once the session is finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history: Option<Vec<AttemptRecord>>,
    pub score: Score,
    pub missed_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery: Option<DeliveryView>,
}

impl SessionView {
    pub fn from_entry(entry: &SessionEntry) -> Self {
        let session = &entry.session;
        let phase = session.phase();
        let total = session.questions().len();

        let progress_percent = if phase != Phase::Quiz || total == 0 {
            100
        } else {
            (session.current_index() * 100 / total) as u32
        };

        let question = match phase {
            Phase::Quiz => session.current_question().map(|q| QuestionView {
                id: q.id.clone(),
                prompt: q.prompt.clone(),
            }),
            _ => None,
        };

        let feedback = match (phase, session.last_attempt()) {
            (Phase::Feedback, Some(attempt)) => Some(FeedbackView {
                attempt: attempt.clone(),
                details: session.last_match().cloned(),
                is_final: session.timed_out() || session.current_index() + 1 >= total,
            }),
            _ => None,
        };

        let history = phase
            .is_finished()
            .then(|| session.history().to_vec());

        let delivery = entry.pending.as_ref().map(|pending| DeliveryView {
            status: pending.status.to_string(),
            can_resend: pending.can_resend(),
        });

        Self {
            student_name: session.student_name().to_string(),
            phase,
            current_index: session.current_index(),
            total_questions: total,
            progress_percent,
            question,
            draft: session.draft().to_string(),
            remaining_secs: session.remaining_secs(),
            remaining_display: format_countdown(session.remaining_secs()),
            timed_out: session.timed_out(),
            feedback,
            history,
            score: session.score(),
            missed_count: session.missed().count(),
            delivery,
        }
    }
}

/// Format seconds as `MM:SS`.
pub fn format_countdown(secs: u32) -> String {
    format!("{:02}:{:02}", secs / 60, secs % 60)
}
