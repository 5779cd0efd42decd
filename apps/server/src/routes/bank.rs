//! Question bank endpoint

use axum::{extract::State, Json};

use crate::models::BankInfoResponse;
use crate::AppState;

/// GET /api/bank
pub async fn info(State(state): State<AppState>) -> Json<BankInfoResponse> {
    let quiz = &state.quiz;
    let config = quiz.config();
    Json(BankInfoResponse {
        subject: quiz.subject().to_string(),
        question_count: quiz.bank().len(),
        session_size: config.session_size,
        duration_secs: config.duration_secs,
        fold: config.fold,
        sink_mode: config.sink_mode,
    })
}
