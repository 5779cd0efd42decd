//! Quiz session endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::*;
use crate::AppState;

/// POST /api/sessions
pub async fn start(
    State(state): State<AppState>,
    Json(payload): Json<StartSessionRequest>,
) -> Result<(StatusCode, Json<StartSessionResponse>)> {
    let session_id = state
        .quiz
        .start(&payload.student_name, payload.question_count)
        .await?;
    let session = view(&state, session_id).await?;

    Ok((
        StatusCode::CREATED,
        Json(StartSessionResponse {
            session_id,
            session,
        }),
    ))
}

/// GET /api/sessions/:id
pub async fn get(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    Ok(Json(view(&state, id).await?))
}

/// DELETE /api/sessions/:id
pub async fn end(State(state): State<AppState>, Path(id): Path<Uuid>) -> Result<StatusCode> {
    state.quiz.end(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /api/sessions/:id/draft
pub async fn draft(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(payload): Json<DraftRequest>,
) -> Result<Json<SessionView>> {
    state.quiz.set_draft(id, payload.draft).await?;
    Ok(Json(view(&state, id).await?))
}

/// POST /api/sessions/:id/answer
pub async fn answer(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    payload: Option<Json<AnswerRequest>>,
) -> Result<Json<SessionView>> {
    let answer = payload.and_then(|Json(p)| p.answer);
    state.quiz.answer(id, answer).await?;
    Ok(Json(view(&state, id).await?))
}

/// POST /api/sessions/:id/advance
pub async fn advance(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    state.quiz.advance(id).await?;
    Ok(Json(view(&state, id).await?))
}

/// POST /api/sessions/:id/result
pub async fn show_result(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    state.quiz.show_result(id).await?;
    Ok(Json(view(&state, id).await?))
}

/// POST /api/sessions/:id/retry
pub async fn retry_all(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    state.quiz.retry_all(id).await?;
    Ok(Json(view(&state, id).await?))
}

/// POST /api/sessions/:id/retry-missed
pub async fn retry_missed(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>> {
    state.quiz.retry_missed(id).await?;
    Ok(Json(view(&state, id).await?))
}

pub(crate) async fn view(state: &AppState, id: Uuid) -> Result<SessionView> {
    state.quiz.read(id, SessionView::from_entry).await
}
