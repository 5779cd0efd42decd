//! Result submission endpoints

use axum::{
    extract::{Path, State},
    http::{header::USER_AGENT, HeaderMap, StatusCode},
    Json,
};
use uuid::Uuid;

use crate::error::Result;
use crate::models::SessionView;
use crate::routes::sessions::view;
use crate::AppState;

const UNKNOWN_CLIENT: &str = "unknown";

/// POST /api/sessions/:id/submit
/// Starts delivery in the background and answers immediately.
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<SessionView>)> {
    let device_info = headers
        .get(USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN_CLIENT);

    let status = state.quiz.submit_results(id, device_info).await?;
    tracing::info!(%id, %status, "Submitted results");

    Ok((StatusCode::ACCEPTED, Json(view(&state, id).await?)))
}

/// POST /api/sessions/:id/submit/resend
pub async fn resend(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<SessionView>)> {
    state.quiz.resend_results(id).await?;
    Ok((StatusCode::ACCEPTED, Json(view(&state, id).await?)))
}
