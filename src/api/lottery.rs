use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_user;
use super::{ApiError, ApiResponse, AppState};
use crate::services::{RevealedDraw, SubmittedDraw};

#[derive(Deserialize)]
pub struct SubmitDrawRequest {
    pub numbers: Vec<i64>,
}

#[derive(Serialize)]
pub struct PurgeResponse {
    pub deleted: u64,
}

/// POST /lottery/draws
/// Submit six numbers; they are canonicalized and stored encrypted under
/// the submitter's own public key.
pub async fn submit_draw(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<SubmitDrawRequest>,
) -> Result<Json<ApiResponse<SubmittedDraw>>, ApiError> {
    let user = current_user(&state, &session).await?;

    let draw = state
        .lottery_service
        .submit_draw(&user, &payload.numbers)
        .await?;

    Ok(Json(ApiResponse::success(draw)))
}

/// GET /lottery/draws
/// The caller's unplayed draws, decrypted for display only.
pub async fn playable_draws(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<RevealedDraw>>>, ApiError> {
    let user = current_user(&state, &session).await?;

    let draws = state.lottery_service.playable_draws(&user).await?;
    Ok(Json(ApiResponse::success(draws)))
}

/// GET /lottery/results
/// The caller's played draws with win/lose status.
pub async fn played_draws(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<RevealedDraw>>>, ApiError> {
    let user = current_user(&state, &session).await?;

    let draws = state.lottery_service.played_draws(&user).await?;
    Ok(Json(ApiResponse::success(draws)))
}

/// DELETE /lottery/draws/played
/// "Play again": removes the caller's played draws for a fresh round.
pub async fn purge_played(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<PurgeResponse>>, ApiError> {
    let user = current_user(&state, &session).await?;

    let deleted = state.lottery_service.purge_played(&user).await?;
    Ok(Json(ApiResponse::success(PurgeResponse { deleted })))
}
