use axum::{
    Json,
    extract::{Query, State},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_sessions::Session;

use super::auth::current_user;
use super::{ApiError, ApiResponse, AppState, UserActivityDto, UserDto};
use crate::entities::security_logs;
use crate::models::Role;
use crate::services::{Registration, RoundOutcome, WinningDraw};

#[derive(Deserialize)]
pub struct LogsQuery {
    /// Number of most recent entries to return
    #[serde(default = "default_log_limit")]
    pub limit: u64,
}

const fn default_log_limit() -> u64 {
    10
}

/// Explicit capability check for the admin-only user/log views, with an
/// audit entry for refusals.
async fn require_admin(state: &AppState, actor: &crate::models::User) -> Result<(), ApiError> {
    if actor.role == Role::Admin {
        return Ok(());
    }

    let _ = state
        .shared
        .store
        .add_security_log(
            "invalid_role",
            "warning",
            &format!(
                "User attempted admin operation with invalid role [{}, {}]",
                actor.id, actor.email
            ),
            None,
        )
        .await;

    Err(ApiError::Forbidden("Admin role required".to_string()))
}

#[derive(Serialize)]
pub struct RegisterAdminResponse {
    pub user: UserDto,
    pub provisioning_uri: String,
}

/// POST /admin/winning-draw
/// Replaces the master draw with fresh winning numbers for the next round.
pub async fn generate_winning_draw(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<WinningDraw>>, ApiError> {
    let actor = current_user(&state, &session).await?;

    let draw = state.lottery_service.generate_winning_draw(&actor).await?;
    Ok(Json(ApiResponse::success(draw)))
}

/// GET /admin/winning-draw
/// The current unplayed winning draw, decrypted for display.
pub async fn view_winning_draw(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<WinningDraw>>, ApiError> {
    let actor = current_user(&state, &session).await?;

    let draw = state
        .lottery_service
        .current_winning_draw(&actor)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No valid winning draw exists. Please add new winning draw.".to_string())
        })?;

    Ok(Json(ApiResponse::success(draw)))
}

/// POST /admin/run-lottery
/// Matches every unplayed user draw against the master draw.
pub async fn run_lottery(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<RoundOutcome>>, ApiError> {
    let actor = current_user(&state, &session).await?;

    let outcome = state.lottery_service.run_round(&actor).await?;
    Ok(Json(ApiResponse::success(outcome)))
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<UserDto>>>, ApiError> {
    let actor = current_user(&state, &session).await?;
    require_admin(&state, &actor).await?;

    let users = state.user_service.list_players().await?;
    Ok(Json(ApiResponse::success(
        users.iter().map(UserDto::from).collect(),
    )))
}

/// GET /admin/activity
/// Login telemetry for all player accounts.
pub async fn list_user_activity(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<Vec<UserActivityDto>>>, ApiError> {
    let actor = current_user(&state, &session).await?;
    require_admin(&state, &actor).await?;

    let users = state.user_service.list_players().await?;
    Ok(Json(ApiResponse::success(
        users.iter().map(UserActivityDto::from).collect(),
    )))
}

/// GET /admin/logs?limit=n
/// Most recent security audit entries, newest first.
pub async fn recent_logs(
    State(state): State<Arc<AppState>>,
    session: Session,
    Query(query): Query<LogsQuery>,
) -> Result<Json<ApiResponse<Vec<security_logs::Model>>>, ApiError> {
    let actor = current_user(&state, &session).await?;
    require_admin(&state, &actor).await?;

    let logs = state
        .shared
        .store
        .recent_security_logs(query.limit)
        .await?;
    Ok(Json(ApiResponse::success(logs)))
}

/// POST /admin/register
/// Registers another admin account; audit-logged by the service.
pub async fn register_admin(
    State(state): State<Arc<AppState>>,
    session: Session,
    Json(payload): Json<Registration>,
) -> Result<Json<ApiResponse<RegisterAdminResponse>>, ApiError> {
    let actor = current_user(&state, &session).await?;
    require_admin(&state, &actor).await?;

    let registered = state.user_service.register(payload, Role::Admin).await?;

    Ok(Json(ApiResponse::success(RegisterAdminResponse {
        user: UserDto::from(&registered.user),
        provisioning_uri: registered.provisioning_uri,
    })))
}
