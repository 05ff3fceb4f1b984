use axum::{
    Json,
    extract::{Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::IntoResponse,
};
use serde::Serialize;
use std::sync::Arc;
use tower_sessions::Session;

use super::{ApiError, ApiResponse, AppState, UserDto};
use crate::auth::LoginAttemptGuard;
use crate::models::{Role, User};
use crate::services::{LoginAttempt, LoginOutcome, Registration};

pub const SESSION_USER_KEY: &str = "user_id";
pub const SESSION_GUARD_KEY: &str = "login_guard";

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user: UserDto,
    /// otpauth:// URI the client renders as a QR code for PIN setup
    pub provisioning_uri: String,
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

// ============================================================================
// Middleware
// ============================================================================

/// Rejects requests without an authenticated session. Role checks happen
/// in the services, per operation.
pub async fn auth_middleware(
    session: Session,
    request: Request,
    next: Next,
) -> Result<impl IntoResponse, ApiError> {
    if let Ok(Some(user_id)) = session.get::<i32>(SESSION_USER_KEY).await {
        tracing::Span::current().record("user_id", user_id);
        return Ok(next.run(request).await);
    }

    let response = (StatusCode::UNAUTHORIZED, "Unauthorized");
    Ok(response.into_response())
}

/// Resolves the session's user. Handlers behind `auth_middleware` still
/// call this to get the full actor for capability checks.
pub async fn current_user(state: &AppState, session: &Session) -> Result<User, ApiError> {
    let user_id: i32 = session
        .get(SESSION_USER_KEY)
        .await
        .map_err(|e| ApiError::InternalError(format!("Session error: {e}")))?
        .ok_or_else(|| ApiError::Unauthorized("Not logged in".to_string()))?;

    state
        .user_service
        .get_user(user_id)
        .await
        .map_err(ApiError::from)?
        .ok_or_else(|| ApiError::Unauthorized("Unknown session user".to_string()))
}

async fn load_guard(session: &Session) -> Result<LoginAttemptGuard, ApiError> {
    Ok(session
        .get::<LoginAttemptGuard>(SESSION_GUARD_KEY)
        .await
        .map_err(|e| ApiError::InternalError(format!("Session error: {e}")))?
        .unwrap_or_default())
}

async fn store_guard(session: &Session, guard: &LoginAttemptGuard) -> Result<(), ApiError> {
    session
        .insert(SESSION_GUARD_KEY, guard)
        .await
        .map_err(|e| ApiError::InternalError(format!("Session error: {e}")))
}

fn origin_ip(headers: &HeaderMap) -> Option<String> {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /auth/register
/// Creates a player account and returns the 2FA provisioning URI.
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<Registration>,
) -> Result<Json<ApiResponse<RegisterResponse>>, ApiError> {
    let registered = state.user_service.register(payload, Role::User).await?;

    Ok(Json(ApiResponse::success(RegisterResponse {
        user: UserDto::from(&registered.user),
        provisioning_uri: registered.provisioning_uri,
    })))
}

/// POST /auth/login
/// Verifies password, one-time PIN and postcode in one step.
pub async fn login(
    State(state): State<Arc<AppState>>,
    session: Session,
    headers: HeaderMap,
    Json(mut payload): Json<LoginAttempt>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    payload.origin_ip = payload.origin_ip.or_else(|| origin_ip(&headers));

    let mut guard = load_guard(&session).await?;
    let outcome = state.user_service.authenticate(&payload, &mut guard).await?;
    store_guard(&session, &guard).await?;

    match outcome {
        LoginOutcome::Success(user) => {
            session
                .insert(SESSION_USER_KEY, user.id)
                .await
                .map_err(|e| ApiError::InternalError(format!("Session error: {e}")))?;

            Ok(Json(ApiResponse::success(UserDto::from(&user))))
        }
        // One generic message for every factor combination
        LoginOutcome::Failure { .. } => {
            Err(ApiError::Unauthorized("Invalid credentials".to_string()))
        }
        LoginOutcome::Locked => Err(ApiError::Locked(
            "Too many failed attempts. Reset the lockout to try again.".to_string(),
        )),
    }
}

/// POST /auth/logout
pub async fn logout(session: Session) -> impl IntoResponse {
    let _ = session.flush().await;
    (StatusCode::OK, "Logged out")
}

/// POST /auth/reset-lockout
/// The explicit reset action: zeroes the attempt counter for this session.
pub async fn reset_lockout(
    session: Session,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let mut guard = load_guard(&session).await?;
    guard.reset();
    store_guard(&session, &guard).await?;

    Ok(Json(ApiResponse::success(MessageResponse {
        message: "Attempt counter reset".to_string(),
    })))
}

/// GET /auth/me
pub async fn me(
    State(state): State<Arc<AppState>>,
    session: Session,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = current_user(&state, &session).await?;
    Ok(Json(ApiResponse::success(UserDto::from(&user))))
}
