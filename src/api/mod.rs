use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::Config;
use crate::services::{
    LotteryService, SeaOrmLotteryService, SeaOrmUserService, UserService,
};
use crate::state::SharedState;

mod admin;
pub mod auth;
mod error;
mod lottery;
mod types;

pub use error::ApiError;
pub use types::*;

pub struct AppState {
    pub shared: Arc<SharedState>,

    pub user_service: Arc<dyn UserService>,

    pub lottery_service: Arc<dyn LotteryService>,

    pub start_time: std::time::Instant,
}

pub async fn create_app_state(shared: Arc<SharedState>) -> anyhow::Result<Arc<AppState>> {
    let security = shared.config.read().await.security.clone();

    let user_service = Arc::new(SeaOrmUserService::new(shared.store.clone(), security));

    let lottery_service = Arc::new(SeaOrmLotteryService::new(
        shared.store.clone(),
        shared.round_lock.clone(),
    ));

    Ok(Arc::new(AppState {
        shared,
        user_service,
        lottery_service,
        start_time: std::time::Instant::now(),
    }))
}

pub async fn create_app_state_from_config(config: Config) -> anyhow::Result<Arc<AppState>> {
    let shared = Arc::new(SharedState::new(config).await?);
    create_app_state(shared).await
}

pub async fn router(state: Arc<AppState>) -> Router {
    let (cors_origins, session_minutes) = {
        let config = state.shared.config.read().await;
        (
            config.server.cors_allowed_origins.clone(),
            config.server.session_minutes,
        )
    };

    let session_store = MemoryStore::default();
    let session_layer = SessionManagerLayer::new(session_store)
        .with_secure(false)
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            session_minutes,
        )));

    let protected_routes = Router::new()
        .route("/auth/me", get(auth::me))
        .route("/lottery/draws", post(lottery::submit_draw))
        .route("/lottery/draws", get(lottery::playable_draws))
        .route("/lottery/results", get(lottery::played_draws))
        .route("/lottery/draws/played", delete(lottery::purge_played))
        .route("/admin/winning-draw", post(admin::generate_winning_draw))
        .route("/admin/winning-draw", get(admin::view_winning_draw))
        .route("/admin/run-lottery", post(admin::run_lottery))
        .route("/admin/users", get(admin::list_users))
        .route("/admin/activity", get(admin::list_user_activity))
        .route("/admin/logs", get(admin::recent_logs))
        .route("/admin/register", post(admin::register_admin))
        .layer(middleware::from_fn(auth::auth_middleware));

    let api_router = Router::new()
        .merge(protected_routes)
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/reset-lockout", post(auth::reset_lockout))
        .layer(session_layer)
        .with_state(state);

    let cors_layer = if cors_origins.contains(&"*".to_string()) {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api", api_router)
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
}
