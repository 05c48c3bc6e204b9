//! API routes for the adflow server.

pub mod approvals;
pub mod assets;
pub mod campaigns;
pub mod health;
pub mod metrics;
pub mod users;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum::Router;
use uuid::Uuid;

use adflow_core::User;

use crate::engine::Engine;
use crate::error::AppError;

/// Shared handler state.
pub type AppState = Arc<Engine>;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user making the request, resolved from `X-User-ID`.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl FromRequestParts<AppState> for Actor {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized("Missing X-User-ID header".to_string()))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|value| Uuid::parse_str(value.trim()).ok())
            .ok_or_else(|| AppError::Unauthorized("X-User-ID is not a valid UUID".to_string()))?;

        let user = state
            .store()
            .find_user(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized(format!("Unknown user {}", user_id)))?;
        Ok(Actor(user))
    }
}

/// Creates the main router: `/health` plus the API under `/api/v1`.
pub fn create_router(engine: AppState) -> Router {
    Router::new()
        .merge(health::router())
        .nest("/api/v1", api_v1_routes(engine))
}

/// Creates the v1 API routes.
fn api_v1_routes(engine: AppState) -> Router {
    Router::new()
        .nest("/users", users::router(engine.clone()))
        .nest("/assets", assets::router(engine.clone()))
        .nest("/campaigns", campaigns::router(engine.clone()))
        .nest("/approvals", approvals::router(engine.clone()))
        .nest("/metrics", metrics::router(engine))
}
