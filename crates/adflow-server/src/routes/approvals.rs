//! Approval queue endpoint for campaign managers.

use axum::{extract::State, routing::get, Json, Router};

use super::campaigns::CampaignResponse;
use super::{Actor, AppState};
use crate::error::AppError;

/// Creates the approvals router.
pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/", get(list_approval_queue))
        .with_state(engine)
}

/// Campaigns awaiting review, longest waiting first.
async fn list_approval_queue(
    State(engine): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<CampaignResponse>>, AppError> {
    let queue = engine.approvals.list(&actor).await?;
    Ok(Json(queue.into_iter().map(CampaignResponse::from).collect()))
}
