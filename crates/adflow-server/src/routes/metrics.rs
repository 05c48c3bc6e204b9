//! Read-only metrics endpoint for tech support.

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;

use super::{Actor, AppState};
use crate::engine::{ComponentUptime, MetricsSnapshot};
use crate::error::AppError;

const DEFAULT_WINDOW_DAYS: u32 = 30;

#[derive(Debug, Deserialize)]
pub struct MetricsQuery {
    /// Approval-rate and proof-timing window in days, 1 to 365.
    #[serde(default)]
    pub days: Option<u32>,
}

/// Creates the metrics router.
pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/", get(get_metrics))
        .route("/uptime", get(get_uptime))
        .with_state(engine)
}

async fn get_metrics(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Query(query): Query<MetricsQuery>,
) -> Result<Json<MetricsSnapshot>, AppError> {
    let days = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);
    let snapshot = engine.metrics.snapshot(&actor, days).await?;
    Ok(Json(snapshot))
}

async fn get_uptime(
    State(engine): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<ComponentUptime>>, AppError> {
    Ok(Json(engine.metrics.uptime(&actor).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::{ApprovalRate, ProofGenerationStats};

    #[test]
    fn test_snapshot_serialization() {
        let snapshot = MetricsSnapshot {
            queue_depth: 4,
            approval_rate: ApprovalRate {
                days: 30,
                approved: 2,
                rejected: 1,
                total_reviewed: 3,
                approval_rate: 66.67,
            },
            proof_generation: ProofGenerationStats {
                days: 30,
                count: 0,
                average_seconds: None,
                last_seconds: None,
            },
            uptime: vec![],
        };
        let json = serde_json::to_string(&snapshot).unwrap();
        assert!(json.contains("\"queueDepth\":4"));
        assert!(json.contains("\"approvalRate\":{"));
        assert!(json.contains("\"totalReviewed\":3"));
        assert!(json.contains("\"averageSeconds\":null"));
        assert!(json.contains("\"uptime\":[]"));
    }
}
