//! System health check model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::StoreError;

/// Component name for the campaign store.
pub const COMPONENT_DATABASE: &str = "database";
/// Component name for the external proof renderer.
pub const COMPONENT_PROOF_SERVICE: &str = "proof_service";
/// Component name for the external asset classifier.
pub const COMPONENT_CLASSIFIER_SERVICE: &str = "classifier_service";

/// Outcome of one check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Down,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Healthy => "healthy",
            HealthStatus::Degraded => "degraded",
            HealthStatus::Down => "down",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "healthy" => Some(HealthStatus::Healthy),
            "degraded" => Some(HealthStatus::Degraded),
            "down" => Some(HealthStatus::Down),
            _ => None,
        }
    }
}

/// A recorded health check of one component.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    pub id: Uuid,
    pub component: String,
    pub status: HealthStatus,
    pub response_time_ms: i64,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl HealthCheck {
    pub fn new(
        component: impl Into<String>,
        status: HealthStatus,
        response_time_ms: i64,
        error_message: Option<String>,
        checked_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            component: component.into(),
            status,
            response_time_ms,
            error_message,
            checked_at,
        }
    }
}

/// A row of the `system_health` table.
#[derive(Debug, Clone, FromRow)]
pub struct HealthCheckRow {
    pub id: Uuid,
    pub component: String,
    pub status: String,
    pub response_time_ms: i64,
    pub error_message: Option<String>,
    pub checked_at: DateTime<Utc>,
}

impl TryFrom<HealthCheckRow> for HealthCheck {
    type Error = StoreError;

    fn try_from(row: HealthCheckRow) -> Result<Self, Self::Error> {
        let status = HealthStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("health check {} has status '{}'", row.id, row.status))
        })?;
        Ok(HealthCheck {
            id: row.id,
            component: row.component,
            status,
            response_time_ms: row.response_time_ms,
            error_message: row.error_message,
            checked_at: row.checked_at,
        })
    }
}
