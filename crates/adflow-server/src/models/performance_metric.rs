//! Performance metric model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Metric type recorded after each successful proof generation, in seconds.
pub const PROOF_GENERATION_TIME: &str = "proof_generation_time";

/// A recorded performance sample.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PerformanceMetric {
    pub id: Uuid,
    pub metric_type: String,
    pub metric_value: f64,
    /// Context such as the campaign id and artifact sizes.
    pub metadata: serde_json::Value,
    pub recorded_at: DateTime<Utc>,
}

/// Data required to record a metric.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewPerformanceMetric {
    pub metric_type: String,
    pub metric_value: f64,
    pub metadata: serde_json::Value,
}

impl NewPerformanceMetric {
    /// Create a proof generation timing sample.
    pub fn proof_generation(
        campaign_id: Uuid,
        seconds: f64,
        asset_count: usize,
        markup_len: usize,
        html_len: usize,
    ) -> Self {
        Self {
            metric_type: PROOF_GENERATION_TIME.to_string(),
            metric_value: seconds,
            metadata: serde_json::json!({
                "campaign_id": campaign_id.to_string(),
                "asset_count": asset_count,
                "markup_length": markup_len,
                "html_length": html_len,
            }),
        }
    }

    pub fn into_metric(self, recorded_at: DateTime<Utc>) -> PerformanceMetric {
        PerformanceMetric {
            id: Uuid::new_v4(),
            metric_type: self.metric_type,
            metric_value: self.metric_value,
            metadata: self.metadata,
            recorded_at,
        }
    }
}
