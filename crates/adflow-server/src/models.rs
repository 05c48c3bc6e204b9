//! Database row models for adflow.

pub mod asset;
pub mod campaign;
pub mod campaign_asset;
pub mod performance_metric;
pub mod system_health;
pub mod user;

pub use asset::AssetRow;
pub use campaign::CampaignRow;
pub use campaign_asset::CampaignAssetRow;
pub use performance_metric::{NewPerformanceMetric, PerformanceMetric, PROOF_GENERATION_TIME};
pub use system_health::{HealthCheck, HealthCheckRow, HealthStatus};
pub use user::UserRow;
