//! Campaign/asset association row model.

use adflow_core::CampaignAsset;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// A row of the `campaign_assets` table.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignAssetRow {
    pub campaign_id: Uuid,
    pub asset_id: Uuid,
    pub asset_role: Option<String>,
    pub display_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl From<CampaignAssetRow> for CampaignAsset {
    fn from(row: CampaignAssetRow) -> Self {
        CampaignAsset {
            campaign_id: row.campaign_id,
            asset_id: row.asset_id,
            asset_role: row.asset_role,
            display_order: row.display_order,
            created_at: row.created_at,
        }
    }
}
