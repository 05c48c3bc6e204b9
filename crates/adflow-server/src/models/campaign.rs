//! Campaign row model.

use adflow_core::{Campaign, CampaignStatus, Proof};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::StoreError;

/// A row of the `campaigns` table. The proof pair is stored as two nullable columns.
#[derive(Debug, Clone, FromRow)]
pub struct CampaignRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub target_audience: Option<String>,
    pub goal: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub proof_markup: Option<String>,
    pub proof_html: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Column list shared by every campaign query.
pub const CAMPAIGN_COLUMNS: &str = "id, owner_id, name, target_audience, goal, notes, status, \
     proof_markup, proof_html, reviewed_by, reviewed_at, rejection_reason, created_at, updated_at";

impl TryFrom<CampaignRow> for Campaign {
    type Error = StoreError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        let status = CampaignStatus::from_str(&row.status).ok_or_else(|| {
            StoreError::Corrupt(format!("campaign {} has status '{}'", row.id, row.status))
        })?;
        let proof = match (row.proof_markup, row.proof_html) {
            (Some(markup), Some(html)) => Some(Proof { markup, html }),
            (None, None) => None,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "campaign {} has half of a proof pair",
                    row.id
                )))
            }
        };

        Ok(Campaign {
            id: row.id,
            owner_id: row.owner_id,
            name: row.name,
            target_audience: row.target_audience,
            goal: row.goal,
            notes: row.notes,
            status,
            proof,
            reviewed_by: row.reviewed_by,
            reviewed_at: row.reviewed_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
