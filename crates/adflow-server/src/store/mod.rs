//! Persistence seam for campaigns, assets and their associations.
//!
//! Implementations must make each method atomic on its own. Campaign writes
//! are conditional on the status the caller read, so a transition computed
//! from stale state is reported instead of overwriting a newer one.

pub mod memory;
pub mod postgres;

use adflow_core::{
    Asset, AssetCategory, Campaign, CampaignAsset, CampaignError, CampaignStatus,
    CategorizationMethod, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{HealthCheck, PerformanceMetric};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Errors raised by a store backend.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Assets that do not exist or belong to another owner.
    #[error("Assets missing or owned by another user: {0:?}")]
    MissingAssets(Vec<Uuid>),

    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// A persisted value could not be mapped back to a domain type.
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

impl From<StoreError> for CampaignError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::MissingAssets(ids) => CampaignError::InvalidAssetReference(ids),
            StoreError::Duplicate(message) => CampaignError::Conflict(message),
            other => CampaignError::Storage(other.to_string()),
        }
    }
}

/// A campaign's link row together with the asset it references.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkedAsset {
    pub link: CampaignAsset,
    pub asset: Asset,
}

/// Result of an atomic asset deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetDeletion {
    /// Asset removed; lists the draft campaigns it was detached from.
    Deleted { detached_from: Vec<Uuid> },
    /// Asset kept because these non-draft campaigns reference it.
    Blocked { campaign_ids: Vec<Uuid> },
    /// Asset kept because these campaigns link it but were not in the held set.
    Unheld { campaign_ids: Vec<Uuid> },
    NotFound,
}

#[async_trait]
pub trait CampaignStore: Send + Sync {
    /// Cheap round trip proving the backend answers.
    async fn ping(&self) -> Result<(), StoreError>;

    async fn insert_user(&self, user: &User) -> Result<(), StoreError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    async fn insert_asset(&self, asset: &Asset) -> Result<(), StoreError>;

    async fn find_asset(&self, id: Uuid) -> Result<Option<Asset>, StoreError>;

    /// Owner's assets, oldest upload first.
    async fn list_assets_by_owner(&self, owner_id: Uuid) -> Result<Vec<Asset>, StoreError>;

    /// Sets an asset's category. Returns `None` if the asset no longer exists.
    async fn update_asset_category(
        &self,
        id: Uuid,
        category: AssetCategory,
        method: CategorizationMethod,
    ) -> Result<Option<Asset>, StoreError>;

    /// Campaigns that currently link the asset.
    async fn campaigns_using_asset(&self, asset_id: Uuid) -> Result<Vec<Campaign>, StoreError>;

    /// Deletes the asset and its link rows unless a non-draft campaign links it.
    ///
    /// `held` lists the campaigns the caller has locked. A link from any other
    /// campaign refuses the delete with `Unheld`.
    async fn delete_asset(&self, id: Uuid, held: &[Uuid]) -> Result<AssetDeletion, StoreError>;

    /// Inserts a campaign with its link rows. Every linked asset must exist and
    /// belong to the campaign owner, otherwise nothing is written.
    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        links: &[CampaignAsset],
    ) -> Result<(), StoreError>;

    async fn find_campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError>;

    /// Owner's campaigns, newest first.
    async fn list_campaigns_by_owner(&self, owner_id: Uuid) -> Result<Vec<Campaign>, StoreError>;

    /// Campaigns in `status`, least recently updated first.
    async fn list_campaigns_by_status(
        &self,
        status: CampaignStatus,
    ) -> Result<Vec<Campaign>, StoreError>;

    async fn count_campaigns_by_status(&self, status: CampaignStatus) -> Result<u64, StoreError>;

    /// Approved or rejected campaigns reviewed at or after `since`.
    async fn list_reviewed_since(&self, since: DateTime<Utc>) -> Result<Vec<Campaign>, StoreError>;

    /// Link rows and assets of a campaign ordered by display order.
    async fn list_campaign_assets(&self, campaign_id: Uuid)
        -> Result<Vec<LinkedAsset>, StoreError>;

    /// Adds link rows, skipping assets already linked. Same ownership rule as
    /// `insert_campaign`. Returns the number of rows added.
    async fn attach_assets(
        &self,
        campaign_id: Uuid,
        owner_id: Uuid,
        links: &[CampaignAsset],
    ) -> Result<usize, StoreError>;

    /// Overwrites the campaign only if its persisted status is still `expected`.
    /// Returns `false` when the write was refused as stale or the campaign is gone.
    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected: CampaignStatus,
    ) -> Result<bool, StoreError>;

    /// Deletes the campaign and its link rows only if its status is `expected`.
    async fn delete_campaign(&self, id: Uuid, expected: CampaignStatus)
        -> Result<bool, StoreError>;

    async fn record_metric(&self, metric: &PerformanceMetric) -> Result<(), StoreError>;

    /// Samples of `metric_type` recorded at or after `since`, oldest first.
    async fn list_metrics(
        &self,
        metric_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PerformanceMetric>, StoreError>;

    async fn record_health_check(&self, check: &HealthCheck) -> Result<(), StoreError>;

    /// Health checks taken at or after `since`, oldest first.
    async fn list_health_checks_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<HealthCheck>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_mapping() {
        let id = Uuid::new_v4();
        assert_eq!(
            CampaignError::from(StoreError::MissingAssets(vec![id])),
            CampaignError::InvalidAssetReference(vec![id])
        );
        assert!(matches!(
            CampaignError::from(StoreError::Duplicate("email".into())),
            CampaignError::Conflict(_)
        ));
        assert!(matches!(
            CampaignError::from(StoreError::Corrupt("bad".into())),
            CampaignError::Storage(_)
        ));
    }
}
