//! AssetRegistry: uploads, categories and deletion of advertiser assets.

use std::sync::Arc;
use std::time::Duration;

use adflow_core::campaign::dedup_asset_ids;
use adflow_core::{
    Action, Asset, AssetCategory, CampaignError, CategorizationMethod, FileMetadata, Result, User,
};
use futures::future::join_all;
use serde::Serialize;
use uuid::Uuid;

use super::classifier::AssetClassifier;
use super::collaborator::with_deadline;
use super::decide;
use super::locks::KeyedLocks;
use crate::store::{AssetDeletion, CampaignStore};

/// An asset the batch could not recategorize; its category is unchanged.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecategorizeFailure {
    pub asset_id: Uuid,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecategorizeOutcome {
    pub updated: Vec<Asset>,
    pub failed: Vec<RecategorizeFailure>,
}

/// Snapshot-and-lock rounds before a contended delete gives up.
const MAX_DELETE_ATTEMPTS: usize = 5;

pub struct AssetRegistry {
    store: Arc<dyn CampaignStore>,
    locks: Arc<KeyedLocks>,
    classifier: Arc<dyn AssetClassifier>,
    classifier_timeout: Duration,
    max_asset_bytes: u64,
}

impl AssetRegistry {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        locks: Arc<KeyedLocks>,
        classifier: Arc<dyn AssetClassifier>,
        classifier_timeout: Duration,
        max_asset_bytes: u64,
    ) -> Self {
        Self {
            store,
            locks,
            classifier,
            classifier_timeout,
            max_asset_bytes,
        }
    }

    async fn load(&self, asset_id: Uuid) -> Result<Asset> {
        self.store
            .find_asset(asset_id)
            .await?
            .ok_or_else(|| CampaignError::asset_not_found(asset_id))
    }

    /// Records an uploaded file as a new `pending` asset owned by `actor`.
    pub async fn upload(&self, actor: &User, metadata: FileMetadata) -> Result<Asset> {
        decide(actor, Action::UploadAsset, Some(actor.id)).check_forbidden(Action::UploadAsset)?;
        metadata.validate(self.max_asset_bytes)?;

        let asset = Asset::from_upload(actor.id, metadata);
        self.store.insert_asset(&asset).await?;
        tracing::info!(
            asset_id = %asset.id,
            owner_id = %actor.id,
            size_bytes = asset.size_bytes,
            "Asset uploaded"
        );
        Ok(asset)
    }

    /// The actor's own assets, oldest first.
    pub async fn list(&self, actor: &User) -> Result<Vec<Asset>> {
        decide(actor, Action::ViewAsset, Some(actor.id)).check_forbidden(Action::ViewAsset)?;
        Ok(self.store.list_assets_by_owner(actor.id).await?)
    }

    pub async fn get(&self, asset_id: Uuid, actor: &User) -> Result<Asset> {
        let asset = self.load(asset_id).await?;
        decide(actor, Action::ViewAsset, Some(asset.owner_id)).check_forbidden(Action::ViewAsset)?;
        Ok(asset)
    }

    /// Manual categorization by the owner.
    pub async fn categorize(
        &self,
        asset_id: Uuid,
        actor: &User,
        category: AssetCategory,
    ) -> Result<Asset> {
        let asset = self.load(asset_id).await?;
        decide(actor, Action::CategorizeAsset, Some(asset.owner_id))
            .check_forbidden(Action::CategorizeAsset)?;
        if category == AssetCategory::Pending {
            return Err(CampaignError::validation(
                "Assets cannot be manually set to pending",
            ));
        }

        let updated = self
            .store
            .update_asset_category(asset_id, category, CategorizationMethod::Manual)
            .await?
            .ok_or_else(|| CampaignError::asset_not_found(asset_id))?;
        tracing::info!(%asset_id, category = category.as_str(), "Asset categorized");
        Ok(updated)
    }

    /// Runs the classifier over each asset independently.
    ///
    /// Assets that fail keep their category and are reported in `failed`; one
    /// failure never rolls back another asset's update.
    pub async fn recategorize_batch(
        &self,
        asset_ids: &[Uuid],
        actor: &User,
    ) -> Result<RecategorizeOutcome> {
        decide(actor, Action::CategorizeAsset, Some(actor.id))
            .check_forbidden(Action::CategorizeAsset)?;
        let asset_ids = dedup_asset_ids(asset_ids);
        if asset_ids.is_empty() {
            return Err(CampaignError::validation("No assets to recategorize"));
        }

        let results = join_all(asset_ids.iter().map(|id| self.recategorize_one(*id, actor))).await;

        let mut outcome = RecategorizeOutcome::default();
        for (asset_id, result) in asset_ids.into_iter().zip(results) {
            match result {
                Ok(asset) => outcome.updated.push(asset),
                Err(reason) => {
                    tracing::warn!(%asset_id, %reason, "Recategorization failed");
                    outcome.failed.push(RecategorizeFailure { asset_id, reason });
                }
            }
        }
        tracing::info!(
            actor_id = %actor.id,
            updated = outcome.updated.len(),
            failed = outcome.failed.len(),
            "Batch recategorization finished"
        );
        Ok(outcome)
    }

    async fn recategorize_one(&self, asset_id: Uuid, actor: &User) -> std::result::Result<Asset, String> {
        let asset = self.load(asset_id).await.map_err(|e| e.to_string())?;
        decide(actor, Action::CategorizeAsset, Some(asset.owner_id))
            .check_forbidden(Action::CategorizeAsset)
            .map_err(|e| e.to_string())?;

        let category = with_deadline(self.classifier_timeout, self.classifier.classify(&asset))
            .await
            .map_err(|e| e.to_string())?;

        self.store
            .update_asset_category(asset_id, category, CategorizationMethod::Ai)
            .await
            .map_err(|e| CampaignError::from(e).to_string())?
            .ok_or_else(|| CampaignError::asset_not_found(asset_id).to_string())
    }

    /// Deletes an asset, detaching it from draft campaigns.
    ///
    /// Fails with `Conflict` while any submitted, approved or rejected
    /// campaign references it.
    pub async fn delete(&self, asset_id: Uuid, actor: &User) -> Result<()> {
        let asset = self.load(asset_id).await?;
        decide(actor, Action::DeleteAsset, Some(asset.owner_id))
            .check_forbidden(Action::DeleteAsset)?;

        // Hold every referencing campaign so none is submitted mid-delete. A
        // campaign that links the asset after the snapshot makes the store
        // refuse with `Unheld`, and the snapshot is taken again.
        for attempt in 1..=MAX_DELETE_ATTEMPTS {
            let campaign_ids: Vec<Uuid> = self
                .store
                .campaigns_using_asset(asset_id)
                .await?
                .into_iter()
                .map(|c| c.id)
                .collect();
            let _guards = self.locks.lock_all(&campaign_ids).await;

            match self.store.delete_asset(asset_id, &campaign_ids).await? {
                AssetDeletion::Deleted { detached_from } => {
                    tracing::info!(
                        %asset_id,
                        detached = detached_from.len(),
                        "Asset deleted"
                    );
                    return Ok(());
                }
                AssetDeletion::Blocked { campaign_ids } => {
                    tracing::warn!(%asset_id, ?campaign_ids, "Asset delete blocked");
                    return Err(CampaignError::Conflict(format!(
                        "Asset {} is used by campaigns that are no longer drafts: {:?}",
                        asset_id, campaign_ids
                    )));
                }
                AssetDeletion::Unheld { campaign_ids } => {
                    tracing::debug!(%asset_id, attempt, ?campaign_ids, "Asset linked during delete");
                }
                AssetDeletion::NotFound => return Err(CampaignError::asset_not_found(asset_id)),
            }
        }

        Err(CampaignError::Conflict(format!(
            "Asset {} is being linked to campaigns concurrently, retry the delete",
            asset_id
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::classifier::RulesClassifier;
    use crate::engine::collaborator::CollaboratorError;
    use crate::models::{HealthCheck, PerformanceMetric};
    use crate::store::{LinkedAsset, MemoryStore, StoreError};
    use adflow_core::{Campaign, CampaignAsset, CampaignDetails, CampaignStatus, Role};
    use chrono::{DateTime, Utc};
    use assert_matches::assert_matches;
    use async_trait::async_trait;

    struct ScriptedClassifier;

    #[async_trait]
    impl AssetClassifier for ScriptedClassifier {
        async fn classify(&self, asset: &Asset) -> std::result::Result<AssetCategory, CollaboratorError> {
            if asset.filename.starts_with("broken") {
                Err(CollaboratorError::Rejected("model unavailable".to_string()))
            } else {
                Ok(AssetCategory::Image)
            }
        }
    }

    fn metadata(filename: &str, size_bytes: u64) -> FileMetadata {
        FileMetadata {
            filename: filename.to_string(),
            storage_key: format!("uploads/{}", filename),
            storage_url: format!("https://cdn.example.com/uploads/{}", filename),
            file_type: String::new(),
            size_bytes,
        }
    }

    fn registry(classifier: Arc<dyn AssetClassifier>) -> AssetRegistry {
        AssetRegistry::new(
            Arc::new(MemoryStore::new()),
            Arc::new(KeyedLocks::new()),
            classifier,
            Duration::from_secs(1),
            1024,
        )
    }

    fn advertiser() -> User {
        User::new("ad@example.com", "Ada", Role::Advertiser)
    }

    #[tokio::test]
    async fn test_upload_creates_pending_asset() {
        let registry = registry(Arc::new(RulesClassifier));
        let owner = advertiser();
        let asset = registry.upload(&owner, metadata("hero.png", 10)).await.unwrap();
        assert_eq!(asset.category, AssetCategory::Pending);
        assert_eq!(asset.file_type, "application/octet-stream");
        assert_eq!(registry.list(&owner).await.unwrap(), vec![asset]);
    }

    #[tokio::test]
    async fn test_upload_enforces_size_limit_and_role() {
        let registry = registry(Arc::new(RulesClassifier));
        assert_matches!(
            registry.upload(&advertiser(), metadata("big.png", 2048)).await,
            Err(CampaignError::Validation(_))
        );
        let manager = User::new("m@example.com", "Mia", Role::CampaignManager);
        assert_matches!(
            registry.upload(&manager, metadata("a.png", 1)).await,
            Err(CampaignError::Forbidden(_))
        );
    }

    #[tokio::test]
    async fn test_categorize_requires_owner() {
        let registry = registry(Arc::new(RulesClassifier));
        let owner = advertiser();
        let other = User::new("other@example.com", "Otto", Role::Advertiser);
        let asset = registry.upload(&owner, metadata("a.png", 1)).await.unwrap();

        assert_matches!(
            registry.categorize(asset.id, &other, AssetCategory::Logo).await,
            Err(CampaignError::Forbidden(_))
        );
        let updated = registry
            .categorize(asset.id, &owner, AssetCategory::Logo)
            .await
            .unwrap();
        assert_eq!(updated.category, AssetCategory::Logo);
        assert_eq!(
            updated.categorization_method,
            Some(CategorizationMethod::Manual)
        );
        assert_matches!(
            registry.categorize(asset.id, &owner, AssetCategory::Pending).await,
            Err(CampaignError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_recategorize_batch_partial_failure() {
        let registry = registry(Arc::new(ScriptedClassifier));
        let owner = advertiser();
        let a = registry.upload(&owner, metadata("a.png", 1)).await.unwrap();
        let b = registry.upload(&owner, metadata("broken.png", 1)).await.unwrap();
        let c = registry.upload(&owner, metadata("c.png", 1)).await.unwrap();

        let outcome = registry
            .recategorize_batch(&[a.id, b.id, c.id], &owner)
            .await
            .unwrap();
        assert_eq!(outcome.updated.len(), 2);
        assert_eq!(outcome.failed.len(), 1);
        assert_eq!(outcome.failed[0].asset_id, b.id);
        assert!(outcome.failed[0].reason.contains("model unavailable"));

        assert_eq!(
            registry.get(b.id, &owner).await.unwrap().category,
            AssetCategory::Pending
        );
        let refreshed = registry.get(a.id, &owner).await.unwrap();
        assert_eq!(refreshed.category, AssetCategory::Image);
        assert_eq!(refreshed.categorization_method, Some(CategorizationMethod::Ai));
    }

    #[tokio::test]
    async fn test_recategorize_batch_reports_foreign_and_missing() {
        let registry = registry(Arc::new(ScriptedClassifier));
        let owner = advertiser();
        let other = User::new("other@example.com", "Otto", Role::Advertiser);
        let theirs = registry.upload(&other, metadata("x.png", 1)).await.unwrap();
        let missing = Uuid::new_v4();

        let outcome = registry
            .recategorize_batch(&[theirs.id, missing], &owner)
            .await
            .unwrap();
        assert!(outcome.updated.is_empty());
        assert_eq!(outcome.failed.len(), 2);
        assert_eq!(
            registry.get(theirs.id, &other).await.unwrap().category,
            AssetCategory::Pending
        );
    }

    #[tokio::test]
    async fn test_delete_by_non_owner_forbidden() {
        let registry = registry(Arc::new(RulesClassifier));
        let owner = advertiser();
        let other = User::new("other@example.com", "Otto", Role::Advertiser);
        let asset = registry.upload(&owner, metadata("a.png", 1)).await.unwrap();

        assert_matches!(
            registry.delete(asset.id, &other).await,
            Err(CampaignError::Forbidden(_))
        );
        registry.delete(asset.id, &owner).await.unwrap();
        assert_matches!(
            registry.get(asset.id, &owner).await,
            Err(CampaignError::NotFound { entity: "Asset", .. })
        );
    }

    /// Links a fresh draft to the asset right before the first delete reaches the store.
    struct LateLinkStore {
        inner: MemoryStore,
        late: std::sync::Mutex<Option<(adflow_core::Campaign, Vec<adflow_core::CampaignAsset>)>>,
        delete_calls: std::sync::atomic::AtomicUsize,
    }

    #[async_trait]
    impl CampaignStore for LateLinkStore {
        async fn ping(&self) -> std::result::Result<(), StoreError> {
            self.inner.ping().await
        }
        async fn insert_user(&self, user: &User) -> std::result::Result<(), StoreError> {
            self.inner.insert_user(user).await
        }
        async fn find_user(&self, id: Uuid) -> std::result::Result<Option<User>, StoreError> {
            self.inner.find_user(id).await
        }
        async fn insert_asset(&self, asset: &Asset) -> std::result::Result<(), StoreError> {
            self.inner.insert_asset(asset).await
        }
        async fn find_asset(&self, id: Uuid) -> std::result::Result<Option<Asset>, StoreError> {
            self.inner.find_asset(id).await
        }
        async fn list_assets_by_owner(
            &self,
            owner_id: Uuid,
        ) -> std::result::Result<Vec<Asset>, StoreError> {
            self.inner.list_assets_by_owner(owner_id).await
        }
        async fn update_asset_category(
            &self,
            id: Uuid,
            category: AssetCategory,
            method: CategorizationMethod,
        ) -> std::result::Result<Option<Asset>, StoreError> {
            self.inner.update_asset_category(id, category, method).await
        }
        async fn campaigns_using_asset(
            &self,
            asset_id: Uuid,
        ) -> std::result::Result<Vec<Campaign>, StoreError> {
            self.inner.campaigns_using_asset(asset_id).await
        }
        async fn delete_asset(
            &self,
            id: Uuid,
            held: &[Uuid],
        ) -> std::result::Result<AssetDeletion, StoreError> {
            self.delete_calls.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            let late = self.late.lock().unwrap().take();
            if let Some((campaign, links)) = late {
                self.inner.insert_campaign(&campaign, &links).await?;
            }
            self.inner.delete_asset(id, held).await
        }
        async fn insert_campaign(
            &self,
            campaign: &Campaign,
            links: &[CampaignAsset],
        ) -> std::result::Result<(), StoreError> {
            self.inner.insert_campaign(campaign, links).await
        }
        async fn find_campaign(&self, id: Uuid) -> std::result::Result<Option<Campaign>, StoreError> {
            self.inner.find_campaign(id).await
        }
        async fn list_campaigns_by_owner(
            &self,
            owner_id: Uuid,
        ) -> std::result::Result<Vec<Campaign>, StoreError> {
            self.inner.list_campaigns_by_owner(owner_id).await
        }
        async fn list_campaigns_by_status(
            &self,
            status: CampaignStatus,
        ) -> std::result::Result<Vec<Campaign>, StoreError> {
            self.inner.list_campaigns_by_status(status).await
        }
        async fn count_campaigns_by_status(
            &self,
            status: CampaignStatus,
        ) -> std::result::Result<u64, StoreError> {
            self.inner.count_campaigns_by_status(status).await
        }
        async fn list_reviewed_since(
            &self,
            since: DateTime<Utc>,
        ) -> std::result::Result<Vec<Campaign>, StoreError> {
            self.inner.list_reviewed_since(since).await
        }
        async fn list_campaign_assets(
            &self,
            campaign_id: Uuid,
        ) -> std::result::Result<Vec<LinkedAsset>, StoreError> {
            self.inner.list_campaign_assets(campaign_id).await
        }
        async fn attach_assets(
            &self,
            campaign_id: Uuid,
            owner_id: Uuid,
            links: &[CampaignAsset],
        ) -> std::result::Result<usize, StoreError> {
            self.inner.attach_assets(campaign_id, owner_id, links).await
        }
        async fn update_campaign(
            &self,
            campaign: &Campaign,
            expected: CampaignStatus,
        ) -> std::result::Result<bool, StoreError> {
            self.inner.update_campaign(campaign, expected).await
        }
        async fn delete_campaign(
            &self,
            id: Uuid,
            expected: CampaignStatus,
        ) -> std::result::Result<bool, StoreError> {
            self.inner.delete_campaign(id, expected).await
        }
        async fn record_metric(&self, metric: &PerformanceMetric) -> std::result::Result<(), StoreError> {
            self.inner.record_metric(metric).await
        }
        async fn list_metrics(
            &self,
            metric_type: &str,
            since: DateTime<Utc>,
        ) -> std::result::Result<Vec<PerformanceMetric>, StoreError> {
            self.inner.list_metrics(metric_type, since).await
        }
        async fn record_health_check(&self, check: &HealthCheck) -> std::result::Result<(), StoreError> {
            self.inner.record_health_check(check).await
        }
        async fn list_health_checks_since(
            &self,
            since: DateTime<Utc>,
        ) -> std::result::Result<Vec<HealthCheck>, StoreError> {
            self.inner.list_health_checks_since(since).await
        }
    }

    #[tokio::test]
    async fn test_delete_relocks_campaigns_linked_after_snapshot() {
        let owner = advertiser();
        let asset = Asset::from_upload(owner.id, metadata("hero.png", 1));
        let late = Campaign::draft(
            owner.id,
            CampaignDetails {
                name: "Late Draft".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let links = CampaignAsset::link_all(late.id, &[asset.id], None, 0, Utc::now());

        let store = Arc::new(LateLinkStore {
            inner: MemoryStore::new(),
            late: std::sync::Mutex::new(Some((late.clone(), links))),
            delete_calls: std::sync::atomic::AtomicUsize::new(0),
        });
        store.insert_asset(&asset).await.unwrap();
        let registry = AssetRegistry::new(
            store.clone(),
            Arc::new(KeyedLocks::new()),
            Arc::new(RulesClassifier),
            Duration::from_secs(1),
            1024,
        );

        registry.delete(asset.id, &owner).await.unwrap();

        assert_eq!(store.delete_calls.load(std::sync::atomic::Ordering::SeqCst), 2);
        assert!(store.find_asset(asset.id).await.unwrap().is_none());
        assert!(store.list_campaign_assets(late.id).await.unwrap().is_empty());
        assert_eq!(
            store.find_campaign(late.id).await.unwrap().unwrap().status,
            CampaignStatus::Draft
        );
    }
}
