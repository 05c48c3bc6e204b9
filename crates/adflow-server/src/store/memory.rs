//! In-process store backed by hash maps behind a single `RwLock`.
//!
//! Every method takes the lock once, so each call is atomic with respect to
//! every other call.

use std::collections::{BTreeMap, HashMap};

use adflow_core::{
    Asset, AssetCategory, Campaign, CampaignAsset, CampaignStatus, CategorizationMethod, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AssetDeletion, CampaignStore, LinkedAsset, StoreError};
use crate::models::{HealthCheck, PerformanceMetric};

#[derive(Default)]
struct Tables {
    users: HashMap<Uuid, User>,
    assets: HashMap<Uuid, Asset>,
    campaigns: HashMap<Uuid, Campaign>,
    /// Keyed by (campaign_id, asset_id).
    links: BTreeMap<(Uuid, Uuid), CampaignAsset>,
    metrics: Vec<PerformanceMetric>,
    health_checks: Vec<HealthCheck>,
}

impl Tables {
    fn foreign_assets(&self, owner_id: Uuid, links: &[CampaignAsset]) -> Vec<Uuid> {
        links
            .iter()
            .map(|l| l.asset_id)
            .filter(|id| {
                self.assets
                    .get(id)
                    .map_or(true, |asset| asset.owner_id != owner_id)
            })
            .collect()
    }

    fn campaigns_linking(&self, asset_id: Uuid) -> Vec<&Campaign> {
        self.links
            .keys()
            .filter(|(_, linked)| *linked == asset_id)
            .filter_map(|(campaign_id, _)| self.campaigns.get(campaign_id))
            .collect()
    }
}

/// Store used by tests and by servers started without `DATABASE_URL`.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CampaignStore for MemoryStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.users.values().any(|u| u.email == user.email) {
            return Err(StoreError::Duplicate(format!("email {}", user.email)));
        }
        tables.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn insert_asset(&self, asset: &Asset) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        if tables.assets.contains_key(&asset.id) {
            return Err(StoreError::Duplicate(format!("asset {}", asset.id)));
        }
        tables.assets.insert(asset.id, asset.clone());
        Ok(())
    }

    async fn find_asset(&self, id: Uuid) -> Result<Option<Asset>, StoreError> {
        Ok(self.tables.read().await.assets.get(&id).cloned())
    }

    async fn list_assets_by_owner(&self, owner_id: Uuid) -> Result<Vec<Asset>, StoreError> {
        let tables = self.tables.read().await;
        let mut assets: Vec<Asset> = tables
            .assets
            .values()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect();
        assets.sort_by_key(|a| (a.uploaded_at, a.id));
        Ok(assets)
    }

    async fn update_asset_category(
        &self,
        id: Uuid,
        category: AssetCategory,
        method: CategorizationMethod,
    ) -> Result<Option<Asset>, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables.assets.get_mut(&id).map(|asset| {
            *asset = asset.recategorized(category, method);
            asset.clone()
        }))
    }

    async fn campaigns_using_asset(&self, asset_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .campaigns_linking(asset_id)
            .into_iter()
            .cloned()
            .collect())
    }

    async fn delete_asset(&self, id: Uuid, held: &[Uuid]) -> Result<AssetDeletion, StoreError> {
        let mut tables = self.tables.write().await;
        if !tables.assets.contains_key(&id) {
            return Ok(AssetDeletion::NotFound);
        }

        let linking = tables.campaigns_linking(id);
        let unheld: Vec<Uuid> = linking
            .iter()
            .map(|c| c.id)
            .filter(|campaign_id| !held.contains(campaign_id))
            .collect();
        if !unheld.is_empty() {
            return Ok(AssetDeletion::Unheld {
                campaign_ids: unheld,
            });
        }
        let blocking: Vec<Uuid> = linking
            .iter()
            .filter(|c| !c.is_draft())
            .map(|c| c.id)
            .collect();
        if !blocking.is_empty() {
            return Ok(AssetDeletion::Blocked {
                campaign_ids: blocking,
            });
        }
        let detached_from: Vec<Uuid> = linking.iter().map(|c| c.id).collect();

        tables.links.retain(|(_, asset_id), _| *asset_id != id);
        tables.assets.remove(&id);
        Ok(AssetDeletion::Deleted { detached_from })
    }

    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        links: &[CampaignAsset],
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let missing = tables.foreign_assets(campaign.owner_id, links);
        if !missing.is_empty() {
            return Err(StoreError::MissingAssets(missing));
        }
        if tables.campaigns.contains_key(&campaign.id) {
            return Err(StoreError::Duplicate(format!("campaign {}", campaign.id)));
        }
        tables.campaigns.insert(campaign.id, campaign.clone());
        for link in links {
            tables
                .links
                .insert((campaign.id, link.asset_id), link.clone());
        }
        Ok(())
    }

    async fn find_campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        Ok(self.tables.read().await.campaigns.get(&id).cloned())
    }

    async fn list_campaigns_by_owner(&self, owner_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.owner_id == owner_id)
            .cloned()
            .collect();
        campaigns.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(a.id.cmp(&b.id)));
        Ok(campaigns)
    }

    async fn list_campaigns_by_status(
        &self,
        status: CampaignStatus,
    ) -> Result<Vec<Campaign>, StoreError> {
        let tables = self.tables.read().await;
        let mut campaigns: Vec<Campaign> = tables
            .campaigns
            .values()
            .filter(|c| c.status == status)
            .cloned()
            .collect();
        campaigns.sort_by_key(|c| (c.updated_at, c.id));
        Ok(campaigns)
    }

    async fn count_campaigns_by_status(&self, status: CampaignStatus) -> Result<u64, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables.campaigns.values().filter(|c| c.status == status).count() as u64)
    }

    async fn list_reviewed_since(&self, since: DateTime<Utc>) -> Result<Vec<Campaign>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .campaigns
            .values()
            .filter(|c| c.status.is_reviewed())
            .filter(|c| c.reviewed_at.is_some_and(|at| at >= since))
            .cloned()
            .collect())
    }

    async fn list_campaign_assets(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<LinkedAsset>, StoreError> {
        let tables = self.tables.read().await;
        let mut linked: Vec<LinkedAsset> = tables
            .links
            .iter()
            .filter(|((linked_campaign, _), _)| *linked_campaign == campaign_id)
            .filter_map(|(_, link)| {
                tables.assets.get(&link.asset_id).map(|asset| LinkedAsset {
                    link: link.clone(),
                    asset: asset.clone(),
                })
            })
            .collect();
        linked.sort_by_key(|l| (l.link.display_order.unwrap_or(i32::MAX), l.link.created_at));
        Ok(linked)
    }

    async fn attach_assets(
        &self,
        campaign_id: Uuid,
        owner_id: Uuid,
        links: &[CampaignAsset],
    ) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().await;
        let missing = tables.foreign_assets(owner_id, links);
        if !missing.is_empty() {
            return Err(StoreError::MissingAssets(missing));
        }
        let mut added = 0;
        for link in links {
            let key = (campaign_id, link.asset_id);
            if !tables.links.contains_key(&key) {
                tables.links.insert(key, link.clone());
                added += 1;
            }
        }
        Ok(added)
    }

    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected: CampaignStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.campaigns.get_mut(&campaign.id) {
            Some(current) if current.status == expected => {
                *current = campaign.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete_campaign(
        &self,
        id: Uuid,
        expected: CampaignStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write().await;
        match tables.campaigns.get(&id) {
            Some(current) if current.status == expected => {
                tables.campaigns.remove(&id);
                tables.links.retain(|(campaign_id, _), _| *campaign_id != id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn record_metric(&self, metric: &PerformanceMetric) -> Result<(), StoreError> {
        self.tables.write().await.metrics.push(metric.clone());
        Ok(())
    }

    async fn list_metrics(
        &self,
        metric_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PerformanceMetric>, StoreError> {
        let tables = self.tables.read().await;
        let mut metrics: Vec<PerformanceMetric> = tables
            .metrics
            .iter()
            .filter(|m| m.metric_type == metric_type && m.recorded_at >= since)
            .cloned()
            .collect();
        metrics.sort_by_key(|m| m.recorded_at);
        Ok(metrics)
    }

    async fn record_health_check(&self, check: &HealthCheck) -> Result<(), StoreError> {
        self.tables.write().await.health_checks.push(check.clone());
        Ok(())
    }

    async fn list_health_checks_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<HealthCheck>, StoreError> {
        let tables = self.tables.read().await;
        let mut checks: Vec<HealthCheck> = tables
            .health_checks
            .iter()
            .filter(|c| c.checked_at >= since)
            .cloned()
            .collect();
        checks.sort_by_key(|c| c.checked_at);
        Ok(checks)
    }
}
