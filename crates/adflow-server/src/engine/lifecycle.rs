//! CampaignLifecycle: the draft → pending_approval → approved/rejected machine.
//!
//! Each mutating call takes the campaign's lock, re-reads the persisted record,
//! validates the transition against it and commits with a write conditional on
//! that status. A caller racing on stale state gets `InvalidState`.

use std::sync::Arc;

use adflow_core::campaign::dedup_asset_ids;
use adflow_core::{
    Action, Campaign, CampaignAsset, CampaignError, CampaignPatch, CampaignStatus, NewCampaign,
    Result, Role, User,
};
use chrono::Utc;
use uuid::Uuid;

use super::decide;
use super::locks::KeyedLocks;
use super::proof::{ProofGenerationCoordinator, ProofOutcome, ProofRequest};
use crate::store::{CampaignStore, LinkedAsset};

/// A campaign together with its linked assets in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignWithAssets {
    pub campaign: Campaign,
    pub assets: Vec<LinkedAsset>,
}

pub struct CampaignLifecycle {
    store: Arc<dyn CampaignStore>,
    locks: Arc<KeyedLocks>,
    coordinator: Arc<ProofGenerationCoordinator>,
}

fn stale(campaign_id: Uuid, expected: CampaignStatus) -> CampaignError {
    tracing::warn!(
        %campaign_id,
        expected = expected.as_str(),
        "Transition refused: persisted status changed"
    );
    CampaignError::invalid_state(format!(
        "Campaign {} is no longer {}",
        campaign_id,
        expected.as_str()
    ))
}

fn log_transition(campaign: &Campaign, actor: &User, from: CampaignStatus) {
    tracing::info!(
        campaign_id = %campaign.id,
        actor_id = %actor.id,
        from = from.as_str(),
        to = campaign.status.as_str(),
        "Campaign transition"
    );
}

impl CampaignLifecycle {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        locks: Arc<KeyedLocks>,
        coordinator: Arc<ProofGenerationCoordinator>,
    ) -> Self {
        Self {
            store,
            locks,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &ProofGenerationCoordinator {
        &self.coordinator
    }

    async fn load(&self, campaign_id: Uuid) -> Result<Campaign> {
        self.store
            .find_campaign(campaign_id)
            .await?
            .ok_or_else(|| CampaignError::campaign_not_found(campaign_id))
    }

    /// Writes `next` if the stored status is still `expected`.
    async fn commit(&self, next: &Campaign, expected: CampaignStatus) -> Result<()> {
        if self.store.update_campaign(next, expected).await? {
            Ok(())
        } else {
            Err(stale(next.id, expected))
        }
    }

    /// Creates a draft with at least one of the owner's assets.
    pub async fn create(&self, actor: &User, input: NewCampaign) -> Result<Campaign> {
        decide(actor, Action::CreateCampaign, Some(actor.id))
            .check_forbidden(Action::CreateCampaign)?;

        let now = Utc::now();
        let campaign = Campaign::draft(actor.id, input.details, now)?;
        let asset_ids = dedup_asset_ids(&input.asset_ids);
        if asset_ids.is_empty() {
            return Err(CampaignError::validation(
                "A campaign needs at least one asset",
            ));
        }

        let links = CampaignAsset::link_all(campaign.id, &asset_ids, None, 0, now);
        self.store.insert_campaign(&campaign, &links).await?;
        tracing::info!(
            campaign_id = %campaign.id,
            owner_id = %actor.id,
            assets = links.len(),
            "Campaign created"
        );
        Ok(campaign)
    }

    /// Reads a campaign with its assets.
    ///
    /// Owners see their own campaigns; campaign managers see campaigns awaiting
    /// review.
    pub async fn get(&self, campaign_id: Uuid, actor: &User) -> Result<CampaignWithAssets> {
        let campaign = self.load(campaign_id).await?;
        decide(actor, Action::ViewCampaign, Some(campaign.owner_id))
            .check_forbidden(Action::ViewCampaign)?;
        if actor.role == Role::CampaignManager && !campaign.is_pending_approval() {
            return Err(CampaignError::forbidden(
                "Campaign managers may only view campaigns awaiting approval",
            ));
        }

        let assets = self.store.list_campaign_assets(campaign_id).await?;
        Ok(CampaignWithAssets { campaign, assets })
    }

    /// Advertisers get their own campaigns, managers the approval queue.
    pub async fn list(&self, actor: &User) -> Result<Vec<Campaign>> {
        match actor.role {
            Role::Advertiser => Ok(self.store.list_campaigns_by_owner(actor.id).await?),
            Role::CampaignManager => Ok(self
                .store
                .list_campaigns_by_status(CampaignStatus::PendingApproval)
                .await?),
            Role::TechSupport => Err(CampaignError::forbidden(
                "Tech support may not list campaigns",
            )),
        }
    }

    /// Edits a draft's descriptive fields.
    pub async fn update_details(
        &self,
        campaign_id: Uuid,
        actor: &User,
        patch: CampaignPatch,
    ) -> Result<Campaign> {
        if patch.is_empty() {
            return Err(CampaignError::validation("No fields to update"));
        }
        let _guard = self.locks.lock(campaign_id).await;
        let current = self.load(campaign_id).await?;
        decide(actor, Action::EditCampaign, Some(current.owner_id))
            .check(actor.id, Action::EditCampaign)?;

        let next = current.with_details(patch, Utc::now())?;
        self.commit(&next, CampaignStatus::Draft).await?;
        tracing::info!(%campaign_id, actor_id = %actor.id, "Campaign details updated");
        Ok(next)
    }

    /// Links more of the owner's assets to a draft. Already-linked assets are
    /// skipped. Display order continues after the current last asset unless
    /// `first_order` is given.
    pub async fn attach_assets(
        &self,
        campaign_id: Uuid,
        actor: &User,
        asset_ids: &[Uuid],
        asset_role: Option<&str>,
        first_order: Option<i32>,
    ) -> Result<CampaignWithAssets> {
        let asset_ids = dedup_asset_ids(asset_ids);
        if asset_ids.is_empty() {
            return Err(CampaignError::validation("No assets to attach"));
        }

        let _guard = self.locks.lock(campaign_id).await;
        let campaign = self.load(campaign_id).await?;
        decide(actor, Action::EditCampaign, Some(campaign.owner_id))
            .check(actor.id, Action::EditCampaign)?;
        campaign.ensure_status(CampaignStatus::Draft)?;

        let existing = self.store.list_campaign_assets(campaign_id).await?;
        let first_order = first_order.unwrap_or_else(|| {
            existing
                .iter()
                .filter_map(|l| l.link.display_order)
                .max()
                .map_or(0, |last| last + 1)
        });
        let fresh: Vec<Uuid> = asset_ids
            .into_iter()
            .filter(|id| !existing.iter().any(|l| l.asset.id == *id))
            .collect();
        let links =
            CampaignAsset::link_all(campaign_id, &fresh, asset_role, first_order, Utc::now());
        let added = self
            .store
            .attach_assets(campaign_id, campaign.owner_id, &links)
            .await?;
        tracing::info!(%campaign_id, added, "Assets attached");

        let assets = self.store.list_campaign_assets(campaign_id).await?;
        Ok(CampaignWithAssets { campaign, assets })
    }

    /// Deletes a draft and its asset links.
    pub async fn delete(&self, campaign_id: Uuid, actor: &User) -> Result<()> {
        let _guard = self.locks.lock(campaign_id).await;
        let campaign = self.load(campaign_id).await?;
        decide(actor, Action::DeleteCampaign, Some(campaign.owner_id))
            .check(actor.id, Action::DeleteCampaign)?;
        campaign.ensure_status(CampaignStatus::Draft)?;

        if !self
            .store
            .delete_campaign(campaign_id, CampaignStatus::Draft)
            .await?
        {
            return Err(stale(campaign_id, CampaignStatus::Draft));
        }
        tracing::info!(%campaign_id, actor_id = %actor.id, "Campaign deleted");
        Ok(())
    }

    /// Generates (or regenerates) the proof for a draft.
    pub async fn generate_proof(&self, campaign_id: Uuid, actor: &User) -> Result<ProofOutcome> {
        let campaign = self.load(campaign_id).await?;
        decide(actor, Action::GenerateProof, Some(campaign.owner_id))
            .check(actor.id, Action::GenerateProof)?;
        campaign.ensure_status(CampaignStatus::Draft)?;

        let assets = self.store.list_campaign_assets(campaign_id).await?;
        if assets.is_empty() {
            return Err(CampaignError::NoAssetsAssociated(campaign_id));
        }

        self.coordinator
            .request(ProofRequest::new(&campaign, &assets))
            .await
    }

    /// draft → pending_approval.
    pub async fn submit(&self, campaign_id: Uuid, actor: &User) -> Result<Campaign> {
        let _guard = self.locks.lock(campaign_id).await;
        let current = self.load(campaign_id).await?;
        decide(actor, Action::SubmitCampaign, Some(current.owner_id))
            .check(actor.id, Action::SubmitCampaign)?;

        let next = current.submitted(Utc::now())?;
        if self.store.list_campaign_assets(campaign_id).await?.is_empty() {
            return Err(CampaignError::NoAssetsAssociated(campaign_id));
        }
        self.commit(&next, CampaignStatus::Draft).await?;
        log_transition(&next, actor, current.status);
        Ok(next)
    }

    /// pending_approval → approved.
    pub async fn approve(&self, campaign_id: Uuid, actor: &User) -> Result<Campaign> {
        let _guard = self.locks.lock(campaign_id).await;
        let current = self.load(campaign_id).await?;
        decide(actor, Action::ApproveCampaign, Some(current.owner_id))
            .check_forbidden(Action::ApproveCampaign)?;

        let next = current.approved(actor.id, Utc::now())?;
        self.commit(&next, CampaignStatus::PendingApproval).await?;
        log_transition(&next, actor, current.status);
        Ok(next)
    }

    /// pending_approval → rejected with a mandatory reason.
    pub async fn reject(&self, campaign_id: Uuid, actor: &User, reason: &str) -> Result<Campaign> {
        let _guard = self.locks.lock(campaign_id).await;
        let current = self.load(campaign_id).await?;
        decide(actor, Action::RejectCampaign, Some(current.owner_id))
            .check_forbidden(Action::RejectCampaign)?;

        let next = current.rejected(actor.id, reason, Utc::now())?;
        self.commit(&next, CampaignStatus::PendingApproval).await?;
        log_transition(&next, actor, current.status);
        Ok(next)
    }
}
