//! Proof generation: the external renderer seam and the per-campaign coordinator.
//!
//! At most one generation per campaign is in flight. A second request while one
//! is running fails with `GenerationInProgress`; requests are never coalesced.
//! The proof pair is written in a single conditional update, and only if the
//! campaign is still a draft when the renderer answers.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use adflow_core::{
    AssetCategory, Campaign, CampaignError, CampaignStatus, Proof, Result,
};
use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::collaborator::{endpoint, http_client, with_deadline, CollaboratorError};
use super::locks::KeyedLocks;
use crate::models::NewPerformanceMetric;
use crate::store::{CampaignStore, LinkedAsset};

/// Campaign context sent to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofRequest {
    pub campaign_id: Uuid,
    pub name: String,
    pub target_audience: Option<String>,
    pub goal: Option<String>,
    pub notes: Option<String>,
    pub assets: Vec<ProofAsset>,
}

/// One linked asset as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofAsset {
    pub asset_id: Uuid,
    pub filename: String,
    pub category: AssetCategory,
    pub file_type: String,
    pub storage_url: String,
    pub asset_role: Option<String>,
}

impl ProofRequest {
    pub fn new(campaign: &Campaign, linked: &[LinkedAsset]) -> Self {
        Self {
            campaign_id: campaign.id,
            name: campaign.name.clone(),
            target_audience: campaign.target_audience.clone(),
            goal: campaign.goal.clone(),
            notes: campaign.notes.clone(),
            assets: linked
                .iter()
                .map(|l| ProofAsset {
                    asset_id: l.asset.id,
                    filename: l.asset.filename.clone(),
                    category: l.asset.category,
                    file_type: l.asset.file_type.clone(),
                    storage_url: l.asset.storage_url.clone(),
                    asset_role: l.link.asset_role.clone(),
                })
                .collect(),
        }
    }
}

/// Renders an email proof for a campaign.
#[async_trait]
pub trait ProofGenerator: Send + Sync {
    async fn generate(&self, request: &ProofRequest) -> Result<Proof, CollaboratorError>;
}

/// Used when no proof service is configured; every call fails.
pub struct UnconfiguredProofGenerator;

#[async_trait]
impl ProofGenerator for UnconfiguredProofGenerator {
    async fn generate(&self, _request: &ProofRequest) -> Result<Proof, CollaboratorError> {
        Err(CollaboratorError::NotConfigured("proof service"))
    }
}

#[derive(Debug, Deserialize)]
struct ProofResponse {
    markup: String,
    html: String,
}

/// Calls a proof service at `POST {base_url}/generate`.
pub struct HttpProofGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpProofGenerator {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl ProofGenerator for HttpProofGenerator {
    async fn generate(&self, request: &ProofRequest) -> Result<Proof, CollaboratorError> {
        let response: ProofResponse = self
            .client
            .post(endpoint(&self.base_url, "generate"))
            .json(request)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.markup.trim().is_empty() || response.html.trim().is_empty() {
            return Err(CollaboratorError::Rejected(
                "proof service returned an empty proof".to_string(),
            ));
        }
        Ok(Proof {
            markup: response.markup,
            html: response.html,
        })
    }
}

/// Result of a successful generation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProofOutcome {
    /// The campaign as persisted with its new proof.
    pub campaign: Campaign,
    pub proof: Proof,
    pub generation_time_seconds: f64,
}

pub struct ProofGenerationCoordinator {
    store: Arc<dyn CampaignStore>,
    locks: Arc<KeyedLocks>,
    generator: Arc<dyn ProofGenerator>,
    timeout: Duration,
    in_flight: Mutex<HashSet<Uuid>>,
}

/// Marks a campaign as generating until dropped.
struct InFlight<'a> {
    coordinator: &'a ProofGenerationCoordinator,
    campaign_id: Uuid,
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.coordinator
            .in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.campaign_id);
    }
}

impl ProofGenerationCoordinator {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        locks: Arc<KeyedLocks>,
        generator: Arc<dyn ProofGenerator>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            locks,
            generator,
            timeout,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_in_flight(&self, campaign_id: Uuid) -> bool {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(&campaign_id)
    }

    fn claim(&self, campaign_id: Uuid) -> Result<InFlight<'_>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !in_flight.insert(campaign_id) {
            return Err(CampaignError::GenerationInProgress(campaign_id));
        }
        Ok(InFlight {
            coordinator: self,
            campaign_id,
        })
    }

    /// Generates a proof for `request.campaign_id` and stores it.
    ///
    /// The renderer runs without holding the campaign lock, so approvals and
    /// edits on other fields are not blocked by a slow service. The result is
    /// discarded if the campaign left `draft` in the meantime.
    pub async fn request(&self, request: ProofRequest) -> Result<ProofOutcome> {
        let campaign_id = request.campaign_id;
        let _slot = self.claim(campaign_id)?;

        let started = Instant::now();
        let proof = with_deadline(self.timeout, self.generator.generate(&request))
            .await
            .map_err(|e| {
                tracing::warn!(%campaign_id, error = %e, "Proof generation failed");
                CampaignError::GenerationFailed(e.to_string())
            })?;
        let elapsed = started.elapsed().as_secs_f64();

        let _guard = self.locks.lock(campaign_id).await;
        let current = self
            .store
            .find_campaign(campaign_id)
            .await?
            .ok_or_else(|| CampaignError::campaign_not_found(campaign_id))?;
        if !current.is_draft() {
            tracing::warn!(
                %campaign_id,
                status = current.status.as_str(),
                "Discarding proof: campaign left draft during generation"
            );
            return Err(CampaignError::invalid_state(format!(
                "Campaign {} is {} and no longer accepts a proof",
                campaign_id,
                current.status.as_str()
            )));
        }

        let updated = current.with_proof(proof.clone(), Utc::now())?;
        if !self
            .store
            .update_campaign(&updated, CampaignStatus::Draft)
            .await?
        {
            tracing::warn!(%campaign_id, "Stale proof write refused");
            return Err(CampaignError::invalid_state(format!(
                "Campaign {} changed while its proof was being stored",
                campaign_id
            )));
        }

        let metric = NewPerformanceMetric::proof_generation(
            campaign_id,
            elapsed,
            request.assets.len(),
            proof.markup.len(),
            proof.html.len(),
        )
        .into_metric(Utc::now());
        if let Err(e) = self.store.record_metric(&metric).await {
            tracing::warn!(%campaign_id, error = %e, "Failed to record proof generation time");
        }

        tracing::info!(
            %campaign_id,
            seconds = elapsed,
            assets = request.assets.len(),
            "Proof generated"
        );
        Ok(ProofOutcome {
            campaign: updated,
            proof,
            generation_time_seconds: elapsed,
        })
    }
}
