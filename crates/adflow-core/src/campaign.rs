//! Campaign records and the pure transition guards of the review state machine.
//!
//! ```text
//! draft ──submit──▶ pending_approval ──approve──▶ approved
//!                                   └──reject───▶ rejected
//! ```
//!
//! Every transition takes the campaign as persisted and returns the next
//! record; nothing here touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CampaignError, Result};

/// Maximum campaign name length in characters.
pub const MAX_CAMPAIGN_NAME_LEN: usize = 255;

/// Status of a campaign in its review lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    /// Being assembled by its owner.
    Draft,
    /// Submitted and awaiting a manager decision.
    PendingApproval,
    /// Approved by a manager.
    Approved,
    /// Rejected by a manager, with a reason.
    Rejected,
}

impl CampaignStatus {
    /// Parse a status from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(Self::Draft),
            "pending_approval" => Some(Self::PendingApproval),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::PendingApproval => "pending_approval",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    /// Whether a manager decision has been recorded.
    pub fn is_reviewed(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }
}

/// Generated email artifact. Markup and rendered HTML only ever travel together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    /// Source markup the HTML was compiled from.
    pub markup: String,
    pub html: String,
}

/// Descriptive fields supplied by the advertiser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignDetails {
    pub name: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for creating a campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCampaign {
    #[serde(flatten)]
    pub details: CampaignDetails,
    pub asset_ids: Vec<Uuid>,
}

/// Partial update of a draft's descriptive fields. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl CampaignPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.target_audience.is_none()
            && self.goal.is_none()
            && self.notes.is_none()
    }
}

/// Association between a campaign and one of its owner's assets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignAsset {
    pub campaign_id: Uuid,
    pub asset_id: Uuid,
    /// Free-form placement hint such as `primary_logo` or `hero_image`.
    pub asset_role: Option<String>,
    pub display_order: Option<i32>,
    pub created_at: DateTime<Utc>,
}

impl CampaignAsset {
    /// Builds link rows for `asset_ids`, numbering display order from `first_order`.
    pub fn link_all(
        campaign_id: Uuid,
        asset_ids: &[Uuid],
        asset_role: Option<&str>,
        first_order: i32,
        now: DateTime<Utc>,
    ) -> Vec<Self> {
        asset_ids
            .iter()
            .enumerate()
            .map(|(idx, asset_id)| Self {
                campaign_id,
                asset_id: *asset_id,
                asset_role: asset_role.map(str::to_string),
                display_order: Some(first_order + idx as i32),
                created_at: now,
            })
            .collect()
    }
}

/// An email campaign and its review outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: Uuid,
    /// Advertiser that created the campaign. Immutable.
    pub owner_id: Uuid,
    pub name: String,
    pub target_audience: Option<String>,
    pub goal: Option<String>,
    pub notes: Option<String>,
    pub status: CampaignStatus,
    pub proof: Option<Proof>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Trims and length-checks a campaign name.
pub fn validate_campaign_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(CampaignError::validation("Campaign name cannot be empty"));
    }
    if trimmed.chars().count() > MAX_CAMPAIGN_NAME_LEN {
        return Err(CampaignError::validation(format!(
            "Campaign name exceeds {} characters",
            MAX_CAMPAIGN_NAME_LEN
        )));
    }
    Ok(trimmed.to_string())
}

/// Trims a rejection reason, which must not be blank.
pub fn validate_rejection_reason(reason: &str) -> Result<String> {
    let trimmed = reason.trim();
    if trimmed.is_empty() {
        return Err(CampaignError::validation("Rejection reason is required"));
    }
    Ok(trimmed.to_string())
}

/// Removes duplicate ids, keeping first occurrences in order.
pub fn dedup_asset_ids(asset_ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = std::collections::HashSet::with_capacity(asset_ids.len());
    asset_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect()
}

fn optional_text(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Campaign {
    /// Creates a draft owned by `owner_id` after validating `details`.
    pub fn draft(owner_id: Uuid, details: CampaignDetails, now: DateTime<Utc>) -> Result<Self> {
        let name = validate_campaign_name(&details.name)?;
        Ok(Self {
            id: Uuid::new_v4(),
            owner_id,
            name,
            target_audience: optional_text(details.target_audience),
            goal: optional_text(details.goal),
            notes: optional_text(details.notes),
            status: CampaignStatus::Draft,
            proof: None,
            reviewed_by: None,
            reviewed_at: None,
            rejection_reason: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn is_draft(&self) -> bool {
        self.status == CampaignStatus::Draft
    }

    pub fn is_pending_approval(&self) -> bool {
        self.status == CampaignStatus::PendingApproval
    }

    pub fn has_proof(&self) -> bool {
        self.proof.is_some()
    }

    /// Fails with `InvalidState` unless the campaign is in `expected`.
    pub fn ensure_status(&self, expected: CampaignStatus) -> Result<()> {
        if self.status == expected {
            Ok(())
        } else {
            Err(CampaignError::invalid_state(format!(
                "Campaign {} is {} (expected {})",
                self.id,
                self.status.as_str(),
                expected.as_str()
            )))
        }
    }

    /// Applies a patch to a draft.
    pub fn with_details(&self, patch: CampaignPatch, now: DateTime<Utc>) -> Result<Self> {
        self.ensure_status(CampaignStatus::Draft)?;
        let mut next = self.clone();
        if let Some(name) = patch.name {
            next.name = validate_campaign_name(&name)?;
        }
        if patch.target_audience.is_some() {
            next.target_audience = optional_text(patch.target_audience);
        }
        if patch.goal.is_some() {
            next.goal = optional_text(patch.goal);
        }
        if patch.notes.is_some() {
            next.notes = optional_text(patch.notes);
        }
        next.updated_at = now;
        Ok(next)
    }

    /// Replaces the proof pair wholesale. Draft only; status is unchanged.
    pub fn with_proof(&self, proof: Proof, now: DateTime<Utc>) -> Result<Self> {
        self.ensure_status(CampaignStatus::Draft)?;
        Ok(Self {
            proof: Some(proof),
            updated_at: now,
            ..self.clone()
        })
    }

    /// draft → pending_approval. Requires a generated proof.
    pub fn submitted(&self, now: DateTime<Utc>) -> Result<Self> {
        self.ensure_status(CampaignStatus::Draft)?;
        if !self.has_proof() {
            return Err(CampaignError::invalid_state(format!(
                "Campaign {} has no generated proof",
                self.id
            )));
        }
        Ok(Self {
            status: CampaignStatus::PendingApproval,
            updated_at: now,
            ..self.clone()
        })
    }

    /// pending_approval → approved.
    pub fn approved(&self, reviewer_id: Uuid, now: DateTime<Utc>) -> Result<Self> {
        self.ensure_status(CampaignStatus::PendingApproval)?;
        Ok(Self {
            status: CampaignStatus::Approved,
            reviewed_by: Some(reviewer_id),
            reviewed_at: Some(now),
            rejection_reason: None,
            updated_at: now,
            ..self.clone()
        })
    }

    /// pending_approval → rejected. `reason` must not be blank.
    pub fn rejected(&self, reviewer_id: Uuid, reason: &str, now: DateTime<Utc>) -> Result<Self> {
        self.ensure_status(CampaignStatus::PendingApproval)?;
        let reason = validate_rejection_reason(reason)?;
        Ok(Self {
            status: CampaignStatus::Rejected,
            reviewed_by: Some(reviewer_id),
            reviewed_at: Some(now),
            rejection_reason: Some(reason),
            updated_at: now,
            ..self.clone()
        })
    }

    /// Checks the record-level invariants, returning the first violation.
    pub fn check_invariants(&self) -> std::result::Result<(), String> {
        let has_reason = self
            .rejection_reason
            .as_deref()
            .is_some_and(|r| !r.trim().is_empty());
        if (self.status == CampaignStatus::Rejected) != has_reason {
            return Err(format!(
                "rejection_reason presence does not match status {}",
                self.status.as_str()
            ));
        }
        let reviewed = self.reviewed_by.is_some() && self.reviewed_at.is_some();
        let unreviewed = self.reviewed_by.is_none() && self.reviewed_at.is_none();
        if self.status.is_reviewed() && !reviewed {
            return Err(format!("{} campaign lacks reviewer", self.status.as_str()));
        }
        if !self.status.is_reviewed() && !unreviewed {
            return Err(format!(
                "{} campaign carries reviewer fields",
                self.status.as_str()
            ));
        }
        if self.status != CampaignStatus::Draft && self.proof.is_none() {
            return Err(format!("{} campaign has no proof", self.status.as_str()));
        }
        let name_len = self.name.chars().count();
        if name_len == 0 || name_len > MAX_CAMPAIGN_NAME_LEN {
            return Err("name length out of range".to_string());
        }
        Ok(())
    }
}
