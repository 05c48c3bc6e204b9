//! Error taxonomy shared by every engine operation.

use uuid::Uuid;

pub type Result<T, E = CampaignError> = std::result::Result<T, E>;

/// Every failure is scoped to a single operation and leaves persisted state untouched.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CampaignError {
    /// Malformed input the caller can correct.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The actor's role may not perform this action.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The actor's role permits the action but the resource belongs to someone else.
    #[error("Actor {actor_id} does not own this resource")]
    NotOwner { actor_id: Uuid },

    /// Transition attempted from the wrong (or a stale) status.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// One or more referenced assets are missing or belong to another owner.
    #[error("Invalid asset reference: {0:?}")]
    InvalidAssetReference(Vec<Uuid>),

    #[error("Campaign {0} has no associated assets")]
    NoAssetsAssociated(Uuid),

    /// A proof generation for this campaign is already in flight; retry later.
    #[error("Proof generation already in progress for campaign {0}")]
    GenerationInProgress(Uuid),

    /// The external generation step failed; the prior proof is unchanged.
    #[error("Proof generation failed: {0}")]
    GenerationFailed(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CampaignError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState(message.into())
    }

    pub fn campaign_not_found(id: Uuid) -> Self {
        Self::NotFound {
            entity: "Campaign",
            id,
        }
    }

    pub fn asset_not_found(id: Uuid) -> Self {
        Self::NotFound { entity: "Asset", id }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let id = Uuid::nil();
        assert_eq!(
            CampaignError::campaign_not_found(id).to_string(),
            format!("Campaign {} not found", id)
        );
        assert_eq!(
            CampaignError::GenerationFailed("timeout".to_string()).to_string(),
            "Proof generation failed: timeout"
        );
    }
}
