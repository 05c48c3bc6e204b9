//! Role/action/ownership decision table.
//!
//! Evaluated before every mutation and every role-scoped read. The table is
//! closed: any (role, action) pair it does not list is denied.
//!
//! | Role             | asset & campaign authoring | approve / reject | approval queue | metrics |
//! |------------------|----------------------------|------------------|----------------|---------|
//! | advertiser       | own resources only         | never            | never          | never   |
//! | campaign_manager | never                      | any campaign     | yes            | never   |
//! | tech_support     | never                      | never            | never          | yes     |

use serde::Serialize;
use uuid::Uuid;

use crate::error::{CampaignError, Result};
use crate::types::Role;

/// Operation classes the engine authorizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    UploadAsset,
    ViewAsset,
    CategorizeAsset,
    DeleteAsset,
    CreateCampaign,
    ViewCampaign,
    EditCampaign,
    DeleteCampaign,
    GenerateProof,
    SubmitCampaign,
    ApproveCampaign,
    RejectCampaign,
    ViewApprovalQueue,
    ViewMetrics,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UploadAsset => "upload_asset",
            Self::ViewAsset => "view_asset",
            Self::CategorizeAsset => "categorize_asset",
            Self::DeleteAsset => "delete_asset",
            Self::CreateCampaign => "create_campaign",
            Self::ViewCampaign => "view_campaign",
            Self::EditCampaign => "edit_campaign",
            Self::DeleteCampaign => "delete_campaign",
            Self::GenerateProof => "generate_proof",
            Self::SubmitCampaign => "submit_campaign",
            Self::ApproveCampaign => "approve_campaign",
            Self::RejectCampaign => "reject_campaign",
            Self::ViewApprovalQueue => "view_approval_queue",
            Self::ViewMetrics => "view_metrics",
        }
    }
}

/// Relationship between the actor and the resource acted on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    Owner,
    NotOwner,
    /// The action targets no owned resource (queue, metrics).
    NotApplicable,
}

impl Ownership {
    pub fn of(owner_id: Uuid, actor_id: Uuid) -> Self {
        if owner_id == actor_id {
            Self::Owner
        } else {
            Self::NotOwner
        }
    }
}

/// Outcome of a table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Permit,
    /// The role may never perform the action.
    DenyRole,
    /// The role may perform the action, but only on its own resources.
    DenyOwnership,
}

enum Grant {
    Never,
    OwnOnly,
    Any,
}

fn grant(role: Role, action: Action) -> Grant {
    use Action::*;

    match (role, action) {
        (
            Role::Advertiser,
            UploadAsset | ViewAsset | CategorizeAsset | DeleteAsset | CreateCampaign
            | ViewCampaign | EditCampaign | DeleteCampaign | GenerateProof | SubmitCampaign,
        ) => Grant::OwnOnly,
        (
            Role::CampaignManager,
            ApproveCampaign | RejectCampaign | ViewApprovalQueue | ViewCampaign,
        ) => Grant::Any,
        (Role::TechSupport, ViewMetrics) => Grant::Any,
        _ => Grant::Never,
    }
}

/// Looks up the decision for `role` performing `action` given `ownership`.
pub fn authorize(role: Role, action: Action, ownership: Ownership) -> Decision {
    match grant(role, action) {
        Grant::Never => Decision::DenyRole,
        Grant::Any => Decision::Permit,
        Grant::OwnOnly => match ownership {
            Ownership::Owner => Decision::Permit,
            Ownership::NotOwner | Ownership::NotApplicable => Decision::DenyOwnership,
        },
    }
}

impl Decision {
    pub fn is_permitted(&self) -> bool {
        *self == Decision::Permit
    }

    /// Converts to a result, reporting ownership denials as `NotOwner`.
    pub fn check(self, actor_id: Uuid, action: Action) -> Result<()> {
        match self {
            Decision::Permit => Ok(()),
            Decision::DenyRole => Err(CampaignError::forbidden(format!(
                "Role may not perform {}",
                action.as_str()
            ))),
            Decision::DenyOwnership => Err(CampaignError::NotOwner { actor_id }),
        }
    }

    /// Converts to a result, reporting every denial as `Forbidden`.
    pub fn check_forbidden(self, action: Action) -> Result<()> {
        match self {
            Decision::Permit => Ok(()),
            Decision::DenyRole => Err(CampaignError::forbidden(format!(
                "Role may not perform {}",
                action.as_str()
            ))),
            Decision::DenyOwnership => Err(CampaignError::forbidden(format!(
                "Only the owner may perform {}",
                action.as_str()
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ownership_of() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(Ownership::of(a, a), Ownership::Owner);
        assert_eq!(Ownership::of(a, b), Ownership::NotOwner);
    }

    #[test]
    fn test_check_maps_ownership_to_not_owner() {
        let actor = Uuid::new_v4();
        let result = authorize(Role::Advertiser, Action::SubmitCampaign, Ownership::NotOwner)
            .check(actor, Action::SubmitCampaign);
        assert_eq!(result, Err(CampaignError::NotOwner { actor_id: actor }));
    }

    #[test]
    fn test_check_forbidden_maps_ownership_to_forbidden() {
        let result = authorize(Role::Advertiser, Action::DeleteAsset, Ownership::NotOwner)
            .check_forbidden(Action::DeleteAsset);
        assert!(matches!(result, Err(CampaignError::Forbidden(_))));
    }

    #[test]
    fn test_own_only_requires_an_owner() {
        assert_eq!(
            authorize(Role::Advertiser, Action::UploadAsset, Ownership::NotApplicable),
            Decision::DenyOwnership
        );
    }
}
