//! Users and their roles.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Role a user acts under. Exactly one per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Uploads assets and builds campaigns it owns.
    Advertiser,
    /// Reviews campaigns pending approval.
    CampaignManager,
    /// Observes system health metrics.
    TechSupport,
}

impl Role {
    /// Parse a role from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "advertiser" => Some(Self::Advertiser),
            "campaign_manager" => Some(Self::CampaignManager),
            "tech_support" => Some(Self::TechSupport),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Advertiser => "advertiser",
            Self::CampaignManager => "campaign_manager",
            Self::TechSupport => "tech_support",
        }
    }
}

/// An authenticated principal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: email.into(),
            full_name: full_name.into(),
            role,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serialization() {
        assert_eq!(
            serde_json::to_string(&Role::CampaignManager).unwrap(),
            "\"campaign_manager\""
        );
        assert_eq!(
            serde_json::from_str::<Role>("\"tech_support\"").unwrap(),
            Role::TechSupport
        );
    }

    #[test]
    fn test_role_from_str() {
        assert_eq!(Role::from_str("advertiser"), Some(Role::Advertiser));
        assert_eq!(Role::from_str("campaign_manager"), Some(Role::CampaignManager));
        assert_eq!(Role::from_str("tech_support"), Some(Role::TechSupport));
        assert_eq!(Role::from_str("admin"), None);
    }
}
