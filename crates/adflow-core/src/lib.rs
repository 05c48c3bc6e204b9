// adflow core - campaign lifecycle rules for the email advertising workflow

pub mod asset;
pub mod authz;
pub mod campaign;
pub mod classify;
pub mod error;
pub mod types;

pub use asset::{Asset, AssetCategory, CategorizationMethod, FileMetadata};
pub use authz::{authorize, Action, Decision, Ownership};
pub use campaign::{
    Campaign, CampaignAsset, CampaignDetails, CampaignPatch, CampaignStatus, NewCampaign, Proof,
};
pub use classify::classify_by_rules;
pub use error::{CampaignError, Result};
pub use types::{Role, User};
