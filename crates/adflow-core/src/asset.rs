//! Uploaded assets and their category assignment.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{CampaignError, Result};

/// Default upload limit in bytes (10 MiB).
pub const DEFAULT_MAX_ASSET_BYTES: u64 = 10 * 1024 * 1024;

/// Maximum filename length in characters.
pub const MAX_FILENAME_LEN: usize = 255;

/// MIME type recorded when the uploader supplies none.
pub const FALLBACK_FILE_TYPE: &str = "application/octet-stream";

/// What an asset is used for inside an email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetCategory {
    Logo,
    Image,
    Copy,
    Url,
    /// Not yet classified.
    #[default]
    Pending,
}

impl AssetCategory {
    pub const ALL: [AssetCategory; 5] = [
        Self::Logo,
        Self::Image,
        Self::Copy,
        Self::Url,
        Self::Pending,
    ];

    /// Parse a category from a string.
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "logo" => Some(Self::Logo),
            "image" => Some(Self::Image),
            "copy" => Some(Self::Copy),
            "url" => Some(Self::Url),
            "pending" => Some(Self::Pending),
            _ => None,
        }
    }

    /// Convert to string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Logo => "logo",
            Self::Image => "image",
            Self::Copy => "copy",
            Self::Url => "url",
            Self::Pending => "pending",
        }
    }
}

/// How the current category was assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategorizationMethod {
    /// Set by the owner.
    Manual,
    /// Set by the classifier collaborator.
    Ai,
}

impl CategorizationMethod {
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(Self::Manual),
            "ai" => Some(Self::Ai),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Manual => "manual",
            Self::Ai => "ai",
        }
    }
}

/// Metadata describing a file already placed in storage by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMetadata {
    pub filename: String,
    /// Storage object key.
    pub storage_key: String,
    /// Locator clients use to fetch the file.
    pub storage_url: String,
    /// MIME type; empty means unknown.
    #[serde(default)]
    pub file_type: String,
    pub size_bytes: u64,
}

impl FileMetadata {
    /// Validates the metadata against the upload limits.
    pub fn validate(&self, max_bytes: u64) -> Result<()> {
        let filename = self.filename.trim();
        if filename.is_empty() {
            return Err(CampaignError::validation("Filename must not be empty"));
        }
        if filename.chars().count() > MAX_FILENAME_LEN {
            return Err(CampaignError::validation(format!(
                "Filename exceeds {} characters",
                MAX_FILENAME_LEN
            )));
        }
        if self.storage_key.trim().is_empty() {
            return Err(CampaignError::validation("Storage key must not be empty"));
        }
        if self.size_bytes > max_bytes {
            return Err(CampaignError::validation(format!(
                "File size {} bytes exceeds maximum of {} bytes",
                self.size_bytes, max_bytes
            )));
        }
        Ok(())
    }
}

/// An uploaded file owned by exactly one advertiser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub id: Uuid,
    /// Immutable after creation.
    pub owner_id: Uuid,
    pub filename: String,
    pub storage_key: String,
    pub storage_url: String,
    pub file_type: String,
    pub size_bytes: u64,
    pub category: AssetCategory,
    pub categorization_method: Option<CategorizationMethod>,
    pub uploaded_at: DateTime<Utc>,
}

impl Asset {
    /// Creates an unclassified asset from upload metadata.
    pub fn from_upload(owner_id: Uuid, metadata: FileMetadata) -> Self {
        let file_type = if metadata.file_type.trim().is_empty() {
            FALLBACK_FILE_TYPE.to_string()
        } else {
            metadata.file_type.trim().to_string()
        };
        Self {
            id: Uuid::new_v4(),
            owner_id,
            filename: metadata.filename.trim().to_string(),
            storage_key: metadata.storage_key,
            storage_url: metadata.storage_url,
            file_type,
            size_bytes: metadata.size_bytes,
            category: AssetCategory::Pending,
            categorization_method: None,
            uploaded_at: Utc::now(),
        }
    }

    pub fn is_owned_by(&self, user_id: Uuid) -> bool {
        self.owner_id == user_id
    }

    pub fn is_pending(&self) -> bool {
        self.category == AssetCategory::Pending
    }

    /// Returns a copy carrying the new category.
    pub fn recategorized(&self, category: AssetCategory, method: CategorizationMethod) -> Self {
        Self {
            category,
            categorization_method: Some(method),
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(filename: &str, size_bytes: u64) -> FileMetadata {
        FileMetadata {
            filename: filename.to_string(),
            storage_key: format!("uploads/{}", filename),
            storage_url: format!("https://cdn.example.com/uploads/{}", filename),
            file_type: "image/png".to_string(),
            size_bytes,
        }
    }

    #[test]
    fn test_category_serialization() {
        assert_eq!(serde_json::to_string(&AssetCategory::Logo).unwrap(), "\"logo\"");
        assert_eq!(
            serde_json::from_str::<AssetCategory>("\"pending\"").unwrap(),
            AssetCategory::Pending
        );
    }

    #[test]
    fn test_category_from_str() {
        for category in AssetCategory::ALL {
            assert_eq!(AssetCategory::from_str(category.as_str()), Some(category));
        }
        assert_eq!(AssetCategory::from_str("video"), None);
    }

    #[test]
    fn test_upload_starts_pending() {
        let owner = Uuid::new_v4();
        let asset = Asset::from_upload(owner, metadata("hero.png", 1024));
        assert_eq!(asset.category, AssetCategory::Pending);
        assert_eq!(asset.categorization_method, None);
        assert!(asset.is_owned_by(owner));
        assert!(asset.is_pending());
    }

    #[test]
    fn test_upload_defaults_file_type() {
        let mut meta = metadata("notes", 10);
        meta.file_type = "  ".to_string();
        let asset = Asset::from_upload(Uuid::new_v4(), meta);
        assert_eq!(asset.file_type, FALLBACK_FILE_TYPE);
    }

    #[test]
    fn test_validate_rejects_oversized_file() {
        let meta = metadata("huge.png", DEFAULT_MAX_ASSET_BYTES + 1);
        assert!(matches!(
            meta.validate(DEFAULT_MAX_ASSET_BYTES),
            Err(CampaignError::Validation(_))
        ));
        assert!(metadata("ok.png", DEFAULT_MAX_ASSET_BYTES)
            .validate(DEFAULT_MAX_ASSET_BYTES)
            .is_ok());
    }

    #[test]
    fn test_validate_rejects_blank_filename() {
        assert!(metadata("   ", 1).validate(DEFAULT_MAX_ASSET_BYTES).is_err());
        let long_name = "a".repeat(MAX_FILENAME_LEN + 1);
        assert!(metadata(&long_name, 1).validate(DEFAULT_MAX_ASSET_BYTES).is_err());
    }

    #[test]
    fn test_recategorized_keeps_identity() {
        let asset = Asset::from_upload(Uuid::new_v4(), metadata("brand-logo.png", 5));
        let updated = asset.recategorized(AssetCategory::Logo, CategorizationMethod::Manual);
        assert_eq!(updated.id, asset.id);
        assert_eq!(updated.owner_id, asset.owner_id);
        assert_eq!(updated.category, AssetCategory::Logo);
        assert_eq!(updated.categorization_method, Some(CategorizationMethod::Manual));
    }
}
