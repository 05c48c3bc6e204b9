//! Asset row model.

use adflow_core::{Asset, AssetCategory, CategorizationMethod};
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::store::StoreError;

/// A row of the `assets` table.
#[derive(Debug, Clone, FromRow)]
pub struct AssetRow {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub storage_key: String,
    pub storage_url: String,
    pub file_type: String,
    pub size_bytes: i64,
    pub category: String,
    pub categorization_method: Option<String>,
    pub uploaded_at: DateTime<Utc>,
}

impl TryFrom<AssetRow> for Asset {
    type Error = StoreError;

    fn try_from(row: AssetRow) -> Result<Self, Self::Error> {
        let category = AssetCategory::from_str(&row.category).ok_or_else(|| {
            StoreError::Corrupt(format!("asset {} has category '{}'", row.id, row.category))
        })?;
        let categorization_method = match row.categorization_method.as_deref() {
            None => None,
            Some(method) => Some(CategorizationMethod::from_str(method).ok_or_else(|| {
                StoreError::Corrupt(format!(
                    "asset {} has categorization method '{}'",
                    row.id, method
                ))
            })?),
        };
        let size_bytes = u64::try_from(row.size_bytes)
            .map_err(|_| StoreError::Corrupt(format!("asset {} has negative size", row.id)))?;

        Ok(Asset {
            id: row.id,
            owner_id: row.owner_id,
            filename: row.filename,
            storage_key: row.storage_key,
            storage_url: row.storage_url,
            file_type: row.file_type,
            size_bytes,
            category,
            categorization_method,
            uploaded_at: row.uploaded_at,
        })
    }
}
