//! Asset classifier seam used by batch recategorization.

use std::time::Duration;

use adflow_core::{classify_by_rules, Asset, AssetCategory};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::collaborator::{endpoint, http_client, CollaboratorError};

/// Assigns a category to one asset.
#[async_trait]
pub trait AssetClassifier: Send + Sync {
    async fn classify(&self, asset: &Asset) -> Result<AssetCategory, CollaboratorError>;
}

/// Built-in classifier based on the filename alone.
pub struct RulesClassifier;

#[async_trait]
impl AssetClassifier for RulesClassifier {
    async fn classify(&self, asset: &Asset) -> Result<AssetCategory, CollaboratorError> {
        classify_by_rules(&asset.filename).ok_or_else(|| {
            CollaboratorError::Rejected(format!("no rule matches '{}'", asset.filename))
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ClassifyRequest<'a> {
    filename: &'a str,
    file_type: &'a str,
    storage_url: &'a str,
}

#[derive(Debug, Deserialize)]
struct ClassifyResponse {
    category: String,
}

/// Calls a classifier service at `POST {base_url}/classify`.
pub struct HttpAssetClassifier {
    client: reqwest::Client,
    base_url: String,
}

impl HttpAssetClassifier {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, CollaboratorError> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.into(),
        })
    }
}

/// Accepts a concrete category; `pending` or unknown labels are unusable.
fn parse_category(label: &str) -> Result<AssetCategory, CollaboratorError> {
    match AssetCategory::from_str(label.trim()) {
        Some(AssetCategory::Pending) | None => Err(CollaboratorError::Rejected(format!(
            "classifier returned unusable category '{}'",
            label
        ))),
        Some(category) => Ok(category),
    }
}

#[async_trait]
impl AssetClassifier for HttpAssetClassifier {
    async fn classify(&self, asset: &Asset) -> Result<AssetCategory, CollaboratorError> {
        let response: ClassifyResponse = self
            .client
            .post(endpoint(&self.base_url, "classify"))
            .json(&ClassifyRequest {
                filename: &asset.filename,
                file_type: &asset.file_type,
                storage_url: &asset.storage_url,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        parse_category(&response.category)
    }
}
