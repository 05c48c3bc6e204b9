//! Asset endpoints.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adflow_core::{Asset, AssetCategory, FileMetadata};

use super::{Actor, AppState};
use crate::engine::RecategorizeFailure;
use crate::error::AppError;

/// Request body describing a file already placed in storage.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadAssetRequest {
    pub filename: String,
    pub storage_key: String,
    pub storage_url: String,
    /// MIME type; defaults to `application/octet-stream`.
    #[serde(default)]
    pub file_type: String,
    pub size_bytes: u64,
}

impl From<UploadAssetRequest> for FileMetadata {
    fn from(request: UploadAssetRequest) -> Self {
        FileMetadata {
            filename: request.filename,
            storage_key: request.storage_key,
            storage_url: request.storage_url,
            file_type: request.file_type,
            size_bytes: request.size_bytes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorizeRequest {
    pub category: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecategorizeRequest {
    pub asset_ids: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub filename: String,
    pub storage_key: String,
    pub storage_url: String,
    pub file_type: String,
    pub size_bytes: u64,
    pub category: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categorization_method: Option<String>,
    pub uploaded_at: String,
}

impl From<Asset> for AssetResponse {
    fn from(asset: Asset) -> Self {
        Self {
            id: asset.id,
            owner_id: asset.owner_id,
            filename: asset.filename,
            storage_key: asset.storage_key,
            storage_url: asset.storage_url,
            file_type: asset.file_type,
            size_bytes: asset.size_bytes,
            category: asset.category.as_str().to_string(),
            categorization_method: asset.categorization_method.map(|m| m.as_str().to_string()),
            uploaded_at: asset.uploaded_at.to_rfc3339(),
        }
    }
}

/// Batch result: updated assets plus the ones left unchanged.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecategorizeResponse {
    pub updated: Vec<AssetResponse>,
    pub failed: Vec<RecategorizeFailure>,
}

/// Creates the assets router.
pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/", post(upload_asset).get(list_assets))
        .route("/recategorize", post(recategorize_assets))
        .route(
            "/{id}",
            get(get_asset).patch(categorize_asset).delete(delete_asset),
        )
        .with_state(engine)
}

async fn upload_asset(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<UploadAssetRequest>,
) -> Result<(StatusCode, Json<AssetResponse>), AppError> {
    let asset = engine.assets.upload(&actor, request.into()).await?;
    Ok((StatusCode::CREATED, Json(asset.into())))
}

async fn list_assets(
    State(engine): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<AssetResponse>>, AppError> {
    let assets = engine.assets.list(&actor).await?;
    Ok(Json(assets.into_iter().map(AssetResponse::from).collect()))
}

async fn get_asset(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(asset_id): Path<Uuid>,
) -> Result<Json<AssetResponse>, AppError> {
    let asset = engine.assets.get(asset_id, &actor).await?;
    Ok(Json(asset.into()))
}

/// Manual categorization.
async fn categorize_asset(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(asset_id): Path<Uuid>,
    Json(request): Json<CategorizeRequest>,
) -> Result<Json<AssetResponse>, AppError> {
    let category = AssetCategory::from_str(request.category.trim()).ok_or_else(|| {
        AppError::BadRequest(format!("Unknown category '{}'", request.category))
    })?;
    let asset = engine.assets.categorize(asset_id, &actor, category).await?;
    Ok(Json(asset.into()))
}

async fn recategorize_assets(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<RecategorizeRequest>,
) -> Result<Json<RecategorizeResponse>, AppError> {
    let outcome = engine
        .assets
        .recategorize_batch(&request.asset_ids, &actor)
        .await?;
    Ok(Json(RecategorizeResponse {
        updated: outcome.updated.into_iter().map(AssetResponse::from).collect(),
        failed: outcome.failed,
    }))
}

async fn delete_asset(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(asset_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    engine.assets.delete(asset_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upload_request_defaults_file_type() {
        let json = r#"{
            "filename": "hero.png",
            "storageKey": "uploads/hero.png",
            "storageUrl": "https://cdn.example.com/uploads/hero.png",
            "sizeBytes": 2048
        }"#;
        let request: UploadAssetRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.file_type, "");
        let metadata = FileMetadata::from(request);
        assert_eq!(metadata.size_bytes, 2048);
    }

    #[test]
    fn test_asset_response_serialization() {
        let asset = Asset::from_upload(
            Uuid::new_v4(),
            FileMetadata {
                filename: "hero.png".to_string(),
                storage_key: "uploads/hero.png".to_string(),
                storage_url: "https://cdn.example.com/uploads/hero.png".to_string(),
                file_type: "image/png".to_string(),
                size_bytes: 2048,
            },
        );
        let json = serde_json::to_string(&AssetResponse::from(asset)).unwrap();
        assert!(json.contains("\"category\":\"pending\""));
        assert!(json.contains("\"sizeBytes\":2048"));
        assert!(json.contains("\"storageUrl\":"));
        assert!(!json.contains("categorizationMethod"));
    }

    #[test]
    fn test_recategorize_response_serialization() {
        let response = RecategorizeResponse {
            updated: vec![],
            failed: vec![RecategorizeFailure {
                asset_id: Uuid::nil(),
                reason: "timeout".to_string(),
            }],
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"assetId\":\"00000000-0000-0000-0000-000000000000\""));
        assert!(json.contains("\"reason\":\"timeout\""));
    }
}
