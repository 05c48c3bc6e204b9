//! Error types for the adflow server.

use adflow_core::CampaignError;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::store::StoreError;

/// Seconds a client should wait before retrying a busy proof generation.
pub const GENERATION_RETRY_AFTER_SECS: u64 = 5;

/// Application error type.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Campaign(#[from] CampaignError),

    /// Missing or unknown `X-User-ID`.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Invalid request: {0}")]
    BadRequest(String),
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        AppError::Campaign(error.into())
    }
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Campaign(error) => campaign_status(error),
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Machine-readable error code included in the response body.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Campaign(error) => match error {
                CampaignError::Validation(_) => "validation_error",
                CampaignError::Forbidden(_) => "forbidden",
                CampaignError::NotOwner { .. } => "not_owner",
                CampaignError::InvalidState(_) => "invalid_state",
                CampaignError::InvalidAssetReference(_) => "invalid_asset_reference",
                CampaignError::NoAssetsAssociated(_) => "no_assets_associated",
                CampaignError::GenerationInProgress(_) => "generation_in_progress",
                CampaignError::GenerationFailed(_) => "generation_failed",
                CampaignError::Conflict(_) => "conflict",
                CampaignError::NotFound { .. } => "not_found",
                CampaignError::Storage(_) => "internal_error",
            },
            AppError::Unauthorized(_) => "unauthorized",
            AppError::BadRequest(_) => "bad_request",
        }
    }
}

fn campaign_status(error: &CampaignError) -> StatusCode {
    match error {
        CampaignError::Validation(_) => StatusCode::BAD_REQUEST,
        CampaignError::Forbidden(_) | CampaignError::NotOwner { .. } => StatusCode::FORBIDDEN,
        CampaignError::NotFound { .. } => StatusCode::NOT_FOUND,
        CampaignError::InvalidState(_) | CampaignError::Conflict(_) => StatusCode::CONFLICT,
        CampaignError::InvalidAssetReference(_) | CampaignError::NoAssetsAssociated(_) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        CampaignError::GenerationInProgress(_) => StatusCode::TOO_MANY_REQUESTS,
        CampaignError::GenerationFailed(_) => StatusCode::BAD_GATEWAY,
        CampaignError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();

        let message = match &self {
            AppError::Campaign(CampaignError::Storage(msg)) => {
                tracing::error!("Internal error: {}", msg);
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };

        let mut body = json!({ "error": code, "message": message });
        if let AppError::Campaign(CampaignError::InvalidAssetReference(ids)) = &self {
            body["assetIds"] = json!(ids);
        }

        let mut response = (status, Json(body)).into_response();
        if let AppError::Campaign(CampaignError::GenerationInProgress(_)) = self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from_str(&GENERATION_RETRY_AFTER_SECS.to_string())
                    .unwrap_or_else(|_| HeaderValue::from_static("5")),
            );
        }
        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn test_status_mapping() {
        let id = Uuid::new_v4();
        let cases = [
            (CampaignError::validation("x"), StatusCode::BAD_REQUEST),
            (CampaignError::forbidden("x"), StatusCode::FORBIDDEN),
            (CampaignError::NotOwner { actor_id: id }, StatusCode::FORBIDDEN),
            (CampaignError::campaign_not_found(id), StatusCode::NOT_FOUND),
            (CampaignError::invalid_state("x"), StatusCode::CONFLICT),
            (CampaignError::Conflict("x".into()), StatusCode::CONFLICT),
            (
                CampaignError::InvalidAssetReference(vec![id]),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CampaignError::NoAssetsAssociated(id),
                StatusCode::UNPROCESSABLE_ENTITY,
            ),
            (
                CampaignError::GenerationInProgress(id),
                StatusCode::TOO_MANY_REQUESTS,
            ),
            (
                CampaignError::GenerationFailed("timeout".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (
                CampaignError::Storage("db down".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, expected) in cases {
            assert_eq!(AppError::from(error).status_code(), expected);
        }
        assert_eq!(
            AppError::Unauthorized("missing".into()).status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_generation_in_progress_sets_retry_after() {
        let response = AppError::from(CampaignError::GenerationInProgress(Uuid::new_v4()))
            .into_response();
        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            response.headers().get(header::RETRY_AFTER).unwrap(),
            &HeaderValue::from_static("5")
        );
    }

    #[tokio::test]
    async fn test_storage_error_body_is_redacted() {
        let response =
            AppError::from(CampaignError::Storage("password=hunter2".into())).into_response();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(!text.contains("hunter2"));
        assert!(text.contains("internal_error"));
    }
}
