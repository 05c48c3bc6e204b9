//! Campaign endpoints: drafting, proof generation and review transitions.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adflow_core::{Campaign, CampaignDetails, CampaignPatch, NewCampaign};

use super::assets::AssetResponse;
use super::{Actor, AppState};
use crate::engine::{CampaignWithAssets, ProofOutcome};
use crate::error::AppError;
use crate::store::LinkedAsset;

/// Request body for creating a campaign.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCampaignRequest {
    pub name: String,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub asset_ids: Vec<Uuid>,
}

impl From<CreateCampaignRequest> for NewCampaign {
    fn from(request: CreateCampaignRequest) -> Self {
        NewCampaign {
            details: CampaignDetails {
                name: request.name,
                target_audience: request.target_audience,
                goal: request.goal,
                notes: request.notes,
            },
            asset_ids: request.asset_ids,
        }
    }
}

/// Partial update of a draft. Omitted fields stay unchanged.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCampaignRequest {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub target_audience: Option<String>,
    #[serde(default)]
    pub goal: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<UpdateCampaignRequest> for CampaignPatch {
    fn from(request: UpdateCampaignRequest) -> Self {
        CampaignPatch {
            name: request.name,
            target_audience: request.target_audience,
            goal: request.goal,
            notes: request.notes,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachAssetsRequest {
    pub asset_ids: Vec<Uuid>,
    /// Placement hint applied to every attached asset.
    #[serde(default)]
    pub asset_role: Option<String>,
    /// Display order of the first attached asset.
    #[serde(default)]
    pub display_order: Option<i32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectCampaignRequest {
    pub reason: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignResponse {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub target_audience: Option<String>,
    pub goal: Option<String>,
    pub notes: Option<String>,
    pub status: String,
    pub has_proof: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_markup: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proof_html: Option<String>,
    pub reviewed_by: Option<Uuid>,
    pub reviewed_at: Option<String>,
    pub rejection_reason: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Campaign> for CampaignResponse {
    fn from(campaign: Campaign) -> Self {
        let has_proof = campaign.has_proof();
        let (proof_markup, proof_html) = match campaign.proof {
            Some(proof) => (Some(proof.markup), Some(proof.html)),
            None => (None, None),
        };
        Self {
            id: campaign.id,
            owner_id: campaign.owner_id,
            name: campaign.name,
            target_audience: campaign.target_audience,
            goal: campaign.goal,
            notes: campaign.notes,
            status: campaign.status.as_str().to_string(),
            has_proof,
            proof_markup,
            proof_html,
            reviewed_by: campaign.reviewed_by,
            reviewed_at: campaign.reviewed_at.map(|at| at.to_rfc3339()),
            rejection_reason: campaign.rejection_reason,
            created_at: campaign.created_at.to_rfc3339(),
            updated_at: campaign.updated_at.to_rfc3339(),
        }
    }
}

/// A linked asset with its placement within the campaign.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignAssetResponse {
    #[serde(flatten)]
    pub asset: AssetResponse,
    pub asset_role: Option<String>,
    pub display_order: Option<i32>,
}

impl From<LinkedAsset> for CampaignAssetResponse {
    fn from(linked: LinkedAsset) -> Self {
        Self {
            asset: linked.asset.into(),
            asset_role: linked.link.asset_role,
            display_order: linked.link.display_order,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CampaignDetailResponse {
    #[serde(flatten)]
    pub campaign: CampaignResponse,
    pub assets: Vec<CampaignAssetResponse>,
}

impl From<CampaignWithAssets> for CampaignDetailResponse {
    fn from(view: CampaignWithAssets) -> Self {
        Self {
            campaign: view.campaign.into(),
            assets: view.assets.into_iter().map(CampaignAssetResponse::from).collect(),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateProofResponse {
    pub markup: String,
    pub html: String,
    pub generation_time_seconds: f64,
    pub campaign: CampaignResponse,
}

impl From<ProofOutcome> for GenerateProofResponse {
    fn from(outcome: ProofOutcome) -> Self {
        Self {
            markup: outcome.proof.markup,
            html: outcome.proof.html,
            generation_time_seconds: outcome.generation_time_seconds,
            campaign: outcome.campaign.into(),
        }
    }
}

/// Creates the campaigns router.
pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/", post(create_campaign).get(list_campaigns))
        .route(
            "/{id}",
            get(get_campaign)
                .patch(update_campaign)
                .delete(delete_campaign),
        )
        .route("/{id}/assets", post(attach_assets))
        .route("/{id}/generate-proof", post(generate_proof))
        .route("/{id}/submit", post(submit_campaign))
        .route("/{id}/approve", post(approve_campaign))
        .route("/{id}/reject", post(reject_campaign))
        .with_state(engine)
}

async fn create_campaign(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Json(request): Json<CreateCampaignRequest>,
) -> Result<(StatusCode, Json<CampaignResponse>), AppError> {
    let campaign = engine.campaigns.create(&actor, request.into()).await?;
    Ok((StatusCode::CREATED, Json(campaign.into())))
}

async fn list_campaigns(
    State(engine): State<AppState>,
    Actor(actor): Actor,
) -> Result<Json<Vec<CampaignResponse>>, AppError> {
    let campaigns = engine.campaigns.list(&actor).await?;
    Ok(Json(campaigns.into_iter().map(CampaignResponse::from).collect()))
}

async fn get_campaign(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignDetailResponse>, AppError> {
    let view = engine.campaigns.get(campaign_id, &actor).await?;
    Ok(Json(view.into()))
}

async fn update_campaign(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<UpdateCampaignRequest>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = engine
        .campaigns
        .update_details(campaign_id, &actor, request.into())
        .await?;
    Ok(Json(campaign.into()))
}

async fn delete_campaign(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    engine.campaigns.delete(campaign_id, &actor).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn attach_assets(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<AttachAssetsRequest>,
) -> Result<Json<CampaignDetailResponse>, AppError> {
    let view = engine
        .campaigns
        .attach_assets(
            campaign_id,
            &actor,
            &request.asset_ids,
            request.asset_role.as_deref(),
            request.display_order,
        )
        .await?;
    Ok(Json(view.into()))
}

async fn generate_proof(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<GenerateProofResponse>, AppError> {
    let outcome = engine.campaigns.generate_proof(campaign_id, &actor).await?;
    Ok(Json(outcome.into()))
}

async fn submit_campaign(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = engine.campaigns.submit(campaign_id, &actor).await?;
    Ok(Json(campaign.into()))
}

async fn approve_campaign(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = engine.campaigns.approve(campaign_id, &actor).await?;
    Ok(Json(campaign.into()))
}

async fn reject_campaign(
    State(engine): State<AppState>,
    Actor(actor): Actor,
    Path(campaign_id): Path<Uuid>,
    Json(request): Json<RejectCampaignRequest>,
) -> Result<Json<CampaignResponse>, AppError> {
    let campaign = engine
        .campaigns
        .reject(campaign_id, &actor, &request.reason)
        .await?;
    Ok(Json(campaign.into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use adflow_core::Proof;
    use chrono::Utc;

    #[test]
    fn test_create_request_deserialization() {
        let json = r#"{
            "name": "Spring Sale",
            "targetAudience": "Returning customers",
            "assetIds": ["00000000-0000-0000-0000-000000000001"]
        }"#;
        let request: CreateCampaignRequest = serde_json::from_str(json).unwrap();
        let input = NewCampaign::from(request);
        assert_eq!(input.details.name, "Spring Sale");
        assert_eq!(input.details.goal, None);
        assert_eq!(input.asset_ids.len(), 1);
    }

    #[test]
    fn test_campaign_response_hides_missing_proof() {
        let campaign = Campaign::draft(
            Uuid::new_v4(),
            CampaignDetails {
                name: "Spring Sale".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_string(&CampaignResponse::from(campaign)).unwrap();
        assert!(json.contains("\"status\":\"draft\""));
        assert!(json.contains("\"hasProof\":false"));
        assert!(!json.contains("proofMarkup"));
        assert!(json.contains("\"rejectionReason\":null"));
    }

    #[test]
    fn test_campaign_response_carries_proof_pair() {
        let campaign = Campaign::draft(
            Uuid::new_v4(),
            CampaignDetails {
                name: "Spring Sale".to_string(),
                ..Default::default()
            },
            Utc::now(),
        )
        .unwrap()
        .with_proof(
            Proof {
                markup: "<mjml/>".to_string(),
                html: "<html/>".to_string(),
            },
            Utc::now(),
        )
        .unwrap();
        let json = serde_json::to_string(&CampaignResponse::from(campaign)).unwrap();
        assert!(json.contains("\"hasProof\":true"));
        assert!(json.contains("\"proofMarkup\":\"<mjml/>\""));
        assert!(json.contains("\"proofHtml\":\"<html/>\""));
    }

    #[test]
    fn test_attach_request_optional_fields() {
        let json = r#"{"assetIds": []}"#;
        let request: AttachAssetsRequest = serde_json::from_str(json).unwrap();
        assert!(request.asset_role.is_none());
        assert!(request.display_order.is_none());
    }
}
