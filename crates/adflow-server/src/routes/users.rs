//! User registration and identity endpoints.

use axum::{
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use adflow_core::{Role, User};

use super::{Actor, AppState};
use crate::error::AppError;

/// Request body for registering a user.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub email: String,
    pub full_name: String,
    /// One of `advertiser`, `campaign_manager`, `tech_support`.
    pub role: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: String,
    pub created_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
            role: user.role.as_str().to_string(),
            created_at: user.created_at.to_rfc3339(),
        }
    }
}

/// Creates the users router.
pub fn router(engine: AppState) -> Router {
    Router::new()
        .route("/", post(register_user))
        .route("/me", get(current_user))
        .with_state(engine)
}

/// Registers a user. Identity is otherwise asserted by `X-User-ID`.
async fn register_user(
    State(engine): State<AppState>,
    Json(request): Json<RegisterUserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let role = Role::from_str(&request.role)
        .ok_or_else(|| AppError::BadRequest(format!("Unknown role '{}'", request.role)))?;
    let user = engine
        .register_user(User::new(
            request.email.trim(),
            request.full_name.trim(),
            role,
        ))
        .await?;
    Ok(Json(user.into()))
}

async fn current_user(Actor(user): Actor) -> Json<UserResponse> {
    Json(user.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_request_deserialization() {
        let json = r#"{"email": "ada@example.com", "fullName": "Ada", "role": "advertiser"}"#;
        let request: RegisterUserRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.full_name, "Ada");
        assert_eq!(request.role, "advertiser");
    }

    #[test]
    fn test_user_response_serialization() {
        let user = User::new("mia@example.com", "Mia", Role::CampaignManager);
        let json = serde_json::to_string(&UserResponse::from(user)).unwrap();
        assert!(json.contains("\"fullName\":\"Mia\""));
        assert!(json.contains("\"role\":\"campaign_manager\""));
        assert!(json.contains("\"createdAt\":"));
    }
}
