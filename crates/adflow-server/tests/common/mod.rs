//! Shared fixtures for the adflow server integration tests.
#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use adflow_core::{Asset, AssetCategory, Proof, Role, User};
use adflow_server::engine::{
    AssetClassifier, CollaboratorError, EngineSettings, ProofGenerator, ProofRequest,
};
use adflow_server::store::MemoryStore;
use adflow_server::{create_router, Engine};
use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio::sync::Notify;
use tower::ServiceExt;
use uuid::Uuid;

/// Renders a deterministic proof from the request.
pub struct EchoGenerator;

#[async_trait]
impl ProofGenerator for EchoGenerator {
    async fn generate(&self, request: &ProofRequest) -> Result<Proof, CollaboratorError> {
        Ok(Proof {
            markup: format!("<mjml><mj-text>{}</mj-text></mjml>", request.name),
            html: format!("<html><body>{}</body></html>", request.name),
        })
    }
}

/// Holds every generation until `release` is notified.
#[derive(Default)]
pub struct GateGenerator {
    pub entered: Notify,
    pub release: Notify,
}

#[async_trait]
impl ProofGenerator for GateGenerator {
    async fn generate(&self, _request: &ProofRequest) -> Result<Proof, CollaboratorError> {
        self.entered.notify_one();
        self.release.notified().await;
        Ok(Proof {
            markup: "<mjml/>".to_string(),
            html: "<html/>".to_string(),
        })
    }
}

/// Classifies everything as an image except files named `broken*`.
pub struct FlakyClassifier;

#[async_trait]
impl AssetClassifier for FlakyClassifier {
    async fn classify(&self, asset: &Asset) -> Result<AssetCategory, CollaboratorError> {
        if asset.filename.starts_with("broken") {
            Err(CollaboratorError::Rejected("classifier unavailable".to_string()))
        } else {
            Ok(AssetCategory::Image)
        }
    }
}

pub fn engine_with(generator: Arc<dyn ProofGenerator>) -> Arc<Engine> {
    Arc::new(Engine::new(
        Arc::new(MemoryStore::new()),
        generator,
        Arc::new(FlakyClassifier),
        EngineSettings {
            collaborator_timeout: Duration::from_secs(5),
            max_asset_bytes: 10 * 1024 * 1024,
        },
    ))
}

pub fn engine() -> Arc<Engine> {
    engine_with(Arc::new(EchoGenerator))
}

pub fn router(engine: &Arc<Engine>) -> Router {
    create_router(Arc::clone(engine))
}

pub async fn register(engine: &Engine, email: &str, role: Role) -> User {
    engine
        .register_user(User::new(email, email.split('@').next().unwrap_or(email), role))
        .await
        .expect("register user")
}

/// Sends one request and returns the status with the parsed JSON body
/// (`Value::Null` for empty bodies).
pub async fn send(
    app: &Router,
    method: &str,
    uri: &str,
    user: Option<Uuid>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user_id) = user {
        builder = builder.header("X-User-ID", user_id.to_string());
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("build request");

    let response = app.clone().oneshot(request).await.expect("send request");
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("parse JSON body")
    };
    (status, json)
}

pub fn upload_body(filename: &str) -> Value {
    serde_json::json!({
        "filename": filename,
        "storageKey": format!("uploads/{}", filename),
        "storageUrl": format!("https://cdn.example.com/uploads/{}", filename),
        "fileType": "image/png",
        "sizeBytes": 2048
    })
}
