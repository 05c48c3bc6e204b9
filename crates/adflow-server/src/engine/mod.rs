//! The campaign workflow engine.
//!
//! Every operation takes the acting [`User`] explicitly and consults the
//! authorization table before touching state. Mutations of one campaign are
//! serialized through [`KeyedLocks`] and committed with status-conditional
//! store writes.

pub mod approval_queue;
pub mod assets;
pub mod classifier;
pub mod collaborator;
pub mod health;
pub mod lifecycle;
pub mod locks;
pub mod metrics;
pub mod proof;

use std::sync::Arc;
use std::time::Duration;

use adflow_core::asset::DEFAULT_MAX_ASSET_BYTES;
use adflow_core::{authorize, Action, CampaignError, Decision, Ownership, Result, User};
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::store::CampaignStore;

pub use approval_queue::ApprovalQueueView;
pub use assets::{AssetRegistry, RecategorizeFailure, RecategorizeOutcome};
pub use classifier::{AssetClassifier, HttpAssetClassifier, RulesClassifier};
pub use collaborator::CollaboratorError;
pub use health::{CheckError, ComponentCheck, HealthMonitor, ServiceCheck, StoreCheck};
pub use lifecycle::{CampaignLifecycle, CampaignWithAssets};
pub use locks::KeyedLocks;
pub use metrics::{
    ApprovalRate, ComponentUptime, MetricsSnapshot, MetricsView, ProofGenerationStats,
};
pub use proof::{
    HttpProofGenerator, ProofGenerationCoordinator, ProofGenerator, ProofOutcome, ProofRequest,
    UnconfiguredProofGenerator,
};

/// Looks up the table entry for `actor`, logging denials.
pub(crate) fn decide(actor: &User, action: Action, owner_id: Option<Uuid>) -> Decision {
    let ownership = owner_id.map_or(Ownership::NotApplicable, |owner| {
        Ownership::of(owner, actor.id)
    });
    let decision = authorize(actor.role, action, ownership);
    if !decision.is_permitted() {
        tracing::debug!(
            actor_id = %actor.id,
            role = actor.role.as_str(),
            action = action.as_str(),
            ?decision,
            "Authorization denied"
        );
    }
    decision
}

/// Limits applied by the engine.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub collaborator_timeout: Duration,
    pub max_asset_bytes: u64,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            collaborator_timeout: Duration::from_secs(60),
            max_asset_bytes: DEFAULT_MAX_ASSET_BYTES,
        }
    }
}

/// All engine components sharing one store and one lock registry.
pub struct Engine {
    store: Arc<dyn CampaignStore>,
    pub assets: AssetRegistry,
    pub campaigns: CampaignLifecycle,
    pub approvals: ApprovalQueueView,
    pub metrics: MetricsView,
}

impl Engine {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        generator: Arc<dyn ProofGenerator>,
        classifier: Arc<dyn AssetClassifier>,
        settings: EngineSettings,
    ) -> Self {
        let locks = Arc::new(KeyedLocks::new());
        let coordinator = Arc::new(ProofGenerationCoordinator::new(
            Arc::clone(&store),
            Arc::clone(&locks),
            generator,
            settings.collaborator_timeout,
        ));

        Self {
            assets: AssetRegistry::new(
                Arc::clone(&store),
                Arc::clone(&locks),
                classifier,
                settings.collaborator_timeout,
                settings.max_asset_bytes,
            ),
            campaigns: CampaignLifecycle::new(Arc::clone(&store), locks, coordinator),
            approvals: ApprovalQueueView::new(Arc::clone(&store)),
            metrics: MetricsView::new(Arc::clone(&store)),
            store,
        }
    }

    /// Wires the collaborators named in `config` around `store`.
    pub fn from_config(
        config: &ServerConfig,
        store: Arc<dyn CampaignStore>,
    ) -> std::result::Result<Self, CollaboratorError> {
        let timeout = config.collaborator_timeout;
        let generator: Arc<dyn ProofGenerator> = match &config.proof_service_url {
            Some(url) => Arc::new(HttpProofGenerator::new(url.clone(), timeout)?),
            None => Arc::new(UnconfiguredProofGenerator),
        };
        let classifier: Arc<dyn AssetClassifier> = match &config.classifier_service_url {
            Some(url) => Arc::new(HttpAssetClassifier::new(url.clone(), timeout)?),
            None => Arc::new(RulesClassifier),
        };

        Ok(Self::new(
            store,
            generator,
            classifier,
            EngineSettings {
                collaborator_timeout: timeout,
                max_asset_bytes: config.max_asset_bytes,
            },
        ))
    }

    pub fn store(&self) -> &Arc<dyn CampaignStore> {
        &self.store
    }

    /// Registers a user. Emails are unique.
    pub async fn register_user(&self, user: User) -> Result<User> {
        if user.email.trim().is_empty() || !user.email.contains('@') {
            return Err(CampaignError::validation("A valid email address is required"));
        }
        if user.full_name.trim().is_empty() {
            return Err(CampaignError::validation("Full name must not be empty"));
        }
        self.store.insert_user(&user).await?;
        tracing::info!(user_id = %user.id, role = user.role.as_str(), "User registered");
        Ok(user)
    }

    /// Resolves an actor id to the stored user.
    pub async fn resolve_actor(&self, actor_id: Uuid) -> Result<User> {
        self.store
            .find_user(actor_id)
            .await?
            .ok_or(CampaignError::NotFound {
                entity: "User",
                id: actor_id,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use adflow_core::Role;
    use assert_matches::assert_matches;

    fn engine() -> Engine {
        Engine::new(
            Arc::new(MemoryStore::new()),
            Arc::new(UnconfiguredProofGenerator),
            Arc::new(RulesClassifier),
            EngineSettings::default(),
        )
    }

    #[tokio::test]
    async fn test_register_and_resolve() {
        let engine = engine();
        let user = engine
            .register_user(User::new("m@example.com", "Mia Manager", Role::CampaignManager))
            .await
            .unwrap();
        let resolved = engine.resolve_actor(user.id).await.unwrap();
        assert_eq!(resolved.role, Role::CampaignManager);
    }

    #[tokio::test]
    async fn test_register_rejects_bad_email() {
        let engine = engine();
        assert_matches!(
            engine
                .register_user(User::new("not-an-email", "X", Role::Advertiser))
                .await,
            Err(CampaignError::Validation(_))
        );
    }

    #[tokio::test]
    async fn test_unknown_actor() {
        let engine = engine();
        assert_matches!(
            engine.resolve_actor(Uuid::new_v4()).await,
            Err(CampaignError::NotFound { entity: "User", .. })
        );
    }

    #[test]
    fn test_decide_maps_ownership() {
        let actor = User::new("a@example.com", "Ada", Role::Advertiser);
        assert_eq!(
            decide(&actor, Action::SubmitCampaign, Some(actor.id)),
            Decision::Permit
        );
        assert_eq!(
            decide(&actor, Action::SubmitCampaign, Some(Uuid::new_v4())),
            Decision::DenyOwnership
        );
        assert_eq!(
            decide(&actor, Action::ViewApprovalQueue, None),
            Decision::DenyRole
        );
    }
}
