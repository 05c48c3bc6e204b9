//! Periodic health checks of the store and the external collaborators.
//!
//! Each round checks every component, times the check and records one
//! `HealthCheck` row per component. `MetricsView::uptime` reads them back.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;

use super::collaborator::{endpoint, http_client, with_deadline, CollaboratorError};
use crate::config::ServerConfig;
use crate::models::system_health::{
    COMPONENT_CLASSIFIER_SERVICE, COMPONENT_DATABASE, COMPONENT_PROOF_SERVICE,
};
use crate::models::{HealthCheck, HealthStatus};
use crate::store::{CampaignStore, StoreError};

/// Why a component did not come back healthy.
#[derive(Debug, thiserror::Error)]
pub enum CheckError {
    /// The component cannot serve requests at all.
    #[error("{0}")]
    Down(String),

    /// The component answered badly or slowly.
    #[error("{0}")]
    Degraded(String),
}

impl CheckError {
    fn status(&self) -> HealthStatus {
        match self {
            CheckError::Down(_) => HealthStatus::Down,
            CheckError::Degraded(_) => HealthStatus::Degraded,
        }
    }
}

impl From<StoreError> for CheckError {
    fn from(error: StoreError) -> Self {
        CheckError::Down(error.to_string())
    }
}

impl From<CollaboratorError> for CheckError {
    fn from(error: CollaboratorError) -> Self {
        match &error {
            CollaboratorError::NotConfigured(_) => CheckError::Down(error.to_string()),
            CollaboratorError::Http(e) if e.is_connect() => CheckError::Down(error.to_string()),
            _ => CheckError::Degraded(error.to_string()),
        }
    }
}

/// One component the monitor checks.
#[async_trait]
pub trait ComponentCheck: Send + Sync {
    fn component(&self) -> &str;

    async fn check(&self) -> Result<(), CheckError>;
}

/// Pings the campaign store.
pub struct StoreCheck {
    store: Arc<dyn CampaignStore>,
}

impl StoreCheck {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ComponentCheck for StoreCheck {
    fn component(&self) -> &str {
        COMPONENT_DATABASE
    }

    async fn check(&self) -> Result<(), CheckError> {
        Ok(self.store.ping().await?)
    }
}

/// Calls `GET {base_url}/health` on an external service.
pub struct ServiceCheck {
    component: &'static str,
    client: reqwest::Client,
    base_url: Option<String>,
}

impl ServiceCheck {
    /// A missing `base_url` reports the service as down.
    pub fn new(
        component: &'static str,
        base_url: Option<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        Ok(Self {
            component,
            client: http_client(timeout)?,
            base_url,
        })
    }
}

#[async_trait]
impl ComponentCheck for ServiceCheck {
    fn component(&self) -> &str {
        self.component
    }

    async fn check(&self) -> Result<(), CheckError> {
        let base_url = self
            .base_url
            .as_deref()
            .ok_or(CollaboratorError::NotConfigured(self.component))?;
        self.client
            .get(endpoint(base_url, "health"))
            .send()
            .await
            .map_err(CollaboratorError::from)?
            .error_for_status()
            .map_err(CollaboratorError::from)?;
        Ok(())
    }
}

pub struct HealthMonitor {
    store: Arc<dyn CampaignStore>,
    targets: Vec<Arc<dyn ComponentCheck>>,
    timeout: Duration,
}

impl HealthMonitor {
    pub fn new(
        store: Arc<dyn CampaignStore>,
        targets: Vec<Arc<dyn ComponentCheck>>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            targets,
            timeout,
        }
    }

    /// Checks the store and the proof service, plus the classifier service
    /// when one is configured. The rules classifier runs in process and has
    /// nothing to check.
    pub fn from_config(
        config: &ServerConfig,
        store: Arc<dyn CampaignStore>,
    ) -> Result<Self, CollaboratorError> {
        let timeout = config.collaborator_timeout;
        let mut targets: Vec<Arc<dyn ComponentCheck>> = vec![
            Arc::new(StoreCheck::new(Arc::clone(&store))),
            Arc::new(ServiceCheck::new(
                COMPONENT_PROOF_SERVICE,
                config.proof_service_url.clone(),
                timeout,
            )?),
        ];
        if let Some(url) = &config.classifier_service_url {
            targets.push(Arc::new(ServiceCheck::new(
                COMPONENT_CLASSIFIER_SERVICE,
                Some(url.clone()),
                timeout,
            )?));
        }
        Ok(Self::new(store, targets, timeout))
    }

    async fn check_component(&self, target: &dyn ComponentCheck) -> HealthCheck {
        let started = Instant::now();
        let checked = async { Ok::<_, CollaboratorError>(target.check().await) };
        let outcome = match with_deadline(self.timeout, checked).await {
            Ok(result) => result,
            Err(timeout) => Err(CheckError::from(timeout)),
        };
        let response_time_ms = i64::try_from(started.elapsed().as_millis()).unwrap_or(i64::MAX);

        let (status, error_message) = match outcome {
            Ok(()) => (HealthStatus::Healthy, None),
            Err(e) => (e.status(), Some(e.to_string())),
        };
        HealthCheck::new(
            target.component(),
            status,
            response_time_ms,
            error_message,
            Utc::now(),
        )
    }

    /// Runs every check concurrently and records the results.
    ///
    /// A check that cannot be recorded is logged and still returned.
    pub async fn run_checks(&self) -> Vec<HealthCheck> {
        let rounds = self.targets.iter().map(|t| self.check_component(t.as_ref()));
        let checks = join_all(rounds).await;

        for check in &checks {
            if let Err(e) = self.store.record_health_check(check).await {
                tracing::warn!(component = %check.component, "Failed to record health check: {}", e);
            }
            match check.status {
                HealthStatus::Healthy => tracing::debug!(
                    component = %check.component,
                    response_time_ms = check.response_time_ms,
                    "Health check passed"
                ),
                status => tracing::warn!(
                    component = %check.component,
                    status = status.as_str(),
                    response_time_ms = check.response_time_ms,
                    error = check.error_message.as_deref().unwrap_or(""),
                    "Health check failed"
                ),
            }
        }
        checks
    }

    /// Spawns a task running a round every `every`, starting immediately.
    pub fn start(self: Arc<Self>, every: Duration) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                self.run_checks().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use chrono::Duration as ChronoDuration;

    struct FixedCheck {
        component: &'static str,
        result: fn() -> Result<(), CheckError>,
    }

    #[async_trait]
    impl ComponentCheck for FixedCheck {
        fn component(&self) -> &str {
            self.component
        }

        async fn check(&self) -> Result<(), CheckError> {
            (self.result)()
        }
    }

    struct HangingCheck;

    #[async_trait]
    impl ComponentCheck for HangingCheck {
        fn component(&self) -> &str {
            "renderer"
        }

        async fn check(&self) -> Result<(), CheckError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(())
        }
    }

    async fn recorded(store: &MemoryStore) -> Vec<HealthCheck> {
        store
            .list_health_checks_since(Utc::now() - ChronoDuration::hours(1))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_run_checks_records_each_component() {
        let store = Arc::new(MemoryStore::new());
        let monitor = HealthMonitor::new(
            store.clone(),
            vec![
                Arc::new(StoreCheck::new(store.clone())),
                Arc::new(FixedCheck {
                    component: COMPONENT_PROOF_SERVICE,
                    result: || Err(CheckError::Degraded("503 Service Unavailable".to_string())),
                }),
            ],
            Duration::from_secs(1),
        );

        let checks = monitor.run_checks().await;
        assert_eq!(checks.len(), 2);
        assert_eq!(checks[0].component, COMPONENT_DATABASE);
        assert_eq!(checks[0].status, HealthStatus::Healthy);
        assert_eq!(checks[0].error_message, None);
        assert_eq!(checks[1].status, HealthStatus::Degraded);
        assert_eq!(checks[1].error_message.as_deref(), Some("503 Service Unavailable"));

        assert_eq!(recorded(&store).await.len(), 2);
    }

    #[tokio::test]
    async fn test_slow_component_is_degraded() {
        let store = Arc::new(MemoryStore::new());
        let monitor = HealthMonitor::new(
            store.clone(),
            vec![Arc::new(HangingCheck)],
            Duration::from_millis(20),
        );
        let checks = monitor.run_checks().await;
        assert_eq!(checks[0].status, HealthStatus::Degraded);
        assert_eq!(checks[0].error_message.as_deref(), Some("timeout"));
    }

    #[tokio::test]
    async fn test_unconfigured_service_is_down() {
        let service =
            ServiceCheck::new(COMPONENT_PROOF_SERVICE, None, Duration::from_secs(1)).unwrap();
        let error = service.check().await.unwrap_err();
        assert_eq!(error.status(), HealthStatus::Down);
        assert_eq!(error.to_string(), "proof_service not configured");
    }

    #[tokio::test]
    async fn test_from_config_skips_rules_classifier() {
        let store: Arc<dyn CampaignStore> = Arc::new(MemoryStore::new());
        let monitor = HealthMonitor::from_config(&ServerConfig::default(), Arc::clone(&store))
            .unwrap();
        let components: Vec<&str> = monitor.targets.iter().map(|t| t.component()).collect();
        assert_eq!(components, vec![COMPONENT_DATABASE, COMPONENT_PROOF_SERVICE]);

        let config = ServerConfig {
            classifier_service_url: Some("http://classifier.local".to_string()),
            ..ServerConfig::default()
        };
        let monitor = HealthMonitor::from_config(&config, store).unwrap();
        assert_eq!(monitor.targets.len(), 3);
    }

    #[tokio::test]
    async fn test_start_runs_a_round_immediately() {
        let store = Arc::new(MemoryStore::new());
        let monitor = Arc::new(HealthMonitor::new(
            store.clone(),
            vec![Arc::new(StoreCheck::new(store.clone()))],
            Duration::from_secs(1),
        ));
        let handle = monitor.start(Duration::from_secs(3600));

        let mut checks = Vec::new();
        for _ in 0..50 {
            checks = recorded(&store).await;
            if !checks.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        handle.abort();
        assert_eq!(checks.len(), 1);
        assert_eq!(checks[0].status, HealthStatus::Healthy);
    }
}
