//! Read-only health figures for tech support.
//!
//! Computed from plain store reads without taking campaign locks, so the
//! numbers may trail in-flight transitions slightly.

use std::sync::Arc;

use std::collections::BTreeMap;

use adflow_core::{Action, CampaignError, CampaignStatus, Result, User};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use super::decide;
use crate::models::{HealthCheck, HealthStatus, PROOF_GENERATION_TIME};
use crate::store::CampaignStore;

pub const MAX_WINDOW_DAYS: u32 = 365;

/// Look-back of the uptime figures.
pub const UPTIME_WINDOW_HOURS: i64 = 24;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalRate {
    pub days: u32,
    pub approved: u64,
    pub rejected: u64,
    pub total_reviewed: u64,
    /// Percentage of reviewed campaigns that were approved, two decimals.
    pub approval_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProofGenerationStats {
    pub days: u32,
    pub count: u64,
    pub average_seconds: Option<f64>,
    pub last_seconds: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub queue_depth: u64,
    pub approval_rate: ApprovalRate,
    pub proof_generation: ProofGenerationStats,
    pub uptime: Vec<ComponentUptime>,
}

/// Health check tallies for one component over the uptime window.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentUptime {
    pub component: String,
    pub latest_status: HealthStatus,
    pub last_checked_at: DateTime<Utc>,
    pub total_checks: u64,
    pub healthy_checks: u64,
    pub degraded_checks: u64,
    pub down_checks: u64,
    /// Share of healthy checks, two decimals.
    pub uptime_percentage: f64,
}

impl ComponentUptime {
    /// Tallies `checks`, which must be non-empty and ordered oldest first.
    fn tally(component: String, checks: &[&HealthCheck]) -> Option<Self> {
        let latest = checks.last()?;
        let count = |status: HealthStatus| checks.iter().filter(|c| c.status == status).count() as u64;
        let total_checks = checks.len() as u64;
        let healthy_checks = count(HealthStatus::Healthy);

        Some(Self {
            component,
            latest_status: latest.status,
            last_checked_at: latest.checked_at,
            total_checks,
            healthy_checks,
            degraded_checks: count(HealthStatus::Degraded),
            down_checks: count(HealthStatus::Down),
            uptime_percentage: round2(healthy_checks as f64 / total_checks as f64 * 100.0),
        })
    }
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn window_start(days: u32) -> Result<DateTime<Utc>> {
    if !(1..=MAX_WINDOW_DAYS).contains(&days) {
        return Err(CampaignError::validation(format!(
            "days must be between 1 and {}",
            MAX_WINDOW_DAYS
        )));
    }
    Ok(Utc::now() - Duration::days(i64::from(days)))
}

pub struct MetricsView {
    store: Arc<dyn CampaignStore>,
}

impl MetricsView {
    pub fn new(store: Arc<dyn CampaignStore>) -> Self {
        Self { store }
    }

    fn authorize(actor: &User) -> Result<()> {
        decide(actor, Action::ViewMetrics, None).check_forbidden(Action::ViewMetrics)
    }

    /// Number of campaigns awaiting review.
    pub async fn queue_depth(&self, actor: &User) -> Result<u64> {
        Self::authorize(actor)?;
        Ok(self
            .store
            .count_campaigns_by_status(CampaignStatus::PendingApproval)
            .await?)
    }

    /// Approval share of campaigns reviewed in the last `days` days.
    pub async fn approval_rate(&self, actor: &User, days: u32) -> Result<ApprovalRate> {
        Self::authorize(actor)?;
        let since = window_start(days)?;
        let reviewed = self.store.list_reviewed_since(since).await?;
        let approved = reviewed
            .iter()
            .filter(|c| c.status == CampaignStatus::Approved)
            .count() as u64;
        let rejected = reviewed
            .iter()
            .filter(|c| c.status == CampaignStatus::Rejected)
            .count() as u64;
        let total_reviewed = approved + rejected;
        let approval_rate = if total_reviewed == 0 {
            0.0
        } else {
            round2(approved as f64 / total_reviewed as f64 * 100.0)
        };

        Ok(ApprovalRate {
            days,
            approved,
            rejected,
            total_reviewed,
            approval_rate,
        })
    }

    /// Proof generation timings recorded in the last `days` days.
    pub async fn proof_generation(&self, actor: &User, days: u32) -> Result<ProofGenerationStats> {
        Self::authorize(actor)?;
        let since = window_start(days)?;
        let samples = self.store.list_metrics(PROOF_GENERATION_TIME, since).await?;
        let count = samples.len() as u64;
        let average_seconds = (count > 0).then(|| {
            round2(samples.iter().map(|m| m.metric_value).sum::<f64>() / count as f64)
        });

        Ok(ProofGenerationStats {
            days,
            count,
            average_seconds,
            last_seconds: samples.last().map(|m| round2(m.metric_value)),
        })
    }

    /// Per-component health over the last day, by component name.
    /// Components with no recorded check are absent.
    pub async fn uptime(&self, actor: &User) -> Result<Vec<ComponentUptime>> {
        Self::authorize(actor)?;
        let since = Utc::now() - Duration::hours(UPTIME_WINDOW_HOURS);
        let checks = self.store.list_health_checks_since(since).await?;

        let mut by_component: BTreeMap<&str, Vec<&HealthCheck>> = BTreeMap::new();
        for check in &checks {
            by_component.entry(check.component.as_str()).or_default().push(check);
        }
        Ok(by_component
            .into_iter()
            .filter_map(|(component, checks)| ComponentUptime::tally(component.to_string(), &checks))
            .collect())
    }

    pub async fn snapshot(&self, actor: &User, days: u32) -> Result<MetricsSnapshot> {
        Ok(MetricsSnapshot {
            queue_depth: self.queue_depth(actor).await?,
            approval_rate: self.approval_rate(actor, days).await?,
            proof_generation: self.proof_generation(actor, days).await?,
            uptime: self.uptime(actor).await?,
        })
    }
}
