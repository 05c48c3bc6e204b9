//! PostgreSQL store.
//!
//! Campaign transitions are `UPDATE ... WHERE id = $1 AND status = $2` checked by
//! `rows_affected()`. Multi-row writes run in a transaction.

use adflow_core::{
    Asset, AssetCategory, Campaign, CampaignAsset, CampaignStatus, CategorizationMethod, User,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{AssetDeletion, CampaignStore, LinkedAsset, StoreError};
use crate::models::campaign::CAMPAIGN_COLUMNS;
use crate::db;
use crate::models::{
    AssetRow, CampaignAssetRow, CampaignRow, HealthCheck, HealthCheckRow, PerformanceMetric,
    UserRow,
};

const ASSET_COLUMNS: &str = "id, owner_id, filename, storage_key, storage_url, file_type, \
     size_bytes, category, categorization_method, uploaded_at";

/// Join row for a campaign's link rows and their assets.
#[derive(Debug, FromRow)]
struct LinkedAssetRow {
    #[sqlx(flatten)]
    link: CampaignAssetRow,
    #[sqlx(flatten)]
    asset: AssetRow,
}

/// Store backed by a PostgreSQL pool.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn is_unique_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|e| e.is_unique_violation())
}

fn is_foreign_key_violation(error: &sqlx::Error) -> bool {
    error
        .as_database_error()
        .is_some_and(|e| e.is_foreign_key_violation())
}

fn campaigns_from_rows(rows: Vec<CampaignRow>) -> Result<Vec<Campaign>, StoreError> {
    rows.into_iter().map(Campaign::try_from).collect()
}

/// Asset ids from `links` that are absent or not owned by `owner_id`.
/// Locks the owned rows so a concurrent delete waits for the caller's transaction.
async fn foreign_assets(
    tx: &mut Transaction<'_, Postgres>,
    owner_id: Uuid,
    links: &[CampaignAsset],
) -> Result<Vec<Uuid>, StoreError> {
    let requested: Vec<Uuid> = links.iter().map(|l| l.asset_id).collect();
    if requested.is_empty() {
        return Ok(Vec::new());
    }
    let owned: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT id FROM assets
        WHERE id = ANY($1) AND owner_id = $2
        FOR SHARE
        "#,
    )
    .bind(&requested)
    .bind(owner_id)
    .fetch_all(&mut **tx)
    .await?;

    Ok(requested
        .into_iter()
        .filter(|id| !owned.contains(id))
        .collect())
}

/// Inserts link rows, ignoring pairs that already exist. Returns rows added.
async fn insert_links(
    tx: &mut Transaction<'_, Postgres>,
    links: &[CampaignAsset],
) -> Result<usize, StoreError> {
    let mut added = 0;
    for link in links {
        let result = sqlx::query(
            r#"
            INSERT INTO campaign_assets (campaign_id, asset_id, asset_role, display_order, created_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (campaign_id, asset_id) DO NOTHING
            "#,
        )
        .bind(link.campaign_id)
        .bind(link.asset_id)
        .bind(&link.asset_role)
        .bind(link.display_order)
        .bind(link.created_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| {
            if is_foreign_key_violation(&e) {
                StoreError::MissingAssets(vec![link.asset_id])
            } else {
                StoreError::Database(e)
            }
        })?;
        added += result.rows_affected() as usize;
    }
    Ok(added)
}

#[async_trait]
impl CampaignStore for PgStore {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(db::health_check(&self.pool).await?)
    }

    async fn insert_user(&self, user: &User) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO users (id, email, full_name, role, created_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.full_name)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("email {}", user.email))
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        sqlx::query_as::<_, UserRow>(
            "SELECT id, email, full_name, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(User::try_from)
        .transpose()
    }

    async fn insert_asset(&self, asset: &Asset) -> Result<(), StoreError> {
        let size_bytes = i64::try_from(asset.size_bytes)
            .map_err(|_| StoreError::Corrupt(format!("asset {} size overflows", asset.id)))?;
        sqlx::query(
            r#"
            INSERT INTO assets (id, owner_id, filename, storage_key, storage_url, file_type,
                                size_bytes, category, categorization_method, uploaded_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(asset.id)
        .bind(asset.owner_id)
        .bind(&asset.filename)
        .bind(&asset.storage_key)
        .bind(&asset.storage_url)
        .bind(&asset.file_type)
        .bind(size_bytes)
        .bind(asset.category.as_str())
        .bind(asset.categorization_method.map(|m| m.as_str()))
        .bind(asset.uploaded_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("asset {}", asset.id))
            } else {
                StoreError::Database(e)
            }
        })?;
        Ok(())
    }

    async fn find_asset(&self, id: Uuid) -> Result<Option<Asset>, StoreError> {
        let query = format!("SELECT {} FROM assets WHERE id = $1", ASSET_COLUMNS);
        sqlx::query_as::<_, AssetRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Asset::try_from)
            .transpose()
    }

    async fn list_assets_by_owner(&self, owner_id: Uuid) -> Result<Vec<Asset>, StoreError> {
        let query = format!(
            "SELECT {} FROM assets WHERE owner_id = $1 ORDER BY uploaded_at ASC, id ASC",
            ASSET_COLUMNS
        );
        sqlx::query_as::<_, AssetRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(Asset::try_from)
            .collect()
    }

    async fn update_asset_category(
        &self,
        id: Uuid,
        category: AssetCategory,
        method: CategorizationMethod,
    ) -> Result<Option<Asset>, StoreError> {
        let query = format!(
            r#"
            UPDATE assets
            SET category = $2, categorization_method = $3
            WHERE id = $1
            RETURNING {}
            "#,
            ASSET_COLUMNS
        );
        sqlx::query_as::<_, AssetRow>(&query)
            .bind(id)
            .bind(category.as_str())
            .bind(method.as_str())
            .fetch_optional(&self.pool)
            .await?
            .map(Asset::try_from)
            .transpose()
    }

    async fn campaigns_using_asset(&self, asset_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let query = format!(
            r#"
            SELECT {} FROM campaigns
            WHERE id IN (SELECT campaign_id FROM campaign_assets WHERE asset_id = $1)
            ORDER BY created_at ASC
            "#,
            CAMPAIGN_COLUMNS
        );
        let rows = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(asset_id)
            .fetch_all(&self.pool)
            .await?;
        campaigns_from_rows(rows)
    }

    async fn delete_asset(&self, id: Uuid, held: &[Uuid]) -> Result<AssetDeletion, StoreError> {
        let mut tx = self.pool.begin().await?;

        let exists: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM assets WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await?;
        if exists.is_none() {
            return Ok(AssetDeletion::NotFound);
        }

        let linking: Vec<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT c.id, c.status
            FROM campaigns c
            JOIN campaign_assets ca ON ca.campaign_id = c.id
            WHERE ca.asset_id = $1
            ORDER BY c.id
            FOR UPDATE OF c
            "#,
        )
        .bind(id)
        .fetch_all(&mut *tx)
        .await?;

        let unheld: Vec<Uuid> = linking
            .iter()
            .map(|(campaign_id, _)| *campaign_id)
            .filter(|campaign_id| !held.contains(campaign_id))
            .collect();
        if !unheld.is_empty() {
            tx.rollback().await?;
            return Ok(AssetDeletion::Unheld {
                campaign_ids: unheld,
            });
        }

        let blocking: Vec<Uuid> = linking
            .iter()
            .filter(|(_, status)| status != CampaignStatus::Draft.as_str())
            .map(|(campaign_id, _)| *campaign_id)
            .collect();
        if !blocking.is_empty() {
            tx.rollback().await?;
            return Ok(AssetDeletion::Blocked {
                campaign_ids: blocking,
            });
        }

        // Link rows go with the asset through ON DELETE CASCADE.
        sqlx::query("DELETE FROM assets WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(AssetDeletion::Deleted {
            detached_from: linking.into_iter().map(|(campaign_id, _)| campaign_id).collect(),
        })
    }

    async fn insert_campaign(
        &self,
        campaign: &Campaign,
        links: &[CampaignAsset],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let missing = foreign_assets(&mut tx, campaign.owner_id, links).await?;
        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(StoreError::MissingAssets(missing));
        }

        let (proof_markup, proof_html) = match &campaign.proof {
            Some(proof) => (Some(proof.markup.as_str()), Some(proof.html.as_str())),
            None => (None, None),
        };
        sqlx::query(
            r#"
            INSERT INTO campaigns (id, owner_id, name, target_audience, goal, notes, status,
                                   proof_markup, proof_html, reviewed_by, reviewed_at,
                                   rejection_reason, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
            "#,
        )
        .bind(campaign.id)
        .bind(campaign.owner_id)
        .bind(&campaign.name)
        .bind(&campaign.target_audience)
        .bind(&campaign.goal)
        .bind(&campaign.notes)
        .bind(campaign.status.as_str())
        .bind(proof_markup)
        .bind(proof_html)
        .bind(campaign.reviewed_by)
        .bind(campaign.reviewed_at)
        .bind(&campaign.rejection_reason)
        .bind(campaign.created_at)
        .bind(campaign.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StoreError::Duplicate(format!("campaign {}", campaign.id))
            } else {
                StoreError::Database(e)
            }
        })?;

        insert_links(&mut tx, links).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_campaign(&self, id: Uuid) -> Result<Option<Campaign>, StoreError> {
        let query = format!("SELECT {} FROM campaigns WHERE id = $1", CAMPAIGN_COLUMNS);
        sqlx::query_as::<_, CampaignRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .map(Campaign::try_from)
            .transpose()
    }

    async fn list_campaigns_by_owner(&self, owner_id: Uuid) -> Result<Vec<Campaign>, StoreError> {
        let query = format!(
            "SELECT {} FROM campaigns WHERE owner_id = $1 ORDER BY created_at DESC, id ASC",
            CAMPAIGN_COLUMNS
        );
        let rows = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(owner_id)
            .fetch_all(&self.pool)
            .await?;
        campaigns_from_rows(rows)
    }

    async fn list_campaigns_by_status(
        &self,
        status: CampaignStatus,
    ) -> Result<Vec<Campaign>, StoreError> {
        let query = format!(
            "SELECT {} FROM campaigns WHERE status = $1 ORDER BY updated_at ASC, id ASC",
            CAMPAIGN_COLUMNS
        );
        let rows = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        campaigns_from_rows(rows)
    }

    async fn count_campaigns_by_status(&self, status: CampaignStatus) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM campaigns WHERE status = $1")
            .bind(status.as_str())
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn list_reviewed_since(&self, since: DateTime<Utc>) -> Result<Vec<Campaign>, StoreError> {
        let query = format!(
            r#"
            SELECT {} FROM campaigns
            WHERE status IN ('approved', 'rejected') AND reviewed_at >= $1
            ORDER BY reviewed_at ASC
            "#,
            CAMPAIGN_COLUMNS
        );
        let rows = sqlx::query_as::<_, CampaignRow>(&query)
            .bind(since)
            .fetch_all(&self.pool)
            .await?;
        campaigns_from_rows(rows)
    }

    async fn list_campaign_assets(
        &self,
        campaign_id: Uuid,
    ) -> Result<Vec<LinkedAsset>, StoreError> {
        let rows = sqlx::query_as::<_, LinkedAssetRow>(
            r#"
            SELECT ca.campaign_id, ca.asset_id, ca.asset_role, ca.display_order, ca.created_at,
                   a.id, a.owner_id, a.filename, a.storage_key, a.storage_url, a.file_type,
                   a.size_bytes, a.category, a.categorization_method, a.uploaded_at
            FROM campaign_assets ca
            JOIN assets a ON a.id = ca.asset_id
            WHERE ca.campaign_id = $1
            ORDER BY ca.display_order ASC NULLS LAST, ca.created_at ASC
            "#,
        )
        .bind(campaign_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(LinkedAsset {
                    link: row.link.into(),
                    asset: Asset::try_from(row.asset)?,
                })
            })
            .collect()
    }

    async fn attach_assets(
        &self,
        _campaign_id: Uuid,
        owner_id: Uuid,
        links: &[CampaignAsset],
    ) -> Result<usize, StoreError> {
        let mut tx = self.pool.begin().await?;
        let missing = foreign_assets(&mut tx, owner_id, links).await?;
        if !missing.is_empty() {
            tx.rollback().await?;
            return Err(StoreError::MissingAssets(missing));
        }
        let added = insert_links(&mut tx, links).await?;
        tx.commit().await?;
        Ok(added)
    }

    async fn update_campaign(
        &self,
        campaign: &Campaign,
        expected: CampaignStatus,
    ) -> Result<bool, StoreError> {
        let (proof_markup, proof_html) = match &campaign.proof {
            Some(proof) => (Some(proof.markup.as_str()), Some(proof.html.as_str())),
            None => (None, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE campaigns
            SET name = $3, target_audience = $4, goal = $5, notes = $6, status = $7,
                proof_markup = $8, proof_html = $9, reviewed_by = $10, reviewed_at = $11,
                rejection_reason = $12, updated_at = $13
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(campaign.id)
        .bind(expected.as_str())
        .bind(&campaign.name)
        .bind(&campaign.target_audience)
        .bind(&campaign.goal)
        .bind(&campaign.notes)
        .bind(campaign.status.as_str())
        .bind(proof_markup)
        .bind(proof_html)
        .bind(campaign.reviewed_by)
        .bind(campaign.reviewed_at)
        .bind(&campaign.rejection_reason)
        .bind(campaign.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn delete_campaign(
        &self,
        id: Uuid,
        expected: CampaignStatus,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM campaigns WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(expected.as_str())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn record_metric(&self, metric: &PerformanceMetric) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO performance_metrics (id, metric_type, metric_value, metadata, recorded_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(metric.id)
        .bind(&metric.metric_type)
        .bind(metric.metric_value)
        .bind(&metric.metadata)
        .bind(metric.recorded_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_metrics(
        &self,
        metric_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<PerformanceMetric>, StoreError> {
        let metrics = sqlx::query_as::<_, PerformanceMetric>(
            r#"
            SELECT id, metric_type, metric_value, metadata, recorded_at
            FROM performance_metrics
            WHERE metric_type = $1 AND recorded_at >= $2
            ORDER BY recorded_at ASC
            "#,
        )
        .bind(metric_type)
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        Ok(metrics)
    }

    async fn record_health_check(&self, check: &HealthCheck) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO system_health (id, component, status, response_time_ms, error_message, checked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(check.id)
        .bind(&check.component)
        .bind(check.status.as_str())
        .bind(check.response_time_ms)
        .bind(&check.error_message)
        .bind(check.checked_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_health_checks_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<HealthCheck>, StoreError> {
        let rows = sqlx::query_as::<_, HealthCheckRow>(
            r#"
            SELECT id, component, status, response_time_ms, error_message, checked_at
            FROM system_health
            WHERE checked_at >= $1
            ORDER BY checked_at ASC
            "#,
        )
        .bind(since)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(HealthCheck::try_from).collect()
    }
}
