use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::{ContactField, StoreError};
use crate::models::{
    CanonicalLead, LeadDraft, LeadPage, LeadQuery, NewSyncRun, Platform, SyncRun, SyncStatus,
};
use crate::store::LeadStore;

const LEAD_COLUMNS: &str = "id, platform, provider_lead_id, name, email, phone, campaign_id, \
     campaign_name, ad_id, form_id, raw_payload, created_at, updated_at";

const SYNC_RUN_COLUMNS: &str = "id, platform, fetched_count, imported_count, started_at, \
     finished_at, status, notes, created_at";

#[derive(Debug, sqlx::FromRow)]
struct LeadRow {
    id: Uuid,
    platform: String,
    provider_lead_id: String,
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    campaign_id: Option<String>,
    campaign_name: Option<String>,
    ad_id: Option<String>,
    form_id: Option<String>,
    raw_payload: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LeadRow> for CanonicalLead {
    type Error = StoreError;

    fn try_from(row: LeadRow) -> Result<Self, Self::Error> {
        Ok(CanonicalLead {
            id: row.id,
            platform: parse_platform(&row.platform)?,
            provider_lead_id: row.provider_lead_id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            campaign_id: row.campaign_id,
            campaign_name: row.campaign_name,
            ad_id: row.ad_id,
            form_id: row.form_id,
            raw_payload: row.raw_payload,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SyncRunRow {
    id: Uuid,
    platform: String,
    fetched_count: i64,
    imported_count: i64,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    status: String,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<SyncRunRow> for SyncRun {
    type Error = StoreError;

    fn try_from(row: SyncRunRow) -> Result<Self, Self::Error> {
        Ok(SyncRun {
            id: row.id,
            platform: parse_platform(&row.platform)?,
            fetched_count: to_count(row.fetched_count)?,
            imported_count: to_count(row.imported_count)?,
            started_at: row.started_at,
            finished_at: row.finished_at,
            status: row
                .status
                .parse::<SyncStatus>()
                .map_err(StoreError::Persistence)?,
            notes: row.notes,
            created_at: row.created_at,
        })
    }
}

fn parse_platform(value: &str) -> Result<Platform, StoreError> {
    value
        .parse()
        .map_err(|e: crate::models::UnknownPlatform| StoreError::Persistence(e.to_string()))
}

fn to_count(value: i64) -> Result<u64, StoreError> {
    u64::try_from(value)
        .map_err(|_| StoreError::Persistence(format!("negative count in sync_runs: {}", value)))
}

fn to_db_count(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value)
        .map_err(|_| StoreError::Persistence(format!("count out of range: {}", value)))
}

/// Translates unique violations into the store's constraint errors.
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            match db_err.constraint() {
                Some("leads_platform_provider_lead_id_key") => {
                    return StoreError::DuplicateIdentity
                }
                Some("leads_email_key") => return StoreError::ContactConflict(ContactField::Email),
                Some("leads_phone_key") => return StoreError::ContactConflict(ContactField::Phone),
                _ => {}
            }
        }
    }
    StoreError::Database(err)
}

/// PostgreSQL-backed lead and sync-run storage.
///
/// Uniqueness is enforced by the `leads_*_key` constraints in
/// `migrations/0001_init.sql`; every method is a single statement.
#[derive(Clone)]
pub struct PgLeadStore {
    pool: PgPool,
}

impl PgLeadStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LeadStore for PgLeadStore {
    async fn insert_lead(&self, draft: &LeadDraft) -> Result<CanonicalLead, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO leads (
                id, platform, provider_lead_id, name, email, phone,
                campaign_id, campaign_name, ad_id, form_id, raw_payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {}
            "#,
            LEAD_COLUMNS
        );

        let row: LeadRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(draft.platform.as_str())
            .bind(&draft.provider_lead_id)
            .bind(&draft.name)
            .bind(&draft.email)
            .bind(&draft.phone)
            .bind(&draft.campaign_id)
            .bind(&draft.campaign_name)
            .bind(&draft.ad_id)
            .bind(&draft.form_id)
            .bind(&draft.raw_payload)
            .fetch_one(&self.pool)
            .await
            .map_err(map_write_error)?;

        row.try_into()
    }

    async fn update_lead(&self, draft: &LeadDraft) -> Result<Option<CanonicalLead>, StoreError> {
        let sql = format!(
            r#"
            UPDATE leads
            SET name = COALESCE($3, name),
                phone = COALESCE($4, phone),
                campaign_id = COALESCE($5, campaign_id),
                campaign_name = COALESCE($6, campaign_name),
                ad_id = COALESCE($7, ad_id),
                form_id = COALESCE($8, form_id),
                raw_payload = $9,
                updated_at = GREATEST(now(), updated_at)
            WHERE platform = $1 AND provider_lead_id = $2
            RETURNING {}
            "#,
            LEAD_COLUMNS
        );

        let row: Option<LeadRow> = sqlx::query_as(&sql)
            .bind(draft.platform.as_str())
            .bind(&draft.provider_lead_id)
            .bind(&draft.name)
            .bind(&draft.phone)
            .bind(&draft.campaign_id)
            .bind(&draft.campaign_name)
            .bind(&draft.ad_id)
            .bind(&draft.form_id)
            .bind(&draft.raw_payload)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_write_error)?;

        row.map(CanonicalLead::try_from).transpose()
    }

    async fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, StoreError> {
        let platform = query.platform.map(|p| p.as_str());

        let sql = format!(
            r#"
            SELECT {}
            FROM leads
            WHERE ($1::text IS NULL OR platform = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
            LEAD_COLUMNS
        );

        let rows: Vec<LeadRow> = sqlx::query_as(&sql)
            .bind(platform)
            .bind(i64::from(query.limit()))
            .bind(to_db_count(query.offset())?)
            .fetch_all(&self.pool)
            .await?;

        let items = rows
            .into_iter()
            .map(CanonicalLead::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(LeadPage {
            items,
            total: self.count_leads(query.platform).await?,
            page: query.page(),
            limit: query.limit(),
        })
    }

    async fn count_leads(&self, platform: Option<Platform>) -> Result<u64, StoreError> {
        let (total,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM leads WHERE ($1::text IS NULL OR platform = $1)")
                .bind(platform.map(|p| p.as_str()))
                .fetch_one(&self.pool)
                .await?;

        to_count(total)
    }

    async fn record_sync_run(&self, run: &NewSyncRun) -> Result<SyncRun, StoreError> {
        let sql = format!(
            r#"
            INSERT INTO sync_runs (
                id, platform, fetched_count, imported_count,
                started_at, finished_at, status, notes
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {}
            "#,
            SYNC_RUN_COLUMNS
        );

        let row: SyncRunRow = sqlx::query_as(&sql)
            .bind(Uuid::new_v4())
            .bind(run.platform.as_str())
            .bind(to_db_count(run.fetched_count)?)
            .bind(to_db_count(run.imported_count)?)
            .bind(run.started_at)
            .bind(run.finished_at)
            .bind(run.status.as_str())
            .bind(&run.notes)
            .fetch_one(&self.pool)
            .await?;

        row.try_into()
    }

    async fn recent_sync_runs(
        &self,
        limit: u32,
        platform: Option<Platform>,
    ) -> Result<Vec<SyncRun>, StoreError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM sync_runs
            WHERE ($1::text IS NULL OR platform = $1)
            ORDER BY created_at DESC, id DESC
            LIMIT $2
            "#,
            SYNC_RUN_COLUMNS
        );

        let rows: Vec<SyncRunRow> = sqlx::query_as(&sql)
            .bind(platform.map(|p| p.as_str()))
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(SyncRun::try_from).collect()
    }
}
