//! Persistence surface for leads and sync audit entries.
//!
//! Implementations must enforce, at write time:
//!
//! - `(platform, provider_lead_id)` is unique ([`StoreError::DuplicateIdentity`]),
//! - a non-null `email` is unique across all leads,
//! - a non-null `phone` is unique across all leads
//!   (both reported as [`StoreError::ContactConflict`]).
//!
//! Each call is a single atomic write; callers build upsert semantics on top
//! (see [`crate::dedup::DedupEngine`]).

use async_trait::async_trait;

use crate::errors::StoreError;
use crate::models::{CanonicalLead, LeadDraft, LeadPage, LeadQuery, NewSyncRun, Platform, SyncRun};

#[async_trait]
pub trait LeadStore: Send + Sync {
    /// Inserts a brand-new lead. Never overwrites an existing row.
    async fn insert_lead(&self, draft: &LeadDraft) -> Result<CanonicalLead, StoreError>;

    /// Refreshes the mutable fields of the lead with the draft's identity.
    ///
    /// `name`, `phone` and provenance keep their stored value when the draft
    /// has none; `raw_payload` is always replaced and `email` is never
    /// rewritten. Returns `Ok(None)` when no such lead exists.
    async fn update_lead(&self, draft: &LeadDraft) -> Result<Option<CanonicalLead>, StoreError>;

    /// Most recently created leads first.
    async fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, StoreError>;

    async fn count_leads(&self, platform: Option<Platform>) -> Result<u64, StoreError>;

    /// Appends an audit entry. Entries are never updated afterwards.
    async fn record_sync_run(&self, run: &NewSyncRun) -> Result<SyncRun, StoreError>;

    /// Most recent audit entries first, at most `limit` of them.
    async fn recent_sync_runs(
        &self,
        limit: u32,
        platform: Option<Platform>,
    ) -> Result<Vec<SyncRun>, StoreError>;
}
