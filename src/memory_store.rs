//! In-memory [`LeadStore`] for tests and database-less local runs.
//!
//! All state sits behind one `RwLock`, so each write is a single critical
//! section and the three uniqueness constraints are checked and applied
//! atomically. Nothing is persisted across restarts.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::errors::{ContactField, StoreError};
use crate::models::{CanonicalLead, LeadDraft, LeadPage, LeadQuery, NewSyncRun, Platform, SyncRun};
use crate::store::LeadStore;

#[derive(Debug, Default)]
struct State {
    /// Insertion order doubles as creation order.
    leads: Vec<CanonicalLead>,
    by_identity: HashMap<(Platform, String), usize>,
    by_email: HashMap<String, usize>,
    by_phone: HashMap<String, usize>,
    runs: Vec<SyncRun>,
}

impl State {
    fn contact_owner(&self, field: ContactField, value: &str) -> Option<usize> {
        match field {
            ContactField::Email => self.by_email.get(value).copied(),
            ContactField::Phone => self.by_phone.get(value).copied(),
        }
    }
}

#[derive(Debug, Default)]
pub struct InMemoryLeadStore {
    state: RwLock<State>,
}

fn poison_err<T>(_: PoisonError<T>) -> StoreError {
    StoreError::Persistence("lock poisoned".to_string())
}

impl InMemoryLeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored lead, oldest first.
    pub fn snapshot(&self) -> Result<Vec<CanonicalLead>, StoreError> {
        Ok(self.state.read().map_err(poison_err)?.leads.clone())
    }
}

#[async_trait]
impl LeadStore for InMemoryLeadStore {
    async fn insert_lead(&self, draft: &LeadDraft) -> Result<CanonicalLead, StoreError> {
        let mut state = self.state.write().map_err(poison_err)?;

        let key = (draft.platform, draft.provider_lead_id.clone());
        if state.by_identity.contains_key(&key) {
            return Err(StoreError::DuplicateIdentity);
        }
        if let Some(email) = &draft.email {
            if state.contact_owner(ContactField::Email, email).is_some() {
                return Err(StoreError::ContactConflict(ContactField::Email));
            }
        }
        if let Some(phone) = &draft.phone {
            if state.contact_owner(ContactField::Phone, phone).is_some() {
                return Err(StoreError::ContactConflict(ContactField::Phone));
            }
        }

        let now = Utc::now();
        let lead = CanonicalLead {
            id: Uuid::new_v4(),
            platform: draft.platform,
            provider_lead_id: draft.provider_lead_id.clone(),
            name: draft.name.clone(),
            email: draft.email.clone(),
            phone: draft.phone.clone(),
            campaign_id: draft.campaign_id.clone(),
            campaign_name: draft.campaign_name.clone(),
            ad_id: draft.ad_id.clone(),
            form_id: draft.form_id.clone(),
            raw_payload: draft.raw_payload.clone(),
            created_at: now,
            updated_at: now,
        };

        let idx = state.leads.len();
        state.by_identity.insert(key, idx);
        if let Some(email) = &lead.email {
            state.by_email.insert(email.clone(), idx);
        }
        if let Some(phone) = &lead.phone {
            state.by_phone.insert(phone.clone(), idx);
        }
        state.leads.push(lead.clone());

        Ok(lead)
    }

    async fn update_lead(&self, draft: &LeadDraft) -> Result<Option<CanonicalLead>, StoreError> {
        let mut state = self.state.write().map_err(poison_err)?;

        let key = (draft.platform, draft.provider_lead_id.clone());
        let Some(idx) = state.by_identity.get(&key).copied() else {
            return Ok(None);
        };

        if let Some(phone) = &draft.phone {
            if matches!(state.contact_owner(ContactField::Phone, phone), Some(owner) if owner != idx)
            {
                return Err(StoreError::ContactConflict(ContactField::Phone));
            }
        }

        let old_phone = state.leads[idx].phone.clone();
        {
            let lead = &mut state.leads[idx];
            if draft.name.is_some() {
                lead.name = draft.name.clone();
            }
            if draft.phone.is_some() {
                lead.phone = draft.phone.clone();
            }
            if draft.campaign_id.is_some() {
                lead.campaign_id = draft.campaign_id.clone();
            }
            if draft.campaign_name.is_some() {
                lead.campaign_name = draft.campaign_name.clone();
            }
            if draft.ad_id.is_some() {
                lead.ad_id = draft.ad_id.clone();
            }
            if draft.form_id.is_some() {
                lead.form_id = draft.form_id.clone();
            }
            lead.raw_payload = draft.raw_payload.clone();
            lead.updated_at = Utc::now().max(lead.updated_at);
        }

        let new_phone = state.leads[idx].phone.clone();
        if old_phone != new_phone {
            if let Some(old) = old_phone {
                state.by_phone.remove(&old);
            }
            if let Some(new) = new_phone {
                state.by_phone.insert(new, idx);
            }
        }

        Ok(Some(state.leads[idx].clone()))
    }

    async fn list_leads(&self, query: &LeadQuery) -> Result<LeadPage, StoreError> {
        let state = self.state.read().map_err(poison_err)?;

        let matching: Vec<&CanonicalLead> = state
            .leads
            .iter()
            .rev()
            .filter(|lead| query.platform.map_or(true, |p| lead.platform == p))
            .collect();

        let items = matching
            .iter()
            .skip(query.offset() as usize)
            .take(query.limit() as usize)
            .map(|lead| (*lead).clone())
            .collect();

        Ok(LeadPage {
            items,
            total: matching.len() as u64,
            page: query.page(),
            limit: query.limit(),
        })
    }

    async fn count_leads(&self, platform: Option<Platform>) -> Result<u64, StoreError> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state
            .leads
            .iter()
            .filter(|lead| platform.map_or(true, |p| lead.platform == p))
            .count() as u64)
    }

    async fn record_sync_run(&self, run: &NewSyncRun) -> Result<SyncRun, StoreError> {
        if run.imported_count > run.fetched_count {
            return Err(StoreError::Persistence(format!(
                "imported count {} exceeds fetched count {}",
                run.imported_count, run.fetched_count
            )));
        }

        let mut state = self.state.write().map_err(poison_err)?;
        let stored = SyncRun {
            id: Uuid::new_v4(),
            platform: run.platform,
            fetched_count: run.fetched_count,
            imported_count: run.imported_count,
            started_at: run.started_at,
            finished_at: run.finished_at,
            status: run.status,
            notes: run.notes.clone(),
            created_at: Utc::now(),
        };
        state.runs.push(stored.clone());
        Ok(stored)
    }

    async fn recent_sync_runs(
        &self,
        limit: u32,
        platform: Option<Platform>,
    ) -> Result<Vec<SyncRun>, StoreError> {
        let state = self.state.read().map_err(poison_err)?;
        Ok(state
            .runs
            .iter()
            .rev()
            .filter(|run| platform.map_or(true, |p| run.platform == p))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}
