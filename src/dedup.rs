//! Identity & dedup engine.
//!
//! Turns a normalized draft into exactly one stored lead. The write is a
//! blind insert; the store's unique constraints decide, and conflicts are
//! recovered here:
//!
//! - `DuplicateIdentity`: the identity already exists (or a concurrent
//!   writer just created it), so the draft is applied as an update.
//! - `ContactConflict`: the email or phone belongs to a different identity.
//!   `(platform, provider_lead_id)` takes precedence, so the contested field
//!   is dropped from the draft and the write is retried.

use std::sync::Arc;

use crate::errors::{ContactField, StoreError};
use crate::models::{CanonicalLead, LeadDraft};
use crate::store::LeadStore;

/// Upper bound on write attempts for one draft.
const MAX_ATTEMPTS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct UpsertOutcome {
    /// True only when this call inserted a new identity.
    pub created: bool,
    pub lead: CanonicalLead,
}

#[derive(Clone)]
pub struct DedupEngine {
    store: Arc<dyn LeadStore>,
}

impl DedupEngine {
    pub fn new(store: Arc<dyn LeadStore>) -> Self {
        Self { store }
    }

    /// Creates the lead if its identity is new, otherwise refreshes it.
    ///
    /// Only errors other than constraint conflicts are returned; they are
    /// persistence failures for the caller to account for.
    pub async fn upsert(&self, draft: LeadDraft) -> Result<UpsertOutcome, StoreError> {
        let mut draft = draft;

        for attempt in 1..=MAX_ATTEMPTS {
            match self.store.insert_lead(&draft).await {
                Ok(lead) => {
                    return Ok(UpsertOutcome {
                        created: true,
                        lead,
                    })
                }
                Err(StoreError::DuplicateIdentity) => {
                    tracing::debug!(
                        "Lead {}/{} already stored, refreshing (attempt {})",
                        draft.platform,
                        draft.provider_lead_id,
                        attempt
                    );
                    match self.store.update_lead(&draft).await {
                        Ok(Some(lead)) => {
                            return Ok(UpsertOutcome {
                                created: false,
                                lead,
                            })
                        }
                        // The row vanished between insert and update; try again.
                        Ok(None) => continue,
                        Err(StoreError::ContactConflict(field)) => {
                            release_contact(&mut draft, field);
                        }
                        Err(e) => return Err(e),
                    }
                }
                Err(StoreError::ContactConflict(field)) => {
                    release_contact(&mut draft, field);
                }
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::Persistence(format!(
            "gave up writing lead {}/{} after {} attempts",
            draft.platform, draft.provider_lead_id, MAX_ATTEMPTS
        )))
    }
}

/// Drops a contact value another identity already owns.
fn release_contact(draft: &mut LeadDraft, field: ContactField) {
    let value = match field {
        ContactField::Email => draft.email.take(),
        ContactField::Phone => draft.phone.take(),
    };
    tracing::warn!(
        "{} {:?} of lead {}/{} belongs to another lead; storing without it",
        field,
        value,
        draft.platform,
        draft.provider_lead_id
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_store::InMemoryLeadStore;
    use crate::models::Platform;
    use serde_json::json;

    fn engine() -> (Arc<InMemoryLeadStore>, DedupEngine) {
        let store = Arc::new(InMemoryLeadStore::new());
        (store.clone(), DedupEngine::new(store))
    }

    fn draft(platform: Platform, id: &str, email: Option<&str>, phone: Option<&str>) -> LeadDraft {
        let mut draft = LeadDraft::new(platform, id, json!({ "id": id }));
        draft.email = email.map(str::to_string);
        draft.phone = phone.map(str::to_string);
        draft
    }

    #[tokio::test]
    async fn test_first_sighting_creates_second_refreshes() {
        let (store, engine) = engine();

        let first = engine
            .upsert(draft(Platform::Meta, "1", Some("a@x.com"), Some("+1")))
            .await
            .unwrap();
        assert!(first.created);

        let mut again = draft(Platform::Meta, "1", Some("a@x.com"), Some("+1"));
        again.name = Some("Alice".into());
        let second = engine.upsert(again).await.unwrap();
        assert!(!second.created);
        assert_eq!(second.lead.id, first.lead.id);
        assert_eq!(second.lead.name.as_deref(), Some("Alice"));
        assert_eq!(store.count_leads(None).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_missing_email_is_stored_as_null() {
        let (store, engine) = engine();

        let outcome = engine
            .upsert(draft(Platform::Google, "g1", None, None))
            .await
            .unwrap();
        assert!(outcome.created);
        assert_eq!(outcome.lead.email, None);

        // A second email-less lead is a distinct identity, not a collision.
        let outcome = engine
            .upsert(draft(Platform::Google, "g2", None, None))
            .await
            .unwrap();
        assert!(outcome.created);
        assert_eq!(store.count_leads(None).await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_contact_collision_keeps_identity_and_drops_field() {
        let (store, engine) = engine();

        engine
            .upsert(draft(Platform::Meta, "m1", Some("shared@x.com"), Some("+1")))
            .await
            .unwrap();
        let outcome = engine
            .upsert(draft(Platform::Google, "g1", Some("shared@x.com"), Some("+1")))
            .await
            .unwrap();

        assert!(outcome.created);
        assert_eq!(outcome.lead.email, None);
        assert_eq!(outcome.lead.phone, None);

        let leads = store.snapshot().unwrap();
        assert_eq!(leads.len(), 2);
        assert_eq!(leads[0].email.as_deref(), Some("shared@x.com"));
        assert_eq!(leads[0].phone.as_deref(), Some("+1"));
    }

    #[tokio::test]
    async fn test_refresh_with_contested_phone_keeps_old_phone() {
        let (_store, engine) = engine();

        engine
            .upsert(draft(Platform::Meta, "m1", None, Some("+1")))
            .await
            .unwrap();
        engine
            .upsert(draft(Platform::Meta, "m2", None, Some("+2")))
            .await
            .unwrap();

        let outcome = engine
            .upsert(draft(Platform::Meta, "m2", None, Some("+1")))
            .await
            .unwrap();
        assert!(!outcome.created);
        assert_eq!(outcome.lead.phone.as_deref(), Some("+2"));
    }

    #[tokio::test]
    async fn test_concurrent_upserts_create_exactly_once() {
        let (store, engine) = engine();

        let mut handles = vec![];
        for _ in 0..16 {
            let engine = engine.clone();
            handles.push(tokio::spawn(async move {
                engine
                    .upsert(draft(Platform::Meta, "race", Some("r@x.com"), Some("+9")))
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            let outcome = handle.await.unwrap().unwrap();
            if outcome.created {
                created += 1;
            }
        }

        assert_eq!(created, 1);
        assert_eq!(store.count_leads(None).await.unwrap(), 1);
    }

    /// Store whose writes never settle, to exhaust the retry budget.
    struct UnsettledStore {
        insert_error: fn() -> StoreError,
        inserts: std::sync::atomic::AtomicUsize,
        inner: InMemoryLeadStore,
    }

    impl UnsettledStore {
        fn new(insert_error: fn() -> StoreError) -> Self {
            Self {
                insert_error,
                inserts: Default::default(),
                inner: InMemoryLeadStore::new(),
            }
        }

        fn inserts(&self) -> usize {
            self.inserts.load(std::sync::atomic::Ordering::SeqCst)
        }
    }

    #[async_trait::async_trait]
    impl LeadStore for UnsettledStore {
        async fn insert_lead(&self, _draft: &LeadDraft) -> Result<CanonicalLead, StoreError> {
            self.inserts
                .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            Err((self.insert_error)())
        }

        async fn update_lead(
            &self,
            _draft: &LeadDraft,
        ) -> Result<Option<CanonicalLead>, StoreError> {
            // The identity vanished again.
            Ok(None)
        }

        async fn list_leads(
            &self,
            query: &crate::models::LeadQuery,
        ) -> Result<crate::models::LeadPage, StoreError> {
            self.inner.list_leads(query).await
        }

        async fn count_leads(&self, platform: Option<Platform>) -> Result<u64, StoreError> {
            self.inner.count_leads(platform).await
        }

        async fn record_sync_run(
            &self,
            run: &crate::models::NewSyncRun,
        ) -> Result<crate::models::SyncRun, StoreError> {
            self.inner.record_sync_run(run).await
        }

        async fn recent_sync_runs(
            &self,
            limit: u32,
            platform: Option<Platform>,
        ) -> Result<Vec<crate::models::SyncRun>, StoreError> {
            self.inner.recent_sync_runs(limit, platform).await
        }
    }

    #[tokio::test]
    async fn test_endless_contact_conflicts_give_up_after_max_attempts() {
        let store = Arc::new(UnsettledStore::new(|| {
            StoreError::ContactConflict(ContactField::Email)
        }));
        let engine = DedupEngine::new(store.clone());

        let result = engine
            .upsert(draft(Platform::Meta, "m1", Some("a@x.com"), Some("+1")))
            .await;

        match result {
            Err(StoreError::Persistence(msg)) => assert!(msg.contains("gave up")),
            other => panic!("expected persistence error, got {:?}", other),
        }
        assert_eq!(store.inserts(), MAX_ATTEMPTS);
    }

    #[tokio::test]
    async fn test_vanishing_identity_gives_up_after_max_attempts() {
        let store = Arc::new(UnsettledStore::new(|| StoreError::DuplicateIdentity));
        let engine = DedupEngine::new(store.clone());

        let result = engine
            .upsert(draft(Platform::Google, "g1", None, None))
            .await;

        assert!(matches!(result, Err(StoreError::Persistence(_))));
        assert_eq!(store.inserts(), MAX_ATTEMPTS);
    }
}
