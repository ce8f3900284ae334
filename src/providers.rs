use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

use crate::errors::SyncError;
use crate::google_ads_models::GoogleLeadFormSubmission;
use crate::meta_models::MetaLead;
use crate::models::{LeadDraft, Platform};

/// Body shape every provider endpoint returns.
#[derive(Debug, Deserialize)]
struct RawBatch {
    /// Absent and `null` both mean an empty batch.
    #[serde(default)]
    leads: Option<Vec<Value>>,
}

/// Fetches and normalizes leads for one advertising platform.
///
/// Normalization is selected by `platform`; supporting a new platform means
/// adding a variant, its raw model and one match arm below.
#[derive(Clone, Debug)]
pub struct ProviderAdapter {
    platform: Platform,
    client: reqwest::Client,
    url: String,
}

impl ProviderAdapter {
    /// Creates an adapter whose fetches give up after `timeout`.
    pub fn new(platform: Platform, url: String, timeout: Duration) -> Result<Self, SyncError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                SyncError::Fetch(format!("Failed to create {} client: {}", platform, e))
            })?;

        Ok(Self::with_client(platform, url, client))
    }

    /// Creates an adapter that shares an existing HTTP client.
    pub fn with_client(platform: Platform, url: String, client: reqwest::Client) -> Self {
        Self {
            platform,
            client,
            url,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    /// Fetches the current batch of provider-native lead objects.
    ///
    /// Transport errors, timeouts, non-success statuses and bodies that are
    /// not `{ "leads": [...] }` all surface as `SyncError::Fetch`.
    pub async fn fetch_raw(&self) -> Result<Vec<Value>, SyncError> {
        tracing::debug!("Fetching {} leads from {}", self.platform, self.url);

        let response = self
            .client
            .get(&self.url)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SyncError::Fetch(format!("{} fetch timed out: {}", self.platform, e))
                } else {
                    SyncError::Fetch(format!("{} fetch failed: {}", self.platform, e))
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SyncError::Fetch(format!(
                "{} fetch failed: {} {}",
                self.platform,
                status.as_u16(),
                error_text.trim()
            )));
        }

        let batch: RawBatch = response.json().await.map_err(|e| {
            SyncError::Fetch(format!(
                "Failed to parse {} response: {}",
                self.platform, e
            ))
        })?;

        let leads = batch.leads.unwrap_or_default();
        tracing::debug!("Fetched {} raw {} leads", leads.len(), self.platform);
        Ok(leads)
    }

    /// Turns one raw provider object into a canonical draft.
    ///
    /// Missing contact or provenance fields resolve to `None`; only a missing
    /// identifier or a missing/malformed field collection is an error.
    pub fn normalize(&self, raw: &Value) -> Result<LeadDraft, SyncError> {
        normalize(self.platform, raw)
    }
}

/// Platform-dispatched normalization, usable without an adapter.
pub fn normalize(platform: Platform, raw: &Value) -> Result<LeadDraft, SyncError> {
    if !raw.is_object() {
        return Err(SyncError::Normalization(format!(
            "{} lead is not a JSON object",
            platform
        )));
    }

    match platform {
        Platform::Meta => MetaLead::deserialize(raw)
            .map_err(|e| SyncError::Normalization(format!("Malformed META lead: {}", e)))?
            .into_draft(raw),
        Platform::Google => GoogleLeadFormSubmission::deserialize(raw)
            .map_err(|e| SyncError::Normalization(format!("Malformed GOOGLE lead: {}", e)))?
            .into_draft(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_non_object_is_normalization_error() {
        assert!(matches!(
            normalize(Platform::Meta, &json!("nope")),
            Err(SyncError::Normalization(_))
        ));
        assert!(matches!(
            normalize(Platform::Google, &json!([1, 2])),
            Err(SyncError::Normalization(_))
        ));
    }

    #[test]
    fn test_missing_collection_is_normalization_error() {
        assert!(matches!(
            normalize(Platform::Meta, &json!({ "leadgen_id": "1" })),
            Err(SyncError::Normalization(_))
        ));
        assert!(matches!(
            normalize(
                Platform::Google,
                &json!({ "resource_name": "r/1", "custom_lead_form_fields": "oops" })
            ),
            Err(SyncError::Normalization(_))
        ));
    }

    #[test]
    fn test_dispatches_on_platform() {
        let raw = json!({
            "leadgen_id": "META_9",
            "field_data": [{ "name": "email", "values": ["X@Y.COM"] }]
        });
        let draft = normalize(Platform::Meta, &raw).unwrap();
        assert_eq!(draft.platform, Platform::Meta);
        assert_eq!(draft.email.as_deref(), Some("x@y.com"));

        // A META-shaped object is not a valid GOOGLE submission.
        assert!(normalize(Platform::Google, &raw).is_err());
    }
}
