use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SyncError;
use crate::models::{LeadDraft, Platform};
use crate::normalize::{clean_email, clean_phone, clean_text, id_string, scalar_text};

/// Meta Lead Ads lead as returned by the leadgen endpoint.
/// Documentation: https://developers.facebook.com/docs/marketing-api/guides/lead-ads/retrieving
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetaLead {
    /// Unique lead identifier (used for deduplication)
    #[serde(default)]
    pub leadgen_id: Option<Value>,

    /// Submitted form answers
    pub field_data: Vec<MetaFieldData>,

    #[serde(default)]
    pub ad_id: Option<Value>,

    #[serde(default)]
    pub campaign_id: Option<Value>,

    #[serde(default)]
    pub campaign_name: Option<String>,

    #[serde(default)]
    pub form_id: Option<Value>,

    #[serde(default)]
    pub created_time: Option<String>,
}

/// One answered question, e.g. `{"name": "email", "values": ["a@b.com"]}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MetaFieldData {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub values: Vec<Value>,
}

impl MetaLead {
    /// First value of the field whose name matches exactly.
    pub fn field(&self, name: &str) -> Option<String> {
        self.field_data
            .iter()
            .find(|field| field.name == name)
            .and_then(|field| field.values.first())
            .and_then(scalar_text)
    }

    pub fn get_name(&self) -> Option<String> {
        clean_text(self.field("full_name").as_deref())
    }

    pub fn get_email(&self) -> Option<String> {
        clean_email(self.field("email").as_deref())
    }

    pub fn get_phone(&self) -> Option<String> {
        clean_phone(self.field("phone_number").as_deref())
    }

    /// Builds the canonical draft. `raw` is kept verbatim as the payload.
    pub fn into_draft(self, raw: &Value) -> Result<LeadDraft, SyncError> {
        let provider_lead_id = id_string(self.leadgen_id.as_ref()).ok_or_else(|| {
            SyncError::Normalization("META lead is missing leadgen_id".to_string())
        })?;

        let mut draft = LeadDraft::new(Platform::Meta, provider_lead_id, raw.clone());
        draft.name = self.get_name();
        draft.email = self.get_email();
        draft.phone = self.get_phone();
        draft.campaign_id = id_string(self.campaign_id.as_ref());
        draft.campaign_name = clean_text(self.campaign_name.as_deref());
        draft.ad_id = id_string(self.ad_id.as_ref());
        draft.form_id = id_string(self.form_id.as_ref());
        Ok(draft)
    }
}
