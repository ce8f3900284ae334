use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::SyncError;
use crate::models::{LeadDraft, Platform};
use crate::normalize::{clean_email, clean_phone, clean_text, id_string, scalar_text};

/// Google Ads lead form submission as returned by the leads report
/// Documentation: https://developers.google.com/google-ads/api/docs/leads/download-leads
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GoogleLeadFormSubmission {
    /// Resource name of the submission (used for deduplication)
    #[serde(default)]
    pub resource_name: Option<Value>,

    /// Google Ads lead form ID
    #[serde(default)]
    pub lead_form_id: Option<Value>,

    /// Google Ads campaign ID
    #[serde(default)]
    pub campaign: Option<Value>,

    #[serde(default)]
    pub campaign_name: Option<String>,

    /// Google Ads ad ID
    #[serde(default)]
    pub ad: Option<Value>,

    /// Questions and answers submitted by the user
    pub custom_lead_form_fields: Vec<CustomLeadFormField>,

    #[serde(default)]
    pub created_at: Option<String>,
}

/// Individual form field data
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CustomLeadFormField {
    /// Question shown on the form (e.g., "Full Name", "Email")
    #[serde(default)]
    pub question_text: String,

    /// User-submitted value; phone answers sometimes arrive as numbers
    #[serde(default)]
    pub user_input: Option<Value>,
}

impl GoogleLeadFormSubmission {
    /// Answer to the first question whose text contains `needle`, ignoring case.
    pub fn get_field(&self, needle: &str) -> Option<String> {
        let needle = needle.to_lowercase();
        self.custom_lead_form_fields
            .iter()
            .find(|field| field.question_text.to_lowercase().contains(&needle))
            .and_then(|field| field.user_input.as_ref())
            .and_then(scalar_text)
    }

    pub fn get_name(&self) -> Option<String> {
        clean_text(self.get_field("name").as_deref())
    }

    pub fn get_email(&self) -> Option<String> {
        clean_email(self.get_field("email").as_deref())
    }

    pub fn get_phone(&self) -> Option<String> {
        clean_phone(self.get_field("phone").as_deref())
    }

    /// Builds the canonical draft. `raw` is kept verbatim as the payload.
    pub fn into_draft(self, raw: &Value) -> Result<LeadDraft, SyncError> {
        let provider_lead_id = id_string(self.resource_name.as_ref()).ok_or_else(|| {
            SyncError::Normalization("GOOGLE lead is missing resource_name".to_string())
        })?;

        let mut draft = LeadDraft::new(Platform::Google, provider_lead_id, raw.clone());
        draft.name = self.get_name();
        draft.email = self.get_email();
        draft.phone = self.get_phone();
        draft.campaign_id = id_string(self.campaign.as_ref());
        draft.campaign_name = clean_text(self.campaign_name.as_deref());
        draft.ad_id = id_string(self.ad.as_ref());
        draft.form_id = id_string(self.lead_form_id.as_ref());
        Ok(draft)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn submission(fields: Value) -> (Value, GoogleLeadFormSubmission) {
        let raw = json!({
            "resource_name": "customers/123/leadForms/1/leadFormSubmissionData/1",
            "lead_form_id": "form_google_123",
            "campaign": 456,
            "ad": "ad_google_123",
            "custom_lead_form_fields": fields
        });
        let parsed = serde_json::from_value(raw.clone()).unwrap();
        (raw, parsed)
    }

    #[test]
    fn test_extract_name() {
        let (_, payload) = submission(json!([
            { "question_text": "Full Name", "user_input": "Charlie Google" }
        ]));

        assert_eq!(payload.get_name(), Some("Charlie Google".to_string()));
    }

    #[test]
    fn test_extract_email() {
        let (_, payload) = submission(json!([
            { "question_text": "Your EMAIL address", "user_input": "  CHARLIE@EXAMPLE.COM  " }
        ]));

        assert_eq!(payload.get_email(), Some("charlie@example.com".to_string()));
    }

    #[test]
    fn test_first_matching_question_wins() {
        let (_, payload) = submission(json!([
            { "question_text": "Phone", "user_input": " +91-9000000003 " },
            { "question_text": "Work phone", "user_input": "+91-9000000099" }
        ]));

        assert_eq!(payload.get_phone(), Some("+91-9000000003".to_string()));
    }

    #[test]
    fn test_into_draft_maps_provenance() {
        let (raw, payload) = submission(json!([
            { "question_text": "Full Name", "user_input": "Diana Google" },
            { "question_text": "Phone", "user_input": "+91-9000000004" }
        ]));
        let draft = payload.into_draft(&raw).unwrap();

        assert_eq!(draft.platform, Platform::Google);
        assert_eq!(
            draft.provider_lead_id,
            "customers/123/leadForms/1/leadFormSubmissionData/1"
        );
        assert_eq!(draft.name.as_deref(), Some("Diana Google"));
        assert_eq!(draft.email, None);
        assert_eq!(draft.campaign_id.as_deref(), Some("456"));
        assert_eq!(draft.ad_id.as_deref(), Some("ad_google_123"));
        assert_eq!(draft.form_id.as_deref(), Some("form_google_123"));
    }

    #[test]
    fn test_numeric_answer_and_unlabelled_entry_are_tolerated() {
        let (raw, payload) = submission(json!([
            { "user_input": "no question attached" },
            { "question_text": "Full Name", "user_input": "Eve Google" },
            { "question_text": "Phone", "user_input": 919000000001u64 },
            { "question_text": "Email", "user_input": null }
        ]));

        assert_eq!(payload.get_phone(), Some("919000000001".to_string()));
        let draft = payload.into_draft(&raw).unwrap();
        assert_eq!(draft.name.as_deref(), Some("Eve Google"));
        assert_eq!(draft.phone.as_deref(), Some("919000000001"));
        assert_eq!(draft.email, None);
    }

    #[test]
    fn test_missing_resource_name_is_rejected() {
        let raw = json!({ "custom_lead_form_fields": [] });
        let payload: GoogleLeadFormSubmission = serde_json::from_value(raw.clone()).unwrap();
        assert!(matches!(
            payload.into_draft(&raw),
            Err(SyncError::Normalization(_))
        ));
    }
}
