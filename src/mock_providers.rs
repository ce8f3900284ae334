//! Simulated provider feeds for local development.
//!
//! Identifiers are stable, so repeated syncs against these feeds exercise
//! the refresh path instead of creating new leads every time.

use axum::{routing::get, Json, Router};
use chrono::Utc;
use serde_json::{json, Value};

pub fn meta_feed() -> Value {
    let created_time = Utc::now().to_rfc3339();
    json!({
        "leads": [
            {
                "leadgen_id": "META_1001",
                "field_data": [
                    { "name": "full_name", "values": ["Alice Meta"] },
                    { "name": "email", "values": ["alice.meta@example.com"] },
                    { "name": "phone_number", "values": ["+91-9000000001"] }
                ],
                "ad_id": "ad_meta_123",
                "campaign_id": "cmp_meta_123",
                "form_id": "form_meta_123",
                "created_time": created_time
            },
            {
                "leadgen_id": "META_1002",
                "field_data": [
                    { "name": "full_name", "values": ["Bob Meta"] },
                    { "name": "email", "values": ["bob.meta@example.com"] },
                    { "name": "phone_number", "values": ["+91-9000000002"] }
                ],
                "ad_id": "ad_meta_456",
                "campaign_id": "cmp_meta_456",
                "form_id": "form_meta_456",
                "created_time": created_time
            }
        ]
    })
}

pub fn google_feed() -> Value {
    let created_at = Utc::now().to_rfc3339();
    json!({
        "leads": [
            {
                "resource_name": "customers/123/leadForms/1/leadFormSubmissionData/1",
                "lead_form_id": "form_google_123",
                "campaign": "cmp_google_123",
                "ad": "ad_google_123",
                "custom_lead_form_fields": [
                    { "question_text": "Full Name", "user_input": "Charlie Google" },
                    { "question_text": "Email", "user_input": "charlie.google@example.com" },
                    { "question_text": "Phone", "user_input": "+91-9000000003" }
                ],
                "created_at": created_at
            },
            {
                "resource_name": "customers/123/leadForms/1/leadFormSubmissionData/2",
                "lead_form_id": "form_google_456",
                "campaign": "cmp_google_456",
                "ad": "ad_google_456",
                "custom_lead_form_fields": [
                    { "question_text": "Full Name", "user_input": "Diana Google" },
                    { "question_text": "Email", "user_input": "diana.google@example.com" },
                    { "question_text": "Phone", "user_input": "+91-9000000004" }
                ],
                "created_at": created_at
            }
        ]
    })
}

/// `GET /mock/meta/leads` and `GET /mock/google/leads`.
pub fn routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/mock/meta/leads", get(|| async { Json(meta_feed()) }))
        .route("/mock/google/leads", get(|| async { Json(google_feed()) }))
}
