use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use std::fmt;

/// Contact field that carries a collection-wide uniqueness constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    Email,
    Phone,
}

impl fmt::Display for ContactField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContactField::Email => f.write_str("email"),
            ContactField::Phone => f.write_str("phone"),
        }
    }
}

/// Failures of one adapter step (fetch or normalize).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SyncError {
    /// Network failure, timeout, non-success status or unreadable batch.
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// A single raw item is structurally unusable.
    #[error("normalization failed: {0}")]
    Normalization(String),
}

/// Failures reported by a `LeadStore`.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// `(platform, provider_lead_id)` is already taken.
    #[error("a lead with this platform and provider id already exists")]
    DuplicateIdentity,

    /// The email or phone already belongs to a different lead.
    #[error("{0} already belongs to another lead")]
    ContactConflict(ContactField),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Application-specific error types.
#[derive(Debug)]
pub enum AppError {
    /// Database-related errors.
    DatabaseError(sqlx::Error),
    /// Bad request error (invalid input).
    BadRequest(String),
    /// A sync was requested while another one was running.
    SyncInProgress,
    /// Internal server error.
    InternalError(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<AppError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::DatabaseError(e) => write!(f, "Database error: {}", e),
            AppError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            AppError::SyncInProgress => f.write_str("A sync is already in progress"),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
            AppError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for AppError {}

impl AppError {
    fn is_sync_in_progress(&self) -> bool {
        match self {
            AppError::SyncInProgress => true,
            AppError::WithContext { source, .. } => source.is_sync_in_progress(),
            _ => false,
        }
    }

    fn status_and_message(&self) -> (StatusCode, String) {
        match self {
            AppError::DatabaseError(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Database error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::SyncInProgress => (StatusCode::CONFLICT, self.to_string()),
            AppError::InternalError(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
            AppError::WithContext { source, context } => {
                tracing::error!("Error with context: {} -> {}", context, source);
                source.status_and_message()
            }
        }
    }
}

impl IntoResponse for AppError {
    /// Maps each variant to a status code and a `{ok, error}` JSON body.
    /// A skipped sync also carries `skipped: true`.
    fn into_response(self) -> Response {
        let (status, error_message) = self.status_and_message();

        let mut body = json!({
            "ok": false,
            "error": error_message,
        });
        if self.is_sync_in_progress() {
            body["skipped"] = json!(true);
        }

        (status, Json(body)).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::DatabaseError(e),
            other => AppError::InternalError(other.to_string()),
        }
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `AppError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    fn context(self, context: impl Into<String>) -> Result<T, AppError>;
}

impl<T, E> ResultExt<T> for Result<T, E>
where
    E: Into<AppError>,
{
    fn context(self, context: impl Into<String>) -> Result<T, AppError> {
        self.map_err(|e| AppError::WithContext {
            source: Box::new(e.into()),
            context: context.into(),
        })
    }
}
