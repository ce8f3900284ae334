use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Default number of leads per page when the caller does not ask for one.
pub const DEFAULT_PAGE_SIZE: u32 = 20;
/// Upper bound for any paged or bounded read.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Default number of sync runs returned by the logs read.
pub const DEFAULT_LOG_LIMIT: u32 = 50;

/// Advertising platform a lead was sourced from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Platform {
    Meta,
    Google,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Meta, Platform::Google];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Meta => "META",
            Platform::Google => "GOOGLE",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known platform or selector.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown platform: {0}")]
pub struct UnknownPlatform(pub String);

impl FromStr for Platform {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "META" => Ok(Platform::Meta),
            "GOOGLE" => Ok(Platform::Google),
            _ => Err(UnknownPlatform(s.to_string())),
        }
    }
}

/// Which platforms a sync run should cover.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PlatformSelector {
    Meta,
    Google,
    All,
}

impl PlatformSelector {
    /// Resolves the selector to the concrete platforms it names.
    pub fn platforms(&self) -> Vec<Platform> {
        match self {
            PlatformSelector::Meta => vec![Platform::Meta],
            PlatformSelector::Google => vec![Platform::Google],
            PlatformSelector::All => Platform::ALL.to_vec(),
        }
    }
}

impl From<Platform> for PlatformSelector {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Meta => PlatformSelector::Meta,
            Platform::Google => PlatformSelector::Google,
        }
    }
}

impl FromStr for PlatformSelector {
    type Err = UnknownPlatform;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().eq_ignore_ascii_case("ALL") {
            return Ok(PlatformSelector::All);
        }
        s.parse::<Platform>().map(PlatformSelector::from)
    }
}

/// A normalized lead that has not been written yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeadDraft {
    pub platform: Platform,
    pub provider_lead_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    pub ad_id: Option<String>,
    pub form_id: Option<String>,
    pub raw_payload: serde_json::Value,
}

impl LeadDraft {
    /// Starts a draft with only the identity and raw payload filled in.
    pub fn new(
        platform: Platform,
        provider_lead_id: impl Into<String>,
        raw_payload: serde_json::Value,
    ) -> Self {
        Self {
            platform,
            provider_lead_id: provider_lead_id.into(),
            name: None,
            email: None,
            phone: None,
            campaign_id: None,
            campaign_name: None,
            ad_id: None,
            form_id: None,
            raw_payload,
        }
    }
}

/// The deduplicated, persisted lead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalLead {
    pub id: Uuid,
    pub platform: Platform,
    pub provider_lead_id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub campaign_id: Option<String>,
    pub campaign_name: Option<String>,
    pub ad_id: Option<String>,
    pub form_id: Option<String>,
    pub raw_payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Final state of one adapter invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SyncStatus {
    Success,
    Partial,
    Error,
}

impl SyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Success => "SUCCESS",
            SyncStatus::Partial => "PARTIAL",
            SyncStatus::Error => "ERROR",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SUCCESS" => Ok(SyncStatus::Success),
            "PARTIAL" => Ok(SyncStatus::Partial),
            "ERROR" => Ok(SyncStatus::Error),
            other => Err(format!("unknown sync status: {}", other)),
        }
    }
}

/// Audit entry as produced by the orchestrator, before the store stamps it.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSyncRun {
    pub platform: Platform,
    pub fetched_count: u64,
    pub imported_count: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: SyncStatus,
    pub notes: Option<String>,
}

/// Immutable audit record for one adapter invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncRun {
    pub id: Uuid,
    pub platform: Platform,
    pub fetched_count: u64,
    pub imported_count: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub status: SyncStatus,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Outcome of one platform inside a sync summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformResult {
    pub platform: Platform,
    pub fetched: u64,
    pub imported: u64,
    pub ok: bool,
    pub status: SyncStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Aggregated result returned by `run_sync`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SyncSummary {
    pub per_platform: Vec<PlatformResult>,
    pub ok: bool,
    /// Total new leads across all platforms in this run.
    pub imported: u64,
}

impl SyncSummary {
    pub fn from_results(per_platform: Vec<PlatformResult>) -> Self {
        let ok = per_platform.iter().all(|r| r.status == SyncStatus::Success);
        let imported = per_platform.iter().map(|r| r.imported).sum();
        Self {
            per_platform,
            ok,
            imported,
        }
    }

    pub fn platform(&self, platform: Platform) -> Option<&PlatformResult> {
        self.per_platform.iter().find(|r| r.platform == platform)
    }
}

/// What happened when a sync was requested.
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    Completed(SyncSummary),
    /// Another run held the run guard; nothing was fetched or written.
    Skipped,
}

impl SyncOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, SyncOutcome::Skipped)
    }
}

/// Paged, platform-filterable lead read.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LeadQuery {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub platform: Option<Platform>,
}

impl LeadQuery {
    /// 1-based page number, never below 1.
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`.
    pub fn limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.limit())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadPage {
    pub items: Vec<CanonicalLead>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
}

/// Clamps a requested sync-run count to `1..=MAX_PAGE_SIZE`.
pub fn clamp_log_limit(limit: Option<u32>) -> u32 {
    limit.unwrap_or(DEFAULT_LOG_LIMIT).clamp(1, MAX_PAGE_SIZE)
}
