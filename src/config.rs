use url::Url;

use crate::models::Platform;

/// Where leads and sync runs are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Postgres,
    /// Process-local store; data is lost on restart.
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub port: u16,
    pub store_backend: StoreBackend,
    pub meta_leads_url: String,
    pub google_leads_url: String,
    pub fetch_timeout_secs: u64,
    pub sync_concurrency: usize,
    pub auto_sync_enabled: bool,
    pub auto_sync_interval_secs: u64,
    pub mock_providers_enabled: bool,
    pub cors_origins: Vec<String>,
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.trim().is_empty())
}

fn parse_bool(key: &str, default: bool) -> anyhow::Result<bool> {
    match env_var(key) {
        None => Ok(default),
        Some(value) => match value.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => anyhow::bail!("{} must be true or false, got {:?}", key, value),
        },
    }
}

fn parse_positive<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr + PartialOrd + Default + Copy,
{
    let value = match env_var(key) {
        None => default,
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| anyhow::anyhow!("{} must be a positive number", key))?,
    };
    if value <= T::default() {
        anyhow::bail!("{} must be greater than zero", key);
    }
    Ok(value)
}

fn validate_http_url(key: &str, raw: &str) -> anyhow::Result<String> {
    let url = Url::parse(raw.trim())
        .map_err(|e| anyhow::anyhow!("{} is not a valid URL: {}", key, e))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        anyhow::bail!("{} must start with http:// or https://", key);
    }
    Ok(raw.trim().trim_end_matches('/').to_string())
}

/// Default feed location for a platform under a provider base URL.
pub fn default_leads_url(base_url: &str, platform: Platform) -> String {
    let path = match platform {
        Platform::Meta => "mock/meta/leads",
        Platform::Google => "mock/google/leads",
    };
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let store_backend = match env_var("STORE_BACKEND").as_deref() {
            None => StoreBackend::Postgres,
            Some(v) if v.eq_ignore_ascii_case("postgres") => StoreBackend::Postgres,
            Some(v) if v.eq_ignore_ascii_case("memory") => StoreBackend::Memory,
            Some(other) => anyhow::bail!("STORE_BACKEND must be postgres or memory, got {:?}", other),
        };

        let database_url = match env_var("DB_URL").or_else(|| env_var("DATABASE_URL")) {
            Some(url) => {
                if !url.starts_with("postgresql://") && !url.starts_with("postgres://") {
                    anyhow::bail!("DB_URL must start with postgresql:// or postgres://");
                }
                Some(url)
            }
            None if store_backend == StoreBackend::Postgres => {
                anyhow::bail!("DB_URL or DATABASE_URL environment variable required")
            }
            None => None,
        };

        let port: u16 = env_var("PORT")
            .unwrap_or_else(|| "4000".to_string())
            .parse()
            .map_err(|_| anyhow::anyhow!("PORT must be a valid number between 1-65535"))?;

        let provider_base_url = validate_http_url(
            "PROVIDER_BASE_URL",
            &env_var("PROVIDER_BASE_URL").unwrap_or_else(|| format!("http://127.0.0.1:{}", port)),
        )?;

        let meta_leads_url = match env_var("META_LEADS_URL") {
            Some(url) => validate_http_url("META_LEADS_URL", &url)?,
            None => default_leads_url(&provider_base_url, Platform::Meta),
        };
        let google_leads_url = match env_var("GOOGLE_LEADS_URL") {
            Some(url) => validate_http_url("GOOGLE_LEADS_URL", &url)?,
            None => default_leads_url(&provider_base_url, Platform::Google),
        };

        let config = Self {
            database_url,
            port,
            store_backend,
            meta_leads_url,
            google_leads_url,
            fetch_timeout_secs: parse_positive("FETCH_TIMEOUT_SECS", 10u64)?,
            sync_concurrency: parse_positive("SYNC_CONCURRENCY", 4usize)?,
            auto_sync_enabled: parse_bool("AUTO_SYNC_ENABLED", false)?,
            auto_sync_interval_secs: parse_positive("AUTO_SYNC_INTERVAL_SECS", 60u64)?,
            mock_providers_enabled: parse_bool("MOCK_PROVIDERS_ENABLED", true)?,
            cors_origins: env_var("CORS_ORIGIN")
                .map(|origins| {
                    origins
                        .split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
        };

        // Log successful configuration load (without sensitive values)
        tracing::info!("Configuration loaded successfully");
        if let Some(ref url) = config.database_url {
            tracing::debug!("Database URL: {}...", url.chars().take(20).collect::<String>());
        }
        tracing::debug!("Store backend: {:?}", config.store_backend);
        tracing::debug!("META leads URL: {}", config.meta_leads_url);
        tracing::debug!("GOOGLE leads URL: {}", config.google_leads_url);
        tracing::debug!("Server Port: {}", config.port);

        Ok(config)
    }

    pub fn leads_url(&self, platform: Platform) -> &str {
        match platform {
            Platform::Meta => &self.meta_leads_url,
            Platform::Google => &self.google_leads_url,
        }
    }
}
