pub mod clients;
pub use clients::{OAuthClient, OAuthClients};

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::info;

/// Complete crmhub configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Listen address
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Public base URL the providers redirect back to; callback URLs are
    /// `{callback_base_url}/integrations/{provider}/oauth2callback`
    #[serde(default = "default_callback_base_url")]
    pub callback_base_url: String,
    /// Browser origins allowed by CORS
    #[serde(default = "default_allowed_origins")]
    pub allowed_origins: Vec<String>,
}

fn default_bind() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_callback_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_allowed_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            callback_base_url: default_callback_base_url(),
            allowed_origins: default_allowed_origins(),
        }
    }
}

/// Credential and OAuth state storage configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// SQLite file holding encrypted token blobs
    #[serde(default = "default_credentials_db")]
    pub credentials_db: String,
    /// How long a stored token blob stays readable (seconds)
    #[serde(default = "default_credential_ttl")]
    pub credential_ttl_seconds: i64,
    /// How long an OAuth state token stays valid (seconds)
    #[serde(default = "default_state_ttl")]
    pub state_ttl_seconds: i64,
    /// Sweep interval for expired states and credential rows (seconds)
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

/// Upper bound for any configured TTL (ten years).
pub const MAX_TTL_SECONDS: i64 = 10 * 365 * 24 * 3600;

fn default_credentials_db() -> String {
    "crmhub_credentials.db".to_string()
}

fn default_credential_ttl() -> i64 {
    3600
}

fn default_state_ttl() -> i64 {
    600
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            credentials_db: default_credentials_db(),
            credential_ttl_seconds: default_credential_ttl(),
            state_ttl_seconds: default_state_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl HubConfig {
    /// Apply `CRMHUB_*` environment overrides on top of file/default values.
    pub fn apply_env(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("CRMHUB_BIND") {
            self.server.bind = v;
        }
        if let Some(v) = lookup("CRMHUB_CALLBACK_BASE_URL") {
            self.server.callback_base_url = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("CRMHUB_ALLOWED_ORIGINS") {
            self.server.allowed_origins = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(v) = lookup("CRMHUB_CREDENTIALS_DB") {
            self.storage.credentials_db = v;
        }
        if let Some(v) = lookup("CRMHUB_CREDENTIAL_TTL_SECONDS") {
            if let Ok(n) = v.parse::<i64>() {
                self.storage.credential_ttl_seconds = n;
            }
        }
    }

    /// Normalize and range-check values from any source.
    ///
    /// Run after the file and the environment have both been applied.
    pub fn validate(&mut self) -> Result<()> {
        self.server.callback_base_url = self
            .server
            .callback_base_url
            .trim_end_matches('/')
            .to_string();

        if self.server.allowed_origins.iter().any(|o| o == "*") {
            bail!("allowed_origins cannot contain '*': credentialed CORS needs explicit origins");
        }

        let storage = &self.storage;
        for (name, value) in [
            ("credential_ttl_seconds", storage.credential_ttl_seconds),
            ("state_ttl_seconds", storage.state_ttl_seconds),
        ] {
            if !(1..=MAX_TTL_SECONDS).contains(&value) {
                bail!("{} must be between 1 and {}, got {}", name, MAX_TTL_SECONDS, value);
            }
        }
        if storage.cleanup_interval_seconds == 0 {
            bail!("cleanup_interval_seconds must be at least 1");
        }

        Ok(())
    }
}

/// Note environment variables that are accepted but have no effect.
///
/// Only presence is logged; a `REDIS_URL` can embed a password.
pub fn log_unused_env<F>(lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if lookup("REDIS_URL").is_some() {
        info!("REDIS_URL is set but unused; credentials live in SQLite");
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<HubConfig> {
    let contents =
        std::fs::read_to_string(path).with_context(|| format!("Failed to read config {}", path))?;
    let mut config: HubConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse config {}", path))?;
    config
        .validate()
        .with_context(|| format!("Invalid config {}", path))?;
    Ok(config)
}
