use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default config file path.
pub const CONFIG_PATH: &str = "config.toml";

/// Top-level application config deserialized from `config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub account: AccountConfig,
    #[serde(default)]
    pub settings: SettingsConfig,
}

/// Session cookies for the signed-in Steam account.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountConfig {
    /// 64-bit SteamID of the account whose history is read.
    pub steam_id: u64,
    /// Value of the `sessionid` cookie.
    pub session_id: String,
    /// Value of the `steamLoginSecure` cookie.
    #[serde(default)]
    pub login_secure: String,
}

/// Runtime settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettingsConfig {
    /// Maximum vanity-URL lookups in flight at once.
    #[serde(default = "default_resolve_concurrency")]
    pub resolve_concurrency: usize,
    /// Per-request timeout handed to the HTTP client.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Page language. Row parsing expects English labels and dates.
    #[serde(default = "default_language")]
    pub language: String,
}

fn default_resolve_concurrency() -> usize {
    8
}

fn default_request_timeout() -> u64 {
    30
}

fn default_language() -> String {
    "english".to_string()
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            resolve_concurrency: default_resolve_concurrency(),
            request_timeout_secs: default_request_timeout(),
            language: default_language(),
        }
    }
}

impl AppConfig {
    /// Load config from the given TOML file path.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = toml::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(config)
    }

    /// Write config to the given TOML file path.
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self).context("failed to serialize config")?;
        std::fs::write(path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(())
    }
}
