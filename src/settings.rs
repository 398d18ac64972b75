use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::error::{ClerkError, Result};
use crate::models::StripeEnvironment;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub data_dir: String,
    /// Which Stripe account syncs and ledger fetches run against.
    #[serde(default)]
    pub stripe_environment: StripeEnvironment,
    /// Page size for the ledger's bulk list requests.
    #[serde(default = "default_fetch_limit")]
    pub fetch_limit: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stripe_api_base: Option<String>,
}

fn default_fetch_limit() -> u32 {
    100
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir().to_string_lossy().to_string(),
            stripe_environment: StripeEnvironment::default(),
            fetch_limit: default_fetch_limit(),
            request_timeout_secs: default_request_timeout_secs(),
            stripe_api_base: None,
        }
    }
}

impl Settings {
    /// Environment variable holding the secret key for `env`.
    pub fn api_key_var(env: StripeEnvironment) -> &'static str {
        match env {
            StripeEnvironment::Test => "STRIPE_TEST_SECRET_KEY",
            StripeEnvironment::Live => "STRIPE_LIVE_SECRET_KEY",
        }
    }

    pub fn resolve_api_key(env: StripeEnvironment) -> Result<String> {
        let var = Self::api_key_var(env);
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
            _ => Err(ClerkError::MissingApiKey(var.to_string())),
        }
    }
}

fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join("clerk")
}

fn settings_path() -> PathBuf {
    config_dir().join("settings.json")
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("Documents")
        .join("clerk")
}

pub fn load_settings() -> Settings {
    let path = settings_path();
    if path.exists() {
        let content = std::fs::read_to_string(&path).unwrap_or_default();
        serde_json::from_str(&content).unwrap_or_default()
    } else {
        Settings::default()
    }
}

pub fn save_settings(settings: &Settings) -> Result<()> {
    let dir = config_dir();
    std::fs::create_dir_all(&dir)?;
    let json = serde_json::to_string_pretty(settings)
        .map_err(|e| ClerkError::Settings(e.to_string()))?;
    std::fs::write(settings_path(), format!("{json}\n"))?;
    Ok(())
}

pub fn get_data_dir() -> PathBuf {
    PathBuf::from(&load_settings().data_dir)
}

pub fn shellexpand_path(path: &str) -> String {
    if path.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return path.replacen('~', &home.to_string_lossy(), 1);
        }
    }
    std::fs::canonicalize(path)
        .unwrap_or_else(|_| PathBuf::from(path))
        .to_string_lossy()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            data_dir: "/tmp/test".to_string(),
            stripe_environment: StripeEnvironment::Live,
            fetch_limit: 25,
            request_timeout_secs: 5,
            stripe_api_base: Some("http://localhost:1234".to_string()),
        };
        let json = serde_json::to_string_pretty(&settings).unwrap();
        std::fs::write(&path, &json).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        let loaded: Settings = serde_json::from_str(&content).unwrap();
        assert_eq!(loaded.stripe_environment, StripeEnvironment::Live);
        assert_eq!(loaded.data_dir, "/tmp/test");
        assert_eq!(loaded.fetch_limit, 25);
        assert_eq!(loaded.stripe_api_base.as_deref(), Some("http://localhost:1234"));
    }

    #[test]
    fn test_defaults() {
        let s = Settings::default();
        assert_eq!(s.stripe_environment, StripeEnvironment::Test);
        assert_eq!(s.fetch_limit, 100);
        assert_eq!(s.request_timeout_secs, 30);
        assert!(!s.data_dir.is_empty());
    }

    #[test]
    fn test_load_merges_with_defaults() {
        let json = r#"{"data_dir": "/tmp/test", "stripe_environment": "live"}"#;
        let s: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(s.stripe_environment, StripeEnvironment::Live);
        assert_eq!(s.fetch_limit, 100);
        assert!(s.stripe_api_base.is_none());
    }

    #[test]
    fn test_api_key_var_per_environment() {
        assert_eq!(Settings::api_key_var(StripeEnvironment::Test), "STRIPE_TEST_SECRET_KEY");
        assert_eq!(Settings::api_key_var(StripeEnvironment::Live), "STRIPE_LIVE_SECRET_KEY");
    }
}
