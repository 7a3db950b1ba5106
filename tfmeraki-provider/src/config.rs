//! Provider configuration
//!
//! Explicit settings win over the environment, which wins over defaults.

use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://api.meraki.com/api/v1";
pub const API_KEY_ENV: &str = "MERAKI_DASHBOARD_API_KEY";
pub const BASE_URL_ENV: &str = "MERAKI_BASE_URL";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_RETRIES: u32 = 3;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("no API key configured; set api_key or {API_KEY_ENV}")]
    MissingApiKey,

    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
}

/// Resolved provider settings
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderConfig {
    pub base_url: Url,
    pub api_key: String,
    pub timeout: Duration,
    /// Extra attempts after a rate-limited or failed request
    pub retries: u32,
}

/// Provider settings as written in configuration; anything left out is
/// filled from the environment or defaults by [`ProviderSettings::resolve`]
#[derive(Debug, Clone, Default)]
pub struct ProviderSettings {
    pub base_url: Option<String>,
    pub api_key: Option<String>,
    pub timeout_secs: Option<u64>,
    pub retries: Option<u32>,
}

impl ProviderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = Some(timeout_secs);
        self
    }

    pub fn with_retries(mut self, retries: u32) -> Self {
        self.retries = Some(retries);
        self
    }

    /// Resolve against the process environment
    pub fn resolve(self) -> Result<ProviderConfig, ConfigError> {
        self.resolve_with(|key| std::env::var(key).ok())
    }

    /// Resolve against an arbitrary variable lookup
    pub fn resolve_with<F>(self, env: F) -> Result<ProviderConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = self
            .api_key
            .or_else(|| env(API_KEY_ENV))
            .filter(|key| !key.trim().is_empty())
            .ok_or(ConfigError::MissingApiKey)?;

        let raw_url = self
            .base_url
            .or_else(|| env(BASE_URL_ENV))
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let base_url = parse_base_url(&raw_url)?;

        Ok(ProviderConfig {
            base_url,
            api_key,
            timeout: Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)),
            retries: self.retries.unwrap_or(DEFAULT_RETRIES),
        })
    }
}

fn parse_base_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidBaseUrl {
        url: raw.to_string(),
        reason,
    };

    let url = Url::parse(raw).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme '{}'", url.scheme())));
    }
    Ok(url)
}

impl ProviderConfig {
    /// Absolute URL for an API path such as `/networks/N_1/appliance/vlans`
    pub fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_only_key_is_given() {
        let config = ProviderSettings::new()
            .with_api_key("k")
            .resolve_with(env(&[]))
            .unwrap();

        assert_eq!(config.base_url.as_str(), "https://api.meraki.com/api/v1");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.retries, 3);
    }

    #[test]
    fn environment_fills_missing_settings() {
        let config = ProviderSettings::new()
            .resolve_with(env(&[
                (API_KEY_ENV, "from-env"),
                (BASE_URL_ENV, "http://localhost:8080/api/v1"),
            ]))
            .unwrap();

        assert_eq!(config.api_key, "from-env");
        assert_eq!(config.base_url.as_str(), "http://localhost:8080/api/v1");
    }

    #[test]
    fn explicit_settings_win_over_environment() {
        let config = ProviderSettings::new()
            .with_api_key("explicit")
            .with_retries(0)
            .resolve_with(env(&[(API_KEY_ENV, "from-env")]))
            .unwrap();

        assert_eq!(config.api_key, "explicit");
        assert_eq!(config.retries, 0);
    }

    #[test]
    fn missing_or_blank_key_is_rejected() {
        assert_eq!(
            ProviderSettings::new().resolve_with(env(&[])),
            Err(ConfigError::MissingApiKey)
        );
        assert_eq!(
            ProviderSettings::new().resolve_with(env(&[(API_KEY_ENV, "  ")])),
            Err(ConfigError::MissingApiKey)
        );
    }

    #[test]
    fn malformed_base_url_is_rejected() {
        let err = ProviderSettings::new()
            .with_api_key("k")
            .with_base_url("ftp://example.com")
            .resolve_with(env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));

        let err = ProviderSettings::new()
            .with_api_key("k")
            .with_base_url("not a url")
            .resolve_with(env(&[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidBaseUrl { .. }));
    }

    #[test]
    fn endpoint_joins_paths() {
        let config = ProviderSettings::new()
            .with_api_key("k")
            .with_base_url("http://localhost:1234/api/v1/")
            .resolve_with(env(&[]))
            .unwrap();
        assert_eq!(
            config.endpoint("/organizations/O_1/certificates"),
            "http://localhost:1234/api/v1/organizations/O_1/certificates"
        );
    }
}
