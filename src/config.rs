//! Crate configuration: endpoint, key pool, quarantine TTL, request timeout,
//! CSRF header pair. Loaded from defaults, TOML, or the environment.

use crate::keypool::Code;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Header name the page metadata falls back to when none is configured.
pub const DEFAULT_CSRF_HEADER: &str = "X-CSRF-TOKEN";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("key pool is empty")]
    EmptyPool,
    #[error("duplicate code {0} in key pool")]
    DuplicateCode(Code),
    #[error("request timeout must be non-zero")]
    ZeroTimeout,
    #[error("invalid base URL {url:?}: {source}")]
    InvalidBaseUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("base URL {0:?} cannot carry a path")]
    NotABaseUrl(String),
    #[error("failed to build HTTP client: {0}")]
    HttpClient(String),
}

/// CSRF token/header pair attached to every POST. Provisioning the token is
/// the host application's business; this crate only carries it.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct CsrfHeader {
    #[serde(default = "default_csrf_header")]
    pub header: String,
    pub token: String,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Settings {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Ordered pool of client codes for the rotator.
    #[serde(default = "default_codes")]
    pub codes: Vec<Code>,
    /// Quarantine span for a rate-limited code.
    #[serde(default = "default_blacklist_ttl_secs")]
    pub blacklist_ttl_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default)]
    pub csrf: Option<CsrfHeader>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            codes: default_codes(),
            blacklist_ttl_secs: default_blacklist_ttl_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            csrf: None,
        }
    }
}

impl Settings {
    /// Parse settings from a TOML document. Missing keys fall back to the
    /// defaults; the result is validated before being returned.
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let settings: Settings = toml::from_str(raw).context("malformed settings TOML")?;
        settings.validate()?;
        Ok(settings)
    }

    /// Read settings from `KLEIO_*` environment variables, after a
    /// best-effort `.env` load. Unset variables fall back to the defaults.
    pub fn from_env() -> anyhow::Result<Self> {
        let _ = dotenv::dotenv();

        let mut settings = Settings::default();
        if let Ok(v) = env::var("KLEIO_BASE_URL") {
            settings.base_url = v;
        }
        if let Ok(v) = env::var("KLEIO_CODES") {
            settings.codes = v
                .split(',')
                .map(|s| s.trim().parse::<Code>())
                .collect::<Result<_, _>>()
                .context("KLEIO_CODES must be a comma-separated list of integers")?;
        }
        if let Ok(v) = env::var("KLEIO_BLACKLIST_TTL_SECS") {
            settings.blacklist_ttl_secs =
                v.parse().context("KLEIO_BLACKLIST_TTL_SECS must be an integer")?;
        }
        if let Ok(v) = env::var("KLEIO_REQUEST_TIMEOUT_SECS") {
            settings.request_timeout_secs =
                v.parse().context("KLEIO_REQUEST_TIMEOUT_SECS must be an integer")?;
        }
        if let Ok(token) = env::var("KLEIO_CSRF_TOKEN") {
            let header = env::var("KLEIO_CSRF_HEADER").unwrap_or_else(|_| default_csrf_header());
            settings.csrf = Some(CsrfHeader { header, token });
        }
        settings.validate()?;
        Ok(settings)
    }

    /// Check the invariants a rotator and client rely on, returning the
    /// parsed base URL. Rejects empty or duplicated pools, a zero timeout,
    /// and base URLs that cannot anchor request paths.
    pub fn validate(&self) -> Result<Url, SettingsError> {
        if self.codes.is_empty() {
            return Err(SettingsError::EmptyPool);
        }
        let mut seen = HashSet::new();
        for &code in &self.codes {
            if !seen.insert(code) {
                return Err(SettingsError::DuplicateCode(code));
            }
        }
        if self.request_timeout_secs == 0 {
            return Err(SettingsError::ZeroTimeout);
        }
        let url = Url::parse(&self.base_url).map_err(|source| SettingsError::InvalidBaseUrl {
            url: self.base_url.clone(),
            source,
        })?;
        if url.cannot_be_a_base() {
            return Err(SettingsError::NotABaseUrl(self.base_url.clone()));
        }
        Ok(url)
    }

    pub fn blacklist_ttl(&self) -> Duration {
        Duration::from_secs(self.blacklist_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_codes() -> Vec<Code> {
    vec![1, 2, 3]
}

fn default_blacklist_ttl_secs() -> u64 {
    3600
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_csrf_header() -> String {
    DEFAULT_CSRF_HEADER.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.codes, vec![1, 2, 3]);
        assert_eq!(settings.blacklist_ttl_secs, 3600);
        assert_eq!(settings.request_timeout_secs, 30);
        assert!(settings.csrf.is_none());
        settings.validate().unwrap();
    }

    #[test]
    fn rejects_empty_pool() {
        let settings = Settings {
            codes: vec![],
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::EmptyPool)));
    }

    #[test]
    fn rejects_duplicate_codes() {
        let settings = Settings {
            codes: vec![1, 2, 2],
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::DuplicateCode(2))
        ));
    }

    #[test]
    fn rejects_zero_timeout() {
        let settings = Settings {
            request_timeout_secs: 0,
            ..Settings::default()
        };
        assert!(matches!(settings.validate(), Err(SettingsError::ZeroTimeout)));
    }

    #[test]
    fn rejects_relative_base_url() {
        let settings = Settings {
            base_url: "/heritage".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            settings.validate(),
            Err(SettingsError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn toml_overrides_and_defaults_mix() {
        let settings = Settings::from_toml_str(
            r#"
            base_url = "https://heritage.example.org"
            codes = [4, 5]

            [csrf]
            token = "abc123"
            "#,
        )
        .unwrap();
        assert_eq!(settings.base_url, "https://heritage.example.org");
        assert_eq!(settings.codes, vec![4, 5]);
        assert_eq!(settings.blacklist_ttl_secs, 3600); // default survives
        let csrf = settings.csrf.unwrap();
        assert_eq!(csrf.header, DEFAULT_CSRF_HEADER);
        assert_eq!(csrf.token, "abc123");
    }

    #[test]
    fn env_loader_reads_documented_keys() {
        env::set_var("KLEIO_BASE_URL", "https://env.example.org");
        env::set_var("KLEIO_CODES", "7, 8, 9");
        env::set_var("KLEIO_BLACKLIST_TTL_SECS", "120");
        env::set_var("KLEIO_REQUEST_TIMEOUT_SECS", "5");
        env::set_var("KLEIO_CSRF_TOKEN", "tok");

        let settings = Settings::from_env().unwrap();
        assert_eq!(settings.base_url, "https://env.example.org");
        assert_eq!(settings.codes, vec![7, 8, 9]);
        assert_eq!(settings.blacklist_ttl_secs, 120);
        assert_eq!(settings.request_timeout_secs, 5);
        assert_eq!(settings.csrf.unwrap().token, "tok");

        env::remove_var("KLEIO_BASE_URL");
        env::remove_var("KLEIO_CODES");
        env::remove_var("KLEIO_BLACKLIST_TTL_SECS");
        env::remove_var("KLEIO_REQUEST_TIMEOUT_SECS");
        env::remove_var("KLEIO_CSRF_TOKEN");
    }
}
