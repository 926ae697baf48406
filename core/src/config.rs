//! Client configuration.

use std::env;

/// Base URL used when `SKILLGIG_API_URL` is unset or empty.
pub const DEFAULT_BASE_URL: &str = "http://localhost:8000/api/v1";

/// Durable storage key holding the serialized session.
pub const AUTH_STORAGE_KEY: &str = "skillgig_auth";

/// Environment variable consulted by [`ClientConfig::from_env`].
pub const BASE_URL_ENV: &str = "SKILLGIG_API_URL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    base_url: String,
    storage_key: String,
}

impl ClientConfig {
    /// Build a config for `base_url`, stripping one trailing slash.
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: normalize_base_url(base_url),
            storage_key: AUTH_STORAGE_KEY.to_string(),
        }
    }

    pub fn from_env() -> Self {
        let base_url = env::var(BASE_URL_ENV).unwrap_or_default();
        Self::new(&base_url)
    }

    pub fn with_storage_key(mut self, key: impl Into<String>) -> Self {
        self.storage_key = key.into();
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn storage_key(&self) -> &str {
        &self.storage_key
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

fn normalize_base_url(url: &str) -> String {
    if url.is_empty() {
        return DEFAULT_BASE_URL.to_string();
    }
    url.strip_suffix('/').unwrap_or(url).to_string()
}
