//! Environment-driven configuration.

use crate::error::ConfigError;

pub const BASE_URL_VAR: &str = "TRANSPORT_BASE_URL";
pub const API_KEY_VAR: &str = "TRANSPORT_API_KEY";

/// Settings needed to build a `NetworkService`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    pub base_url: String,
    pub api_key: Option<String>,
}

impl TransportConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: None,
        }
    }

    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Read `TRANSPORT_BASE_URL` (required) and `TRANSPORT_API_KEY`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Like `from_env`, reading variables through `lookup`. Blank values
    /// count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let base_url = read(BASE_URL_VAR).ok_or(ConfigError::MissingVar(BASE_URL_VAR))?;
        Ok(Self {
            base_url,
            api_key: read(API_KEY_VAR),
        })
    }
}
