//! Credential sources read by the transport at call time.

use std::sync::{Arc, RwLock};

/// Supplies the API key to attach to outbound requests.
///
/// `None` means the request goes out without auth headers.
pub trait CredentialSource: Send + Sync {
    fn api_key(&self) -> Option<String>;
}

/// Blank keys count as no key.
fn non_blank(key: String) -> Option<String> {
    (!key.trim().is_empty()).then_some(key)
}

/// A fixed key, or none at all.
#[derive(Debug, Clone, Default)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    /// A blank `key` is the same as `StaticCredential::none()`.
    pub fn new(key: impl Into<String>) -> Self {
        Self(non_blank(key.into()))
    }

    pub fn none() -> Self {
        Self(None)
    }
}

impl CredentialSource for StaticCredential {
    fn api_key(&self) -> Option<String> {
        self.0.clone()
    }
}

/// A key shared between the transport and whoever manages the session.
///
/// Clones observe the same value; updates apply to the next request sent.
#[derive(Debug, Clone, Default)]
pub struct SessionCredential {
    key: Arc<RwLock<Option<String>>>,
}

impl SessionCredential {
    pub fn new() -> Self {
        Self::default()
    }

    /// Setting a blank key clears the credential.
    pub fn set(&self, key: impl Into<String>) {
        *self.key.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = non_blank(key.into());
    }

    pub fn clear(&self) {
        *self.key.write().unwrap_or_else(|poisoned| poisoned.into_inner()) = None;
    }
}

impl CredentialSource for SessionCredential {
    fn api_key(&self) -> Option<String> {
        self.key
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}
