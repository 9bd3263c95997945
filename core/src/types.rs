//! Activity models served by the backend.
//!
//! These mirror the mock-server's schema but are defined independently;
//! the integration tests catch drift between the two crates.

use serde::{Deserialize, Serialize};

/// A planned or completed activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Activity {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Request payload for creating an activity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NewActivity {
    pub title: String,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// Request payload for updating an activity. Omitted fields stay unchanged
/// on the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct ActivityPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}
