//! Channel members.
//!
//! A member is one identity present in a channel, along with whatever
//! metadata ("user info") the service attached to it.

use crate::identity::Identity;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// A single member of a presence channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Member {
    /// Member identity.
    pub id: Identity,
    /// User-defined metadata.
    pub info: Option<serde_json::Value>,
    /// When the member joined, in milliseconds since the epoch.
    pub joined_at: u64,
}

impl Member {
    /// Create a new member with no metadata.
    #[must_use]
    pub fn new(id: impl Into<Identity>) -> Self {
        Self {
            id: id.into(),
            info: None,
            joined_at: now_millis(),
        }
    }

    /// Create a member with metadata.
    #[must_use]
    pub fn with_info(mut self, info: serde_json::Value) -> Self {
        self.info = Some(info);
        self
    }

    /// Replace the metadata.
    pub fn update_info(&mut self, info: serde_json::Value) {
        self.info = Some(info);
    }
}
