//! Subscriber identities.
//!
//! A client's identity starts out unresolved and becomes resolved once its
//! authorizer completes. The client owns an [`IdentityCell`]; every view it
//! hands out holds an [`IdentityHandle`] that always observes the latest value.

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::watch;

/// An opaque identity, typically a user id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identity(String);

impl Identity {
    /// Create a new identity.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the identity as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for Identity {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for Identity {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Whether a client has been identified yet.
///
/// Serializes as `null` while unresolved and as the bare id once resolved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IdentityState {
    /// Authorization has not completed.
    #[default]
    Unresolved,
    /// Authorization completed with this identity.
    Resolved(Identity),
}

impl IdentityState {
    /// Check if the identity has been resolved.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved(_))
    }

    /// Get the resolved identity, if any.
    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Resolved(id) => Some(id),
            Self::Unresolved => None,
        }
    }
}

impl From<Identity> for IdentityState {
    fn from(id: Identity) -> Self {
        Self::Resolved(id)
    }
}

impl fmt::Display for IdentityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resolved(id) => write!(f, "{id}"),
            Self::Unresolved => write!(f, "<unresolved>"),
        }
    }
}

/// The writable side of a client's identity.
#[derive(Debug)]
pub struct IdentityCell {
    tx: watch::Sender<IdentityState>,
}

impl IdentityCell {
    /// Create an unresolved identity cell.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _) = watch::channel(IdentityState::Unresolved);
        Self { tx }
    }

    /// Get the current identity state.
    #[must_use]
    pub fn get(&self) -> IdentityState {
        self.tx.borrow().clone()
    }

    /// Record a resolved identity, replacing any previous one.
    ///
    /// Returns the previous state.
    pub fn resolve(&self, identity: Identity) -> IdentityState {
        self.tx.send_replace(IdentityState::Resolved(identity))
    }

    /// Get a read handle that tracks this cell.
    #[must_use]
    pub fn handle(&self) -> IdentityHandle {
        IdentityHandle {
            rx: self.tx.subscribe(),
        }
    }
}

impl Default for IdentityCell {
    fn default() -> Self {
        Self::new()
    }
}

/// A live, read-only view of an [`IdentityCell`].
#[derive(Debug, Clone)]
pub struct IdentityHandle {
    rx: watch::Receiver<IdentityState>,
}

impl IdentityHandle {
    /// Read the identity state as it is right now.
    #[must_use]
    pub fn current(&self) -> IdentityState {
        self.rx.borrow().clone()
    }

    /// Wait until the identity is resolved.
    ///
    /// Returns `None` if the owning cell was dropped while still unresolved.
    pub async fn resolved(&self) -> Option<Identity> {
        let mut rx = self.rx.clone();
        loop {
            if let IdentityState::Resolved(id) = &*rx.borrow_and_update() {
                return Some(id.clone());
            }
            if rx.changed().await.is_err() {
                return rx.borrow().identity().cloned();
            }
        }
    }
}
