//! Authorization for presence subscriptions.
//!
//! Subscribing to a presence channel requires the client to be identified.
//! The [`Authorizer`] trait is the caller-supplied step that produces that
//! identity. It may finish immediately or at some later point; the client
//! never blocks on it.
//!
//! The authorizers in this module cover the timings tests usually need:
//!
//! - [`StaticAuthorizer`] - resolves on the first poll
//! - [`FnAuthorizer`] - resolves on the first poll, computed from the request
//! - [`DelayedAuthorizer`] - resolves after a timer
//! - [`ManualAuthorizer`] - resolves when the test says so
//! - [`RejectingAuthorizer`] - always fails

use crate::identity::Identity;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Handle;
use tokio::sync::oneshot;

static CLIENT_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a client connection (the "socket id").
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Create a new client ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a client ID unique within this process.
    #[must_use]
    pub fn generate() -> Self {
        let counter = CLIENT_COUNTER.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}.{}", std::process::id(), counter))
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authorization errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The authorizer refused the subscription.
    #[error("Authorization rejected: {0}")]
    Rejected(String),

    /// The authorizer went away before deciding.
    #[error("Authorization abandoned")]
    Abandoned,

    /// The authorizer needs a tokio runtime and none is running.
    #[error("No tokio runtime to drive the authorization")]
    NoRuntime,
}

/// What is being authorized.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthRequest {
    /// The subscribing client.
    pub client_id: ClientId,
    /// The channel being subscribed to.
    pub channel_name: String,
}

impl AuthRequest {
    /// Create a new authorization request.
    #[must_use]
    pub fn new(client_id: ClientId, channel_name: impl Into<String>) -> Self {
        Self {
            client_id,
            channel_name: channel_name.into(),
        }
    }
}

/// Supplies the identity of a subscribing client.
#[async_trait]
pub trait Authorizer: Send + Sync {
    /// Authorize a subscription, yielding the subscriber's identity.
    async fn authorize(&self, request: AuthRequest) -> Result<Identity, AuthError>;
}

/// Resolves every request with the same identity, without suspending.
#[derive(Debug, Clone)]
pub struct StaticAuthorizer {
    identity: Identity,
}

impl StaticAuthorizer {
    /// Create an authorizer that always yields `identity`.
    #[must_use]
    pub fn new(identity: impl Into<Identity>) -> Self {
        Self {
            identity: identity.into(),
        }
    }
}

#[async_trait]
impl Authorizer for StaticAuthorizer {
    async fn authorize(&self, _request: AuthRequest) -> Result<Identity, AuthError> {
        Ok(self.identity.clone())
    }
}

/// Resolves synchronously with the result of a function.
pub struct FnAuthorizer<F> {
    f: F,
}

impl<F> FnAuthorizer<F>
where
    F: Fn(&AuthRequest) -> Result<Identity, AuthError> + Send + Sync,
{
    /// Wrap a function as an authorizer.
    #[must_use]
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> fmt::Debug for FnAuthorizer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAuthorizer").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> Authorizer for FnAuthorizer<F>
where
    F: Fn(&AuthRequest) -> Result<Identity, AuthError> + Send + Sync,
{
    async fn authorize(&self, request: AuthRequest) -> Result<Identity, AuthError> {
        (self.f)(&request)
    }
}

/// Resolves with a fixed identity after a delay.
///
/// The delay is timed by the tokio runtime; polled outside one, the
/// authorization fails with [`AuthError::NoRuntime`].
#[derive(Debug, Clone)]
pub struct DelayedAuthorizer {
    identity: Identity,
    delay: Duration,
}

impl DelayedAuthorizer {
    /// Create an authorizer that yields `identity` after `delay`.
    #[must_use]
    pub fn new(identity: impl Into<Identity>, delay: Duration) -> Self {
        Self {
            identity: identity.into(),
            delay,
        }
    }
}

#[async_trait]
impl Authorizer for DelayedAuthorizer {
    async fn authorize(&self, _request: AuthRequest) -> Result<Identity, AuthError> {
        if Handle::try_current().is_err() {
            return Err(AuthError::NoRuntime);
        }
        tokio::time::sleep(self.delay).await;
        Ok(self.identity.clone())
    }
}

/// Holds every request open until the test resolves or rejects it.
///
/// Requests that are never settled stay pending indefinitely.
#[derive(Debug, Default)]
pub struct ManualAuthorizer {
    next_ticket: AtomicU64,
    pending: DashMap<u64, (AuthRequest, oneshot::Sender<Result<Identity, AuthError>>)>,
}

impl ManualAuthorizer {
    /// Create a manual authorizer with nothing pending.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of requests waiting for a decision.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Get the requests waiting for a decision.
    #[must_use]
    pub fn pending_requests(&self) -> Vec<AuthRequest> {
        self.pending.iter().map(|e| e.value().0.clone()).collect()
    }

    /// Resolve every pending request with `identity`.
    ///
    /// Returns the number of requests settled.
    pub fn resolve(&self, identity: impl Into<Identity>) -> usize {
        let identity = identity.into();
        self.settle(|| Ok(identity.clone()))
    }

    /// Reject every pending request.
    ///
    /// Returns the number of requests settled.
    pub fn reject(&self, reason: impl Into<String>) -> usize {
        let reason = reason.into();
        self.settle(|| Err(AuthError::Rejected(reason.clone())))
    }

    /// Drop every pending request without a decision.
    ///
    /// The affected authorizations fail with [`AuthError::Abandoned`].
    /// Returns the number of requests dropped.
    pub fn abandon(&self) -> usize {
        let count = self.pending.len();
        self.pending.clear();
        count
    }

    fn settle(&self, outcome: impl Fn() -> Result<Identity, AuthError>) -> usize {
        let tickets: Vec<u64> = self.pending.iter().map(|e| *e.key()).collect();
        let mut settled = 0;
        for ticket in tickets {
            if let Some((_, (_, tx))) = self.pending.remove(&ticket) {
                // Skip subscribers that went away
                if tx.send(outcome()).is_ok() {
                    settled += 1;
                }
            }
        }
        settled
    }
}

#[async_trait]
impl Authorizer for ManualAuthorizer {
    async fn authorize(&self, request: AuthRequest) -> Result<Identity, AuthError> {
        let (tx, rx) = oneshot::channel();
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.pending.insert(ticket, (request, tx));
        rx.await.unwrap_or(Err(AuthError::Abandoned))
    }
}

/// Rejects every request.
#[derive(Debug, Clone)]
pub struct RejectingAuthorizer {
    reason: String,
}

impl RejectingAuthorizer {
    /// Create an authorizer that always fails with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Authorizer for RejectingAuthorizer {
    async fn authorize(&self, _request: AuthRequest) -> Result<Identity, AuthError> {
        Err(AuthError::Rejected(self.reason.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn request(channel: &str) -> AuthRequest {
        AuthRequest::new(ClientId::new("1.1"), channel)
    }

    #[test]
    fn test_client_ids_unique() {
        let a = ClientId::generate();
        let b = ClientId::generate();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_static_authorizer() {
        let auth = StaticAuthorizer::new("alice");
        assert_eq!(auth.authorize(request("room")).await, Ok(Identity::from("alice")));
    }

    #[tokio::test]
    async fn test_fn_authorizer_uses_request() {
        let auth = FnAuthorizer::new(|req: &AuthRequest| {
            Ok(Identity::new(format!("user-{}", req.channel_name)))
        });
        assert_eq!(
            auth.authorize(request("room")).await,
            Ok(Identity::from("user-room"))
        );
    }

    #[tokio::test]
    async fn test_rejecting_authorizer() {
        let auth = RejectingAuthorizer::new("no session");
        assert_eq!(
            auth.authorize(request("room")).await,
            Err(AuthError::Rejected("no session".to_string()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_delayed_authorizer() {
        let auth = DelayedAuthorizer::new("bob", Duration::from_millis(500));
        let start = tokio::time::Instant::now();

        assert_eq!(auth.authorize(request("room")).await, Ok(Identity::from("bob")));
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[test]
    fn test_delayed_authorizer_without_runtime() {
        let auth = DelayedAuthorizer::new("bob", Duration::from_millis(10));
        let result = futures_util::FutureExt::now_or_never(auth.authorize(request("room")));
        assert_eq!(result, Some(Err(AuthError::NoRuntime)));
    }

    #[tokio::test]
    async fn test_manual_authorizer_resolve() {
        let auth = Arc::new(ManualAuthorizer::new());

        let pending = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.authorize(request("room")).await })
        };

        while auth.pending_count() == 0 {
            tokio::task::yield_now().await;
        }
        assert_eq!(auth.pending_requests()[0].channel_name, "room");

        assert_eq!(auth.resolve("carol"), 1);
        assert_eq!(pending.await.unwrap(), Ok(Identity::from("carol")));
        assert_eq!(auth.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_manual_authorizer_reject() {
        let auth = Arc::new(ManualAuthorizer::new());

        let pending = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.authorize(request("room")).await })
        };

        while auth.pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(auth.reject("expired"), 1);
        assert_eq!(
            pending.await.unwrap(),
            Err(AuthError::Rejected("expired".to_string()))
        );
    }

    #[tokio::test]
    async fn test_manual_authorizer_abandon() {
        let auth = Arc::new(ManualAuthorizer::new());

        let pending = {
            let auth = Arc::clone(&auth);
            tokio::spawn(async move { auth.authorize(request("room")).await })
        };

        while auth.pending_count() == 0 {
            tokio::task::yield_now().await;
        }

        assert_eq!(auth.abandon(), 1);
        assert_eq!(pending.await.unwrap(), Err(AuthError::Abandoned));
    }

    #[test]
    fn test_manual_authorizer_nothing_pending() {
        let auth = ManualAuthorizer::new();
        assert_eq!(auth.resolve("carol"), 0);
    }
}
