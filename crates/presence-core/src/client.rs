//! Mock realtime clients.
//!
//! A client subscribes to presence channels through a shared
//! [`ChannelRegistry`] and identifies itself through its configured
//! [`Authorizer`]. `subscribe` never waits for authorization: the returned
//! view reads as unresolved until the authorizer completes.

use crate::auth::{AuthError, AuthRequest, Authorizer, ClientId};
use crate::identity::{Identity, IdentityCell, IdentityHandle, IdentityState};
use crate::registry::ChannelRegistry;
use crate::view::ChannelView;
use dashmap::DashMap;
use futures_util::future::{BoxFuture, FutureExt};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use tracing::{debug, warn};

/// Client configuration.
#[derive(Clone)]
pub struct ClientConfig {
    /// How the client obtains its identity.
    pub authorizer: Arc<dyn Authorizer>,
}

impl ClientConfig {
    /// Create a configuration using `authorizer`.
    #[must_use]
    pub fn new(authorizer: impl Authorizer + 'static) -> Self {
        Self {
            authorizer: Arc::new(authorizer),
        }
    }

    /// Create a configuration sharing an existing authorizer.
    #[must_use]
    pub fn with_shared_authorizer(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig").finish_non_exhaustive()
    }
}

/// A mock realtime client.
///
/// Dropping the client cancels its outstanding authorizations; views it
/// handed out keep their last identity.
#[derive(Debug)]
pub struct Client {
    id: ClientId,
    config: ClientConfig,
    registry: Arc<ChannelRegistry>,
    identity: Arc<IdentityCell>,
    /// Spawned authorizations still in flight.
    pending: DashMap<u64, AbortHandle>,
    next_task: AtomicU64,
}

impl Client {
    /// Create a new, unidentified client.
    #[must_use]
    pub fn new(config: ClientConfig, registry: Arc<ChannelRegistry>) -> Self {
        let id = ClientId::generate();
        debug!(client = %id, "Client created");
        Self {
            id,
            config,
            registry,
            identity: Arc::new(IdentityCell::new()),
            pending: DashMap::new(),
            next_task: AtomicU64::new(0),
        }
    }

    /// Get the number of authorizations still running in the background.
    #[must_use]
    pub fn pending_authorizations(&self) -> usize {
        self.pending.iter().filter(|h| !h.is_finished()).count()
    }

    /// Get the client ID.
    #[must_use]
    pub fn id(&self) -> &ClientId {
        &self.id
    }

    /// Get the client's current identity.
    #[must_use]
    pub fn identity(&self) -> IdentityState {
        self.identity.get()
    }

    /// Get a live handle on the client's identity.
    #[must_use]
    pub fn identity_handle(&self) -> IdentityHandle {
        self.identity.handle()
    }

    /// Get the registry this client subscribes through.
    #[must_use]
    pub fn registry(&self) -> &Arc<ChannelRegistry> {
        &self.registry
    }

    /// Subscribe to a presence channel.
    ///
    /// Starts authorization and returns immediately with a view bound to
    /// this client. An authorizer that completes without suspending has
    /// already set the identity by the time this returns.
    pub fn subscribe(&self, channel_name: &str) -> ChannelView {
        self.authorize(channel_name);

        let channel = self.registry.get_or_create(channel_name);
        debug!(
            client = %self.id,
            channel = %channel_name,
            members = channel.member_count(),
            "Subscribed"
        );

        ChannelView::wrap(channel, self)
    }

    fn authorize(&self, channel_name: &str) {
        let request = AuthRequest::new(self.id.clone(), channel_name);
        let authorizer = Arc::clone(&self.config.authorizer);
        let mut pending: BoxFuture<'static, Result<Identity, AuthError>> =
            async move { authorizer.authorize(request).await }.boxed();

        let completion = Completion {
            client_id: self.id.clone(),
            channel_name: channel_name.to_string(),
            identity: Arc::downgrade(&self.identity),
        };

        if let Some(result) = (&mut pending).now_or_never() {
            completion.apply(result);
            return;
        }

        match Handle::try_current() {
            Ok(handle) => {
                let task = handle.spawn(async move {
                    let result = pending.await;
                    completion.apply(result);
                });
                self.pending.retain(|_, h| !h.is_finished());
                let ticket = self.next_task.fetch_add(1, Ordering::Relaxed);
                self.pending.insert(ticket, task.abort_handle());
            }
            Err(_) => {
                warn!(
                    client = %self.id,
                    channel = %channel_name,
                    "Authorization suspended outside a tokio runtime; identity stays unresolved"
                );
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        for task in self.pending.iter() {
            task.abort();
        }
        if !self.pending.is_empty() {
            debug!(client = %self.id, "Client dropped with authorizations pending");
        }
    }
}

/// Applies the outcome of one authorization to the client's identity.
///
/// Holds the identity weakly so the client alone decides its lifetime.
struct Completion {
    client_id: ClientId,
    channel_name: String,
    identity: Weak<IdentityCell>,
}

impl Completion {
    fn apply(self, result: Result<Identity, AuthError>) {
        match result {
            Ok(id) => {
                debug!(
                    client = %self.client_id,
                    channel = %self.channel_name,
                    identity = %id,
                    "Authorized"
                );
                match self.identity.upgrade() {
                    Some(identity) => {
                        identity.resolve(id);
                    }
                    None => {
                        debug!(client = %self.client_id, "Client gone before authorization completed");
                    }
                }
            }
            Err(e) => {
                warn!(
                    client = %self.client_id,
                    channel = %self.channel_name,
                    error = %e,
                    "Authorization failed"
                );
            }
        }
    }
}
