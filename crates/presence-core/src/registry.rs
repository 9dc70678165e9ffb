//! Channel registry.
//!
//! The registry deduplicates channels by name: the first lookup of a name
//! creates the channel, every later lookup returns the same instance. It is
//! constructed explicitly and shared with clients, so each test can own an
//! isolated registry.

use crate::channel::{Channel, ChannelId};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Registry configuration.
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Number of channels to pre-allocate room for.
    pub initial_capacity: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 64,
        }
    }
}

/// Registry of presence channels, indexed by name.
///
/// Channels are never evicted; the registry lives as long as the test
/// context that created it.
#[derive(Debug)]
pub struct ChannelRegistry {
    /// Channels indexed by name.
    channels: DashMap<ChannelId, Arc<Channel>>,
}

impl ChannelRegistry {
    /// Create a new registry with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        info!("Creating channel registry with config: {:?}", config);
        Self {
            channels: DashMap::with_capacity(config.initial_capacity),
        }
    }

    /// Get the channel for `name`, creating it if this is the first lookup.
    ///
    /// Calls with equal names always return the same channel.
    pub fn get_or_create(&self, name: &str) -> Arc<Channel> {
        if let Some(channel) = self.channels.get(name) {
            return Arc::clone(channel.value());
        }

        let entry = self.channels.entry(name.to_string()).or_insert_with(|| {
            debug!(channel = %name, "Creating new channel");
            Arc::new(Channel::new(name))
        });
        Arc::clone(entry.value())
    }

    /// Get an existing channel without creating it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.get(name).map(|c| Arc::clone(c.value()))
    }

    /// Check if a channel exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.channels.contains_key(name)
    }

    /// Get the number of channels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Check if no channel has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Get all channel names.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        self.channels.iter().map(|e| e.key().clone()).collect()
    }

    /// Get registry statistics.
    #[must_use]
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            channel_count: self.channels.len(),
            member_count: self.channels.iter().map(|c| c.member_count()).sum(),
        }
    }
}

impl Default for ChannelRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Number of channels.
    pub channel_count: usize,
    /// Total members across all channels.
    pub member_count: usize,
}
