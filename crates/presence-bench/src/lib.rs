//! Shared fixtures for the presence mock benchmarks.

use presence_mock_core::{ChannelRegistry, Client, ClientConfig, StaticAuthorizer};
use serde_json::json;
use std::sync::Arc;

/// Build a registry with `channels` channels of `members` members each.
#[must_use]
pub fn populated_registry(channels: usize, members: usize) -> Arc<ChannelRegistry> {
    let registry = Arc::new(ChannelRegistry::new());
    for c in 0..channels {
        let channel = registry.get_or_create(&format!("presence-room-{c}"));
        for m in 0..members {
            channel.add_member(format!("user-{m}"), Some(json!({ "seat": m })));
        }
    }
    registry
}

/// Build an identified client on `registry`.
#[must_use]
pub fn identified_client(registry: &Arc<ChannelRegistry>, identity: &str) -> Client {
    Client::new(
        ClientConfig::new(StaticAuthorizer::new(identity)),
        Arc::clone(registry),
    )
}
