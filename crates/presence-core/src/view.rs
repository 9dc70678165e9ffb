//! Per-subscriber channel views.
//!
//! A [`ChannelView`] is what a client gets back from `subscribe`. It reads
//! straight through to the shared [`Channel`], except for the membership
//! projection and the self-identity slot, which are filled in from the
//! subscribing client's identity at the moment of the read.
//!
//! ```text
//!            ┌────────────┐       ┌────────────┐
//!  client A ─│ ChannelView│─┐   ┌─│ ChannelView│─ client B
//!  (alice)   │  me: alice │ │   │ │  me: bob   │  (bob)
//!            └────────────┘ ▼   ▼ └────────────┘
//!                       ┌──────────────┐
//!                       │ Arc<Channel> │
//!                       │   members    │
//!                       └──────────────┘
//! ```
//!
//! Views never write to the channel, and never cache the identity.

use crate::channel::Channel;
use crate::client::Client;
use crate::identity::{Identity, IdentityHandle, IdentityState};
use crate::member::Member;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use tracing::trace;

/// Key of the self-identity slot in [`Members::to_json`].
pub const SELF_KEY: &str = "me";

/// A client-specific view over a shared channel.
#[derive(Debug, Clone)]
pub struct ChannelView {
    channel: Arc<Channel>,
    identity: IdentityHandle,
}

impl ChannelView {
    /// Create a view over `channel` that reports `identity` as its own.
    #[must_use]
    pub fn new(channel: Arc<Channel>, identity: IdentityHandle) -> Self {
        Self { channel, identity }
    }

    /// Create a view over `channel` bound to `client`'s identity.
    #[must_use]
    pub fn wrap(channel: Arc<Channel>, client: &Client) -> Self {
        Self::new(channel, client.identity_handle())
    }

    /// Get the underlying shared channel.
    #[must_use]
    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    /// Get the membership as this subscriber sees it.
    ///
    /// The result is a fresh copy: the shared members plus this
    /// subscriber's current identity in the self slot.
    #[must_use]
    pub fn members(&self) -> Members {
        let me = self.identity.current();
        trace!(channel = %self.channel.name(), me = %me, "Reading members");
        Members {
            entries: self.channel.members(),
            me,
        }
    }

    /// Get this subscriber's current identity.
    #[must_use]
    pub fn self_identity(&self) -> IdentityState {
        self.identity.current()
    }

    /// Wait until this subscriber has been identified.
    ///
    /// Returns `None` if the client was dropped before that happened.
    pub async fn identified(&self) -> Option<Identity> {
        self.identity.resolved().await
    }
}

impl Deref for ChannelView {
    type Target = Channel;

    fn deref(&self) -> &Channel {
        &self.channel
    }
}

/// A detached membership projection.
///
/// Changes made here stay here.
#[derive(Debug, Clone, PartialEq)]
pub struct Members {
    entries: HashMap<String, Member>,
    me: IdentityState,
}

impl Members {
    /// Get the viewer's own identity.
    #[must_use]
    pub fn me(&self) -> &IdentityState {
        &self.me
    }

    /// Get a member by identity.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Member> {
        self.entries.get(id)
    }

    /// Get the viewer's own member entry, if the viewer is a member.
    #[must_use]
    pub fn my_member(&self) -> Option<&Member> {
        self.me.identity().and_then(|id| self.entries.get(id.as_str()))
    }

    /// Get the number of members (not counting the self slot).
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// Get all member identities.
    #[must_use]
    pub fn ids(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    /// Iterate over members.
    pub fn iter(&self) -> impl Iterator<Item = &Member> {
        self.entries.values()
    }

    /// Call `f` for every member.
    pub fn each(&self, f: impl FnMut(&Member)) {
        self.entries.values().for_each(f);
    }

    /// Insert or replace a member in this projection.
    pub fn insert(&mut self, member: Member) -> Option<Member> {
        self.entries.insert(member.id.to_string(), member)
    }

    /// Remove a member from this projection.
    pub fn remove(&mut self, id: &str) -> Option<Member> {
        self.entries.remove(id)
    }

    /// Render as a JSON object of `id -> info`, with the viewer's identity
    /// under [`SELF_KEY`].
    ///
    /// The self slot wins over a member whose id happens to equal the key.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        let mut map: serde_json::Map<String, serde_json::Value> = self
            .entries
            .iter()
            .map(|(id, m)| (id.clone(), m.info.clone().unwrap_or_default()))
            .collect();
        map.insert(
            SELF_KEY.to_string(),
            serde_json::to_value(&self.me).unwrap_or_default(),
        );
        serde_json::Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityCell;
    use serde_json::json;

    fn shared_channel() -> Arc<Channel> {
        let channel = Arc::new(Channel::new("presence-room"));
        channel.add_member("carol", Some(json!({"name": "Carol"})));
        channel.add_member("dave", None);
        channel
    }

    #[test]
    fn test_view_isolates_identity() {
        let channel = shared_channel();
        let alice = IdentityCell::new();
        let bob = IdentityCell::new();
        alice.resolve("alice".into());
        bob.resolve("bob".into());

        let view_a = ChannelView::new(Arc::clone(&channel), alice.handle());
        let view_b = ChannelView::new(Arc::clone(&channel), bob.handle());

        let members_a = view_a.members();
        let members_b = view_b.members();
        assert_eq!(members_a.me().identity(), Some(&Identity::from("alice")));
        assert_eq!(members_b.me().identity(), Some(&Identity::from("bob")));

        // Shared entries agree
        let mut ids_a = members_a.ids();
        let mut ids_b = members_b.ids();
        ids_a.sort_unstable();
        ids_b.sort_unstable();
        assert_eq!(ids_a, vec!["carol", "dave"]);
        assert_eq!(ids_a, ids_b);
        assert_eq!(members_a.get("carol"), members_b.get("carol"));
    }

    #[test]
    fn test_view_reads_live_identity() {
        let cell = IdentityCell::new();
        let view = ChannelView::new(shared_channel(), cell.handle());

        assert_eq!(view.self_identity(), IdentityState::Unresolved);
        assert_eq!(view.members().me(), &IdentityState::Unresolved);

        cell.resolve("alice".into());
        assert_eq!(view.self_identity(), IdentityState::Resolved("alice".into()));
        assert_eq!(view.members().me(), &IdentityState::Resolved("alice".into()));
    }

    #[test]
    fn test_view_passthrough() {
        let channel = shared_channel();
        let cell = IdentityCell::new();
        let view = ChannelView::new(Arc::clone(&channel), cell.handle());

        assert_eq!(view.name(), channel.name());
        assert_eq!(view.member_count(), channel.member_count());
        assert_eq!(view.member("carol"), channel.member("carol"));
        assert!(view.member("nobody").is_none());
        assert!(Arc::ptr_eq(view.channel(), &channel));

        // Later channel changes show through
        channel.add_member("erin", None);
        assert!(view.is_member("erin"));
        assert_eq!(view.members().count(), 3);
    }

    #[test]
    fn test_members_mutation_does_not_leak() {
        let channel = shared_channel();
        let cell = IdentityCell::new();
        let view = ChannelView::new(Arc::clone(&channel), cell.handle());

        let mut members = view.members();
        members.remove("carol");
        members.insert(Member::new("mallory"));
        assert_eq!(members.count(), 2);
        assert!(members.get("mallory").is_some());

        assert!(channel.is_member("carol"));
        assert!(!channel.is_member("mallory"));
        assert_eq!(view.members().count(), 2);
        assert!(view.members().get("carol").is_some());
    }

    #[test]
    fn test_members_to_json() {
        let channel = shared_channel();
        let cell = IdentityCell::new();
        let view = ChannelView::new(channel, cell.handle());

        assert_eq!(
            view.members().to_json(),
            json!({"carol": {"name": "Carol"}, "dave": null, "me": null})
        );

        cell.resolve("alice".into());
        assert_eq!(view.members().to_json()[SELF_KEY], json!("alice"));
    }

    #[test]
    fn test_self_slot_overrides_member_named_me() {
        let channel = Arc::new(Channel::new("presence-room"));
        channel.add_member(SELF_KEY, Some(json!({"name": "Impostor"})));
        let cell = IdentityCell::new();
        cell.resolve("alice".into());

        let view = ChannelView::new(Arc::clone(&channel), cell.handle());
        assert_eq!(view.members().to_json()[SELF_KEY], json!("alice"));
        assert_eq!(view.members().me().identity(), Some(&Identity::from("alice")));
        assert!(channel.is_member(SELF_KEY));
    }

    #[test]
    fn test_my_member() {
        let channel = shared_channel();
        let cell = IdentityCell::new();
        let view = ChannelView::new(channel, cell.handle());
        assert!(view.members().my_member().is_none());

        cell.resolve("carol".into());
        let members = view.members();
        let me = members.my_member().unwrap();
        assert_eq!(me.info, Some(json!({"name": "Carol"})));

        let mut seen = Vec::new();
        members.each(|m| seen.push(m.id.clone()));
        seen.sort();
        assert_eq!(seen, vec![Identity::from("carol"), Identity::from("dave")]);
        assert_eq!(members.iter().count(), 2);
    }

    #[tokio::test]
    async fn test_view_identified_waits() {
        let cell = Arc::new(IdentityCell::new());
        let view = ChannelView::new(shared_channel(), cell.handle());

        let writer = Arc::clone(&cell);
        tokio::spawn(async move {
            writer.resolve("alice".into());
        });

        assert_eq!(view.identified().await, Some(Identity::from("alice")));
    }
}
