//! Channel abstraction.
//!
//! A channel is a passive container for the members of one named presence
//! channel. Every subscriber of a name shares the same `Arc<Channel>`, so a
//! membership change made through one handle is seen through all of them.

use crate::identity::Identity;
use crate::member::Member;
use dashmap::DashMap;
use std::collections::HashMap;
use tracing::debug;

/// A channel identifier.
pub type ChannelId = String;

/// Shared state for one presence channel.
#[derive(Debug)]
pub struct Channel {
    /// Channel name.
    name: ChannelId,
    /// Members keyed by identity.
    members: DashMap<String, Member>,
}

impl Channel {
    /// Create a new, empty channel.
    #[must_use]
    pub fn new(name: impl Into<ChannelId>) -> Self {
        Self {
            name: name.into(),
            members: DashMap::new(),
        }
    }

    /// Get the channel name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get a snapshot of all members, keyed by identity.
    #[must_use]
    pub fn members(&self) -> HashMap<String, Member> {
        self.members
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Get a single member.
    #[must_use]
    pub fn member(&self, id: &str) -> Option<Member> {
        self.members.get(id).map(|entry| entry.value().clone())
    }

    /// Get the number of members.
    #[must_use]
    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Check if an identity is a member.
    #[must_use]
    pub fn is_member(&self, id: &str) -> bool {
        self.members.contains_key(id)
    }

    /// Check if the channel has no members.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Add a member.
    ///
    /// Returns `true` if this is a new member, `false` if an existing member
    /// was replaced.
    pub fn add_member(&self, id: impl Into<Identity>, info: Option<serde_json::Value>) -> bool {
        let id = id.into();
        let mut member = Member::new(id.clone());
        if let Some(info) = info {
            member = member.with_info(info);
        }

        let is_new = self.members.insert(id.to_string(), member).is_none();
        if is_new {
            debug!(channel = %self.name, member = %id, "Member added");
        }
        is_new
    }

    /// Remove a member.
    ///
    /// Returns the removed member, if any.
    pub fn remove_member(&self, id: &str) -> Option<Member> {
        let removed = self.members.remove(id).map(|(_, member)| member);
        if removed.is_some() {
            debug!(channel = %self.name, member = %id, "Member removed");
        }
        removed
    }

    /// Update a member's metadata.
    ///
    /// Returns `true` if the member exists and was updated.
    pub fn update_member(&self, id: &str, info: serde_json::Value) -> bool {
        if let Some(mut member) = self.members.get_mut(id) {
            member.update_info(info);
            true
        } else {
            false
        }
    }
}
