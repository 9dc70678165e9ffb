//! # presence-mock-core
//!
//! An in-process stand-in for a hosted realtime service's presence
//! channels, for use in tests.
//!
//! This crate provides the building blocks:
//!
//! - **Channel** - Shared membership state for one named channel
//! - **Registry** - Deduplicates channels by name
//! - **Client** - Identifies itself through an authorizer and subscribes
//! - **ChannelView** - A client's own projection of a shared channel
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │   Client    │────▶│  Registry   │────▶│  Channel    │
//! └─────────────┘     └─────────────┘     └─────────────┘
//!        │                                       ▲
//!        ▼                                       │
//! ┌─────────────┐                         ┌─────────────┐
//! │ Authorizer  │──── identity ──────────▶│ ChannelView │
//! └─────────────┘                         └─────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use presence_mock_core::{ChannelRegistry, Client, ClientConfig, StaticAuthorizer};
//!
//! let registry = Arc::new(ChannelRegistry::new());
//! let alice = Client::new(ClientConfig::new(StaticAuthorizer::new("alice")), registry.clone());
//! let bob = Client::new(ClientConfig::new(StaticAuthorizer::new("bob")), registry.clone());
//!
//! let view_a = alice.subscribe("presence-room");
//! let view_b = bob.subscribe("presence-room");
//!
//! assert_eq!(view_a.self_identity().to_string(), "alice");
//! assert_eq!(view_b.self_identity().to_string(), "bob");
//! assert!(Arc::ptr_eq(view_a.channel(), view_b.channel()));
//! ```

pub mod auth;
pub mod channel;
pub mod client;
pub mod identity;
pub mod member;
pub mod registry;
pub mod view;

pub use auth::{
    AuthError, AuthRequest, Authorizer, ClientId, DelayedAuthorizer, FnAuthorizer,
    ManualAuthorizer, RejectingAuthorizer, StaticAuthorizer,
};
pub use channel::{Channel, ChannelId};
pub use client::{Client, ClientConfig};
pub use identity::{Identity, IdentityCell, IdentityHandle, IdentityState};
pub use member::Member;
pub use registry::{ChannelRegistry, RegistryConfig, RegistryStats};
pub use view::{ChannelView, Members, SELF_KEY};
