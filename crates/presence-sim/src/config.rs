//! Scenario configuration.
//!
//! A scenario can be loaded from:
//! - A path given on the command line
//! - The `PRESENCE_SCENARIO` environment variable
//! - `presence.toml` in the working directory
//! - The built-in default (two clients sharing one room)

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// A full simulation scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// How long to wait for authorizations to settle, in milliseconds.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// Channels to pre-populate.
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,

    /// Clients to run.
    #[serde(default)]
    pub clients: Vec<ClientSpec>,
}

/// A channel with its initial members.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelSpec {
    /// Channel name.
    pub name: String,

    /// Members present before any client subscribes.
    #[serde(default)]
    pub members: Vec<MemberSpec>,
}

/// An initial channel member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberSpec {
    /// Member identity.
    pub id: String,

    /// Member metadata.
    #[serde(default)]
    pub info: Option<serde_json::Value>,
}

/// A client and what it subscribes to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSpec {
    /// Identity the authorizer yields. A client without one never
    /// resolves.
    #[serde(default)]
    pub identity: Option<String>,

    /// Authorization delay in milliseconds; 0 resolves immediately.
    #[serde(default)]
    pub delay_ms: u64,

    /// Channels to subscribe to, in order.
    #[serde(default)]
    pub subscribe: Vec<String>,

    /// Join each subscribed channel as a member once identified.
    #[serde(default)]
    pub join: bool,
}

fn default_settle_ms() -> u64 {
    1_000
}

impl Default for Scenario {
    fn default() -> Self {
        let client = |identity: &str| ClientSpec {
            identity: Some(identity.to_string()),
            delay_ms: 0,
            subscribe: vec!["room-1".to_string()],
            join: false,
        };

        Self {
            settle_ms: default_settle_ms(),
            channels: Vec::new(),
            clients: vec![client("alice"), client("bob")],
        }
    }
}

impl Scenario {
    /// Load a scenario from `path`, or from the default locations.
    ///
    /// # Errors
    ///
    /// Returns an error if a scenario file exists but cannot be parsed.
    pub fn load(path: Option<&str>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(shellexpand::tilde(path).as_ref());
        }

        if let Ok(path) = std::env::var("PRESENCE_SCENARIO") {
            return Self::from_file(shellexpand::tilde(&path).as_ref());
        }

        if Path::new("presence.toml").exists() {
            return Self::from_file("presence.toml");
        }

        Ok(Self::default())
    }

    /// Load a scenario from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario file: {}", path.display()))?;

        let scenario: Scenario = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse scenario file: {}", path.display()))?;

        Ok(scenario)
    }

    /// Get the settle timeout.
    #[must_use]
    pub fn settle_timeout(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}
