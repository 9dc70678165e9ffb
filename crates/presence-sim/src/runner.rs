//! Scenario execution.
//!
//! Builds one registry for the scenario, pre-populates its channels, runs
//! every client's subscriptions, waits for authorizations to settle, and
//! reports what each view shows.

use crate::config::{ClientSpec, Scenario};
use presence_mock_core::{
    Authorizer, ChannelRegistry, ChannelView, Client, ClientConfig, DelayedAuthorizer,
    IdentityState, ManualAuthorizer, StaticAuthorizer,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, info, warn};

/// What one client sees on one channel.
#[derive(Debug, Clone, Serialize)]
pub struct ViewReport {
    /// Client ID.
    pub client: String,
    /// Channel name.
    pub channel: String,
    /// The client's own identity as seen through the view.
    pub me: IdentityState,
    /// The membership projection.
    pub members: serde_json::Value,
}

fn authorizer_for(spec: &ClientSpec) -> Arc<dyn Authorizer> {
    match &spec.identity {
        Some(identity) if spec.delay_ms > 0 => Arc::new(DelayedAuthorizer::new(
            identity.as_str(),
            Duration::from_millis(spec.delay_ms),
        )),
        Some(identity) => Arc::new(StaticAuthorizer::new(identity.as_str())),
        // Never settled
        None => Arc::new(ManualAuthorizer::new()),
    }
}

/// Run a scenario to completion.
pub async fn run(scenario: &Scenario) -> Vec<ViewReport> {
    let registry = Arc::new(ChannelRegistry::new());

    for spec in &scenario.channels {
        let channel = registry.get_or_create(&spec.name);
        for member in &spec.members {
            channel.add_member(member.id.as_str(), member.info.clone());
        }
    }

    let mut subscriptions: Vec<(Client, Vec<ChannelView>, bool)> = Vec::new();
    for spec in &scenario.clients {
        let client = Client::new(
            ClientConfig::with_shared_authorizer(authorizer_for(spec)),
            Arc::clone(&registry),
        );
        let views = spec
            .subscribe
            .iter()
            .map(|name| client.subscribe(name))
            .collect();
        subscriptions.push((client, views, spec.join));
    }

    info!(
        clients = subscriptions.len(),
        channels = registry.len(),
        "Waiting for authorizations to settle"
    );

    let deadline = Instant::now() + scenario.settle_timeout();
    for (client, views, join) in &subscriptions {
        for view in views {
            match timeout_at(deadline, view.identified()).await {
                Ok(Some(identity)) => {
                    if *join {
                        view.add_member(identity, None);
                    }
                }
                Ok(None) | Err(_) => {
                    warn!(client = %client.id(), channel = %view.name(), "Client never identified");
                }
            }
        }
    }

    let reports: Vec<ViewReport> = subscriptions
        .iter()
        .flat_map(|(client, views, _)| {
            views.iter().map(move |view| {
                let members = view.members();
                ViewReport {
                    client: client.id().to_string(),
                    channel: view.name().to_string(),
                    me: members.me().clone(),
                    members: members.to_json(),
                }
            })
        })
        .collect();

    let stats = registry.stats();
    debug!(
        channels = stats.channel_count,
        members = stats.member_count,
        "Scenario finished"
    );

    reports
}
