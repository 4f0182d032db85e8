//! Stream adapter
//!
//! Wires an authenticator, the Bayeux client, and a relay dispatcher
//! together, turning raw connect responses into `StreamEvent`s on an
//! outbound channel for the consumer to republish however it likes.

use crate::auth::JwtAuthenticator;
use crate::bayeux::{
    BayeuxClient, ChangeDataCapturePayload, ConnectResponse, EventDispatcher, PushTopicSObject,
    Subscription,
};
use crate::config::AdapterConfig;
use crate::error::{Error, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{error, warn};
use uuid::Uuid;

/// Event type attached to every relayed stream message
pub const EVENT_TYPE: &str = "com.salesforce.stream.message";

/// A stream message normalized for republishing
#[derive(Debug, Clone, Serialize)]
pub struct StreamEvent {
    /// Always [`EVENT_TYPE`]
    pub event_type: String,

    /// `<adapter name>/<subscription channel>`
    pub source: String,

    /// Unique id assigned at relay time
    pub id: String,

    /// Entity-level subject derived from the payload
    pub subject: String,

    /// The event data as received from the stream
    pub data: serde_json::Value,
}

/// Derive a subject for an event: Change Data Capture events yield
/// `<entity>/<change type>`, PushTopic events `<record name>/<event
/// type>`, anything else falls back to the channel name.
pub fn subject_name(msg: &ConnectResponse) -> String {
    if let Ok(cdc) = serde_json::from_value::<ChangeDataCapturePayload>(msg.data.payload.clone()) {
        return format!(
            "{}/{}",
            cdc.change_event_header.entity_name, cdc.change_event_header.change_type
        );
    }

    if let Ok(sobject) = serde_json::from_value::<PushTopicSObject>(msg.data.payload.clone()) {
        return format!("{}/{}", sobject.name, msg.data.event.event_type);
    }

    msg.common.channel.clone()
}

/// Dispatcher that converts connect responses into [`StreamEvent`]s and
/// forwards them over a channel. Errors are logged; the stream itself
/// keeps running.
pub struct EventRelay {
    source: String,
    sink: mpsc::Sender<StreamEvent>,
}

impl EventRelay {
    /// Create a relay. `name` and `channel` form the event source.
    pub fn new(name: &str, channel: &str, sink: mpsc::Sender<StreamEvent>) -> Self {
        let mut source = name.to_string();
        if !channel.starts_with('/') {
            source.push('/');
        }
        source.push_str(channel);

        Self { source, sink }
    }
}

#[async_trait]
impl EventDispatcher for EventRelay {
    async fn dispatch_event(&self, msg: ConnectResponse) {
        let event = StreamEvent {
            event_type: EVENT_TYPE.to_string(),
            source: self.source.clone(),
            id: Uuid::new_v4().to_string(),
            subject: subject_name(&msg),
            data: serde_json::to_value(&msg.data).unwrap_or_default(),
        };

        if self.sink.send(event).await.is_err() {
            warn!("event receiver dropped, discarding stream message");
        }
    }

    async fn dispatch_error(&self, error: Error) {
        error!(%error, "error receiving events");
    }
}

/// Salesforce stream adapter: authenticator + Bayeux client + relay
pub struct StreamAdapter {
    config: AdapterConfig,
}

impl StreamAdapter {
    pub fn new(config: AdapterConfig) -> Self {
        Self { config }
    }

    /// Build the authenticator from the adapter configuration
    pub fn authenticator(&self) -> Result<JwtAuthenticator> {
        JwtAuthenticator::new(
            &self.config.auth.cert_key()?,
            &self.config.auth.client_id,
            &self.config.auth.user,
            &self.config.auth.server,
            reqwest::Client::new(),
        )
    }

    /// Run the stream until `shutdown` flips to `true`, relaying events
    /// to `sink`.
    pub async fn start(
        &self,
        sink: mpsc::Sender<StreamEvent>,
        shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let subscriptions = vec![Subscription::with_replay_id(
            self.config.subscription.channel.clone(),
            self.config.subscription.replay_id,
        )];

        let relay = EventRelay::new(&self.config.name, &self.config.subscription.channel, sink);

        let client = BayeuxClient::new(
            self.config.api_version.clone(),
            &subscriptions,
            Arc::new(self.authenticator()?),
            Arc::new(relay),
        )?;

        client.start(shutdown).await
    }
}

#[cfg(test)]
mod tests;
