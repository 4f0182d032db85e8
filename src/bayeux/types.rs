//! Bayeux wire types
//!
//! JSON shapes for the CometD 3.1 subset used by the Salesforce
//! Streaming API. Every Bayeux response body is a JSON array with at
//! least one element; an empty array is a protocol error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Replay from the earliest stored event, then new events
pub const REPLAY_ALL: i64 = -2;

/// Replay new events only
pub const REPLAY_NEW: i64 = -1;

/// A channel the client keeps a stream open for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subscription {
    /// Streaming channel, e.g. `/topic/AccountUpdates` or `/data/ChangeEvents`
    pub channel: String,

    /// Position to resume from: `-2` all stored events, `-1` new events
    /// only, `>= 0` resume after that event
    #[serde(default = "default_replay_id")]
    pub replay_id: i64,
}

fn default_replay_id() -> i64 {
    REPLAY_NEW
}

impl Subscription {
    /// Subscribe to new events only on a channel
    pub fn new(channel: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            replay_id: REPLAY_NEW,
        }
    }

    /// Subscribe with an explicit replay position
    pub fn with_replay_id(channel: impl Into<String>, replay_id: i64) -> Self {
        Self {
            channel: channel.into(),
            replay_id,
        }
    }
}

/// Fields shared by every Bayeux response element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonResponse {
    #[serde(default)]
    pub channel: String,

    #[serde(default, rename = "clientId")]
    pub client_id: String,

    #[serde(default)]
    pub successful: bool,

    #[serde(default)]
    pub error: String,
}

/// Response element for `/meta/handshake`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandshakeResponse {
    #[serde(flatten)]
    pub common: CommonResponse,
}

/// Response element for `/meta/subscribe`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscriptionResponse {
    #[serde(flatten)]
    pub common: CommonResponse,

    #[serde(default)]
    pub subscription: String,
}

/// Response element for `/meta/connect`: a protocol acknowledgement
/// when the channel is prefixed `/meta`, an application event otherwise
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectResponse {
    #[serde(flatten)]
    pub common: CommonResponse,

    #[serde(default)]
    pub data: EventData,

    #[serde(default)]
    pub advice: Advice,
}

impl ConnectResponse {
    /// Whether this element belongs to a `/meta` control channel
    pub fn is_meta(&self) -> bool {
        self.common.channel.starts_with("/meta")
    }
}

/// Application payload carried by a connect response element
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventData {
    #[serde(default)]
    pub event: EventDescriptor,

    #[serde(default)]
    pub schema: String,

    #[serde(default)]
    pub sobject: Value,

    #[serde(default)]
    pub payload: Value,
}

/// Metadata the server attaches to each streamed event
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDescriptor {
    #[serde(default)]
    pub created_date: String,

    #[serde(default, rename = "replayId")]
    pub replay_id: i64,

    #[serde(default, rename = "type")]
    pub event_type: String,
}

/// Server hint on how the client should proceed after a failed meta
/// response, e.g. `reconnect: "handshake"`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Advice {
    #[serde(default)]
    pub reconnect: String,

    #[serde(default)]
    pub timeout: i64,

    #[serde(default)]
    pub interval: i64,
}

/// Reconnect advice value demanding a fresh handshake
pub const RECONNECT_HANDSHAKE: &str = "handshake";

/// Header of a Change Data Capture event payload
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChangeDataCapturePayload {
    #[serde(rename = "ChangeEventHeader")]
    pub change_event_header: ChangeEventHeader,
}

/// The subset of the CDC header used for subject naming
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeEventHeader {
    #[serde(default)]
    pub entity_name: String,

    #[serde(default)]
    pub change_type: String,
}

/// PushTopic event payload, as delivered for SObject topics
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PushTopicSObject {
    #[serde(rename = "Name")]
    pub name: String,
}
