//! Tests for subject naming and the event relay

use super::*;
use crate::bayeux::{CommonResponse, EventData, EventDescriptor};
use pretty_assertions::assert_eq;

fn message(channel: &str, payload: serde_json::Value, event_type: &str) -> ConnectResponse {
    ConnectResponse {
        common: CommonResponse {
            channel: channel.to_string(),
            successful: true,
            ..CommonResponse::default()
        },
        data: EventData {
            event: EventDescriptor {
                event_type: event_type.to_string(),
                replay_id: 1,
                ..EventDescriptor::default()
            },
            payload,
            ..EventData::default()
        },
        ..ConnectResponse::default()
    }
}

#[test]
fn test_subject_from_change_data_capture() {
    let msg = message(
        "/data/ChangeEvents",
        serde_json::json!({
            "ChangeEventHeader": {
                "entityName": "Account",
                "changeType": "UPDATE",
            },
            "Name": "Acme",
        }),
        "updated",
    );

    assert_eq!(subject_name(&msg), "Account/UPDATE");
}

#[test]
fn test_subject_from_push_topic() {
    let msg = message(
        "/topic/AccountUpdates",
        serde_json::json!({ "Name": "Acme" }),
        "updated",
    );

    assert_eq!(subject_name(&msg), "Acme/updated");
}

#[test]
fn test_subject_falls_back_to_channel() {
    let msg = message("/topic/AccountUpdates", serde_json::json!({"Id": 7}), "updated");
    assert_eq!(subject_name(&msg), "/topic/AccountUpdates");
}

#[test]
fn test_relay_source_with_leading_slash() {
    let (tx, _rx) = tokio::sync::mpsc::channel(1);
    let relay = EventRelay::new("my-source", "/topic/Accounts", tx);
    assert_eq!(relay.source, "my-source/topic/Accounts");
}

#[test]
fn test_relay_source_without_leading_slash() {
    let (tx, _rx) = tokio::sync::mpsc::channel(1);
    let relay = EventRelay::new("my-source", "topic/Accounts", tx);
    assert_eq!(relay.source, "my-source/topic/Accounts");
}

#[tokio::test]
async fn test_relay_forwards_stream_events() {
    let (tx, mut rx) = tokio::sync::mpsc::channel(1);
    let relay = EventRelay::new("my-source", "/topic/Accounts", tx);

    relay
        .dispatch_event(message(
            "/topic/Accounts",
            serde_json::json!({ "Name": "Acme" }),
            "created",
        ))
        .await;

    let event = rx.recv().await.unwrap();
    assert_eq!(event.event_type, EVENT_TYPE);
    assert_eq!(event.source, "my-source/topic/Accounts");
    assert_eq!(event.subject, "Acme/created");
    assert!(!event.id.is_empty());
    assert_eq!(event.data["payload"]["Name"], "Acme");
}
