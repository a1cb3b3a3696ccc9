use serde_json::json;

use super::permission::{DATA_SCOPE, INIT_SCOPE};
use super::{Client, Permission, Permissions};
use crate::broker::{Hub, Message};
use crate::config::HubSettings;
use crate::utils::HubError;

fn hub_with_queue(client_queue_capacity: usize) -> Hub {
    let (hub, _runner) = Hub::new(&HubSettings {
        intake_capacity: 16,
        client_queue_capacity,
    });
    hub
}

#[test]
fn test_client_new_keeps_id() {
    let hub = hub_with_queue(4);
    let (client, _rx) = Client::new("sensor-1", &hub);
    assert_eq!(client.id, "sensor-1");
    assert!(!client.is_closed());
    assert!(client.topics().is_empty());
}

#[test]
fn test_empty_id_gets_uuid() {
    let hub = hub_with_queue(4);
    let (a, _) = Client::new("", &hub);
    let (b, _) = Client::new("", &hub);
    assert!(uuid::Uuid::parse_str(&a.id).is_ok());
    assert_ne!(a.id, b.id);
}

#[test]
fn test_subscribe_requires_read() {
    let hub = hub_with_queue(4);
    let (client, _rx) = Client::new("c1", &hub);

    client.subscribe("data::#");
    assert!(client.topics().is_empty());
    assert!(!client.is_subscribed("data::temperature"));

    client.set_permissions(Permissions::new().grant(DATA_SCOPE, Permission::Read));
    client.subscribe("data::#");
    assert_eq!(client.topics(), vec!["data::#".to_string()]);
    assert!(client.is_subscribed("data::temperature"));

    client.unsubscribe("data::#");
    assert!(!client.is_subscribed("data::temperature"));
}

#[test]
fn test_write_does_not_imply_read() {
    let hub = hub_with_queue(4);
    let (client, _rx) = Client::with_permissions("c1", &hub, Permissions::sensor_full());
    client.subscribe("data::#");
    assert!(client.topics().is_empty());
}

#[tokio::test]
async fn test_publish_without_write_never_reaches_subscribers() {
    let (hub, mut runner) = Hub::new(&HubSettings::default());
    let (reader, mut reader_rx) = Client::with_permissions(
        "reader",
        &hub,
        Permissions::new().grant(DATA_SCOPE, Permission::Read),
    );
    reader.subscribe("data::#");
    hub.register(reader);

    let (writer, _) = Client::with_permissions("writer", &hub, Permissions::init_only());
    hub.register(writer.clone());
    runner.drain_ready();

    writer.broadcast(Message::new("data::env1", json!({"temperature": 42})));
    assert_eq!(runner.drain_ready(), 0);
    assert!(reader_rx.try_recv().is_err());

    writer.set_permissions(Permissions::sensor_full());
    writer.broadcast(Message::new("data::env1", json!({"temperature": 42})));
    assert_eq!(runner.drain_ready(), 1);
    assert_eq!(reader_rx.try_recv().unwrap().topic, "data::env1");
}

#[test]
fn test_send_reports_overflow_and_closed() {
    let hub = hub_with_queue(1);
    let (client, mut rx) = Client::new("c1", &hub);

    client.send(Message::new("error", json!({"error": "bad frame"}))).unwrap();
    let err = client.send(Message::new("error", json!(null))).unwrap_err();
    assert!(matches!(err, HubError::QueueOverflow(id) if id == "c1"));

    assert_eq!(rx.try_recv().unwrap().payload["error"], "bad frame");

    assert!(client.close());
    assert!(!client.close());
    let err = client.send(Message::new("error", json!(null))).unwrap_err();
    assert!(matches!(err, HubError::QueueClosed(_)));
}

#[test]
fn test_default_permission_sets() {
    let pending = Permissions::init_only();
    assert!(pending.allows(INIT_SCOPE, Permission::Write));
    assert!(!pending.allows(INIT_SCOPE, Permission::Read));
    assert!(!pending.allows(DATA_SCOPE, Permission::Write));

    let full = Permissions::sensor_full();
    let mut scopes: Vec<_> = full.scopes().collect();
    scopes.sort();
    assert_eq!(scopes, vec!["alert", "data", "init"]);
}

#[test]
fn test_revoke_permission() {
    let mut perms = Permissions::new()
        .grant(DATA_SCOPE, Permission::Read)
        .grant(DATA_SCOPE, Permission::Write);
    perms.revoke(DATA_SCOPE, Permission::Write);
    assert!(perms.allows(DATA_SCOPE, Permission::Read));
    assert!(!perms.allows(DATA_SCOPE, Permission::Write));

    perms.revoke(DATA_SCOPE, Permission::Read);
    assert_eq!(perms, Permissions::new());
}

#[test]
fn test_permissions_json_shape() {
    let perms: Permissions = serde_json::from_str(r#"{"data": ["read", "write"]}"#).unwrap();
    assert!(perms.allows("data", Permission::Read));
    assert!(perms.allows("data", Permission::Write));
}

#[test]
fn test_require_names_missing_permission() {
    let hub = hub_with_queue(4);
    let perms = Permissions::new().grant(DATA_SCOPE, Permission::Read);
    let (client, _rx) = Client::with_permissions("c1", &hub, perms);

    assert!(client.require(DATA_SCOPE, Permission::Read).is_ok());
    match client.require(DATA_SCOPE, Permission::Write) {
        Err(HubError::PermissionDenied { scope, kind }) => {
            assert_eq!(scope, DATA_SCOPE);
            assert_eq!(kind, Permission::Write);
        }
        other => panic!("unexpected: {other:?}"),
    }
}
