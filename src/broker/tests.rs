use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tokio::sync::mpsc;
use tokio::time::timeout;

use super::message::SensorEventPayload;
use super::topic::{matches, scope_of};
use super::{Hub, HubRunner, Message, listener_fn};
use crate::client::{Client, OutboundReceiver, Permission, Permissions};
use crate::config::HubSettings;

fn small_hub(intake: usize, client_queue: usize) -> (Hub, HubRunner) {
    Hub::new(&HubSettings {
        intake_capacity: intake,
        client_queue_capacity: client_queue,
    })
}

fn reader(hub: &Hub, id: &str, pattern: &str) -> (Arc<Client>, OutboundReceiver) {
    let perms = Permissions::new().grant(scope_of(pattern), Permission::Read);
    let (client, rx) = Client::with_permissions(id, hub, perms);
    client.subscribe(pattern);
    (client, rx)
}

#[test]
fn test_scope_of() {
    assert_eq!(scope_of(""), "");
    assert_eq!(scope_of("data"), "data");
    assert_eq!(scope_of("a::#"), "a");
    assert_eq!(scope_of("a::b::c"), "a");
    assert_eq!(scope_of("::b"), "");
}

#[test]
fn test_topic_matches() {
    assert!(matches("#", "anything::at::all"));
    assert!(matches("#", ""));
    assert!(matches("data::#", "data::temperature"));
    assert!(matches("data::#", "data::env1::temperature"));
    assert!(matches("data::#", "data"));
    assert!(!matches("data::#", "alert::warning"));
    assert!(!matches("data::#", "database"));
    assert!(matches("data::env1::#", "data::env1::humidity"));
    assert!(!matches("data::env1::#", "data::env2::humidity"));
    assert!(matches("alertwarning", "alertwarning"));
    assert!(!matches("alertwarning", "alertwarning::x"));
    assert!(!matches("data::temp", "data::temperature"));
}

#[test]
fn test_message_wire_format() {
    let msg = Message::from_json(r#"{"Topic":"data::env1","Payload":{"temperature":42}}"#).unwrap();
    assert_eq!(msg.topic, "data::env1");
    assert_eq!(msg.scope(), "data");
    assert_eq!(msg.sender(), Some("env1"));
    assert_eq!(msg.sensor_data().get("temperature"), Some(&42.0));

    let text = msg.to_json().unwrap();
    assert!(text.contains("\"Topic\""));
    assert!(text.contains("\"Payload\""));

    assert!(Message::from_json("not json").is_err());
}

#[test]
fn test_message_sender_prefers_payload() {
    let msg = Message::new(
        "data",
        json!({"senderID": "env9", "data": {"humidity": 12.5, "label": "x"}}),
    );
    assert_eq!(msg.sender(), Some("env9"));
    let data = msg.sensor_data();
    assert_eq!(data.len(), 1);
    assert_eq!(data["humidity"], 12.5);

    assert_eq!(Message::new("data", json!({})).sender(), None);
}

#[test]
fn test_event_payload_view() {
    let payload = SensorEventPayload {
        sender_id: "door1".to_string(),
        event_name: "opened".to_string(),
    };
    let msg = Message::new("data", serde_json::to_value(&payload).unwrap());
    assert_eq!(msg.sender(), Some("door1"));
    assert_eq!(msg.event_name(), Some("opened"));
    assert!(msg.sensor_data().is_empty());
}

#[tokio::test]
async fn test_subscriber_receives_matching_topics_only() {
    let (hub, mut runner) = small_hub(16, 16);
    let (client, mut rx) = reader(&hub, "watcher", "data::#");
    hub.register(client);
    runner.drain_ready();

    hub.broadcast(Message::new("data::temperature", json!(21)));
    hub.broadcast(Message::new("alert::warning", json!("hot")));
    runner.drain_ready();

    let got = rx.try_recv().unwrap();
    assert_eq!(got.topic, "data::temperature");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_duplicate_registration_keeps_one_entry() {
    let (hub, mut runner) = small_hub(16, 16);
    let (first, mut first_rx) = reader(&hub, "sensor-1", "data::#");
    let (second, mut second_rx) = reader(&hub, "sensor-1", "data::#");

    hub.register(first.clone());
    hub.register(second.clone());
    runner.drain_ready();

    assert_eq!(runner.client_count(), 1);
    assert!(Arc::ptr_eq(runner.client("sensor-1").unwrap(), &second));
    assert!(first.is_closed());
    assert!(first_rx.recv().await.is_none());

    hub.broadcast(Message::new("data::x", json!(1)));
    runner.drain_ready();
    assert_eq!(second_rx.try_recv().unwrap().topic, "data::x");
}

#[tokio::test]
async fn test_unregister_removes_and_closes() {
    let (hub, mut runner) = small_hub(16, 16);
    let (client, mut rx) = reader(&hub, "c1", "data::#");
    hub.register(client.clone());
    runner.drain_ready();
    assert_eq!(runner.client_count(), 1);

    hub.unregister(client.clone());
    runner.drain_ready();
    assert_eq!(runner.client_count(), 0);
    assert!(client.is_closed());
    assert!(rx.recv().await.is_none());

    // a second unregister is harmless
    hub.unregister(client.clone());
    runner.drain_ready();
    assert!(!client.close());
}

#[tokio::test]
async fn test_stale_unregister_keeps_newer_session() {
    let (hub, mut runner) = small_hub(16, 16);
    let (old, _old_rx) = reader(&hub, "c1", "data::#");
    let (new, _new_rx) = reader(&hub, "c1", "data::#");

    hub.register(old.clone());
    runner.drain_ready();
    hub.register(new.clone());
    runner.drain_ready();
    hub.unregister(old);
    runner.drain_ready();

    assert_eq!(runner.client_count(), 1);
    assert!(!new.is_closed());
}

#[tokio::test]
async fn test_slow_consumer_is_evicted() {
    let (hub, mut runner) = small_hub(16, 2);
    let (slow, mut slow_rx) = reader(&hub, "slow", "data::#");
    let (fast, mut fast_rx) = reader(&hub, "fast", "data::#");
    hub.register(slow.clone());
    hub.register(fast);
    runner.drain_ready();

    for i in 0..3 {
        hub.broadcast(Message::new("data::t", json!(i)));
        runner.drain_ready();
        fast_rx.try_recv().unwrap();
    }

    assert!(slow.is_closed());
    assert!(runner.client("slow").is_none());
    assert!(runner.client("fast").is_some());

    // buffered messages drain, then the queue reports closed
    assert!(slow_rx.recv().await.is_some());
    assert!(slow_rx.recv().await.is_some());
    assert!(slow_rx.recv().await.is_none());
}

#[tokio::test]
async fn test_full_intake_drops_new_requests() {
    let (hub, mut runner) = small_hub(1, 16);
    let (client, mut rx) = reader(&hub, "c1", "data::#");
    hub.register(client);
    runner.drain_ready();

    hub.broadcast(Message::new("data::first", json!(1)));
    hub.broadcast(Message::new("data::second", json!(2)));
    assert_eq!(runner.drain_ready(), 1);

    assert_eq!(rx.try_recv().unwrap().topic, "data::first");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn test_listeners_see_broadcasts_dropped_by_full_intake() {
    let (hub, mut runner) = small_hub(1, 16);
    let (client, mut rx) = reader(&hub, "c1", "data::#");
    hub.register(client);
    runner.drain_ready();

    let (tx, mut seen) = mpsc::unbounded_channel();
    hub.add_topic_listener(
        "data::#",
        listener_fn(move |_, msg| {
            let _ = tx.send(msg.topic.clone());
        }),
    );

    hub.broadcast(Message::new("data::first", json!(1)));
    hub.broadcast(Message::new("data::second", json!(2)));

    let mut topics = Vec::new();
    for _ in 0..2 {
        let topic = timeout(Duration::from_secs(1), seen.recv())
            .await
            .unwrap()
            .unwrap();
        topics.push(topic);
    }
    topics.sort();
    assert_eq!(topics, vec!["data::first", "data::second"]);

    assert_eq!(runner.drain_ready(), 1);
    assert_eq!(rx.try_recv().unwrap().topic, "data::first");
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_closed_client_is_not_registered() {
    let (hub, mut runner) = small_hub(16, 16);

    // unregister served before the register it races with
    let (client, _rx) = reader(&hub, "c1", "data::#");
    hub.unregister(client.clone());
    runner.drain_ready();
    hub.register(client.clone());
    runner.drain_ready();
    assert!(client.is_closed());
    assert_eq!(runner.client_count(), 0);

    // closed by the adapter after its unregister was lost
    let (other, _rx) = reader(&hub, "c2", "data::#");
    other.close();
    hub.register(other);
    runner.drain_ready();
    assert_eq!(runner.client_count(), 0);
}

#[tokio::test]
async fn test_runner_stops_when_handles_drop() {
    let (hub, runner) = small_hub(16, 16);
    let (client, mut rx) = reader(&hub, "c1", "data::#");
    let task = tokio::spawn(runner.run());

    hub.register(client.clone());
    tokio::time::sleep(Duration::from_millis(20)).await;
    hub.broadcast(Message::new("data::x", json!(1)));
    assert_eq!(rx.recv().await.unwrap().topic, "data::x");

    // registered clients hold hub handles too
    hub.unregister(client.clone());
    assert!(rx.recv().await.is_none());
    drop(client);
    drop(hub);
    timeout(Duration::from_secs(1), task).await.unwrap().unwrap();
}

#[tokio::test]
async fn test_listener_invoked_for_matching_topic() {
    let (hub, _runner) = small_hub(16, 16);
    let (tx, mut seen) = mpsc::unbounded_channel();
    let id = hub.add_topic_listener(
        "data::#",
        listener_fn(move |_, msg| {
            let _ = tx.send(msg.topic.clone());
        }),
    );

    hub.broadcast(Message::new("alert::x", json!(null)));
    hub.broadcast(Message::new("data::env1", json!({"t": 1})));

    let topic = timeout(Duration::from_secs(1), seen.recv()).await.unwrap();
    assert_eq!(topic.as_deref(), Some("data::env1"));

    assert!(hub.remove_topic_listener("data::#", &id));
    assert!(!hub.remove_topic_listener("data::#", &id));
    assert!(hub.listeners().is_empty());
}

#[tokio::test]
async fn test_catch_all_listener() {
    let (hub, _runner) = small_hub(16, 16);
    let (tx, mut seen) = mpsc::unbounded_channel();
    let id = hub.add_listener(listener_fn(move |_, msg| {
        let _ = tx.send(msg.topic.clone());
    }));
    assert_eq!(hub.listeners().len(), 1);

    hub.broadcast(Message::new("init::hello", json!(null)));
    let topic = timeout(Duration::from_secs(1), seen.recv()).await.unwrap();
    assert_eq!(topic.as_deref(), Some("init::hello"));

    assert!(hub.remove_listener(&id));
    assert!(hub.listeners().matching("init::hello").is_empty());
}
