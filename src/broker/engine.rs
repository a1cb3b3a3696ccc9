//! Hub engine
//!
//! The hub is split in two halves:
//! - `Hub`, a cheap cloneable handle given to adapters, clients and
//!   modules. Its `register`, `unregister` and `broadcast` calls push onto
//!   bounded intake queues and never wait: a full queue drops the request
//!   and logs it.
//! - `HubRunner`, the single owner of the client registry. It drains the
//!   intake queues one request at a time, so registry mutation and topic
//!   matching need no locking.
//!
//! Delivery to a client is a non-blocking push onto its outbound queue.
//! A full queue means the consumer is too slow; it is evicted (queue closed,
//! registry entry removed) rather than throttled.
//!
//! Every broadcast is also handed to the listener registry, which runs the
//! matching callbacks on their own tasks.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::broker::listener::{Listener, ListenerId, ListenerRegistry};
use crate::broker::message::Message;
use crate::client::Client;
use crate::config::HubSettings;

#[derive(Debug, Clone)]
pub struct Hub {
    register_tx: mpsc::Sender<Arc<Client>>,
    unregister_tx: mpsc::Sender<Arc<Client>>,
    broadcast_tx: mpsc::Sender<Arc<Message>>,
    listeners: Arc<ListenerRegistry>,
    client_queue_capacity: usize,
}

#[derive(Debug)]
pub struct HubRunner {
    clients: HashMap<String, Arc<Client>>,
    register_rx: mpsc::Receiver<Arc<Client>>,
    unregister_rx: mpsc::Receiver<Arc<Client>>,
    broadcast_rx: mpsc::Receiver<Arc<Message>>,
}

impl Hub {
    /// Build a hub handle and the runner that serves it. The runner does
    /// nothing until `run` is awaited (usually on its own task).
    pub fn new(settings: &HubSettings) -> (Hub, HubRunner) {
        let intake = settings.intake_capacity.max(1);
        let (register_tx, register_rx) = mpsc::channel(intake);
        let (unregister_tx, unregister_rx) = mpsc::channel(intake);
        let (broadcast_tx, broadcast_rx) = mpsc::channel(intake);

        let hub = Hub {
            register_tx,
            unregister_tx,
            broadcast_tx,
            listeners: Arc::new(ListenerRegistry::new()),
            client_queue_capacity: settings.client_queue_capacity.max(1),
        };
        let runner = HubRunner {
            clients: HashMap::new(),
            register_rx,
            unregister_rx,
            broadcast_rx,
        };
        (hub, runner)
    }

    pub fn client_queue_capacity(&self) -> usize {
        self.client_queue_capacity
    }

    pub fn register(&self, client: Arc<Client>) {
        match self.register_tx.try_send(client) {
            Ok(()) => {}
            Err(TrySendError::Full(client)) => {
                warn!(client_id = %client.id, "Register queue full, client discarded");
            }
            Err(TrySendError::Closed(client)) => {
                warn!(client_id = %client.id, "Hub stopped, register discarded");
            }
        }
    }

    pub fn unregister(&self, client: Arc<Client>) {
        match self.unregister_tx.try_send(client) {
            Ok(()) => {}
            Err(TrySendError::Full(client)) => {
                warn!(client_id = %client.id, "Unregister queue full, request discarded");
            }
            Err(TrySendError::Closed(client)) => {
                warn!(client_id = %client.id, "Hub stopped, unregister discarded");
            }
        }
    }

    /// Queue a message for delivery to subscribers and fan it out to the
    /// matching listeners. Listener dispatch happens even when the
    /// broadcast queue is full.
    pub fn broadcast(&self, msg: Message) {
        let msg = Arc::new(msg);

        match self.broadcast_tx.try_send(msg.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                warn!(topic = %dropped.topic, "Broadcast queue full, message discarded");
            }
            Err(TrySendError::Closed(dropped)) => {
                warn!(topic = %dropped.topic, "Hub stopped, message discarded");
            }
        }

        self.listeners.dispatch(self, msg);
    }

    pub fn listeners(&self) -> &Arc<ListenerRegistry> {
        &self.listeners
    }

    pub fn add_topic_listener(&self, pattern: &str, listener: Arc<dyn Listener>) -> ListenerId {
        self.listeners.add_topic_listener(pattern, listener)
    }

    pub fn remove_topic_listener(&self, pattern: &str, id: &str) -> bool {
        self.listeners.remove_topic_listener(pattern, id)
    }

    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        self.listeners.add_listener(listener)
    }

    pub fn remove_listener(&self, id: &str) -> bool {
        self.listeners.remove_listener(id)
    }
}

impl HubRunner {
    /// Serve the intake queues until every `Hub` handle is gone.
    pub async fn run(mut self) {
        info!("Hub started");

        loop {
            tokio::select! {
                Some(client) = self.register_rx.recv() => self.handle_register(client),
                Some(client) = self.unregister_rx.recv() => self.handle_unregister(client),
                Some(msg) = self.broadcast_rx.recv() => self.handle_broadcast(&msg),
                else => break,
            }
        }

        for (_, client) in self.clients.drain() {
            client.close();
        }
        info!("Hub stopped");
    }

    /// Process every request already sitting in the intake queues without
    /// waiting for more. Returns the number of requests handled.
    pub fn drain_ready(&mut self) -> usize {
        let mut handled = 0;
        loop {
            let before = handled;

            if let Ok(client) = self.register_rx.try_recv() {
                self.handle_register(client);
                handled += 1;
            }
            if let Ok(client) = self.unregister_rx.try_recv() {
                self.handle_unregister(client);
                handled += 1;
            }
            if let Ok(msg) = self.broadcast_rx.try_recv() {
                self.handle_broadcast(&msg);
                handled += 1;
            }

            if handled == before {
                return handled;
            }
        }
    }

    pub fn client_count(&self) -> usize {
        self.clients.len()
    }

    pub fn client(&self, id: &str) -> Option<&Arc<Client>> {
        self.clients.get(id)
    }

    fn handle_register(&mut self, client: Arc<Client>) {
        // An unregister served first leaves the client closed; keep it out.
        if client.is_closed() {
            debug!(client_id = %client.id, "Closed client not registered");
            return;
        }
        debug!(client_id = %client.id, "Client registered");
        if let Some(previous) = self.clients.insert(client.id.clone(), client.clone()) {
            if !Arc::ptr_eq(&previous, &client) {
                debug!(client_id = %client.id, "Superseded stale registration");
                previous.close();
            }
        }
    }

    fn handle_unregister(&mut self, client: Arc<Client>) {
        // A stale handle must not remove the session that superseded it.
        let is_current = self
            .clients
            .get(&client.id)
            .is_some_and(|current| Arc::ptr_eq(current, &client));
        if is_current {
            self.clients.remove(&client.id);
            debug!(client_id = %client.id, "Client unregistered");
        }
        client.close();
    }

    fn handle_broadcast(&mut self, msg: &Arc<Message>) {
        debug!(topic = %msg.topic, payload = %msg.payload, "Broadcast message");

        let mut evicted = Vec::new();
        for (id, client) in &self.clients {
            if !client.is_subscribed(&msg.topic) {
                continue;
            }
            match client.try_deliver(msg.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    warn!(client_id = %id, topic = %msg.topic, "Outbound queue full, evicting slow consumer");
                    evicted.push(id.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(client_id = %id, "Outbound queue closed, removing client");
                    evicted.push(id.clone());
                }
            }
        }

        for id in evicted {
            if let Some(client) = self.clients.remove(&id) {
                client.close();
            }
        }
    }
}
