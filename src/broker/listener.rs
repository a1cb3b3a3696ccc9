//! Internal listener registry
//!
//! In-process modules (alert evaluation, time-series forwarding) observe the
//! broadcast stream here instead of holding a `Client`. Each listener is
//! registered under a subscription pattern and receives every broadcast
//! whose topic the pattern matches.
//!
//! Dispatch spawns one task per matching listener, so a slow callback never
//! holds up the hub or the other listeners. Nothing orders listener
//! callbacks against each other or against client delivery.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use tokio::runtime::Handle;
use tracing::warn;
use uuid::Uuid;

use crate::broker::engine::Hub;
use crate::broker::message::Message;
use crate::broker::topic;

pub type ListenerId = String;

#[async_trait]
pub trait Listener: Send + Sync {
    async fn on_message(&self, hub: &Hub, msg: &Message);
}

struct ListenerItem {
    id: ListenerId,
    listener: Arc<dyn Listener>,
}

#[derive(Default)]
pub struct ListenerRegistry {
    by_pattern: RwLock<HashMap<String, Vec<ListenerItem>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_topic_listener(&self, pattern: &str, listener: Arc<dyn Listener>) -> ListenerId {
        let id = Uuid::new_v4().to_string();
        self.by_pattern
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(pattern.to_string())
            .or_default()
            .push(ListenerItem {
                id: id.clone(),
                listener,
            });
        id
    }

    /// Returns `false` when nothing was registered under that pattern and id.
    pub fn remove_topic_listener(&self, pattern: &str, id: &str) -> bool {
        let mut by_pattern = self.by_pattern.write().unwrap_or_else(PoisonError::into_inner);
        let Some(items) = by_pattern.get_mut(pattern) else {
            return false;
        };
        let before = items.len();
        items.retain(|item| item.id != id);
        let removed = items.len() != before;
        if items.is_empty() {
            by_pattern.remove(pattern);
        }
        removed
    }

    pub fn add_listener(&self, listener: Arc<dyn Listener>) -> ListenerId {
        self.add_topic_listener(topic::WILDCARD, listener)
    }

    pub fn remove_listener(&self, id: &str) -> bool {
        self.remove_topic_listener(topic::WILDCARD, id)
    }

    pub fn len(&self) -> usize {
        self.by_pattern
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Listeners whose pattern accepts `message_topic`.
    pub fn matching(&self, message_topic: &str) -> Vec<Arc<dyn Listener>> {
        self.by_pattern
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|(pattern, _)| topic::matches(pattern, message_topic))
            .flat_map(|(_, items)| items.iter().map(|item| item.listener.clone()))
            .collect()
    }

    pub(crate) fn dispatch(&self, hub: &Hub, msg: Arc<Message>) {
        let targets = self.matching(&msg.topic);
        if targets.is_empty() {
            return;
        }

        let Ok(runtime) = Handle::try_current() else {
            warn!(topic = %msg.topic, "No async runtime, listener dispatch skipped");
            return;
        };

        for listener in targets {
            let hub = hub.clone();
            let msg = msg.clone();
            runtime.spawn(async move {
                listener.on_message(&hub, &msg).await;
            });
        }
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistry")
            .field("listeners", &self.len())
            .finish()
    }
}

/// Wrap a plain closure as a listener.
pub fn listener_fn<F>(f: F) -> Arc<dyn Listener>
where
    F: Fn(&Hub, &Message) + Send + Sync + 'static,
{
    Arc::new(FnListener(f))
}

struct FnListener<F>(F);

#[async_trait]
impl<F> Listener for FnListener<F>
where
    F: Fn(&Hub, &Message) + Send + Sync + 'static,
{
    async fn on_message(&self, hub: &Hub, msg: &Message) {
        (self.0)(hub, msg)
    }
}
