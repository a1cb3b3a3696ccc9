//! Client representation
//!
//! `Client` holds the sending half of a bounded per-client queue. The hub
//! pushes into it without blocking and evicts the client when it is full;
//! the transport adapter owns the receiving half and treats the end of the
//! queue as the signal to shut its writer down.
//!
//! The subscription set and permission map sit behind locks so the
//! adapter can change them while the hub loop reads them.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;
use uuid::Uuid;

use crate::broker::{Hub, Message, topic};
use crate::client::{Permission, Permissions};
use crate::utils::{HubError, Result};

pub type OutboundReceiver = mpsc::Receiver<Arc<Message>>;

#[derive(Debug)]
pub struct Client {
    pub id: String,
    hub: Hub,
    outbound: Mutex<Option<mpsc::Sender<Arc<Message>>>>,
    topics: RwLock<HashSet<String>>,
    permissions: RwLock<Permissions>,
}

impl Client {
    /// Create a client with no permissions. An empty `id` is replaced by a
    /// fresh UUID. The returned receiver is the client's outbound queue.
    pub fn new(id: impl Into<String>, hub: &Hub) -> (Arc<Self>, OutboundReceiver) {
        Self::with_permissions(id, hub, Permissions::new())
    }

    pub fn with_permissions(
        id: impl Into<String>,
        hub: &Hub,
        permissions: Permissions,
    ) -> (Arc<Self>, OutboundReceiver) {
        let mut id = id.into();
        if id.is_empty() {
            id = Uuid::new_v4().to_string();
        }

        let (tx, rx) = mpsc::channel(hub.client_queue_capacity());
        let client = Arc::new(Self {
            id,
            hub: hub.clone(),
            outbound: Mutex::new(Some(tx)),
            topics: RwLock::new(HashSet::new()),
            permissions: RwLock::new(permissions),
        });
        (client, rx)
    }

    pub fn set_permissions(&self, permissions: Permissions) {
        *write(&self.permissions) = permissions;
    }

    pub fn permissions(&self) -> Permissions {
        read(&self.permissions).clone()
    }

    pub fn can(&self, scope: &str, kind: Permission) -> bool {
        read(&self.permissions).allows(scope, kind)
    }

    /// `Ok` when the client holds `kind` on `scope`, otherwise
    /// `HubError::PermissionDenied` naming both.
    pub fn require(&self, scope: &str, kind: Permission) -> Result<()> {
        if self.can(scope, kind) {
            Ok(())
        } else {
            Err(HubError::PermissionDenied {
                scope: scope.to_string(),
                kind,
            })
        }
    }

    /// Add a subscription pattern. Ignored without Read on its scope.
    pub fn subscribe(&self, pattern: &str) {
        if !self.can(topic::scope_of(pattern), Permission::Read) {
            debug!(client_id = %self.id, topic = %pattern, "Subscribe ignored: no read permission");
            return;
        }
        write(&self.topics).insert(pattern.to_string());
    }

    pub fn unsubscribe(&self, pattern: &str) {
        write(&self.topics).remove(pattern);
    }

    pub fn topics(&self) -> Vec<String> {
        read(&self.topics).iter().cloned().collect()
    }

    /// Whether any subscription pattern accepts `message_topic`.
    pub fn is_subscribed(&self, message_topic: &str) -> bool {
        read(&self.topics)
            .iter()
            .any(|pattern| topic::matches(pattern, message_topic))
    }

    /// Push a message straight onto this client's own queue, bypassing
    /// topic matching. Used by adapters for replies such as parse errors.
    pub fn send(&self, msg: Message) -> Result<()> {
        match self.try_deliver(Arc::new(msg)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(HubError::QueueOverflow(self.id.clone())),
            Err(TrySendError::Closed(_)) => Err(HubError::QueueClosed(self.id.clone())),
        }
    }

    /// Publish through the hub. Dropped without Write on the topic's scope.
    pub fn broadcast(&self, msg: Message) {
        if !self.can(msg.scope(), Permission::Write) {
            debug!(client_id = %self.id, topic = %msg.topic, "Publish dropped: no write permission");
            return;
        }
        self.hub.broadcast(msg);
    }

    pub(crate) fn try_deliver(
        &self,
        msg: Arc<Message>,
    ) -> std::result::Result<(), TrySendError<Arc<Message>>> {
        match lock(&self.outbound).as_ref() {
            Some(tx) => tx.try_send(msg),
            None => Err(TrySendError::Closed(msg)),
        }
    }

    /// Close the outbound queue. Returns `true` only for the call that
    /// actually closed it.
    pub fn close(&self) -> bool {
        lock(&self.outbound).take().is_some()
    }

    pub fn is_closed(&self) -> bool {
        lock(&self.outbound).is_none()
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn read<T>(l: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    l.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(l: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    l.write().unwrap_or_else(PoisonError::into_inner)
}
