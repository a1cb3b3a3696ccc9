//! Client directory
//!
//! The hub does not own client provisioning. It asks a directory who a
//! client is (status, permissions) when a connection is admitted, and asks a
//! collection source which active sensors should be polled. Both are traits
//! so the embedding process can back them with its own storage;
//! `InMemoryDirectory` implements both for tests and single-node setups.

pub mod memory;
pub mod record;

pub use memory::InMemoryDirectory;
pub use record::{ActiveSensor, ClientKind, ClientRecord, ClientStatus, CollectionProfile};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::utils::Result;

#[async_trait]
pub trait ClientDirectory: Send + Sync {
    async fn find_client(&self, id: &str) -> Result<Option<ClientRecord>>;
}

#[async_trait]
pub trait CollectionSource: Send + Sync {
    /// Active sensor-class clients that carry a collection profile.
    async fn list_active_sensors_with_profile(&self) -> Result<Vec<ActiveSensor>>;

    /// Record a successful pull so the next period starts from `at`.
    async fn mark_collected(&self, client_id: &str, at: DateTime<Utc>) -> Result<()>;
}
