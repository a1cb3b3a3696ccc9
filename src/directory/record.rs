use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::client::Permissions;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientKind {
    Plugin,
    /// Pushes its own data.
    Sensor,
    /// Polled by the collection scheduler.
    ActiveSensor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientStatus {
    Pending,
    Active,
    Disabled,
}

/// Where and how often to pull an active sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionProfile {
    pub endpoint: String,
    pub period_secs: u64,
    #[serde(default)]
    pub auth_token: String,
    #[serde(default)]
    pub last_collection_time: Option<DateTime<Utc>>,
}

impl CollectionProfile {
    pub fn new(endpoint: impl Into<String>, period_secs: u64) -> Self {
        Self {
            endpoint: endpoint.into(),
            period_secs,
            auth_token: String::new(),
            last_collection_time: None,
        }
    }

    /// A profile that was never collected is always due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_collection_time {
            Some(last) => last
                .checked_add_signed(self.period())
                .is_some_and(|due| now >= due),
            None => true,
        }
    }

    pub fn period(&self) -> Duration {
        i64::try_from(self.period_secs)
            .ok()
            .and_then(Duration::try_seconds)
            .unwrap_or(Duration::MAX)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientRecord {
    pub id: String,
    pub name: String,
    pub kind: ClientKind,
    pub status: ClientStatus,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub collection: Option<CollectionProfile>,
}

impl ClientRecord {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: ClientKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            status: ClientStatus::Pending,
            permissions: Permissions::init_only(),
            collection: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ClientStatus::Active
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveSensor {
    pub client_id: String,
    pub profile: CollectionProfile,
}
