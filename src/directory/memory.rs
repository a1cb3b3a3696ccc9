use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::sync::RwLock;

use crate::directory::{
    ActiveSensor, ClientDirectory, ClientKind, ClientRecord, CollectionSource,
};
use crate::utils::{HubError, Result};

#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    records: RwLock<HashMap<String, ClientRecord>>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a directory from a JSON array of client records. A missing file
    /// yields an empty directory.
    pub async fn load_json(path: impl AsRef<Path>) -> Result<Self> {
        let text = match fs::read_to_string(path.as_ref()).await {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::new()),
            Err(e) => return Err(e.into()),
        };
        let records: Vec<ClientRecord> = serde_json::from_str(&text)?;
        Ok(Self {
            records: RwLock::new(records.into_iter().map(|r| (r.id.clone(), r)).collect()),
        })
    }

    /// Insert or replace a record.
    pub async fn insert(&self, record: ClientRecord) {
        self.records.write().await.insert(record.id.clone(), record);
    }

    pub async fn remove(&self, id: &str) -> Option<ClientRecord> {
        self.records.write().await.remove(id)
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }
}

#[async_trait]
impl ClientDirectory for InMemoryDirectory {
    async fn find_client(&self, id: &str) -> Result<Option<ClientRecord>> {
        Ok(self.records.read().await.get(id).cloned())
    }
}

#[async_trait]
impl CollectionSource for InMemoryDirectory {
    async fn list_active_sensors_with_profile(&self) -> Result<Vec<ActiveSensor>> {
        let records = self.records.read().await;
        Ok(records
            .values()
            .filter(|r| r.is_active() && r.kind == ClientKind::ActiveSensor)
            .filter_map(|r| {
                r.collection.as_ref().map(|profile| ActiveSensor {
                    client_id: r.id.clone(),
                    profile: profile.clone(),
                })
            })
            .collect())
    }

    async fn mark_collected(&self, client_id: &str, at: DateTime<Utc>) -> Result<()> {
        let mut records = self.records.write().await;
        let profile = records
            .get_mut(client_id)
            .and_then(|r| r.collection.as_mut())
            .ok_or_else(|| HubError::Storage(format!("no collection profile for {client_id}")))?;
        profile.last_collection_time = Some(at);
        Ok(())
    }
}
