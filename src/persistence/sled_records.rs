use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sled::{Db, Tree};
use tracing::warn;

use crate::alert::{AlertRecord, AlertRecordStore, RecordFilter};
use crate::utils::Result;

const RECORDS_TREE: &str = "alert_records";

#[derive(Clone)]
pub struct SledRecordStore {
    db: Db,
    records: Tree,
}

impl SledRecordStore {
    pub fn open(path: &str) -> Result<Self> {
        let db = sled::open(path)?;
        let records = db.open_tree(RECORDS_TREE)?;
        Ok(Self { db, records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Big-endian millis first so keys sort by time, then the id to keep
/// records created in the same millisecond apart.
fn record_key(created_at: DateTime<Utc>, id: &str) -> Vec<u8> {
    let mut key = time_prefix(created_at).to_vec();
    key.extend_from_slice(id.as_bytes());
    key
}

fn time_prefix(at: DateTime<Utc>) -> [u8; 8] {
    at.timestamp_millis().max(0).to_be_bytes()
}

#[async_trait]
impl AlertRecordStore for SledRecordStore {
    async fn create(&self, record: &AlertRecord) -> Result<()> {
        let value = serde_json::to_vec(record)?;
        self.records
            .insert(record_key(record.created_at, &record.id), value)?;
        self.db.flush_async().await?;
        Ok(())
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<AlertRecord>> {
        let scan = match filter.start {
            Some(start) => self.records.range(time_prefix(start)..),
            None => self.records.iter(),
        };

        let mut found = Vec::new();
        for entry in scan {
            let (key, value) = entry?;
            let record: AlertRecord = match serde_json::from_slice(&value) {
                Ok(record) => record,
                Err(e) => {
                    warn!(key = ?key, error = %e, "Skipping unreadable alert record");
                    continue;
                }
            };
            if filter.end.is_some_and(|end| time_prefix(record.created_at) > time_prefix(end)) {
                break;
            }
            if filter.matches(&record) {
                found.push(record);
            }
        }
        Ok(found)
    }
}

impl std::fmt::Debug for SledRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SledRecordStore")
            .field("records", &self.records.len())
            .finish()
    }
}
