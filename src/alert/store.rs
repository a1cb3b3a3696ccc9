//! Durable storage seams for the alert engine
//!
//! `RuleStore` holds rule definitions, `AlertRecordStore` holds fired
//! alerts. `FileRuleStore` keeps one `<name>.json` per rule in a directory;
//! the sled-backed record store lives in `persistence`.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{error, warn};

use crate::alert::rule::{AlertRecord, AlertRule, RecordFilter};
use crate::utils::Result;

#[async_trait]
pub trait RuleStore: Send + Sync {
    async fn load(&self) -> Result<Vec<AlertRule>>;
    async fn save(&self, rule: &AlertRule) -> Result<()>;
    async fn delete(&self, name: &str) -> Result<()>;
}

#[async_trait]
pub trait AlertRecordStore: Send + Sync {
    async fn create(&self, record: &AlertRecord) -> Result<()>;
    /// Matching records, oldest first.
    async fn query(&self, filter: &RecordFilter) -> Result<Vec<AlertRecord>>;
}

#[derive(Debug, Clone)]
pub struct FileRuleStore {
    dir: PathBuf,
}

impl FileRuleStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn rule_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl RuleStore for FileRuleStore {
    /// Read every `*.json` file in the directory, creating it when missing.
    /// Unreadable or unparsable files are logged and skipped.
    async fn load(&self) -> Result<Vec<AlertRule>> {
        fs::create_dir_all(&self.dir).await?;

        let mut paths = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let is_json = path.extension().is_some_and(|ext| ext == "json");
            if is_json && entry.file_type().await?.is_file() {
                paths.push(path);
            }
        }
        paths.sort();

        let mut rules = Vec::with_capacity(paths.len());
        for path in paths {
            let text = match fs::read_to_string(&path).await {
                Ok(text) => text,
                Err(e) => {
                    error!(path = %path.display(), error = %e, "Failed to read alert rule");
                    continue;
                }
            };
            match serde_json::from_str::<AlertRule>(&text) {
                Ok(rule) => rules.push(rule),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Failed to parse alert rule");
                }
            }
        }
        Ok(rules)
    }

    async fn save(&self, rule: &AlertRule) -> Result<()> {
        fs::create_dir_all(&self.dir).await?;
        let body = serde_json::to_vec_pretty(rule)?;

        // write-then-rename so a crash never leaves half a rule behind
        let target = self.rule_path(&rule.name);
        let tmp = self.dir.join(format!(".{}.json.tmp", rule.name));
        fs::write(&tmp, body).await?;
        fs::rename(&tmp, &target).await?;
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.rule_path(name)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Record store kept in memory. Used when no database path is configured
/// and in tests.
#[derive(Debug, Default)]
pub struct MemoryRecordStore {
    records: Mutex<Vec<AlertRecord>>,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl AlertRecordStore for MemoryRecordStore {
    async fn create(&self, record: &AlertRecord) -> Result<()> {
        self.records.lock().await.push(record.clone());
        Ok(())
    }

    async fn query(&self, filter: &RecordFilter) -> Result<Vec<AlertRecord>> {
        let records = self.records.lock().await;
        Ok(records.iter().filter(|r| filter.matches(r)).cloned().collect())
    }
}
