use chrono::Duration;
use tempfile::tempdir;

use super::SledRecordStore;
use crate::alert::{AlertLevel, AlertRecord, AlertRecordStore, RecordFilter};

fn record_at(client: &str, rule: &str, offset_secs: i64) -> AlertRecord {
    let mut record = AlertRecord::new(client, rule, AlertLevel::Warning);
    record.created_at += Duration::seconds(offset_secs);
    record
}

#[tokio::test]
async fn test_records_survive_reopen() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("records");
    let path = path.to_str().unwrap();

    let record = record_at("env1", "hot", 0);
    {
        let store = SledRecordStore::open(path).unwrap();
        assert!(store.is_empty());
        store.create(&record).await.unwrap();
    }

    let store = SledRecordStore::open(path).unwrap();
    assert_eq!(store.len(), 1);
    let found = store.query(&RecordFilter::default()).await.unwrap();
    assert_eq!(found, vec![record]);
}

#[tokio::test]
async fn test_query_filters_and_orders_by_time() {
    let dir = tempdir().unwrap();
    let store = SledRecordStore::open(dir.path().join("db").to_str().unwrap()).unwrap();

    let late = record_at("env1", "hot", 20);
    let early = record_at("env1", "hot", -20);
    let other = record_at("env2", "cold", 0);
    for r in [&late, &early, &other] {
        store.create(r).await.unwrap();
    }

    let all = store.query(&RecordFilter::default()).await.unwrap();
    let ids: Vec<_> = all.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, vec![early.id.as_str(), other.id.as_str(), late.id.as_str()]);

    let env1 = RecordFilter {
        client_id: Some("env1".to_string()),
        ..Default::default()
    };
    assert_eq!(store.query(&env1).await.unwrap(), vec![early.clone(), late.clone()]);

    let window = RecordFilter {
        client_id: None,
        start: Some(early.created_at + Duration::seconds(1)),
        end: Some(late.created_at - Duration::seconds(1)),
    };
    assert_eq!(store.query(&window).await.unwrap(), vec![other.clone()]);

    let inclusive = RecordFilter {
        client_id: None,
        start: Some(late.created_at),
        end: Some(late.created_at),
    };
    assert_eq!(store.query(&inclusive).await.unwrap(), vec![late]);
}
