//! Cache store persistence across process restarts
//!
//! A "restart" is modelled by dropping the CacheStore and opening a new one
//! on the same directory.

use dash_common::cache::DEFAULT_TTL;
use dash_common::{CacheStore, FileStore};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Row {
    id: String,
    amount: f64,
}

fn rows() -> Vec<Row> {
    vec![
        Row {
            id: "A-1".to_string(),
            amount: 12.5,
        },
        Row {
            id: "A-2".to_string(),
            amount: 40.0,
        },
    ]
}

fn open(dir: &TempDir) -> CacheStore {
    CacheStore::new(FileStore::open(dir.path()).expect("Should open cache dir"))
}

#[test]
fn test_entry_survives_restart() {
    let dir = TempDir::new().unwrap();
    open(&dir).set("sales_data", &rows(), DEFAULT_TTL).unwrap();

    let reopened = open(&dir);
    assert_eq!(reopened.get::<Vec<Row>>("sales_data"), Some(rows()));
    assert!(!reopened.is_stale("sales_data"));
    assert!(reopened.timestamp("sales_data").is_some());
}

#[test]
fn test_stale_entry_still_served_after_restart() {
    let dir = TempDir::new().unwrap();
    open(&dir).set("hr_data", &rows(), Duration::ZERO).unwrap();
    std::thread::sleep(Duration::from_millis(5));

    let reopened = open(&dir);
    assert!(reopened.is_stale("hr_data"));
    assert_eq!(reopened.get::<Vec<Row>>("hr_data"), Some(rows()));
}

#[test]
fn test_clear_removes_durable_copy() {
    let dir = TempDir::new().unwrap();
    let cache = open(&dir);
    cache.set("finance_data", &rows(), DEFAULT_TTL).unwrap();
    cache.set("support_data", &rows(), DEFAULT_TTL).unwrap();
    cache.clear(Some("finance_data"));

    let reopened = open(&dir);
    assert_eq!(reopened.get::<Vec<Row>>("finance_data"), None);
    assert_eq!(reopened.get::<Vec<Row>>("support_data"), Some(rows()));

    reopened.clear(None);
    assert_eq!(open(&dir).get::<Vec<Row>>("support_data"), None);
}

#[test]
fn test_corrupt_file_reads_as_miss() {
    let dir = TempDir::new().unwrap();
    std::fs::write(dir.path().join("dashboard_cache_sales_data.json"), "{ truncated").unwrap();

    let cache = open(&dir);
    assert_eq!(cache.get::<Vec<Row>>("sales_data"), None);
    assert!(cache.is_stale("sales_data"));

    // A fresh write replaces the corrupt file
    cache.set("sales_data", &rows(), DEFAULT_TTL).unwrap();
    assert_eq!(open(&dir).get::<Vec<Row>>("sales_data"), Some(rows()));
}
