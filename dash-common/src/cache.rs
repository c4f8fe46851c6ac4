//! Two-tier cache store for instant display on restart
//!
//! The memory tier is authoritative for the running process. The durable tier
//! (one JSON file per key by default) lets a restarted process show the last
//! collection it fetched before the first network round-trip completes.
//!
//! Staleness is informational only: [`CacheStore::get`] always returns the most
//! recently written value, however old it is.

use crate::{time, Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Prefix applied to every key in the durable tier
pub const CACHE_PREFIX: &str = "dashboard_cache_";

/// Default validity window for an entry
pub const DEFAULT_TTL: Duration = Duration::from_secs(60);

/// Key reported by whole-store failures
const ALL_KEYS: &str = "*";

/// A cached value with its creation time and validity window
///
/// Serialized as `{ "data": ..., "timestamp": <epoch ms>, "ttl": <ms> }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Creation time, milliseconds since the Unix epoch
    pub timestamp: i64,
    /// Validity window in milliseconds
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    /// Whether the entry is older than its ttl at `now_millis`
    pub fn is_stale_at(&self, now_millis: i64) -> bool {
        now_millis - self.timestamp > self.ttl as i64
    }
}

/// Durable key-value backing for the cache
pub trait DurableStore: Send + Sync {
    /// Load the serialized entry for `key`, `Ok(None)` when absent
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Persist the serialized entry for `key`
    fn store(&self, key: &str, payload: &str) -> Result<()>;

    /// Remove the entry for `key` (absent keys are not an error)
    fn remove(&self, key: &str) -> Result<()>;

    /// Remove every entry this store owns
    fn clear(&self) -> Result<()>;
}

/// Durable tier backed by a directory of `dashboard_cache_<key>.json` files
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` for cache files, creating it if missing
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{CACHE_PREFIX}{key}.json"))
    }
}

impl DurableStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(Error::storage(key, e)),
        }
    }

    fn store(&self, key: &str, payload: &str) -> Result<()> {
        // Write-then-rename; readers never see a partial entry
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, payload)
            .and_then(|()| std::fs::rename(&tmp, &path))
            .map_err(|e| Error::storage(key, e))
    }

    fn remove(&self, key: &str) -> Result<()> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::storage(key, e)),
        }
    }

    fn clear(&self) -> Result<()> {
        let entries = std::fs::read_dir(&self.dir).map_err(|e| Error::storage(ALL_KEYS, e))?;
        for entry in entries {
            let entry = entry.map_err(|e| Error::storage(ALL_KEYS, e))?;
            let name = entry.file_name();
            if name.to_string_lossy().starts_with(CACHE_PREFIX) {
                std::fs::remove_file(entry.path()).map_err(|e| Error::storage(ALL_KEYS, e))?;
            }
        }
        Ok(())
    }
}

/// Process-wide cache shared by every data source
///
/// Constructed once and passed to each source; there is no global instance.
pub struct CacheStore {
    memory: RwLock<HashMap<String, CacheEntry<Value>>>,
    durable: Option<Box<dyn DurableStore>>,
}

impl CacheStore {
    /// Cache with a durable tier
    pub fn new(durable: impl DurableStore + 'static) -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            durable: Some(Box::new(durable)),
        }
    }

    /// Memory-only cache (nothing survives a restart)
    pub fn in_memory() -> Self {
        Self {
            memory: RwLock::new(HashMap::new()),
            durable: None,
        }
    }

    /// Store `data` under `key`, replacing any previous value
    ///
    /// Durable-tier failures are logged and swallowed; the memory tier always
    /// receives the write. Only a value that cannot be represented as JSON is
    /// reported as an error.
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Duration) -> Result<()> {
        let entry = CacheEntry {
            data: serde_json::to_value(data)?,
            timestamp: time::now_millis(),
            ttl: ttl.as_millis() as u64,
        };

        if let Some(durable) = &self.durable {
            let persisted = serde_json::to_string(&entry)
                .map_err(Error::from)
                .and_then(|payload| durable.store(key, &payload));
            if let Err(e) = persisted {
                warn!(key = %key, error = %e, "Failed to persist cache entry");
            }
        }

        self.write_memory().insert(key.to_string(), entry);
        Ok(())
    }

    /// Most recently written value for `key`, stale or not
    ///
    /// A memory miss consults the durable tier and promotes a hit into memory.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let entry = self.entry(key)?;
        match serde_json::from_value(entry.data) {
            Ok(data) => Some(data),
            Err(e) => {
                warn!(key = %key, error = %e, "Cached entry does not match requested type");
                None
            }
        }
    }

    /// Whether the entry for `key` has outlived its ttl (missing counts as stale)
    pub fn is_stale(&self, key: &str) -> bool {
        match self.entry(key) {
            Some(entry) => entry.is_stale_at(time::now_millis()),
            None => true,
        }
    }

    /// Creation time of the entry for `key`, in epoch milliseconds
    pub fn timestamp(&self, key: &str) -> Option<i64> {
        self.entry(key).map(|entry| entry.timestamp)
    }

    /// Drop one key, or every key when `key` is `None`
    pub fn clear(&self, key: Option<&str>) {
        match key {
            Some(key) => {
                self.write_memory().remove(key);
                if let Some(durable) = &self.durable {
                    if let Err(e) = durable.remove(key) {
                        warn!(key = %key, error = %e, "Failed to remove durable cache entry");
                    }
                }
            }
            None => {
                self.write_memory().clear();
                if let Some(durable) = &self.durable {
                    if let Err(e) = durable.clear() {
                        warn!(error = %e, "Failed to clear durable cache");
                    }
                }
            }
        }
    }

    fn entry(&self, key: &str) -> Option<CacheEntry<Value>> {
        if let Some(entry) = self.read_memory().get(key) {
            return Some(entry.clone());
        }

        let durable = self.durable.as_ref()?;
        let loaded = durable.load(key).and_then(|payload| match payload {
            Some(payload) => serde_json::from_str::<CacheEntry<Value>>(&payload)
                .map(Some)
                .map_err(|source| Error::CorruptEntry {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(None),
        });

        match loaded {
            Ok(Some(entry)) => {
                debug!(key = %key, "Promoting durable cache entry into memory");
                self.write_memory().insert(key.to_string(), entry.clone());
                Some(entry)
            }
            Ok(None) => None,
            Err(e) => {
                warn!(key = %key, error = %e, "Failed to read durable cache entry");
                None
            }
        }
    }

    fn read_memory(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, CacheEntry<Value>>> {
        // A panic while holding the lock cannot leave a half-written map
        self.memory.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_memory(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, CacheEntry<Value>>> {
        self.memory.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    struct FailingStore;

    fn denied(key: &str) -> Error {
        let source = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "storage disabled");
        Error::storage(key, source)
    }

    impl DurableStore for FailingStore {
        fn load(&self, key: &str) -> Result<Option<String>> {
            Err(denied(key))
        }
        fn store(&self, key: &str, _payload: &str) -> Result<()> {
            Err(denied(key))
        }
        fn remove(&self, key: &str) -> Result<()> {
            Err(denied(key))
        }
        fn clear(&self) -> Result<()> {
            Err(denied(ALL_KEYS))
        }
    }

    #[test]
    fn test_set_then_get_returns_value() {
        let cache = CacheStore::in_memory();
        cache.set("k", &vec![1, 2, 3], DEFAULT_TTL).unwrap();
        assert_eq!(cache.get::<Vec<i32>>("k"), Some(vec![1, 2, 3]));
    }

    #[test]
    fn test_get_missing_is_none_and_stale() {
        let cache = CacheStore::in_memory();
        assert_eq!(cache.get::<String>("missing"), None);
        assert!(cache.is_stale("missing"));
    }

    #[test]
    fn test_stale_entry_is_still_returned() {
        let cache = CacheStore::in_memory();
        cache.set("k", &"v", Duration::ZERO).unwrap();
        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.is_stale("k"));
        assert_eq!(cache.get::<String>("k").as_deref(), Some("v"));
    }

    #[test]
    fn test_fresh_entry_is_not_stale() {
        let cache = CacheStore::in_memory();
        cache.set("k", &1, DEFAULT_TTL).unwrap();
        assert!(!cache.is_stale("k"));
    }

    #[test]
    fn test_overwrite_keeps_latest() {
        let cache = CacheStore::in_memory();
        cache.set("k", &"first", DEFAULT_TTL).unwrap();
        cache.set("k", &"second", DEFAULT_TTL).unwrap();
        assert_eq!(cache.get::<String>("k").as_deref(), Some("second"));
    }

    #[test]
    fn test_durable_failures_are_swallowed() {
        let cache = CacheStore::new(FailingStore);
        cache.set("k", &42, DEFAULT_TTL).unwrap();
        assert_eq!(cache.get::<i32>("k"), Some(42));

        cache.clear(Some("k"));
        assert_eq!(cache.get::<i32>("k"), None);
    }

    #[test]
    fn test_durable_file_layout() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let cache = CacheStore::new(store);
        cache.set("sales_data", &vec!["a"], DEFAULT_TTL).unwrap();

        let path = dir.path().join("dashboard_cache_sales_data.json");
        let raw: Value = serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(raw["data"], serde_json::json!(["a"]));
        assert_eq!(raw["ttl"], 60_000);
        assert!(raw["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn test_clear_all_removes_only_prefixed_files() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("unrelated.txt"), "keep").unwrap();
        let cache = CacheStore::new(FileStore::open(dir.path()).unwrap());
        cache.set("a", &1, DEFAULT_TTL).unwrap();
        cache.set("b", &2, DEFAULT_TTL).unwrap();

        cache.clear(None);

        assert_eq!(cache.get::<i32>("a"), None);
        assert_eq!(cache.get::<i32>("b"), None);
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_type_mismatch_reads_as_none() {
        let cache = CacheStore::in_memory();
        cache.set("k", &"text", DEFAULT_TTL).unwrap();
        assert_eq!(cache.get::<Vec<u8>>("k"), None);
    }

    #[test]
    fn test_file_store_errors_name_the_key() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("cache")).unwrap();
        std::fs::remove_dir_all(store.dir()).unwrap();

        match store.store("hr_data", "{}") {
            Err(Error::Storage { key, .. }) => assert_eq!(key, "hr_data"),
            other => panic!("expected storage error, got {:?}", other),
        }
        assert!(matches!(store.clear(), Err(Error::Storage { .. })));
    }

    #[test]
    fn test_corrupt_durable_entry_is_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("dashboard_cache_k.json"), "{not json").unwrap();
        let cache = CacheStore::new(FileStore::open(dir.path()).unwrap());

        assert_eq!(cache.get::<i32>("k"), None);
        assert!(cache.is_stale("k"));
    }
}
