//! Photolock - Persisted Key-Value Store
//!
//! The lock subsystem keeps hashes, counters and scheme config in a durable
//! string/bool/int map supplied by the host application. The trait here is the
//! seam; `MemoryStore` backs tests and `JsonFileStore` backs the CLI.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;
use serde_json::{Map, Value};

use crate::error::LockResult;

/// Change notification emitted on every write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A key was written or overwritten
    Set(String),
    /// A key was removed
    Removed(String),
    /// Everything was wiped
    Cleared,
}

/// Durable key-value store for preferences, hashes and counters.
pub trait KeyValueStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn set_string(&self, key: &str, value: &str) -> LockResult<()>;

    fn get_bool(&self, key: &str) -> Option<bool>;
    fn set_bool(&self, key: &str, value: bool) -> LockResult<()>;

    fn get_i64(&self, key: &str) -> Option<i64>;
    fn set_i64(&self, key: &str, value: i64) -> LockResult<()>;

    fn remove(&self, key: &str) -> LockResult<()>;

    /// List keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Vec<String>;

    /// Wipe every key. Used by the full security reset.
    fn clear_all(&self) -> LockResult<()>;

    /// Subscribe to change events.
    fn subscribe(&self) -> Receiver<StoreEvent>;
}

// ═══════════════════════════════════════════════════════════════════════════
// MemoryStore
// ═══════════════════════════════════════════════════════════════════════════

/// In-memory store used by unit tests and as a default collaborator.
pub struct MemoryStore {
    map: RwLock<HashMap<String, String>>,
    subscribers: RwLock<Vec<Sender<StoreEvent>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            map: RwLock::new(HashMap::new()),
            subscribers: RwLock::new(Vec::new()),
        }
    }

    fn notify(&self, event: StoreEvent) {
        // Drop senders whose receiver side is gone.
        self.subscribers
            .write()
            .retain(|tx| tx.send(event.clone()).is_ok());
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.map.read().get(key).cloned()
    }

    fn set_string(&self, key: &str, value: &str) -> LockResult<()> {
        self.map.write().insert(key.to_string(), value.to_string());
        self.notify(StoreEvent::Set(key.to_string()));
        Ok(())
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_string(key).and_then(|v| v.parse().ok())
    }

    fn set_bool(&self, key: &str, value: bool) -> LockResult<()> {
        self.set_string(key, if value { "true" } else { "false" })
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.get_string(key).and_then(|v| v.parse().ok())
    }

    fn set_i64(&self, key: &str, value: i64) -> LockResult<()> {
        self.set_string(key, &value.to_string())
    }

    fn remove(&self, key: &str) -> LockResult<()> {
        self.map.write().remove(key);
        self.notify(StoreEvent::Removed(key.to_string()));
        Ok(())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.map
            .read()
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }

    fn clear_all(&self) -> LockResult<()> {
        self.map.write().clear();
        self.notify(StoreEvent::Cleared);
        Ok(())
    }

    fn subscribe(&self) -> Receiver<StoreEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.write().push(tx);
        rx
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// JsonFileStore
// ═══════════════════════════════════════════════════════════════════════════

/// File-backed store: a flat JSON object persisted atomically on every write.
///
/// Small and write-rarely by design; the lock subsystem only touches a handful
/// of keys per verification.
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    pub fn open<P: AsRef<Path>>(path: P) -> LockResult<Self> {
        let path = path.as_ref().to_path_buf();
        let inner = MemoryStore::new();

        if path.exists() {
            let data = std::fs::read_to_string(&path)?;
            let parsed: Map<String, Value> = serde_json::from_str(&data)?;
            for (k, v) in parsed {
                if let Value::String(s) = v {
                    inner.set_string(&k, &s)?;
                }
            }
        }

        Ok(Self { path, inner })
    }

    fn flush(&self) -> LockResult<()> {
        let mut obj = Map::new();
        for key in self.inner.keys_with_prefix("") {
            if let Some(v) = self.inner.get_string(&key) {
                obj.insert(key, Value::String(v));
            }
        }
        let data = serde_json::to_vec_pretty(&Value::Object(obj))?;

        // Atomic write: temp file then rename.
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, &data)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get_string(&self, key: &str) -> Option<String> {
        self.inner.get_string(key)
    }

    fn set_string(&self, key: &str, value: &str) -> LockResult<()> {
        self.inner.set_string(key, value)?;
        self.flush()
    }

    fn get_bool(&self, key: &str) -> Option<bool> {
        self.inner.get_bool(key)
    }

    fn set_bool(&self, key: &str, value: bool) -> LockResult<()> {
        self.inner.set_bool(key, value)?;
        self.flush()
    }

    fn get_i64(&self, key: &str) -> Option<i64> {
        self.inner.get_i64(key)
    }

    fn set_i64(&self, key: &str, value: i64) -> LockResult<()> {
        self.inner.set_i64(key, value)?;
        self.flush()
    }

    fn remove(&self, key: &str) -> LockResult<()> {
        self.inner.remove(key)?;
        self.flush()
    }

    fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.inner.keys_with_prefix(prefix)
    }

    fn clear_all(&self) -> LockResult<()> {
        self.inner.clear_all()?;
        self.flush()
    }

    fn subscribe(&self) -> Receiver<StoreEvent> {
        self.inner.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_memory_store_types() {
        let store = MemoryStore::new();

        store.set_string("s", "hello").unwrap();
        store.set_bool("b", true).unwrap();
        store.set_i64("i", -42).unwrap();

        assert_eq!(store.get_string("s").as_deref(), Some("hello"));
        assert_eq!(store.get_bool("b"), Some(true));
        assert_eq!(store.get_i64("i"), Some(-42));
        assert_eq!(store.get_string("missing"), None);
    }

    #[test]
    fn test_prefix_and_clear() {
        let store = MemoryStore::new();
        store.set_string("pin.hash", "x").unwrap();
        store.set_string("pin.salt", "y").unwrap();
        store.set_string("decoy.a", "true").unwrap();

        let mut keys = store.keys_with_prefix("pin.");
        keys.sort();
        assert_eq!(keys, vec!["pin.hash", "pin.salt"]);

        store.clear_all().unwrap();
        assert!(store.keys_with_prefix("").is_empty());
    }

    #[test]
    fn test_subscription_events() {
        let store = MemoryStore::new();
        let rx = store.subscribe();

        store.set_string("k", "v").unwrap();
        store.remove("k").unwrap();

        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Set("k".into()));
        assert_eq!(rx.try_recv().unwrap(), StoreEvent::Removed("k".into()));
    }

    #[test]
    fn test_json_file_store_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.json");

        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set_string("pin.hash", "abc123").unwrap();
            store.set_i64("auth.failed_count", 3).unwrap();
        }

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get_string("pin.hash").as_deref(), Some("abc123"));
        assert_eq!(reopened.get_i64("auth.failed_count"), Some(3));
    }
}
