//! Time-limited cache for rendered board resources.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde_json::Value;

/// Default resource lifetime (five minutes).
pub const DEFAULT_RESOURCE_TTL: Duration = Duration::from_secs(300);

struct Stored {
    value: Value,
    stored_at: Instant,
}

/// Resource name → JSON value, each entry valid for `ttl`.
pub struct ResourceCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, Stored>>,
}

impl ResourceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Stored>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// The cached value if it is younger than the TTL. Expired entries are
    /// dropped on read.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some(stored) if stored.stored_at.elapsed() < self.ttl => Some(stored.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: impl Into<String>, value: Value) {
        self.lock().insert(
            key.into(),
            Stored {
                value,
                stored_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&self, key: &str) {
        self.lock().remove(key);
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Names of the entries currently held, fresh or not.
    pub fn keys(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_RESOURCE_TTL)
    }
}
