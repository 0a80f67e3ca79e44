//! Bounded geocoding cache with insertion-order eviction.

use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, MutexGuard};

use tracing::debug;

use crate::validation::GeocodedPlace;

/// Default number of cached addresses.
pub const DEFAULT_LOCATION_CAPACITY: usize = 1000;

#[derive(Default)]
struct Entries {
    places: HashMap<String, GeocodedPlace>,
    /// Keys in first-insertion order.
    order: VecDeque<String>,
}

/// Address → coordinates cache.
///
/// When an insert pushes the size above capacity, the oldest tenth of the
/// entries (by first insertion, not by access) is dropped. Updating an
/// existing address keeps its original position.
pub struct LocationCache {
    capacity: usize,
    entries: Mutex<Entries>,
}

impl LocationCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_LOCATION_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: Mutex::new(Entries::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, address: &str) -> Option<GeocodedPlace> {
        self.lock().places.get(address).cloned()
    }

    pub fn insert(&self, address: impl Into<String>, place: GeocodedPlace) {
        let address = address.into();
        let mut entries = self.lock();

        if entries.places.insert(address.clone(), place).is_none() {
            entries.order.push_back(address);
        }

        let len = entries.places.len();
        if len > self.capacity {
            let evict = (len / 10).max(1);
            for _ in 0..evict {
                if let Some(oldest) = entries.order.pop_front() {
                    entries.places.remove(&oldest);
                }
            }
            debug!(evicted = evict, remaining = entries.places.len(), "location cache trimmed");
        }
    }

    pub fn contains(&self, address: &str) -> bool {
        self.lock().places.contains_key(address)
    }

    pub fn len(&self) -> usize {
        self.lock().places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&self) {
        let mut entries = self.lock();
        entries.places.clear();
        entries.order.clear();
    }
}

impl Default for LocationCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(n: usize) -> GeocodedPlace {
        GeocodedPlace {
            lat: n.to_string(),
            lng: n.to_string(),
            address: format!("Street {}", n),
        }
    }

    #[test]
    fn test_eviction_drops_oldest_tenth() {
        let cache = LocationCache::new();
        for n in 0..1001 {
            cache.insert(format!("addr-{}", n), place(n));
        }
        assert_eq!(cache.len(), 901);
        for n in 0..100 {
            assert!(!cache.contains(&format!("addr-{}", n)));
        }
        assert!(cache.contains("addr-100"));
        assert!(cache.contains("addr-1000"));
    }

    #[test]
    fn test_small_capacity_is_honored() {
        let cache = LocationCache::with_capacity(5);
        for n in 0..50 {
            cache.insert(format!("a{}", n), place(n));
        }
        assert_eq!(cache.len(), 5);
        assert!(cache.contains("a49"));
        assert!(!cache.contains("a44"));
    }

    #[test]
    fn test_no_eviction_at_capacity() {
        let cache = LocationCache::with_capacity(10);
        for n in 0..10 {
            cache.insert(format!("a{}", n), place(n));
        }
        assert_eq!(cache.len(), 10);
    }

    #[test]
    fn test_update_keeps_insertion_position() {
        let cache = LocationCache::with_capacity(10);
        for n in 0..10 {
            cache.insert(format!("a{}", n), place(n));
        }
        // refreshing the oldest entry does not protect it
        cache.insert("a0", place(99));
        assert_eq!(cache.get("a0").unwrap().lat, "99");
        cache.insert("a10", place(10));
        assert_eq!(cache.len(), 10);
        assert!(!cache.contains("a0"));
        assert!(cache.contains("a1"));
    }

    #[test]
    fn test_get_miss_and_clear() {
        let cache = LocationCache::new();
        assert!(cache.get("nowhere").is_none());
        cache.insert("Paris", place(1));
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
