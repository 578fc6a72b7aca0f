//! Bounded short-TTL in-memory report cache.
//!
//! Absorbs repeated requests for the same ward within a short window so
//! a popular ward doesn't re-trigger the full upstream fan-out. Small
//! by design: capacity-bounded with oldest-inserted-first eviction
//! (FIFO, not LRU), process-local, explicitly constructed and injected.

use std::collections::VecDeque;
use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};

use crate::service::WardReport;

/// Default number of reports held.
pub const DEFAULT_CAPACITY: usize = 5;

/// Default time-to-live for a cached report.
pub const DEFAULT_TTL_SECONDS: i64 = 120;

struct Entry {
    ward_id: String,
    report: WardReport,
    expires_at: DateTime<Utc>,
}

/// Bounded FIFO cache of assembled ward reports.
pub struct FastCache {
    entries: Mutex<VecDeque<Entry>>,
    capacity: usize,
    ttl: Duration,
}

impl Default for FastCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, Duration::seconds(DEFAULT_TTL_SECONDS))
    }
}

impl FastCache {
    /// Creates a cache with an explicit capacity and TTL.
    #[must_use]
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            ttl,
        }
    }

    /// Returns the cached report for a ward if present and unexpired.
    ///
    /// # Panics
    ///
    /// Panics if the cache mutex is poisoned.
    #[must_use]
    pub fn get(&self, ward_id: &str, now: DateTime<Utc>) -> Option<WardReport> {
        let mut entries = self.entries.lock().expect("fast cache mutex poisoned");

        // Expired entries are dropped eagerly so capacity isn't wasted
        // on dead payloads.
        entries.retain(|entry| entry.expires_at > now);

        entries
            .iter()
            .find(|entry| entry.ward_id == ward_id)
            .map(|entry| entry.report.clone())
    }

    /// Inserts a report, evicting the oldest entry when at capacity.
    ///
    /// # Panics
    ///
    /// Panics if the cache mutex is poisoned.
    pub fn insert(&self, ward_id: String, report: WardReport, now: DateTime<Utc>) {
        let mut entries = self.entries.lock().expect("fast cache mutex poisoned");

        // Purge dead entries first so an expired payload never costs a
        // live one its slot.
        entries.retain(|entry| entry.expires_at > now && entry.ward_id != ward_id);

        while entries.len() >= self.capacity {
            entries.pop_front();
        }

        entries.push_back(Entry {
            ward_id,
            report,
            expires_at: now + self.ttl,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(ward_id: &str) -> WardReport {
        WardReport {
            ward: format!("Ward {ward_id}"),
            ward_id: ward_id.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn hit_within_ttl() {
        let cache = FastCache::default();
        let now = Utc::now();
        cache.insert("W1".to_string(), report("W1"), now);

        let hit = cache.get("W1", now + Duration::seconds(30)).unwrap();
        assert_eq!(hit.ward_id, "W1");
    }

    #[test]
    fn miss_after_expiry() {
        let cache = FastCache::default();
        let now = Utc::now();
        cache.insert("W1".to_string(), report("W1"), now);

        assert!(cache.get("W1", now + Duration::seconds(121)).is_none());
    }

    #[test]
    fn oldest_entry_evicted_at_capacity() {
        let cache = FastCache::new(2, Duration::seconds(600));
        let now = Utc::now();
        cache.insert("W1".to_string(), report("W1"), now);
        cache.insert("W2".to_string(), report("W2"), now + Duration::seconds(1));
        cache.insert("W3".to_string(), report("W3"), now + Duration::seconds(2));

        let later = now + Duration::seconds(3);
        assert!(cache.get("W1", later).is_none());
        assert!(cache.get("W2", later).is_some());
        assert!(cache.get("W3", later).is_some());
    }

    #[test]
    fn expired_entries_purged_before_capacity_eviction() {
        let cache = FastCache::new(2, Duration::seconds(10));
        let now = Utc::now();
        cache.insert("W1".to_string(), report("W1"), now);
        cache.insert("W2".to_string(), report("W2"), now + Duration::seconds(5));

        // W1 is expired by now; inserting at capacity must drop it, not
        // the still-live W2.
        let later = now + Duration::seconds(11);
        cache.insert("W3".to_string(), report("W3"), later);

        assert!(cache.get("W2", later).is_some());
        assert!(cache.get("W3", later).is_some());
    }

    #[test]
    fn reinsert_replaces_existing_entry() {
        let cache = FastCache::new(2, Duration::seconds(600));
        let now = Utc::now();
        cache.insert("W1".to_string(), report("W1"), now);
        cache.insert("W1".to_string(), report("W1"), now + Duration::seconds(1));
        cache.insert("W2".to_string(), report("W2"), now + Duration::seconds(2));

        let later = now + Duration::seconds(3);
        assert!(cache.get("W1", later).is_some());
        assert!(cache.get("W2", later).is_some());
    }
}
