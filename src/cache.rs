//! Keyed cache with time-to-live expiration
//!
//! Used to remember discovery results per provider origin. Entries carry their
//! insertion time so that a cache reloaded from disk keeps expiring on the
//! original schedule.
//!
//! Reads never delete; expired entries stay in the map (and in
//! [`TtlCache::get_entries`]) until [`TtlCache::purge`] runs.

use chrono::{DateTime, Duration, SubsecRound, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Raw cache contents: key -> (insertion time, value)
pub type CacheEntries<V> = HashMap<String, (DateTime<Utc>, V)>;

#[derive(Debug, Clone, PartialEq)]
pub struct TtlCache<V> {
    entries: CacheEntries<V>,
    purge_after_seconds: i64,
}

impl<V> TtlCache<V> {
    /// Create an empty cache
    pub fn new(purge_after_seconds: i64) -> Self {
        Self {
            entries: HashMap::new(),
            purge_after_seconds,
        }
    }

    /// Create a cache seeded with entries that keep their original timestamps
    pub fn with_entries(entries: CacheEntries<V>, purge_after_seconds: i64) -> Self {
        Self {
            entries,
            purge_after_seconds,
        }
    }

    pub fn purge_after_seconds(&self) -> i64 {
        self.purge_after_seconds
    }

    /// Store a value stamped with the current time, replacing any previous entry
    pub fn put(&mut self, key: impl Into<String>, value: V) {
        self.put_at(key, value, Utc::now());
    }

    /// Store a value stamped with `now`
    ///
    /// Timestamps are kept at millisecond precision, the resolution of the
    /// persisted form.
    pub fn put_at(&mut self, key: impl Into<String>, value: V, now: DateTime<Utc>) {
        self.entries.insert(key.into(), (now.trunc_subsecs(3), value));
    }

    /// Look up a live entry
    pub fn get(&self, key: &str) -> Option<&V> {
        self.get_at(key, Utc::now())
    }

    /// Look up an entry that is still live at `now`
    pub fn get_at(&self, key: &str, now: DateTime<Utc>) -> Option<&V> {
        match self.entries.get(key) {
            Some((inserted, value)) if !self.is_expired(*inserted, now) => Some(value),
            Some(_) => {
                debug!("Cache entry for {} has expired", key);
                None
            }
            None => None,
        }
    }

    /// Snapshot of every entry, expired ones included
    pub fn get_entries(&self) -> &CacheEntries<V> {
        &self.entries
    }

    /// Remove expired entries, returning how many were dropped
    pub fn purge(&mut self) -> usize {
        self.purge_at(Utc::now())
    }

    pub fn purge_at(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl();
        self.entries.retain(|_, (inserted, _)| !expired(ttl, *inserted, now));
        let removed = before - self.entries.len();
        if removed > 0 {
            debug!("Purged {} expired cache entries", removed);
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// `None` when the lifetime does not fit a duration; such entries never expire
    fn ttl(&self) -> Option<Duration> {
        Duration::try_seconds(self.purge_after_seconds)
    }

    fn is_expired(&self, inserted: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        expired(self.ttl(), inserted, now)
    }
}

fn expired(ttl: Option<Duration>, inserted: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    match ttl {
        Some(ttl) => now.signed_duration_since(inserted) > ttl,
        None => false,
    }
}
