//! Expiring cache for fetched calendar events.
//!
//! The slot computation itself never caches. This type is for the layer that
//! fetches events: it remembers the events of one calendar over one time
//! range for a short freshness window, so several surfaces asking for
//! availability in quick succession share a single fetch.
//!
//! Range bounds are rounded down to the minute before keying, so requests
//! issued a few seconds apart hit the same entry. Time comes from an injected
//! [`Clock`]; tests drive it with [`ManualClock`].

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Duration, DurationRound, Utc};

use crate::event::RawEvent;

/// How long fetched events stay fresh by default, in seconds.
pub const DEFAULT_FRESHNESS_SECS: i64 = 60;

/// Source of the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to. Clones share the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Identity of one fetch: a calendar and a time range.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    calendar_id: String,
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
}

impl CacheKey {
    pub fn new(calendar_id: impl Into<String>, time_min: DateTime<Utc>, time_max: DateTime<Utc>) -> Self {
        Self {
            calendar_id: calendar_id.into(),
            time_min: round_to_minute(time_min),
            time_max: round_to_minute(time_max),
        }
    }

    pub fn calendar_id(&self) -> &str {
        &self.calendar_id
    }
}

fn round_to_minute(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.duration_trunc(Duration::minutes(1)).unwrap_or(dt)
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    stored_at: DateTime<Utc>,
}

/// Thread-safe event cache with a freshness window.
#[derive(Debug)]
pub struct EventCache<V = Vec<RawEvent>, C = SystemClock>
where
    V: Clone,
    C: Clock,
{
    entries: RwLock<HashMap<CacheKey, Entry<V>>>,
    freshness: Duration,
    clock: C,
}

impl<V: Clone> EventCache<V, SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(Duration::seconds(DEFAULT_FRESHNESS_SECS), SystemClock)
    }
}

impl<V: Clone> Default for EventCache<V, SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V, C> EventCache<V, C>
where
    V: Clone,
    C: Clock,
{
    pub fn with_clock(freshness: Duration, clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            freshness,
            clock,
        }
    }

    /// The cached value for `key`, if it is still fresh.
    ///
    /// Stale entries are evicted on lookup.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                Some(entry) if now - entry.stored_at < self.freshness => {
                    tracing::trace!(calendar = %key.calendar_id, "event cache hit");
                    return Some(entry.value.clone());
                }
                None => {
                    tracing::trace!(calendar = %key.calendar_id, "event cache miss");
                    return None;
                }
                Some(_) => {}
            }
        }
        tracing::trace!(calendar = %key.calendar_id, "event cache entry expired");
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        None
    }

    pub fn insert(&self, key: CacheKey, value: V) {
        let entry = Entry {
            value,
            stored_at: self.clock.now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, entry);
    }

    /// Return the fresh value for `key`, or fetch, store and return a new one.
    ///
    /// Fetch errors are passed through and nothing is stored.
    pub fn get_or_try_insert_with<E>(
        &self,
        key: CacheKey,
        fetch: impl FnOnce() -> Result<V, E>,
    ) -> Result<V, E> {
        if let Some(value) = self.get(&key) {
            return Ok(value);
        }
        let value = fetch()?;
        self.insert(key, value.clone());
        Ok(value)
    }

    /// Drop the entry for `key`. Returns whether one existed.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
            .is_some()
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = self.clock.now();
        let freshness = self.freshness;
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|_, entry| now - entry.stored_at < freshness);
    }

    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
