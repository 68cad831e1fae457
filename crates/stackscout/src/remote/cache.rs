//! Response cache for read-only remote calls
//!
//! Entries expire after their TTL and the oldest is evicted at capacity. A
//! key with a fetch outstanding holds an in-flight slot so concurrent callers
//! share one request.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use stackscout_core::ScoutError;

/// Handle every caller for one key awaits while its fetch is outstanding
pub type SharedFetch = Shared<BoxFuture<'static, Result<Value, ScoutError>>>;

#[derive(Debug, Clone)]
struct CacheEntry {
    value: Value,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_fresh(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.created_at) < self.ttl
    }
}

enum Slot {
    Ready(CacheEntry),
    InFlight { generation: u64, fetch: SharedFetch },
}

pub enum Lookup {
    Hit(Value),
    Pending(SharedFetch),
    Miss,
}

/// TTL response cache that also tracks in-flight fetches per key.
///
/// A key holds either a stored response or the one outstanding fetch for it,
/// never both. Only stored responses count towards the capacity.
pub struct ResponseCache {
    slots: HashMap<String, Slot>,
    ttl: Duration,
    capacity: usize,
    next_generation: u64,
}

impl ResponseCache {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            slots: HashMap::new(),
            ttl,
            capacity: capacity.max(1),
            next_generation: 0,
        }
    }

    pub fn lookup(&mut self, key: &str, now: Instant) -> Lookup {
        match self.slots.get(key) {
            Some(Slot::Ready(entry)) if entry.is_fresh(now) => Lookup::Hit(entry.value.clone()),
            Some(Slot::Ready(_)) => {
                self.slots.remove(key);
                Lookup::Miss
            }
            Some(Slot::InFlight { fetch, .. }) => Lookup::Pending(fetch.clone()),
            None => Lookup::Miss,
        }
    }

    /// Register the outstanding fetch for `key`; the returned generation
    /// identifies it when the fetch settles
    pub fn begin(&mut self, key: &str, fetch: SharedFetch) -> u64 {
        self.next_generation += 1;
        let generation = self.next_generation;
        self.slots
            .insert(key.to_string(), Slot::InFlight { generation, fetch });
        generation
    }

    /// Store a successful response. Ignored when the slot no longer belongs
    /// to this fetch (the cache was reset meanwhile).
    pub fn complete(&mut self, key: &str, generation: u64, value: Value, now: Instant) {
        if !self.owns(key, generation) {
            return;
        }
        self.slots.remove(key);
        self.make_room(now);
        self.slots.insert(
            key.to_string(),
            Slot::Ready(CacheEntry {
                value,
                created_at: now,
                ttl: self.ttl,
            }),
        );
    }

    /// Drop the in-flight slot of a failed fetch so the next caller retries
    pub fn abandon(&mut self, key: &str, generation: u64) {
        if self.owns(key, generation) {
            self.slots.remove(key);
        }
    }

    pub fn clear(&mut self) {
        self.slots.clear();
    }

    /// Stored responses, fresh or not
    pub fn len(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::Ready(_)))
            .count()
    }

    #[cfg(test)]
    pub fn in_flight(&self) -> usize {
        self.slots
            .values()
            .filter(|slot| matches!(slot, Slot::InFlight { .. }))
            .count()
    }

    fn owns(&self, key: &str, generation: u64) -> bool {
        matches!(
            self.slots.get(key),
            Some(Slot::InFlight { generation: g, .. }) if *g == generation
        )
    }

    /// Purge expired entries, then evict the oldest until one more fits
    fn make_room(&mut self, now: Instant) {
        self.slots.retain(|_, slot| match slot {
            Slot::Ready(entry) => entry.is_fresh(now),
            Slot::InFlight { .. } => true,
        });

        while self.len() >= self.capacity {
            let oldest = self
                .slots
                .iter()
                .filter_map(|(key, slot)| match slot {
                    Slot::Ready(entry) => Some((key.clone(), entry.created_at)),
                    Slot::InFlight { .. } => None,
                })
                .min_by_key(|(_, created_at)| *created_at)
                .map(|(key, _)| key);

            match oldest {
                Some(key) => {
                    log::debug!("cache full, evicting {key}");
                    self.slots.remove(&key);
                }
                None => break,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use serde_json::json;

    fn pending_fetch() -> SharedFetch {
        futures::future::pending::<Result<Value, ScoutError>>()
            .boxed()
            .shared()
    }

    #[test]
    fn test_miss_then_hit() {
        let mut cache = ResponseCache::new(Duration::from_secs(60), 8);
        let now = Instant::now();
        assert!(matches!(cache.lookup("k", now), Lookup::Miss));

        let generation = cache.begin("k", pending_fetch());
        assert!(matches!(cache.lookup("k", now), Lookup::Pending(_)));

        cache.complete("k", generation, json!({"v": 1}), now);
        match cache.lookup("k", now) {
            Lookup::Hit(value) => assert_eq!(value, json!({"v": 1})),
            _ => panic!("expected hit"),
        }
        assert_eq!(cache.in_flight(), 0);
    }

    #[test]
    fn test_entries_expire_after_ttl() {
        let mut cache = ResponseCache::new(Duration::from_secs(60), 8);
        let now = Instant::now();
        let generation = cache.begin("k", pending_fetch());
        cache.complete("k", generation, json!(1), now);

        let later = now + Duration::from_secs(61);
        assert!(matches!(cache.lookup("k", later), Lookup::Miss));
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_abandon_frees_the_key() {
        let mut cache = ResponseCache::new(Duration::from_secs(60), 8);
        let generation = cache.begin("k", pending_fetch());
        cache.abandon("k", generation);
        assert!(matches!(cache.lookup("k", Instant::now()), Lookup::Miss));
    }

    #[test]
    fn test_stale_generation_is_ignored() {
        let mut cache = ResponseCache::new(Duration::from_secs(60), 8);
        let now = Instant::now();
        let old = cache.begin("k", pending_fetch());
        cache.clear();
        let current = cache.begin("k", pending_fetch());

        cache.complete("k", old, json!("stale"), now);
        assert!(matches!(cache.lookup("k", now), Lookup::Pending(_)));

        cache.abandon("k", old);
        assert_eq!(cache.in_flight(), 1);

        cache.complete("k", current, json!("fresh"), now);
        assert!(matches!(cache.lookup("k", now), Lookup::Hit(v) if v == json!("fresh")));
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let mut cache = ResponseCache::new(Duration::from_secs(60), 2);
        let start = Instant::now();
        for (i, key) in ["a", "b", "c"].iter().enumerate() {
            let generation = cache.begin(key, pending_fetch());
            cache.complete(key, generation, json!(i), start + Duration::from_secs(i as u64));
        }

        let now = start + Duration::from_secs(3);
        assert_eq!(cache.len(), 2);
        assert!(matches!(cache.lookup("a", now), Lookup::Miss));
        assert!(matches!(cache.lookup("b", now), Lookup::Hit(_)));
        assert!(matches!(cache.lookup("c", now), Lookup::Hit(_)));
    }

    #[test]
    fn test_in_flight_slots_do_not_count_towards_capacity() {
        let mut cache = ResponseCache::new(Duration::from_secs(60), 1);
        let now = Instant::now();
        cache.begin("pending", pending_fetch());
        let generation = cache.begin("done", pending_fetch());
        cache.complete("done", generation, json!(true), now);

        assert_eq!(cache.len(), 1);
        assert_eq!(cache.in_flight(), 1);
    }
}
