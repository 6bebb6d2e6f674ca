//! In-memory cache implementation.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, instrument, trace};
use xbrl_core::{CacheStats, ConceptDefinition, TaxonomyCache, TaxonomySchema};

/// Default number of schemas kept.
pub const DEFAULT_MAX_SCHEMAS: usize = 100;
/// Default number of concept definitions kept.
pub const DEFAULT_MAX_CONCEPTS: usize = 10_000;
/// Default number of labels kept.
pub const DEFAULT_MAX_LABELS: usize = 50_000;
/// Default time an entry survives without being read.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Size bounds and expiry for an [`InMemoryCache`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheLimits {
    /// Maximum number of schemas.
    pub max_schemas: usize,
    /// Maximum number of concept definitions.
    pub max_concepts: usize,
    /// Maximum number of labels.
    pub max_labels: usize,
    /// Entries not accessed for this long are dropped.
    pub ttl: Duration,
}

impl Default for CacheLimits {
    fn default() -> Self {
        Self {
            max_schemas: DEFAULT_MAX_SCHEMAS,
            max_concepts: DEFAULT_MAX_CONCEPTS,
            max_labels: DEFAULT_MAX_LABELS,
            ttl: DEFAULT_TTL,
        }
    }
}

/// Cache entry with the time it was last read or written.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    data: T,
    accessed_at: DateTime<Utc>,
    /// Position in [`Entries::order`].
    tick: u64,
}

impl<T> CacheEntry<T> {
    fn is_stale(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.accessed_at);
        age >= TimeDelta::from_std(ttl).unwrap_or(TimeDelta::MAX)
    }
}

/// Entries plus an access-ordered index of their keys.
#[derive(Debug)]
struct Entries<T> {
    map: HashMap<String, CacheEntry<T>>,
    order: BTreeMap<u64, String>,
    next_tick: u64,
}

impl<T> Entries<T> {
    fn new() -> Self {
        Self {
            map: HashMap::new(),
            order: BTreeMap::new(),
            next_tick: 0,
        }
    }

    fn tick(&mut self) -> u64 {
        let tick = self.next_tick;
        self.next_tick += 1;
        tick
    }

    fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.map.remove(key)?;
        self.order.remove(&entry.tick);
        Some(entry)
    }

    fn remove_oldest(&mut self) -> bool {
        match self.order.pop_first() {
            Some((_, key)) => {
                self.map.remove(&key);
                true
            }
            None => false,
        }
    }

    fn touch(&mut self, key: &str, now: DateTime<Utc>) -> Option<&CacheEntry<T>> {
        let tick = self.tick();
        let entry = self.map.get_mut(key)?;
        self.order.remove(&entry.tick);
        self.order.insert(tick, key.to_string());
        entry.tick = tick;
        entry.accessed_at = now;
        Some(entry)
    }

    fn insert(&mut self, key: &str, data: T) {
        self.remove(key);
        let tick = self.tick();
        self.order.insert(tick, key.to_string());
        self.map.insert(
            key.to_string(),
            CacheEntry {
                data,
                accessed_at: Utc::now(),
                tick,
            },
        );
    }

    fn clear(&mut self) {
        self.map.clear();
        self.order.clear();
    }
}

/// One bounded map. The least recently accessed entry is evicted on overflow.
#[derive(Debug)]
struct Store<T> {
    entries: Mutex<Entries<T>>,
    capacity: usize,
}

impl<T: Clone> Store<T> {
    fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(Entries::new()),
            capacity,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Entries<T>> {
        // A panic while holding the lock cannot leave a map half-updated.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the entry and whether an expired entry was dropped.
    fn get(&self, key: &str, ttl: Duration) -> (Option<T>, bool) {
        let now = Utc::now();
        let mut entries = self.lock();
        let stale = match entries.map.get(key) {
            Some(entry) => entry.is_stale(ttl, now),
            None => return (None, false),
        };
        if stale {
            entries.remove(key);
            return (None, true);
        }
        let value = entries.touch(key, now).map(|entry| entry.data.clone());
        (value, false)
    }

    /// Inserts an entry, returning the number of entries evicted.
    fn put(&self, key: &str, value: T) -> usize {
        if self.capacity == 0 {
            return 0;
        }
        let mut entries = self.lock();
        let mut evicted = 0;
        if !entries.map.contains_key(key) {
            while entries.map.len() >= self.capacity && entries.remove_oldest() {
                evicted += 1;
            }
        }
        entries.insert(key, value);
        evicted
    }

    fn purge_stale(&self, ttl: Duration) -> usize {
        let now = Utc::now();
        let mut entries = self.lock();
        let stale: Vec<String> = entries
            .map
            .iter()
            .filter(|(_, e)| e.is_stale(ttl, now))
            .map(|(k, _)| k.clone())
            .collect();
        for key in &stale {
            entries.remove(key);
        }
        stale.len()
    }

    fn len(&self) -> usize {
        self.lock().map.len()
    }

    fn clear(&self) {
        self.lock().clear();
    }
}

/// Bounded in-memory taxonomy cache.
///
/// Schemas, concept definitions and labels live in three independent maps,
/// each behind its own `Mutex`. Data is lost when the cache is dropped.
/// Values are cloned on get; schemas are shared through `Arc`.
#[derive(Debug)]
pub struct InMemoryCache {
    schemas: Store<Arc<TaxonomySchema>>,
    concepts: Store<ConceptDefinition>,
    labels: Store<String>,
    ttl: Duration,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::with_limits(CacheLimits::default())
    }
}

impl InMemoryCache {
    /// Create a new empty cache with default limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new empty cache with the given limits.
    #[must_use]
    pub fn with_limits(limits: CacheLimits) -> Self {
        Self {
            schemas: Store::new(limits.max_schemas),
            concepts: Store::new(limits.max_concepts),
            labels: Store::new(limits.max_labels),
            ttl: limits.ttl,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    fn record<T>(&self, kind: &str, (value, expired): (Option<T>, bool)) -> Option<T> {
        if expired {
            self.evictions.fetch_add(1, Ordering::Relaxed);
            trace!(kind, "Expired cache entry dropped");
        }
        if value.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
            trace!(kind, "Cache hit");
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            trace!(kind, "Cache miss");
        }
        value
    }

    fn record_evictions(&self, kind: &str, evicted: usize) {
        if evicted > 0 {
            self.evictions.fetch_add(evicted as u64, Ordering::Relaxed);
            debug!(kind, evicted, "Evicted least recently used entries");
        }
    }
}

impl TaxonomyCache for InMemoryCache {
    fn get_schema(&self, url: &str) -> Option<Arc<TaxonomySchema>> {
        self.record("schema", self.schemas.get(url, self.ttl))
    }

    #[instrument(skip(self, schema), fields(elements = schema.elements.len()))]
    fn put_schema(&self, url: &str, schema: Arc<TaxonomySchema>) {
        let evicted = self.schemas.put(url, schema);
        self.record_evictions("schema", evicted);
        debug!("Cached schema");
    }

    fn get_concept(&self, key: &str) -> Option<ConceptDefinition> {
        self.record("concept", self.concepts.get(key, self.ttl))
    }

    fn put_concept(&self, key: &str, definition: ConceptDefinition) {
        let evicted = self.concepts.put(key, definition);
        self.record_evictions("concept", evicted);
    }

    fn get_label(&self, key: &str) -> Option<String> {
        self.record("label", self.labels.get(key, self.ttl))
    }

    fn put_label(&self, key: &str, label: String) {
        let evicted = self.labels.put(key, label);
        self.record_evictions("label", evicted);
    }

    #[instrument(skip(self))]
    fn invalidate_stale(&self) -> usize {
        let count = self.schemas.purge_stale(self.ttl)
            + self.concepts.purge_stale(self.ttl)
            + self.labels.purge_stale(self.ttl);
        self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        debug!("Invalidated {} stale entries", count);
        count
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            schemas: self.schemas.len(),
            concepts: self.concepts.len(),
            labels: self.labels.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            loaded_schemas: 0,
        }
    }

    #[instrument(skip(self))]
    fn clear(&self) {
        self.schemas.clear();
        self.concepts.clear();
        self.labels.clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.evictions.store(0, Ordering::Relaxed);
        debug!("Cleared all cached data");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn limits(max: usize, ttl: Duration) -> CacheLimits {
        CacheLimits {
            max_schemas: max,
            max_concepts: max,
            max_labels: max,
            ttl,
        }
    }

    #[test]
    fn test_label_roundtrip_and_stats() {
        let cache = InMemoryCache::new();
        assert!(cache.get_label("ns#Assets#en-US").is_none());
        cache.put_label("ns#Assets#en-US", "Total assets".to_string());
        assert_eq!(
            cache.get_label("ns#Assets#en-US").as_deref(),
            Some("Total assets")
        );

        let stats = cache.stats();
        assert_eq!(stats.labels, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hit_rate(), 0.5);
    }

    #[test]
    fn test_concept_cache() {
        let cache = InMemoryCache::new();
        let def = ConceptDefinition::inferred("ns", "Assets");
        cache.put_concept("ns#Assets", def.clone());
        assert_eq!(cache.get_concept("ns#Assets"), Some(def));
        assert!(cache.get_concept("ns#Liabilities").is_none());
    }

    #[test]
    fn test_schema_is_shared() {
        let cache = InMemoryCache::new();
        let schema = Arc::new(TaxonomySchema {
            url: "https://example.com/a.xsd".to_string(),
            ..Default::default()
        });
        cache.put_schema(&schema.url, Arc::clone(&schema));
        let cached = cache.get_schema("https://example.com/a.xsd").unwrap();
        assert!(Arc::ptr_eq(&cached, &schema));
    }

    #[test]
    fn test_bounded_size_evicts() {
        let cache = InMemoryCache::with_limits(limits(2, DEFAULT_TTL));
        cache.put_label("a", "A".to_string());
        cache.put_label("b", "B".to_string());
        cache.put_label("c", "C".to_string());

        let stats = cache.stats();
        assert_eq!(stats.labels, 2);
        assert_eq!(stats.evictions, 1);
        assert!(cache.get_label("c").is_some());
    }

    #[test]
    fn test_eviction_follows_reads() {
        let cache = InMemoryCache::with_limits(limits(2, DEFAULT_TTL));
        cache.put_label("a", "A".to_string());
        cache.put_label("b", "B".to_string());
        assert!(cache.get_label("a").is_some());
        cache.put_label("c", "C".to_string());

        assert!(cache.get_label("a").is_some());
        assert!(cache.get_label("b").is_none());
        assert!(cache.get_label("c").is_some());
    }

    #[test]
    fn test_full_store_keeps_capacity() {
        let cache = InMemoryCache::with_limits(limits(1_000, DEFAULT_TTL));
        for i in 0..DEFAULT_MAX_LABELS {
            cache.put_label(&format!("k{i}"), format!("v{i}"));
        }
        let stats = cache.stats();
        assert_eq!(stats.labels, 1_000);
        assert_eq!(stats.evictions, (DEFAULT_MAX_LABELS - 1_000) as u64);
        assert!(cache.get_label(&format!("k{}", DEFAULT_MAX_LABELS - 1)).is_some());
        assert!(cache.get_label("k0").is_none());
    }

    #[test]
    fn test_overwrite_does_not_evict() {
        let cache = InMemoryCache::with_limits(limits(1, DEFAULT_TTL));
        cache.put_label("a", "A".to_string());
        cache.put_label("a", "A2".to_string());
        assert_eq!(cache.stats().evictions, 0);
        assert_eq!(cache.get_label("a").as_deref(), Some("A2"));
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = InMemoryCache::with_limits(limits(10, Duration::ZERO));
        cache.put_label("a", "A".to_string());
        assert!(cache.get_label("a").is_none());
        assert_eq!(cache.stats().labels, 0);
        assert_eq!(cache.stats().evictions, 1);
    }

    #[test]
    fn test_invalidate_stale() {
        let cache = InMemoryCache::with_limits(limits(10, Duration::ZERO));
        cache.put_label("a", "A".to_string());
        cache.put_concept("ns#X", ConceptDefinition::inferred("ns", "X"));
        assert_eq!(cache.invalidate_stale(), 2);
        assert_eq!(cache.stats().concepts, 0);
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(5)]
    fn test_clear(#[case] entries: usize) {
        let cache = InMemoryCache::new();
        for i in 0..entries {
            cache.put_label(&format!("k{i}"), format!("v{i}"));
        }
        cache.clear();
        assert_eq!(cache.stats(), CacheStats::default());
    }
}
