//! Cache trait for taxonomy lookups.
//!
//! This module defines the [`TaxonomyCache`] trait that provides a unified
//! interface over the three independent taxonomy caches: schemas by URL,
//! concept definitions by `namespace#localName` and labels by
//! `namespace#localName#lang`.

use serde::{Deserialize, Serialize};
use std::fmt::Debug;
use std::sync::Arc;

use crate::taxonomy::{ConceptDefinition, TaxonomySchema};

/// Entry counts and hit statistics of a [`TaxonomyCache`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Cached schemas.
    pub schemas: usize,
    /// Cached concept definitions.
    pub concepts: usize,
    /// Cached labels.
    pub labels: usize,
    /// Lookups answered from the cache.
    pub hits: u64,
    /// Lookups that found nothing.
    pub misses: u64,
    /// Entries removed by size bound or expiry.
    pub evictions: u64,
    /// Distinct schema URLs the owning resolver has attempted to load.
    pub loaded_schemas: usize,
}

impl CacheStats {
    /// Hits divided by lookups; 0.0 before any lookup.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Trait for caching taxonomy data.
///
/// Implementations must be safe to share between concurrent parses.
/// Population is idempotent: a `put` that overwrites an entry another caller
/// stored a moment earlier is harmless.
pub trait TaxonomyCache: Send + Sync + Debug {
    /// Retrieves a cached schema by URL.
    fn get_schema(&self, url: &str) -> Option<Arc<TaxonomySchema>>;

    /// Stores a schema.
    fn put_schema(&self, url: &str, schema: Arc<TaxonomySchema>);

    /// Retrieves a cached concept definition by `namespace#localName`.
    fn get_concept(&self, key: &str) -> Option<ConceptDefinition>;

    /// Stores a concept definition.
    fn put_concept(&self, key: &str, definition: ConceptDefinition);

    /// Retrieves a cached label by `namespace#localName#lang`.
    fn get_label(&self, key: &str) -> Option<String>;

    /// Stores a label.
    fn put_label(&self, key: &str, label: String);

    /// Removes expired entries.
    ///
    /// Returns the number of entries invalidated.
    fn invalidate_stale(&self) -> usize;

    /// Returns entry counts and hit statistics.
    fn stats(&self) -> CacheStats;

    /// Clears all cached data.
    fn clear(&self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_rate() {
        assert_eq!(CacheStats::default().hit_rate(), 0.0);
        let stats = CacheStats {
            hits: 3,
            misses: 1,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 0.75);
    }
}
