//! No-op cache implementation.

use std::sync::Arc;
use tracing::trace;
use xbrl_core::{CacheStats, ConceptDefinition, TaxonomyCache, TaxonomySchema};

/// A cache that doesn't store anything.
///
/// Every lookup misses, so each resolution falls through to schema
/// definitions or name-based inference. Useful for testing resolution
/// behavior or when memory matters more than speed.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCache;

impl NoopCache {
    /// Create a new no-op cache.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl TaxonomyCache for NoopCache {
    fn get_schema(&self, url: &str) -> Option<Arc<TaxonomySchema>> {
        trace!(url, "NoopCache: get_schema always returns None");
        None
    }

    fn put_schema(&self, _url: &str, _schema: Arc<TaxonomySchema>) {}

    fn get_concept(&self, _key: &str) -> Option<ConceptDefinition> {
        None
    }

    fn put_concept(&self, _key: &str, _definition: ConceptDefinition) {}

    fn get_label(&self, _key: &str) -> Option<String> {
        None
    }

    fn put_label(&self, _key: &str, _label: String) {}

    fn invalidate_stale(&self) -> usize {
        0
    }

    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }

    fn clear(&self) {}
}
