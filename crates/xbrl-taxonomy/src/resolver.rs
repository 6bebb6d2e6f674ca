//! Concept resolution with caching.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, instrument, trace, warn};
use xbrl_cache::InMemoryCache;
use xbrl_core::{
    CacheStats, ConceptDefinition, DefinitionSource, DocumentFetcher, FactType, FetchOptions,
    Result, TaxonomyCache, TaxonomySchema, XbrlError,
    taxonomy::{concept_key, label_key},
};

use crate::schema::parse_schema;

/// Resolves concept definitions, fact types and labels.
///
/// Resolution order for a concept: a schema-sourced entry in the concept
/// cache, then the element declaration of any loaded schema whose target
/// namespace matches, then a cached inference, then inference from the local
/// name. Every new result is written back to the cache.
///
/// One resolver is meant to live for the whole process and be shared by
/// reference between concurrent parses.
pub struct TaxonomyResolver {
    cache: Arc<dyn TaxonomyCache>,
    fetcher: Option<Arc<dyn DocumentFetcher>>,
    fetch_options: FetchOptions,
    /// Schema URLs whose load has been attempted.
    seen: Mutex<HashSet<String>>,
    /// Target namespace to schema URL of loaded schemas.
    namespaces: RwLock<HashMap<String, String>>,
}

impl fmt::Debug for TaxonomyResolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaxonomyResolver")
            .field("cache", &self.cache)
            .field("has_fetcher", &self.fetcher.is_some())
            .field("fetch_options", &self.fetch_options)
            .finish_non_exhaustive()
    }
}

impl Default for TaxonomyResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl TaxonomyResolver {
    /// Creates a resolver with a default [`InMemoryCache`] and no fetcher.
    #[must_use]
    pub fn new() -> Self {
        Self::with_cache(Arc::new(InMemoryCache::new()))
    }

    /// Creates a resolver on top of an existing cache.
    #[must_use]
    pub fn with_cache(cache: Arc<dyn TaxonomyCache>) -> Self {
        Self {
            cache,
            fetcher: None,
            fetch_options: FetchOptions::document(),
            seen: Mutex::new(HashSet::new()),
            namespaces: RwLock::new(HashMap::new()),
        }
    }

    /// Sets the fetcher used by [`load_schema`](Self::load_schema).
    #[must_use]
    pub fn with_fetcher(mut self, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Sets the limits for schema fetches.
    #[must_use]
    pub const fn with_fetch_options(mut self, options: FetchOptions) -> Self {
        self.fetch_options = options;
        self
    }

    /// The underlying cache.
    #[must_use]
    pub fn cache(&self) -> &Arc<dyn TaxonomyCache> {
        &self.cache
    }

    /// Resolves the definition of a concept.
    pub fn resolve_concept(&self, namespace: &str, local_name: &str) -> ConceptDefinition {
        let key = concept_key(namespace, local_name);
        let cached = self.cache.get_concept(&key);
        if let Some(definition) = cached
            .as_ref()
            .filter(|d| d.source == DefinitionSource::Schema)
        {
            return definition.clone();
        }

        // An inferred entry is replaced once a schema declaring the concept loads.
        let definition = match self.schema_definition(namespace, local_name) {
            Some(definition) => definition,
            None => match cached {
                Some(definition) => return definition,
                None => ConceptDefinition::inferred(namespace, local_name),
            },
        };
        trace!(
            concept = %key,
            fact_type = %definition.fact_type,
            source = ?definition.source,
            "Resolved concept"
        );
        self.cache.put_concept(&key, definition.clone());
        definition
    }

    /// Resolves the fact type of a concept.
    pub fn get_fact_type(&self, namespace: &str, local_name: &str) -> FactType {
        self.resolve_concept(namespace, local_name).fact_type
    }

    /// Label of a concept in `lang`, or its humanized local name.
    pub fn get_label(&self, namespace: &str, local_name: &str, lang: &str) -> String {
        self.cache
            .get_label(&label_key(namespace, local_name, lang))
            .unwrap_or_else(|| humanize(local_name))
    }

    /// Seeds the label cache, e.g. from a label linkbase.
    pub fn register_label(
        &self,
        namespace: &str,
        local_name: &str,
        lang: &str,
        label: impl Into<String>,
    ) {
        self.cache
            .put_label(&label_key(namespace, local_name, lang), label.into());
    }

    /// Loads a taxonomy schema.
    ///
    /// Returns `Ok(None)` when `url` was already attempted by this resolver,
    /// which breaks cyclic import chains. A failed load forgets the URL so a
    /// caller may try again.
    #[instrument(skip(self))]
    pub async fn load_schema(&self, url: &str) -> Result<Option<Arc<TaxonomySchema>>> {
        if !self.mark_seen(url) {
            trace!("Schema already loaded or loading");
            return Ok(None);
        }

        if let Some(schema) = self.cache.get_schema(url) {
            self.register_namespace(&schema);
            return Ok(Some(schema));
        }

        match self.fetch_schema(url).await {
            Ok(schema) => {
                let schema = Arc::new(schema);
                self.cache.put_schema(url, Arc::clone(&schema));
                self.register_namespace(&schema);
                debug!(elements = schema.elements.len(), "Loaded taxonomy schema");
                Ok(Some(schema))
            }
            Err(e) => {
                warn!(error = %e, "Failed to load taxonomy schema");
                self.lock_seen().remove(url);
                Err(e)
            }
        }
    }

    /// Cache statistics plus the number of schema URLs attempted.
    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            loaded_schemas: self.lock_seen().len(),
            ..self.cache.stats()
        }
    }

    /// Empties every cache and forgets loaded schemas.
    pub fn clear_caches(&self) {
        self.cache.clear();
        self.lock_seen().clear();
        self.namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        debug!("Cleared taxonomy caches");
    }

    async fn fetch_schema(&self, url: &str) -> Result<TaxonomySchema> {
        let fetcher = self.fetcher.as_ref().ok_or_else(|| XbrlError::Schema {
            url: url.to_string(),
            reason: "no document fetcher configured".to_string(),
        })?;
        let bytes = fetcher.fetch(url, self.fetch_options).await?;
        parse_schema(url, &bytes)
    }

    fn schema_definition(&self, namespace: &str, local_name: &str) -> Option<ConceptDefinition> {
        let url = self
            .namespaces
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(namespace)
            .cloned()?;
        let schema = self.cache.get_schema(&url)?;
        schema.element(local_name).cloned()
    }

    fn register_namespace(&self, schema: &TaxonomySchema) {
        if schema.target_namespace.is_empty() {
            return;
        }
        self.namespaces
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(schema.target_namespace.clone(), schema.url.clone());
    }

    /// Returns true if `url` was not seen before.
    fn mark_seen(&self, url: &str) -> bool {
        self.lock_seen().insert(url.to_string())
    }

    fn lock_seen(&self) -> std::sync::MutexGuard<'_, HashSet<String>> {
        self.seen.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Turns a local name into a label: a space before each internal capital and
/// an upper-case first letter.
///
/// ```
/// assert_eq!(xbrl_taxonomy::humanize("AssetsCurrent"), "Assets Current");
/// ```
#[must_use]
pub fn humanize(local_name: &str) -> String {
    let mut label = String::with_capacity(local_name.len() + 8);
    for (i, c) in local_name.chars().enumerate() {
        if i == 0 {
            label.extend(c.to_uppercase());
        } else {
            if c.is_uppercase() {
                label.push(' ');
            }
            label.push(c);
        }
    }
    label
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use xbrl_cache::NoopCache;

    const US_GAAP: &str = "http://fasb.org/us-gaap/2024";

    #[rstest]
    #[case("Assets", "Assets")]
    #[case("NetIncomeLoss", "Net Income Loss")]
    #[case("revenues", "Revenues")]
    #[case("", "")]
    fn test_humanize(#[case] name: &str, #[case] expected: &str) {
        assert_eq!(humanize(name), expected);
    }

    #[test]
    fn test_inferred_resolution_is_cached() {
        let resolver = TaxonomyResolver::new();
        assert_eq!(resolver.get_fact_type(US_GAAP, "Assets"), FactType::Monetary);
        assert_eq!(resolver.get_fact_type(US_GAAP, "Assets"), FactType::Monetary);

        let stats = resolver.cache_stats();
        assert_eq!(stats.concepts, 1);
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }

    #[test]
    fn test_label_registration() {
        let resolver = TaxonomyResolver::new();
        assert_eq!(
            resolver.get_label(US_GAAP, "AssetsCurrent", "en-US"),
            "Assets Current"
        );
        resolver.register_label(US_GAAP, "AssetsCurrent", "en-US", "Total current assets");
        assert_eq!(
            resolver.get_label(US_GAAP, "AssetsCurrent", "en-US"),
            "Total current assets"
        );
        // Other languages are independent
        assert_eq!(
            resolver.get_label(US_GAAP, "AssetsCurrent", "de"),
            "Assets Current"
        );
    }

    #[test]
    fn test_noop_cache_still_resolves() {
        let resolver = TaxonomyResolver::with_cache(Arc::new(NoopCache::new()));
        assert_eq!(
            resolver.get_fact_type(US_GAAP, "EarningsPerShareBasic"),
            FactType::PerShare
        );
        assert_eq!(resolver.cache_stats(), CacheStats::default());
    }

    #[tokio::test]
    async fn test_load_schema_without_fetcher() {
        let resolver = TaxonomyResolver::new();
        let err = resolver.load_schema("https://example.com/a.xsd").await.unwrap_err();
        assert!(matches!(err, XbrlError::Schema { .. }));
        // Failed loads are forgotten
        assert_eq!(resolver.cache_stats().loaded_schemas, 0);
    }

    #[test]
    fn test_clear_caches() {
        let resolver = TaxonomyResolver::new();
        resolver.register_label(US_GAAP, "Assets", "en-US", "Total assets");
        resolver.resolve_concept(US_GAAP, "Assets");
        resolver.clear_caches();
        let stats = resolver.cache_stats();
        assert_eq!(stats.labels, 0);
        assert_eq!(stats.concepts, 0);
    }
}
