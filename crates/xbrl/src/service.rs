//! One entry point over parsing, fetching and analysis.

use futures::stream::{self, StreamExt};
use std::io::BufRead;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

use xbrl_analysis::{
    Anomaly, CalculationTable, CalculationValidator, ComparisonResult, ConceptStandardizer,
    FinancialStatements, GrowthAnalysis, MultiPeriodAnalyzer, PeriodRatios, PotentialIssue,
    StandardizedData, StatementReconstructor, StitchedTimeSeries, ValidationResult,
};
use xbrl_cache::InMemoryCache;
use xbrl_core::{
    CacheStats, DocumentFetcher, ParseResult, Result, XbrlError, XbrlFact, XbrlInstance,
};
use xbrl_edgar::{HttpFetcher, SecFilingExtractor, SecFilingMetadata};
use xbrl_parser::{FactStream, ParsedPackage, XbrlParser};
use xbrl_taxonomy::TaxonomyResolver;

use crate::config::XbrlConfig;
use crate::report::{self, ComprehensiveAnalysis, FactRow};

/// Parser, resolver, fetcher and analyzers sharing one configuration.
///
/// The taxonomy resolver and its cache are shared by every parse, so labels
/// and concept definitions loaded for one filing serve the next. All methods
/// take `&self`; a service can be shared across tasks behind an `Arc`.
///
/// # Example
///
/// ```
/// use xbrl::{XbrlConfig, XbrlService};
///
/// let service = XbrlService::new(XbrlConfig::default()).unwrap();
/// let doc = r#"<xbrli:xbrl xmlns:xbrli="http://www.xbrl.org/2003/instance"
///     xmlns:us-gaap="http://fasb.org/us-gaap/2024">
///   <xbrli:context id="c1">
///     <xbrli:entity><xbrli:identifier scheme="http://www.sec.gov/CIK">1</xbrli:identifier></xbrli:entity>
///     <xbrli:period><xbrli:instant>2024-12-31</xbrli:instant></xbrli:period>
///   </xbrli:context>
///   <xbrli:unit id="usd"><xbrli:measure>iso4217:USD</xbrli:measure></xbrli:unit>
///   <us-gaap:Assets contextRef="c1" unitRef="usd" decimals="0">1000</us-gaap:Assets>
/// </xbrli:xbrl>"#;
///
/// let instance = service.parse_bytes(doc.as_bytes(), "a.xml", None).unwrap();
/// assert_eq!(service.key_financials(&instance).get("Assets"), Some(&1000.0));
/// ```
pub struct XbrlService {
    config: XbrlConfig,
    fetcher: Arc<dyn DocumentFetcher>,
    resolver: Arc<TaxonomyResolver>,
    parser: XbrlParser,
    validator: CalculationValidator,
    reconstructor: StatementReconstructor,
    standardizer: ConceptStandardizer,
    analyzer: MultiPeriodAnalyzer,
    extractor: SecFilingExtractor,
}

impl std::fmt::Debug for XbrlService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XbrlService")
            .field("config", &self.config)
            .field("fetcher", &self.fetcher)
            .field("cache", &self.resolver.cache_stats())
            .field("calculations", &self.validator.table().len())
            .finish()
    }
}

impl XbrlService {
    /// Creates a service fetching over HTTP with `config.user_agent`.
    pub fn new(config: XbrlConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = HttpFetcher::new(&config.user_agent)?;
        Ok(Self::with_fetcher(config, Arc::new(fetcher)))
    }

    /// Creates a service around any [`DocumentFetcher`].
    #[must_use]
    pub fn with_fetcher(config: XbrlConfig, fetcher: Arc<dyn DocumentFetcher>) -> Self {
        let cache = Arc::new(InMemoryCache::with_limits(config.cache_limits()));
        let resolver = Arc::new(
            TaxonomyResolver::with_cache(cache)
                .with_fetcher(Arc::clone(&fetcher))
                .with_fetch_options(config.document_options()),
        );
        let parser = XbrlParser::with_resolver(Arc::clone(&resolver))
            .with_max_entry_bytes(config.max_document_bytes);
        debug!(user_agent = %config.user_agent, concurrency = config.concurrency, "Creating XBRL service");

        Self {
            parser,
            reconstructor: StatementReconstructor::new(Arc::clone(&resolver)),
            resolver,
            fetcher,
            config,
            validator: CalculationValidator::new(),
            standardizer: ConceptStandardizer::new(),
            analyzer: MultiPeriodAnalyzer::new(),
            extractor: SecFilingExtractor::new(),
        }
    }

    /// Replaces the calculation relationships checked by [`validate_calculations`](Self::validate_calculations).
    #[must_use]
    pub fn with_calculations(mut self, table: CalculationTable) -> Self {
        self.validator = CalculationValidator::with_table(table);
        self
    }

    /// The configuration.
    pub const fn config(&self) -> &XbrlConfig {
        &self.config
    }

    /// The shared taxonomy resolver.
    pub const fn resolver(&self) -> &Arc<TaxonomyResolver> {
        &self.resolver
    }

    /// The parser.
    pub const fn parser(&self) -> &XbrlParser {
        &self.parser
    }

    /// Parses a document or package held in memory.
    pub fn parse_bytes(
        &self,
        bytes: &[u8],
        uri: &str,
        content_type: Option<&str>,
    ) -> Result<XbrlInstance> {
        self.parser.parse_bytes(bytes, uri, content_type)
    }

    /// Fetches and parses the document or package at `url`.
    ///
    /// `Err` means no instance was produced: the fetch failed or a package
    /// held no instance document. A document with problems, or with no facts
    /// at all, is `Ok`; see [`require_facts`].
    #[instrument(skip(self))]
    pub async fn parse_url(&self, url: &str) -> Result<XbrlInstance> {
        let options = if is_package_url(url) {
            self.config.package_options()
        } else {
            self.config.document_options()
        };
        let bytes = self.fetcher.fetch(url, options).await?;
        let instance = self.parse_bytes(&bytes, url, None)?;
        debug!(
            facts = instance.facts.len(),
            success = instance.parse_result.success,
            "Parsed remote document"
        );
        Ok(instance)
    }

    /// Fetches a ZIP package and parses every instance document in it.
    #[instrument(skip(self))]
    pub async fn parse_package_url(&self, url: &str) -> Result<ParsedPackage> {
        let bytes = self.fetcher.fetch(url, self.config.package_options()).await?;
        self.parser.parse_package(&bytes, url)
    }

    /// Parses several URLs, at most `config.concurrency` at a time.
    ///
    /// Results come back in input order, one per URL; a failed URL does not
    /// affect the others.
    pub async fn parse_urls<I, S>(&self, urls: I) -> Vec<(String, Result<XbrlInstance>)>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        stream::iter(urls.into_iter().map(Into::into))
            .map(|url: String| async move {
                let result = self.parse_url(&url).await;
                if let Err(e) = &result {
                    warn!(url = %url, error = %e, "Failed to parse URL");
                }
                (url, result)
            })
            .buffered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Streams facts from `reader` without building an instance.
    pub fn parse_stream<R: BufRead>(&self, reader: R) -> FactStream<R> {
        self.parser.stream(reader)
    }

    /// Streams every fact of `reader` to `handler`.
    pub fn parse_with_callback<R, F>(&self, reader: R, handler: F) -> ParseResult
    where
        R: BufRead,
        F: FnMut(XbrlFact),
    {
        self.parser.parse_with_callback(reader, handler)
    }

    /// Counts fact elements in `reader`.
    pub fn count_facts<R: BufRead>(&self, reader: R) -> usize {
        self.parser.count_facts(reader)
    }

    /// Checks the calculation relationships in every non-dimensional context.
    #[must_use]
    pub fn validate_calculations(&self, instance: &XbrlInstance) -> ValidationResult {
        self.validator.validate(instance)
    }

    /// Balance sheet equality and primary context checks.
    #[must_use]
    pub fn find_potential_issues(&self, instance: &XbrlInstance) -> Vec<PotentialIssue> {
        self.validator.find_potential_issues(instance)
    }

    /// Rebuilds the three primary statements.
    #[must_use]
    pub fn reconstruct_statements(&self, instance: &XbrlInstance) -> FinancialStatements {
        self.reconstructor.reconstruct(instance)
    }

    /// Maps facts onto canonical concepts.
    #[must_use]
    pub fn standardize(&self, instance: &XbrlInstance) -> StandardizedData {
        self.standardizer.standardize(instance)
    }

    /// Standardizes each instance and lines the companies up.
    #[must_use]
    pub fn compare(&self, instances: &[XbrlInstance]) -> ComparisonResult {
        let data: Vec<StandardizedData> = instances.iter().map(|i| self.standardize(i)).collect();
        self.standardizer.compare(&data)
    }

    /// Merges filings of one company into canonical time series.
    #[must_use]
    pub fn stitch(&self, instances: &[XbrlInstance]) -> StitchedTimeSeries {
        self.analyzer.stitch(instances)
    }

    /// Growth, trend and volatility of one canonical concept.
    #[must_use]
    pub fn analyze_growth(&self, series: &StitchedTimeSeries, concept: &str) -> Option<GrowthAnalysis> {
        self.analyzer.analyze_growth(series, concept)
    }

    /// Outliers and sign changes across every series.
    #[must_use]
    pub fn detect_anomalies(&self, series: &StitchedTimeSeries) -> Vec<Anomaly> {
        self.analyzer.detect_anomalies(series)
    }

    /// Margins, returns and leverage per period.
    #[must_use]
    pub fn calculate_ratios(&self, series: &StitchedTimeSeries) -> Vec<PeriodRatios> {
        self.analyzer.calculate_ratios(series)
    }

    /// Cover page metadata of an SEC filing.
    #[must_use]
    pub fn extract_sec_metadata(&self, instance: &XbrlInstance) -> SecFilingMetadata {
        self.extractor.extract(instance)
    }

    /// See [`report::key_financials`].
    #[must_use]
    pub fn key_financials(&self, instance: &XbrlInstance) -> std::collections::BTreeMap<String, f64> {
        report::key_financials(instance)
    }

    /// See [`report::search_facts`].
    #[must_use]
    pub fn search_facts<'a>(&self, instance: &'a XbrlInstance, query: &str) -> Vec<&'a XbrlFact> {
        report::search_facts(instance, query)
    }

    /// See [`report::export_facts`].
    #[must_use]
    pub fn export_facts(&self, instance: &XbrlInstance) -> Vec<FactRow> {
        report::export_facts(instance)
    }

    /// See [`report::export_facts_frame`].
    pub fn export_facts_frame(&self, instance: &XbrlInstance) -> polars::prelude::PolarsResult<polars::prelude::DataFrame> {
        report::export_facts_frame(instance)
    }

    /// Summary, metadata, key financials, canonical values and checks in one value.
    #[must_use]
    pub fn comprehensive_analysis(&self, instance: &XbrlInstance) -> ComprehensiveAnalysis {
        ComprehensiveAnalysis {
            summary: instance.summary(),
            metadata: self.extract_sec_metadata(instance),
            key_financials: self.key_financials(instance),
            standardized: self.standardize(instance),
            validation: self.validate_calculations(instance),
            potential_issues: self.find_potential_issues(instance),
        }
    }

    /// Taxonomy cache statistics.
    #[must_use]
    pub fn cache_stats(&self) -> CacheStats {
        self.resolver.cache_stats()
    }

    /// Empties the taxonomy caches.
    pub fn clear_caches(&self) {
        self.resolver.clear_caches();
    }
}

/// Turns an instance without facts into [`XbrlError::NoFacts`].
///
/// For callers that need data, not just a well-formed document.
pub fn require_facts(instance: XbrlInstance) -> Result<XbrlInstance> {
    if instance.facts.is_empty() {
        Err(XbrlError::NoFacts(instance.document_uri))
    } else {
        Ok(instance)
    }
}

fn is_package_url(url: &str) -> bool {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    path.to_ascii_lowercase().ends_with(".zip")
}
