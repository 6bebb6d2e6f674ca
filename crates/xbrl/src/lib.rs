#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! XBRL parsing and financial analysis for SEC filings.
//!
//! This crate re-exports the fact model, caches, parser, taxonomy resolver,
//! analyzers and SEC helpers, and provides [`XbrlService`] to use them
//! together from one [`XbrlConfig`].

// Core types and traits
pub use xbrl_core::*;

// Caches
pub use xbrl_cache::{CacheLimits, InMemoryCache, NoopCache};

// Parsing and taxonomy
pub use xbrl_parser::{FactStream, ParsedPackage, XbrlParser};
pub use xbrl_taxonomy::TaxonomyResolver;

// Analysis
pub use xbrl_analysis::{
    Anomaly, AnomalyKind, BalanceSheet, CalcError, CalculationTable, CalculationValidator,
    CashFlowStatement, ComparisonResult, ConceptStandardizer, ConceptTimeSeries,
    FinancialStatements, GrowthAnalysis, IncomeStatement, LineItem, MultiPeriodAnalyzer,
    PeriodRatios, PotentialIssue, Relationship, StandardizedData, StandardizedFact, Statement,
    StatementReconstructor, StitchedTimeSeries, Trend, ValidationResult,
};

// SEC
pub use xbrl_edgar::{
    FilingCategory, FiscalPeriod, FormTypeInfo, HttpFetcher, SecFilingExtractor, SecFilingMetadata,
};

/// Service configuration.
pub mod config;
/// Fact lookups, exports and the combined analysis report.
pub mod report;
mod service;

pub use config::XbrlConfig;
pub use report::{ComprehensiveAnalysis, FactRow, KEY_FINANCIALS};
pub use service::{XbrlService, require_facts};
