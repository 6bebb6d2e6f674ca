#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core fact model, traits and types for XBRL processing.
//!
//! This crate provides the foundational abstractions shared by every other crate:
//!
//! - [`XbrlFact`](fact::XbrlFact), [`XbrlContext`](context::XbrlContext),
//!   [`XbrlUnit`](unit::XbrlUnit) - the fact model
//! - [`XbrlInstance`](instance::XbrlInstance) - a parsed document and its queries
//! - [`ParseResult`](parse_result::ParseResult) - parse statistics and diagnostics
//! - [`FactType`](fact_type::FactType) - fact types and local-name inference
//! - [`TaxonomyCache`](cache::TaxonomyCache) - caching abstraction
//! - [`DocumentFetcher`](fetch::DocumentFetcher) - remote document abstraction

/// Cache trait and statistics for taxonomy lookups.
pub mod cache;
/// Reporting contexts, periods and dimensions.
pub mod context;
/// Error types for XBRL operations.
pub mod error;
/// XBRL facts and numeric normalization.
pub mod fact;
/// Fact types and local-name inference.
pub mod fact_type;
/// Fetcher trait for remote documents.
pub mod fetch;
/// Parsed instance documents.
pub mod instance;
/// Well-known namespace URIs.
pub mod namespaces;
/// Parse statistics and diagnostics.
pub mod parse_result;
/// Taxonomy value types.
pub mod taxonomy;
/// Units of measure.
pub mod unit;

// Re-export commonly used items at crate root
pub use cache::{CacheStats, TaxonomyCache};
pub use context::{DimensionMember, XbrlContext, XbrlDimension, XbrlPeriod};
pub use error::{Result, XbrlError};
pub use fact::{Accuracy, XbrlFact, round_half_up};
pub use fact_type::FactType;
pub use fetch::{DocumentFetcher, FetchOptions};
pub use instance::{DocumentFormat, InstanceSummary, XbrlFootnote, XbrlInstance};
pub use parse_result::{IssueCode, ParseIssue, ParseResult};
pub use taxonomy::{BalanceType, ConceptDefinition, ConceptPeriod, DefinitionSource, TaxonomySchema};
pub use unit::{Measure, UnitKind, XbrlUnit};
