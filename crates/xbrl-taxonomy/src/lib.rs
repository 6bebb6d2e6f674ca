#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # Example
//!
//! ```
//! use xbrl_core::FactType;
//! use xbrl_taxonomy::TaxonomyResolver;
//!
//! let resolver = TaxonomyResolver::new();
//! let ns = "http://fasb.org/us-gaap/2024";
//!
//! assert_eq!(resolver.get_fact_type(ns, "Assets"), FactType::Monetary);
//! assert_eq!(resolver.get_label(ns, "NetIncomeLoss", "en-US"), "Net Income Loss");
//! ```

/// Concept resolution with caching.
pub mod resolver;
/// Taxonomy schema (`.xsd`) parsing.
pub mod schema;

pub use resolver::{TaxonomyResolver, humanize};
pub use schema::parse_schema;
