#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use xbrl_core::{DocumentFetcher, FetchOptions};
//! use xbrl_edgar::HttpFetcher;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let fetcher: Arc<dyn DocumentFetcher> =
//!         Arc::new(HttpFetcher::new("MyApp/1.0 (contact@example.com)")?);
//!     let body = fetcher
//!         .fetch(
//!             "https://www.sec.gov/Archives/edgar/data/320193/000032019324000123/aapl-20240928.htm",
//!             FetchOptions::document(),
//!         )
//!         .await?;
//!     println!("{} bytes", body.len());
//!     Ok(())
//! }
//! ```

/// HTTP document fetching.
pub mod fetcher;
/// SEC form types and filing categories.
pub mod forms;
/// Filing metadata extraction.
pub mod metadata;

pub use fetcher::HttpFetcher;
pub use forms::{FORM_TYPES, FilingCategory, FormTypeInfo, PeriodType, form_type_info};
pub use metadata::{FiscalPeriod, SecFilingExtractor, SecFilingMetadata, normalize_cik, parse_date};
