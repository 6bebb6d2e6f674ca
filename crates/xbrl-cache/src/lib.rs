#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/xbrl/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Caching implementations for XBRL taxonomy lookups.
//!
//! This crate provides implementations of the [`TaxonomyCache`] trait from `xbrl-core`:
//!
//! - [`InMemoryCache`] - Bounded in-memory cache with expiry on last access (default)
//! - [`NoopCache`] - No-op cache that doesn't store anything

/// In-memory cache implementation.
pub mod memory;
/// No-op cache implementation.
pub mod noop;

// Re-export the trait for convenience
pub use xbrl_core::TaxonomyCache;

// Re-export implementations
pub use memory::{CacheLimits, InMemoryCache};
pub use noop::NoopCache;
