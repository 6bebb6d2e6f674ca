//! Fetcher trait for remote documents.
//!
//! Parsers and the taxonomy resolver never talk HTTP directly; they go through
//! a [`DocumentFetcher`], which enforces a per-request timeout and a cap on
//! the number of bytes held in memory.

use async_trait::async_trait;
use std::fmt::Debug;
use std::time::Duration;

use crate::error::Result;

/// Default timeout for single documents.
pub const DEFAULT_DOCUMENT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for ZIP packages.
pub const DEFAULT_PACKAGE_TIMEOUT: Duration = Duration::from_secs(120);

/// Default size cap for single documents (50 MiB).
pub const DEFAULT_MAX_DOCUMENT_BYTES: usize = 50 * 1024 * 1024;

/// Default size cap for ZIP packages (200 MiB).
pub const DEFAULT_MAX_PACKAGE_BYTES: usize = 200 * 1024 * 1024;

/// Limits applied to one fetch.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FetchOptions {
    /// Deadline for the whole request, body included.
    pub timeout: Duration,
    /// Largest body accepted.
    pub max_bytes: usize,
}

impl FetchOptions {
    /// Limits for a single document.
    #[must_use]
    pub const fn document() -> Self {
        Self {
            timeout: DEFAULT_DOCUMENT_TIMEOUT,
            max_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
        }
    }

    /// Limits for a ZIP package.
    #[must_use]
    pub const fn package() -> Self {
        Self {
            timeout: DEFAULT_PACKAGE_TIMEOUT,
            max_bytes: DEFAULT_MAX_PACKAGE_BYTES,
        }
    }
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self::document()
    }
}

/// Source of remote bytes (filings, packages, taxonomy schemas).
///
/// A fetch either returns the complete body or fails; it never hangs past
/// `options.timeout` and is never retried internally.
#[async_trait]
pub trait DocumentFetcher: Send + Sync + Debug {
    /// Fetches the body at `url`.
    async fn fetch(&self, url: &str, options: FetchOptions) -> Result<Vec<u8>>;
}
