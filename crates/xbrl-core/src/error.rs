//! Error types for XBRL operations.
//!
//! This module defines [`XbrlError`] which covers every failure that leaves the
//! caller without a usable result. Per-fact problems found while parsing are not
//! errors; they are recorded as issues on the
//! [`ParseResult`](crate::parse_result::ParseResult) instead.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while fetching or parsing XBRL documents.
#[derive(Error, Debug)]
pub enum XbrlError {
    /// Network-related errors (connection failures, DNS, TLS, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// The operation did not complete before its deadline.
    #[error("Timed out after {0:?} fetching {1}")]
    Timeout(Duration, String),

    /// The remote server answered with a non-success status.
    #[error("HTTP {status} fetching {url}")]
    HttpStatus {
        /// Status code returned by the server.
        status: u16,
        /// The requested URL.
        url: String,
    },

    /// The response exceeded the configured in-memory size cap.
    #[error("Response from {url} exceeds limit of {limit} bytes")]
    ResponseTooLarge {
        /// The requested URL.
        url: String,
        /// The configured cap in bytes.
        limit: usize,
    },

    /// The document could not be parsed at all.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The document declares an encoding that cannot be decoded.
    #[error("Unsupported encoding: {0}")]
    UnsupportedEncoding(String),

    /// The document is neither an XBRL instance nor an inline XBRL document.
    #[error("Unrecognized document root: {0}")]
    UnrecognizedRoot(String),

    /// The ZIP package could not be read.
    #[error("Package error: {0}")]
    Package(String),

    /// The ZIP package contains no XBRL instance document.
    #[error("No XBRL instance document found in package")]
    NoInstanceDocument,

    /// A document was parsed but no facts were extracted.
    #[error("No facts extracted from {0}")]
    NoFacts(String),

    /// A taxonomy schema could not be loaded or parsed.
    #[error("Schema error for {url}: {reason}")]
    Schema {
        /// Schema location.
        url: String,
        /// Reason for the failure.
        reason: String,
    },

    /// An invalid parameter was provided.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl XbrlError {
    /// Returns true for transport failures (network, timeout, status, size cap).
    #[must_use]
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Network(_)
                | Self::Timeout(..)
                | Self::HttpStatus { .. }
                | Self::ResponseTooLarge { .. }
        )
    }
}

/// Result type alias using [`XbrlError`].
pub type Result<T> = std::result::Result<T, XbrlError>;
