//! Service configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use xbrl_cache::CacheLimits;
use xbrl_core::fetch::{
    DEFAULT_DOCUMENT_TIMEOUT, DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_MAX_PACKAGE_BYTES,
    DEFAULT_PACKAGE_TIMEOUT,
};
use xbrl_core::{FetchOptions, Result, XbrlError};

/// User agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str = "xbrl-rs/0.1 (contact@example.com)";

/// Default number of URLs parsed at once by [`parse_urls`](crate::XbrlService::parse_urls).
pub const DEFAULT_CONCURRENCY: usize = 4;

/// Settings for an [`XbrlService`](crate::XbrlService).
///
/// Durations are (de)serialized as whole seconds. Missing fields take their
/// defaults, so `{"concurrency": 8}` is a complete configuration.
///
/// ```
/// use std::time::Duration;
/// use xbrl::XbrlConfig;
///
/// let config = XbrlConfig::from_json(r#"{"document_timeout": 10, "concurrency": 8}"#).unwrap();
/// assert_eq!(config.document_timeout, Duration::from_secs(10));
/// assert_eq!(config.max_schemas, 100);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct XbrlConfig {
    /// Deadline for fetching one document.
    #[serde(with = "seconds")]
    pub document_timeout: Duration,
    /// Deadline for fetching one ZIP package.
    #[serde(with = "seconds")]
    pub package_timeout: Duration,
    /// Largest document accepted.
    pub max_document_bytes: usize,
    /// Largest package accepted.
    pub max_package_bytes: usize,
    /// User agent for every request. The SEC rejects anonymous clients.
    pub user_agent: String,
    /// Cached schemas.
    pub max_schemas: usize,
    /// Cached concept definitions.
    pub max_concepts: usize,
    /// Cached labels.
    pub max_labels: usize,
    /// Cache entries not accessed for this long are dropped.
    #[serde(with = "seconds")]
    pub cache_ttl: Duration,
    /// URLs fetched and parsed at once.
    pub concurrency: usize,
}

impl Default for XbrlConfig {
    fn default() -> Self {
        let limits = CacheLimits::default();
        Self {
            document_timeout: DEFAULT_DOCUMENT_TIMEOUT,
            package_timeout: DEFAULT_PACKAGE_TIMEOUT,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            max_package_bytes: DEFAULT_MAX_PACKAGE_BYTES,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            max_schemas: limits.max_schemas,
            max_concepts: limits.max_concepts,
            max_labels: limits.max_labels,
            cache_ttl: limits.ttl,
            concurrency: DEFAULT_CONCURRENCY,
        }
    }
}

impl XbrlConfig {
    /// Reads a configuration from JSON.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| XbrlError::InvalidParameter(format!("invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects settings no service can run with.
    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(XbrlError::InvalidParameter(
                "concurrency must be at least 1".to_string(),
            ));
        }
        if self.document_timeout.is_zero() || self.package_timeout.is_zero() {
            return Err(XbrlError::InvalidParameter(
                "timeouts must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the document timeout.
    #[must_use]
    pub fn with_document_timeout(mut self, timeout: Duration) -> Self {
        self.document_timeout = timeout;
        self
    }

    /// Sets the package timeout.
    #[must_use]
    pub fn with_package_timeout(mut self, timeout: Duration) -> Self {
        self.package_timeout = timeout;
        self
    }

    /// Sets the document size cap.
    #[must_use]
    pub fn with_max_document_bytes(mut self, max_bytes: usize) -> Self {
        self.max_document_bytes = max_bytes;
        self
    }

    /// Sets the package size cap.
    #[must_use]
    pub fn with_max_package_bytes(mut self, max_bytes: usize) -> Self {
        self.max_package_bytes = max_bytes;
        self
    }

    /// Sets the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Sets the cache bounds and expiry.
    #[must_use]
    pub fn with_cache_limits(mut self, limits: CacheLimits) -> Self {
        self.max_schemas = limits.max_schemas;
        self.max_concepts = limits.max_concepts;
        self.max_labels = limits.max_labels;
        self.cache_ttl = limits.ttl;
        self
    }

    /// Sets the batch concurrency.
    #[must_use]
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Cache bounds and expiry.
    #[must_use]
    pub const fn cache_limits(&self) -> CacheLimits {
        CacheLimits {
            max_schemas: self.max_schemas,
            max_concepts: self.max_concepts,
            max_labels: self.max_labels,
            ttl: self.cache_ttl,
        }
    }

    /// Fetch limits for single documents.
    #[must_use]
    pub const fn document_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.document_timeout,
            max_bytes: self.max_document_bytes,
        }
    }

    /// Fetch limits for ZIP packages.
    #[must_use]
    pub const fn package_options(&self) -> FetchOptions {
        FetchOptions {
            timeout: self.package_timeout,
            max_bytes: self.max_package_bytes,
        }
    }
}

mod seconds {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub(super) fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub(super) fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = XbrlConfig::default();
        assert_eq!(config.document_timeout, Duration::from_secs(30));
        assert_eq!(config.package_timeout, Duration::from_secs(120));
        assert_eq!(config.max_document_bytes, 50 * 1024 * 1024);
        assert_eq!(config.max_package_bytes, 200 * 1024 * 1024);
        assert_eq!(config.max_concepts, 10_000);
        assert_eq!(config.max_labels, 50_000);
        assert_eq!(config.cache_ttl, Duration::from_secs(3600));
        assert_eq!(config.concurrency, 4);
        assert_eq!(config.document_options(), FetchOptions::document());
        assert_eq!(config.package_options(), FetchOptions::package());
    }

    #[test]
    fn test_json_roundtrip_in_seconds() {
        let config = XbrlConfig::default()
            .with_document_timeout(Duration::from_secs(5))
            .with_user_agent("Tests/1.0 (tests@example.com)");
        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["document_timeout"], 5);
        assert_eq!(json["cache_ttl"], 3600);

        let back = XbrlConfig::from_json(&json.to_string()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_from_json_rejects_invalid() {
        assert!(matches!(
            XbrlConfig::from_json(r#"{"concurrency": 0}"#),
            Err(XbrlError::InvalidParameter(_))
        ));
        assert!(XbrlConfig::from_json("not json").is_err());
    }

    #[test]
    fn test_cache_limits() {
        let limits = CacheLimits {
            max_schemas: 1,
            max_concepts: 2,
            max_labels: 3,
            ttl: Duration::from_secs(4),
        };
        assert_eq!(XbrlConfig::default().with_cache_limits(limits).cache_limits(), limits);
    }
}
