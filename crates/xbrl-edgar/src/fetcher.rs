//! HTTP access to EDGAR.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{Instant, sleep, timeout};
use tracing::{debug, instrument, warn};
use xbrl_core::{DocumentFetcher, FetchOptions, Result, XbrlError};

/// Default spacing between requests: 10 requests per second (SEC requirement).
pub const DEFAULT_RATE_LIMIT: Duration = Duration::from_millis(100);

/// Keeps requests at least `min_interval` apart.
#[derive(Debug)]
struct RateLimiter {
    last_request: Instant,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval: Duration) -> Self {
        Self {
            last_request: Instant::now() - min_interval,
            min_interval,
        }
    }

    async fn wait(&mut self) {
        let elapsed = self.last_request.elapsed();
        if elapsed < self.min_interval {
            sleep(self.min_interval - elapsed).await;
        }
        self.last_request = Instant::now();
    }
}

/// [`DocumentFetcher`] over HTTP.
///
/// Every fetch is bounded by the [`FetchOptions`] it is called with: the
/// whole exchange, body included, must finish within `timeout`, and the body
/// is abandoned as soon as it grows past `max_bytes`. Failures are returned,
/// never retried.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    rate_limiter: Arc<Mutex<RateLimiter>>,
    user_agent: String,
}

impl HttpFetcher {
    /// Creates a fetcher sending `user_agent` with every request.
    ///
    /// The SEC requires identifying user agents of the form
    /// `"AppName/Version (contact@example.com)"`.
    ///
    /// ```
    /// use xbrl_edgar::HttpFetcher;
    ///
    /// let fetcher = HttpFetcher::new("MyApp/1.0 (contact@example.com)").unwrap();
    /// assert_eq!(fetcher.user_agent(), "MyApp/1.0 (contact@example.com)");
    /// ```
    pub fn new(user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| XbrlError::Network(e.to_string()))?;
        Ok(Self::with_client(client, user_agent))
    }

    /// Creates a fetcher around a pre-configured client.
    pub fn with_client(client: reqwest::Client, user_agent: &str) -> Self {
        Self {
            client,
            rate_limiter: Arc::new(Mutex::new(RateLimiter::new(DEFAULT_RATE_LIMIT))),
            user_agent: user_agent.to_string(),
        }
    }

    /// Changes the minimum spacing between requests.
    #[must_use]
    pub fn with_rate_limit(mut self, min_interval: Duration) -> Self {
        self.rate_limiter = Arc::new(Mutex::new(RateLimiter::new(min_interval)));
        self
    }

    /// The configured user agent.
    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }

    async fn get(&self, url: &str, max_bytes: usize) -> Result<Vec<u8>> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| XbrlError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(XbrlError::HttpStatus {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        let too_large = || XbrlError::ResponseTooLarge {
            url: url.to_string(),
            limit: max_bytes,
        };
        if response
            .content_length()
            .is_some_and(|len| len > max_bytes as u64)
        {
            return Err(too_large());
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| XbrlError::Network(e.to_string()))?
        {
            if body.len() + chunk.len() > max_bytes {
                return Err(too_large());
            }
            body.extend_from_slice(&chunk);
        }
        Ok(body)
    }
}

#[async_trait]
impl DocumentFetcher for HttpFetcher {
    #[instrument(skip(self, options), fields(timeout = ?options.timeout, max_bytes = options.max_bytes))]
    async fn fetch(&self, url: &str, options: FetchOptions) -> Result<Vec<u8>> {
        self.rate_limiter.lock().await.wait().await;

        debug!("Fetching document");
        match timeout(options.timeout, self.get(url, options.max_bytes)).await {
            Ok(Ok(body)) => {
                debug!(bytes = body.len(), "Fetched document");
                Ok(body)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Fetch failed");
                Err(e)
            }
            Err(_) => {
                warn!("Fetch timed out");
                Err(XbrlError::Timeout(options.timeout, url.to_string()))
            }
        }
    }
}
