//! The page fetching seam between the assembler and the network.
//!
//! [`PageFetcher`] is the consumed interface: it returns raw markup or
//! fails. [`HttpFetcher`] is the reqwest-backed default with bounded
//! retries on connection errors; tests substitute canned-page stubs.

use std::time::Duration;

use tracing::{debug, warn};

use currichef_shared::{ChefError, Result};

/// User-Agent string for page requests.
const USER_AGENT: &str = concat!("currichef/", env!("CARGO_PKG_VERSION"));

/// Fetches raw page markup and resource bytes.
pub trait PageFetcher {
    /// Fetch a page as text. Connection errors are retried internally;
    /// HTTP errors surface as [`ChefError::Http`] without retry.
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;

    /// Fetch a binary resource (PDF, image).
    fn fetch_bytes(&self, url: &str) -> impl Future<Output = Result<Vec<u8>>> + Send;
}

/// Default [`PageFetcher`] over a shared reqwest client.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
    retry_delay: Duration,
}

impl HttpFetcher {
    pub fn new(max_retries: u32, retry_delay: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ChefError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries,
            retry_delay,
        })
    }

    /// Access the underlying client (shared with the video resolver for
    /// HEAD requests).
    pub fn client(&self) -> &reqwest::Client {
        &self.client
    }

    /// GET with bounded retries on connection errors. HTTP error statuses
    /// are returned immediately; they are not worth retrying.
    async fn get_with_retry(&self, url: &str) -> Result<reqwest::Response> {
        let mut attempt = 0;
        loop {
            match self.client.get(url).send().await {
                Ok(response) => {
                    let status = response.status();
                    if !status.is_success() {
                        return Err(ChefError::Http {
                            url: url.to_string(),
                            status: status.as_u16(),
                        });
                    }
                    return Ok(response);
                }
                Err(e) if e.is_connect() || e.is_timeout() => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(ChefError::Network(format!(
                            "{url}: giving up after {attempt} attempts: {e}"
                        )));
                    }
                    warn!(%url, attempt, "connection error, retrying after fixed delay");
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(ChefError::Network(format!("{url}: {e}"))),
            }
        }
    }
}

impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        debug!(%url, "fetching page");
        let response = self.get_with_retry(url).await?;
        response
            .text()
            .await
            .map_err(|e| ChefError::Network(format!("{url}: body read failed: {e}")))
    }

    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>> {
        debug!(%url, "fetching resource");
        let response = self.get_with_retry(url).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| ChefError::Network(format!("{url}: body read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}
