//! Retrieval of the raw page text that entries are parsed from.

use crate::config::Config;
use crate::error::{Error, Result};
use async_trait::async_trait;
use tracing::debug;

/// Source of the raw page payload
///
/// Each call performs a fresh fetch; implementations must not cache, since the
/// discovery loop relies on repeated polls possibly returning different content.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetch the current page text
    async fn fetch_page(&self) -> Result<String>;
}

/// [`PageSource`] backed by an HTTP GET of a fixed URL
pub struct HttpPageSource {
    http_client: reqwest::Client,
    url: String,
}

impl HttpPageSource {
    /// Create a source for `url` using an existing client
    pub fn new(http_client: reqwest::Client, url: impl Into<String>) -> Self {
        Self {
            http_client,
            url: url.into(),
        }
    }

    /// Create a source for the configured page
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(config.http_client()?, config.source_url.clone()))
    }

    /// URL polled by this source
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl PageSource for HttpPageSource {
    async fn fetch_page(&self) -> Result<String> {
        debug!(url = %self.url, "Fetching background page");

        let response = self.http_client.get(&self.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                url: self.url.clone(),
                status: status.as_u16(),
            });
        }

        Ok(response.text().await?)
    }
}
