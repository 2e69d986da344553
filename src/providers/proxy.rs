//! Proxy extraction provider (`scrapeproxy`).
//!
//! Routes the target URL through a rendering proxy: one GET against the
//! proxy endpoint with the credential and the encoded target URL as query
//! parameters. The response body is the target page's raw HTML.

use super::{AttemptError, Provider, random_user_agent};
use tracing::{debug, instrument};

pub struct ScrapeProxy {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

impl ScrapeProxy {
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client (carries the per-attempt timeout)
    /// * `base` - Proxy endpoint base URL
    /// * `api_key` - Credential; `None` makes every attempt fail fast
    pub fn new(client: reqwest::Client, base: String, api_key: Option<String>) -> Self {
        Self {
            client,
            base,
            api_key,
        }
    }
}

#[async_trait::async_trait]
impl Provider for ScrapeProxy {
    fn name(&self) -> &'static str {
        "scrapeproxy"
    }

    #[instrument(level = "debug", skip_all, fields(provider = self.name(), %url))]
    async fn attempt(&self, url: &str) -> Result<String, AttemptError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AttemptError::MissingCredential("PROXY_FETCH_API_KEY"))?;

        let request_url = format!(
            "{}/?api_key={}&url={}",
            self.base.trim_end_matches('/'),
            api_key,
            urlencoding::encode(url)
        );

        let response = self
            .client
            .get(&request_url)
            .header("User-Agent", random_user_agent())
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await.map_err(AttemptError::from_reqwest)?;
        if body.trim().is_empty() {
            return Err(AttemptError::EmptyContent);
        }

        debug!(bytes = body.len(), "Proxy provider returned HTML");
        Ok(body)
    }
}
