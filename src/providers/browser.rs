//! Last-resort fallback fetcher (`browser`).
//!
//! Fetches the target URL directly with a browser-like header fingerprint:
//! a rotating User-Agent plus the Accept/Accept-Language headers a real
//! browser sends. Enough to get past basic bot-blocking that keys on bare
//! library defaults. Needs no credential, so it stays usable when every
//! keyed provider is unconfigured or down.

use super::{AttemptError, Provider, random_user_agent};
use tracing::{debug, instrument};

pub struct BrowserFetch {
    client: reqwest::Client,
}

impl BrowserFetch {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl Provider for BrowserFetch {
    fn name(&self) -> &'static str {
        "browser"
    }

    #[instrument(level = "debug", skip_all, fields(provider = self.name(), %url))]
    async fn attempt(&self, url: &str) -> Result<String, AttemptError> {
        let response = self
            .client
            .get(url)
            .header("User-Agent", random_user_agent())
            .header(
                "Accept",
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
            )
            .header("Accept-Language", "en-US,en;q=0.9")
            .header("Upgrade-Insecure-Requests", "1")
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

        debug!(bytes = body.len(), "Fallback fetch returned HTML");
        Ok(body)
    }
}
