//! Render extraction provider (`renderapi`).
//!
//! Calls a rendering API that pre-renders the target page and returns a JSON
//! envelope, `{"content": "<html…>"}`. The credential travels as an `apikey`
//! header; the target URL as an encoded query parameter.

use super::{AttemptError, Provider, random_user_agent};
use tracing::{debug, instrument};

pub struct RenderApi {
    client: reqwest::Client,
    base: String,
    api_key: Option<String>,
}

impl RenderApi {
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client (carries the per-attempt timeout)
    /// * `base` - Render API base URL
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
impl Provider for RenderApi {
    fn name(&self) -> &'static str {
        "renderapi"
    }

    #[instrument(level = "debug", skip_all, fields(provider = self.name(), %url))]
    async fn attempt(&self, url: &str) -> Result<String, AttemptError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(AttemptError::MissingCredential("RENDER_API_KEY"))?;

        let request_url = format!(
            "{}/extract?url={}",
            self.base.trim_end_matches('/'),
            urlencoding::encode(url)
        );

        let response = self
            .client
            .get(&request_url)
            .header("apikey", api_key)
            .header("User-Agent", random_user_agent())
            .send()
            .await
            .map_err(AttemptError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(AttemptError::HttpStatus(status.as_u16()));
        }

        let envelope: serde_json::Value = response
            .json()
            .await
            .map_err(|e| AttemptError::MalformedResponse(e.to_string()))?;

        let content = envelope
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                AttemptError::MalformedResponse("envelope missing `content` field".to_string())
            })?;
        if content.trim().is_empty() {
            return Err(AttemptError::EmptyContent);
        }

        debug!(bytes = content.len(), "Render provider returned HTML");
        Ok(content.to_string())
    }
}
