//! Delivery of composed records to the external content store.
//!
//! One POST per record, no retry: a rejected or failed delivery is reported
//! to the cycle controller, which skips the hash insertion so the same
//! content becomes eligible again on a later cycle.

use crate::models::ContentRecord;
use thiserror::Error;
use tracing::{info, instrument, warn};

/// Delivery failure reported back to the cycle controller.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The sink answered with a non-success status.
    #[error("content store rejected record: http {0}")]
    Rejected(u16),
    /// The request never completed.
    #[error("content store delivery failed: {0}")]
    Transport(String),
}

/// Writes records to the content-store API.
pub struct Publisher {
    client: reqwest::Client,
    endpoint: String,
}

impl Publisher {
    /// # Arguments
    ///
    /// * `client` - Shared HTTP client
    /// * `endpoint` - Full URL of the content-store write endpoint
    pub fn new(client: reqwest::Client, endpoint: String) -> Self {
        Self { client, endpoint }
    }

    /// Deliver one record.
    ///
    /// # Errors
    ///
    /// [`PublishError::Rejected`] on a non-2xx response,
    /// [`PublishError::Transport`] when the request fails outright. The
    /// record is not retried within the cycle either way.
    #[instrument(level = "info", skip_all, fields(source_url = %record.source_url))]
    pub async fn publish(&self, record: &ContentRecord) -> Result<(), PublishError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(record)
            .send()
            .await
            .map_err(|e| PublishError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(status = status.as_u16(), "Content store rejected record");
            return Err(PublishError::Rejected(status.as_u16()));
        }

        info!(
            platform = %record.target_platform,
            scheduled_at = %record.scheduled_at,
            "Delivered record to content store"
        );
        Ok(())
    }
}
