//! One-way publishing of finished rows to a WordPress endpoint.
//!
//! The endpoint receives `{"title": …, "body": …}` as JSON. Delivery is not
//! retried; the pipeline logs a failure and moves on to the next link.

use crate::models::PipelineRow;
use std::error::Error;
use std::time::Duration;
use tracing::{info, instrument};

/// Receives every finished row, one at a time, as soon as it is produced.
pub trait Publisher {
    /// Deliver `row`.
    ///
    /// # Errors
    ///
    /// Any delivery failure. The caller logs it and keeps going.
    async fn publish(&self, row: &PipelineRow) -> Result<(), Box<dyn Error>>;
}

/// `None` publishes nothing.
impl<T: Publisher> Publisher for Option<T> {
    async fn publish(&self, row: &PipelineRow) -> Result<(), Box<dyn Error>> {
        match self {
            Some(publisher) => publisher.publish(row).await,
            None => Ok(()),
        }
    }
}

/// Posts rows as JSON to a WordPress REST endpoint.
#[derive(Debug, Clone)]
pub struct WordPressPublisher {
    client: reqwest::Client,
    endpoint: String,
}

impl WordPressPublisher {
    /// Create a publisher for `endpoint` with a 30 second request timeout.
    ///
    /// # Errors
    ///
    /// Returns a `reqwest::Error` if the HTTP client cannot be built.
    pub fn new(endpoint: &str) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
        })
    }
}

impl Publisher for WordPressPublisher {
    #[instrument(level = "info", skip_all, fields(title = %row.title))]
    async fn publish(&self, row: &PipelineRow) -> Result<(), Box<dyn Error>> {
        let response = self.client.post(&self.endpoint).json(row).send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(format!("publish endpoint returned {status}: {body}").into());
        }
        info!(%status, response = %crate::utils::truncate_for_log(&body, 200), "Posted to WordPress");
        Ok(())
    }
}
