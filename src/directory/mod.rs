//! Alert directory: the external service listing who wants which alerts.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::alert::Subscription;
use crate::config::DirectoryConfig;
use crate::metrics;

#[derive(Debug, Error)]
pub enum DirectoryError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to alert directory failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("alert directory answered with status {0}")]
    Status(StatusCode),

    #[error("failed to decode alert list: {0}")]
    Decode(#[source] reqwest::Error),
}

/// Source of the current subscription list.
///
/// Called once per inbound event; implementations must not cache.
#[async_trait]
pub trait AlertDirectory: Send + Sync {
    async fn fetch(&self) -> Result<Vec<Subscription>, DirectoryError>;
}

/// Fetches subscriptions with a single time-bounded GET
pub struct HttpDirectoryClient {
    client: Client,
    url: String,
}

impl HttpDirectoryClient {
    pub fn new(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(DirectoryError::Client)?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl AlertDirectory for HttpDirectoryClient {
    #[tracing::instrument(name = "directory.fetch", skip(self), fields(url = %self.url))]
    async fn fetch(&self) -> Result<Vec<Subscription>, DirectoryError> {
        let start = Instant::now();
        let result = async {
            let response = self
                .client
                .get(&self.url)
                .send()
                .await
                .map_err(DirectoryError::Request)?;

            if response.status() != StatusCode::OK {
                return Err(DirectoryError::Status(response.status()));
            }

            response
                .json::<Vec<Subscription>>()
                .await
                .map_err(DirectoryError::Decode)
        }
        .await;

        metrics::DIRECTORY_FETCH_LATENCY.observe(start.elapsed().as_secs_f64());

        if let Ok(subscriptions) = &result {
            tracing::debug!(count = subscriptions.len(), "Fetched alert subscriptions");
        }
        result
    }
}
