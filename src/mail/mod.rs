//! Outbound mail: hands rendered alerts to the mail-sending API.

use std::time::Instant;

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::Serialize;
use thiserror::Error;

use crate::config::MailConfig;
use crate::metrics;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("mail API token is not configured")]
    MissingCredential,

    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("request to mail API failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("mail API rejected message, status: {status}, body: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Payload accepted by the mail API
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct OutgoingMail {
    pub recipient: String,
    pub subject: String,
    pub content: String,
}

/// Delivery seam between the event processor and the mail API.
///
/// One call is one delivery attempt; implementations do not retry.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DispatchError>;
}

pub struct HttpMailClient {
    client: Client,
    url: String,
    token: Option<String>,
}

impl HttpMailClient {
    pub fn new(config: &MailConfig) -> Result<Self, DispatchError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(DispatchError::Client)?;

        Ok(Self {
            client,
            url: config.url.clone(),
            token: config.token.clone(),
        })
    }
}

#[async_trait]
impl Mailer for HttpMailClient {
    #[tracing::instrument(name = "mail.send", skip_all)]
    async fn send(&self, mail: &OutgoingMail) -> Result<(), DispatchError> {
        let token = self
            .token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or(DispatchError::MissingCredential)?;

        let start = Instant::now();
        let response = self
            .client
            .post(&self.url)
            .header(header::AUTHORIZATION, token)
            .json(mail)
            .send()
            .await;
        metrics::MAIL_SEND_LATENCY.observe(start.elapsed().as_secs_f64());

        let response = response.map_err(DispatchError::Request)?;
        let status = response.status();
        if status != StatusCode::NO_CONTENT {
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected { status, body });
        }

        Ok(())
    }
}
