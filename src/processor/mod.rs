//! Event processing: one bus message in, zero or more alert mails out.
//!
//! For each message the processor decodes the event, fetches the current
//! subscriptions, and for every matching subscription renders the alert
//! template and hands it to the mailer. A failure while rendering or sending
//! for one subscriber never stops the others; only an undecodable payload or
//! an unavailable directory drops the message as a whole.

use std::sync::Arc;

use serde::Serialize;
use tracing::Span;

use crate::alert::{mask_email, matches, Event, Subscription};
use crate::directory::AlertDirectory;
use crate::error::{AppError, Result};
use crate::mail::{Mailer, OutgoingMail};
use crate::metrics::AlertMetrics;
use crate::template::TemplateStore;

/// What happened to one event
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchReport {
    pub event_id: String,
    pub is_new: bool,
    /// Subscriptions returned by the directory
    pub subscriptions: usize,
    pub matched: usize,
    pub sent: usize,
    pub render_failures: usize,
    pub dispatch_failures: usize,
}

/// Data made available to the alert template
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AlertContext<'a> {
    event: &'a Event,
    is_new: bool,
}

pub struct EventProcessor {
    directory: Arc<dyn AlertDirectory>,
    mailer: Arc<dyn Mailer>,
    templates: Arc<TemplateStore>,
    template: String,
}

impl EventProcessor {
    pub fn new(
        directory: Arc<dyn AlertDirectory>,
        mailer: Arc<dyn Mailer>,
        templates: Arc<TemplateStore>,
        template: impl Into<String>,
    ) -> Self {
        Self {
            directory,
            mailer,
            templates,
            template: template.into(),
        }
    }

    /// Process a raw bus payload, logging every outcome.
    ///
    /// This is the entry point used by the bus trigger; nothing is reported
    /// back to the publisher.
    pub async fn handle(&self, payload: &[u8]) {
        AlertMetrics::record_received();

        match self.process(payload).await {
            Ok(report) => {
                tracing::info!(
                    event_id = %report.event_id,
                    matched = report.matched,
                    sent = report.sent,
                    failed = report.render_failures + report.dispatch_failures,
                    "Event processed"
                );
            }
            Err(e) => {
                AlertMetrics::record_aborted(e.kind());
                match &e {
                    AppError::Decode(_) => {
                        tracing::error!(error = %e, "Failed to decode event, message dropped")
                    }
                    AppError::Directory(_) => tracing::error!(
                        error = %e,
                        "Failed to fetch alert subscriptions, message dropped"
                    ),
                    _ => tracing::error!(error = %e, "Event processing failed"),
                }
            }
        }
    }

    /// Process a raw bus payload.
    ///
    /// Returns an error only when the whole message is dropped (undecodable
    /// payload, directory unavailable). Per-subscriber failures are logged
    /// and counted in the report.
    #[tracing::instrument(
        name = "processor.process",
        skip_all,
        fields(event_id = tracing::field::Empty)
    )]
    pub async fn process(&self, payload: &[u8]) -> Result<DispatchReport> {
        let event = Event::from_slice(payload)?;
        let is_new = event.is_new();
        Span::current().record("event_id", event.uid.as_str());
        tracing::info!(event_id = %event.uid, is_new, "Event received");

        let subscriptions = self.directory.fetch().await?;

        let mut report = DispatchReport {
            event_id: event.uid.clone(),
            is_new,
            subscriptions: subscriptions.len(),
            ..DispatchReport::default()
        };

        let context = AlertContext {
            event: &event,
            is_new,
        };

        for subscription in subscriptions.iter().filter(|s| matches(&event, s)) {
            report.matched += 1;
            AlertMetrics::record_matched();

            match self.notify(subscription, &context).await {
                Ok(()) => {
                    report.sent += 1;
                    AlertMetrics::record_sent();
                }
                Err(AppError::Render(_)) => {
                    report.render_failures += 1;
                    AlertMetrics::record_failed("render");
                }
                Err(_) => {
                    report.dispatch_failures += 1;
                    AlertMetrics::record_failed("dispatch");
                }
            }
        }

        Ok(report)
    }

    /// Render and send the alert for one subscription
    async fn notify(&self, subscription: &Subscription, context: &AlertContext<'_>) -> Result<()> {
        let rendered = self
            .templates
            .render(&self.template, context)
            .map_err(|e| {
                tracing::error!(
                    subscription_id = ?subscription.id,
                    error = %e,
                    "Failed to render alert template"
                );
                e
            })?;

        let mail = OutgoingMail {
            recipient: subscription.email.clone(),
            subject: rendered.header.subject,
            content: rendered.body,
        };

        let recipient = mask_email(&subscription.email);
        match self.mailer.send(&mail).await {
            Ok(()) => {
                tracing::info!(recipient = %recipient, "Alert mail sent");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    recipient = %recipient,
                    subscription_id = ?subscription.id,
                    error = %e,
                    "Failed to send alert mail"
                );
                Err(e.into())
            }
        }
    }
}
