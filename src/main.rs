use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;

use timetable_alerter::config::Settings;
use timetable_alerter::directory::HttpDirectoryClient;
use timetable_alerter::mail::HttpMailClient;
use timetable_alerter::processor::EventProcessor;
use timetable_alerter::server::{create_app, AppState};
use timetable_alerter::telemetry::init_telemetry;
use timetable_alerter::template::TemplateStore;
use timetable_alerter::triggers::{self, NatsSubscriber};

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    let _telemetry = init_telemetry(&settings.otel)?;
    tracing::info!("Configuration loaded");

    if settings.mail.token.as_deref().unwrap_or_default().is_empty() {
        tracing::warn!("MAIL_TOKEN is not set, every alert mail will fail");
    }

    // Build the processing pipeline
    let templates = Arc::new(TemplateStore::bundled()?);
    if !templates.exists(&settings.processor.template) {
        anyhow::bail!("unknown template {}", settings.processor.template);
    }
    let directory = Arc::new(HttpDirectoryClient::new(&settings.directory)?);
    let mailer = Arc::new(HttpMailClient::new(&settings.mail)?);
    let processor = Arc::new(EventProcessor::new(
        directory,
        mailer,
        templates,
        settings.processor.template.clone(),
    ));

    // Connect and subscribe; both failures are fatal
    let client = triggers::connect(&settings.nats).await?;
    let subscriber = NatsSubscriber::new(
        settings.nats.subject.clone(),
        processor,
        settings.processor.max_in_flight,
    );
    let subscription = subscriber.subscribe(&client).await?;
    let shutdown_signal = subscriber.shutdown_signal();

    // Start the health & metrics server in background
    let server_handle = if settings.server.enabled {
        let app = create_app(AppState::new(Some(client.clone())));
        let addr = settings.server_addr();
        let listener = TcpListener::bind(&addr).await?;
        tracing::info!("Health server listening on {}", addr);

        let mut shutdown_rx = shutdown_signal.subscribe();
        Some(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Health server failed");
            }
        }))
    } else {
        None
    };

    tokio::spawn(shutdown_signal_handler(shutdown_signal.clone()));

    let outcome = subscriber.run(subscription).await;

    // Stop the health server whichever way the subscriber ended
    let _ = shutdown_signal.send(());
    if let Some(handle) = server_handle {
        let _ = handle.await;
    }

    outcome?;
    tracing::info!("Service shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: tokio::sync::broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down");
        }
    }

    let _ = shutdown_tx.send(());
}
