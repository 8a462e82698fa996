use std::sync::Arc;

use async_nats::{Client, ConnectOptions, Subscriber};
use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, Semaphore};
use tokio::task::JoinSet;

use crate::config::NatsConfig;
use crate::error::{AppError, Result};
use crate::processor::EventProcessor;

/// Connect to the bus.
///
/// A failure here is fatal; once connected, the client reconnects on its own
/// up to `max_reconnects` times.
pub async fn connect(config: &NatsConfig) -> Result<Client> {
    let wait = config.reconnect_wait();

    let client = ConnectOptions::new()
        .max_reconnects(config.max_reconnects)
        .reconnect_delay_callback(move |_attempts| wait)
        .event_callback(|event| async move {
            match event {
                async_nats::Event::Disconnected => {
                    tracing::warn!("Disconnected from NATS")
                }
                async_nats::Event::Connected => tracing::info!("Connected to NATS"),
                other => tracing::debug!(event = %other, "NATS connection event"),
            }
        })
        .connect(config.url.as_str())
        .await
        .map_err(|e| AppError::Bus(format!("cannot connect to {}: {}", config.url, e)))?;

    tracing::info!(url = %config.url, "NATS connection established");
    Ok(client)
}

/// Feeds bus messages to the event processor through a bounded worker pool
pub struct NatsSubscriber {
    subject: String,
    processor: Arc<EventProcessor>,
    max_in_flight: usize,
    shutdown: broadcast::Sender<()>,
}

impl NatsSubscriber {
    pub fn new(
        subject: impl Into<String>,
        processor: Arc<EventProcessor>,
        max_in_flight: usize,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            subject: subject.into(),
            processor,
            max_in_flight: max_in_flight.max(1),
            shutdown,
        }
    }

    /// Get a shutdown signal sender
    pub fn shutdown_signal(&self) -> broadcast::Sender<()> {
        self.shutdown.clone()
    }

    /// Subscribe to the configured subject; a failure here is fatal
    pub async fn subscribe(&self, client: &Client) -> Result<Subscriber> {
        let subscription = client
            .subscribe(self.subject.clone())
            .await
            .map_err(|e| AppError::Bus(format!("cannot subscribe to {}: {}", self.subject, e)))?;

        tracing::info!(subject = %self.subject, "Subscribed to bus subject");
        Ok(subscription)
    }

    /// Consume messages until shutdown or until the subscription closes.
    pub async fn run(&self, subscription: Subscriber) -> Result<()> {
        let payloads = subscription.map(|message| {
            tracing::debug!(subject = %message.subject, "Received bus message");
            message.payload
        });
        self.consume(payloads).await
    }

    /// Drive the processor from a stream of raw payloads.
    ///
    /// Each payload is processed on its own task. At most `max_in_flight`
    /// payloads are processed at once; when the pool is full nothing more is
    /// pulled from the stream. Work still in flight at shutdown is abandoned.
    pub async fn consume<S, P>(&self, mut payloads: S) -> Result<()>
    where
        S: Stream<Item = P> + Unpin,
        P: AsRef<[u8]> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        let mut shutdown_rx = self.shutdown.subscribe();

        tracing::info!(
            subject = %self.subject,
            max_in_flight = self.max_in_flight,
            "Waiting for timetable events"
        );

        let outcome = loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("Received shutdown signal");
                    break Ok(());
                }
                Some(joined) = tasks.join_next(), if !tasks.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Event processing task panicked");
                    }
                }
                permit = semaphore.clone().acquire_owned() => {
                    let permit = match permit {
                        Ok(permit) => permit,
                        Err(_) => break Ok(()),
                    };

                    tokio::select! {
                        _ = shutdown_rx.recv() => {
                            tracing::info!("Received shutdown signal");
                            break Ok(());
                        }
                        payload = payloads.next() => match payload {
                            Some(payload) => {
                                let processor = self.processor.clone();
                                tasks.spawn(async move {
                                    processor.handle(payload.as_ref()).await;
                                    drop(permit);
                                });
                            }
                            None => {
                                tracing::warn!(subject = %self.subject, "Bus subscription closed");
                                break Err(AppError::Bus(format!(
                                    "subscription to {} closed",
                                    self.subject
                                )));
                            }
                        }
                    }
                }
            }
        };

        if !tasks.is_empty() {
            tracing::warn!(abandoned = tasks.len(), "Abandoning in-flight events");
        }
        tasks.abort_all();

        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use futures::stream;

    use crate::alert::Subscription;
    use crate::directory::{AlertDirectory, DirectoryError};
    use crate::mail::{DispatchError, Mailer, OutgoingMail};
    use crate::template::TemplateStore;

    struct EveryoneDirectory;

    #[async_trait]
    impl AlertDirectory for EveryoneDirectory {
        async fn fetch(&self) -> std::result::Result<Vec<Subscription>, DirectoryError> {
            Ok(vec![Subscription {
                email: "eve@x.com".to_string(),
                all: true,
                ..Subscription::default()
            }])
        }
    }

    /// Mailer that holds each send for `delay` and tracks concurrency
    struct SlowMailer {
        delay: Duration,
        started: AtomicUsize,
        finished: AtomicUsize,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl SlowMailer {
        fn new(delay: Duration) -> Self {
            Self {
                delay,
                started: AtomicUsize::new(0),
                finished: AtomicUsize::new(0),
                in_flight: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl Mailer for SlowMailer {
        async fn send(&self, _mail: &OutgoingMail) -> std::result::Result<(), DispatchError> {
            self.started.fetch_add(1, Ordering::SeqCst);
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            self.finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn subscriber(mailer: Arc<SlowMailer>, max_in_flight: usize) -> Arc<NatsSubscriber> {
        let templates = Arc::new(TemplateStore::bundled().unwrap());
        let processor = Arc::new(EventProcessor::new(
            Arc::new(EveryoneDirectory),
            mailer,
            templates,
            "alert.txt",
        ));
        Arc::new(NatsSubscriber::new("TIMETABLE.TEST", processor, max_in_flight))
    }

    fn payload(uid: &str) -> Vec<u8> {
        serde_json::to_vec(&serde_json::json!({
            "UID": uid,
            "DTSTART": "20240115T093000Z",
            "DTEND": "20240115T113000Z",
            "RESOURCE-ID": "r1"
        }))
        .unwrap()
    }

    async fn wait_for(counter: &AtomicUsize, target: usize) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while counter.load(Ordering::SeqCst) < target {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("counter never reached target");
    }

    #[tokio::test]
    async fn test_consume_respects_max_in_flight() {
        let mailer = Arc::new(SlowMailer::new(Duration::from_millis(50)));
        let subscriber = subscriber(mailer.clone(), 2);
        let shutdown = subscriber.shutdown_signal();

        let payloads: Vec<Vec<u8>> = (0..6).map(|i| payload(&format!("evt-{}", i))).collect();
        let messages = stream::iter(payloads).chain(stream::pending());
        let runner = {
            let subscriber = subscriber.clone();
            tokio::spawn(async move { subscriber.consume(messages).await })
        };

        wait_for(&mailer.finished, 6).await;
        shutdown.send(()).unwrap();

        let result = runner.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(mailer.started.load(Ordering::SeqCst), 6);
        assert!(mailer.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_shutdown_abandons_in_flight_work() {
        let mailer = Arc::new(SlowMailer::new(Duration::from_secs(3600)));
        let subscriber = subscriber(mailer.clone(), 4);
        let shutdown = subscriber.shutdown_signal();

        let messages = stream::iter(vec![payload("evt-1")]).chain(stream::pending());
        let runner = {
            let subscriber = subscriber.clone();
            tokio::spawn(async move { subscriber.consume(messages).await })
        };

        wait_for(&mailer.started, 1).await;
        shutdown.send(()).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), runner)
            .await
            .expect("consume should stop on shutdown")
            .unwrap();
        assert!(result.is_ok());
        assert_eq!(mailer.finished.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_closed_stream_is_an_error() {
        let mailer = Arc::new(SlowMailer::new(Duration::ZERO));
        let subscriber = subscriber(mailer, 1);

        let result = subscriber.consume(stream::iter(Vec::<Vec<u8>>::new())).await;
        assert!(matches!(result, Err(AppError::Bus(msg)) if msg.contains("TIMETABLE.TEST")));
    }

    #[tokio::test]
    async fn test_connect_failure_is_reported() {
        let config = NatsConfig {
            url: "nats://127.0.0.1:1".to_string(),
            reconnect_wait_secs: 0,
            ..NatsConfig::default()
        };

        let result = tokio::time::timeout(Duration::from_secs(30), connect(&config))
            .await
            .expect("connect should fail fast");

        match result {
            Err(AppError::Bus(msg)) => assert!(msg.contains("127.0.0.1:1")),
            other => panic!("expected bus error, got {:?}", other.map(|_| ())),
        }
    }
}
