use crate::config::ConfigStore;
use crate::producer::{self, RelayContext};
use crate::scheduler::Scheduler;
use crate::stats::SharedStats;
use crate::{Error, Result};
use rdkafka::producer::{BaseProducer, BaseRecord, Producer};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// The Kafka connection manager.
///
/// Owns the single producer handle, the shared configuration, the statistics
/// snapshot and the background poll task. Constructed once at startup and
/// handed to everything that produces; there is no global state.
///
/// Lifecycle: [`Relay::connect`] → [`Relay::start`] → any number of
/// concurrent [`Relay::produce`] calls → [`Relay::shutdown`].
pub struct Relay {
    store: Arc<ConfigStore>,
    producer: Arc<BaseProducer<RelayContext>>,
    stats: Arc<SharedStats>,
    scheduler: Scheduler,
    poll_interval: Duration,
    flush_timeout: Duration,
}

impl Relay {
    /// Build the producer instance from the current configuration and
    /// install the callback sinks. Exactly one handle exists per `Relay`;
    /// creation failure is fatal to startup.
    pub fn connect(store: Arc<ConfigStore>) -> Result<Self> {
        let general = store.snapshot().general;
        info!(brokers = %general.bootstrap_servers(), "Connecting Kafka producer");

        let stats = Arc::new(SharedStats::default());
        let producer = Arc::new(producer::connect(&general, stats.clone())?);

        Ok(Relay {
            store,
            producer,
            stats,
            scheduler: Scheduler::new(),
            poll_interval: Duration::from_millis(general.poll_interval_ms),
            flush_timeout: Duration::from_secs(general.flush_timeout_secs),
        })
    }

    /// Start the recurring poll task so delivery, error and statistics
    /// callbacks fire even when nothing is producing. No-op if already
    /// running.
    pub fn start(&mut self) {
        let producer = self.producer.clone();
        self.scheduler.start(self.poll_interval, move || {
            producer.poll(Duration::ZERO);
        });
    }

    /// Enqueue one message for asynchronous transmission.
    ///
    /// When the module is disabled this returns `Ok` without touching the
    /// handle. The payload is copied into the client's queue, so the caller's
    /// buffer is free as soon as this returns; the call never waits for
    /// broker acknowledgement. An enqueue failure drops the message: it is
    /// logged and reported, but never retried.
    pub fn produce(&self, topic: &str, payload: &str) -> Result<()> {
        if !self.store.enabled() {
            return Ok(());
        }

        let record: BaseRecord<'_, (), str> = BaseRecord::to(topic).payload(payload);
        let result = match self.producer.send(record) {
            Ok(()) => {
                debug!(topic, bytes = payload.len(), "Enqueued message");
                Ok(())
            }
            Err((e, _record)) => {
                error!(topic, error = %e, "Failed to enqueue message");
                Err(Error::Enqueue {
                    topic: topic.to_string(),
                    source: e,
                })
            }
        };

        // Drain any already-completed delivery reports rather than waiting
        // for the next scheduled tick.
        self.producer.poll(Duration::ZERO);
        result
    }

    /// Produce without surfacing the result. This is the surface record
    /// adapters call unconditionally; every failure is absorbed and logged
    /// inside [`Relay::produce`].
    pub fn emit(&self, topic: &str, payload: &str) {
        let _ = self.produce(topic, payload);
    }

    /// One immediate service pass, then the latest statistics snapshot.
    /// `None` until the first statistics callback has fired.
    pub fn stats(&self) -> Option<Arc<Value>> {
        self.producer.poll(Duration::ZERO);
        self.stats.latest()
    }

    /// Messages enqueued but not yet acknowledged or failed.
    pub fn in_flight(&self) -> i32 {
        self.producer.in_flight_count()
    }

    /// Drain and destroy the connection handle.
    ///
    /// Closes the produce gate, stops the poll task, then flushes for up to
    /// the configured timeout while servicing callbacks. Whatever is still
    /// outstanding after the timeout is reported and dropped; shutdown always
    /// completes.
    pub async fn shutdown(mut self) {
        self.store.disable();
        self.scheduler.stop().await;

        info!("Flushing outstanding messages");
        let producer = self.producer.clone();
        let timeout = self.flush_timeout;
        let flush = tokio::task::spawn_blocking(move || {
            let result = producer.flush(timeout);
            (result, producer.in_flight_count())
        })
        .await;

        match flush {
            Ok((Ok(()), _)) => info!("All outstanding messages flushed"),
            Ok((Err(e), remaining)) => {
                warn!(error = %e, remaining, "Message(s) were not delivered before the flush timeout")
            }
            Err(e) => error!(error = %e, "Flush task failed"),
        }
        // Dropping the last producer reference destroys the client.
    }
}
