use crate::config::GeneralConfig;
use crate::stats::SharedStats;
use crate::Result;
use rdkafka::config::RDKafkaLogLevel;
use rdkafka::error::KafkaError;
use rdkafka::message::Message;
use rdkafka::producer::{BaseProducer, DeliveryResult, ProducerContext};
use rdkafka::{ClientConfig, ClientContext};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Client context carrying the delivery, error and statistics sinks.
///
/// All three fire only while the producer is being serviced (a `poll` or
/// `flush` call), never spontaneously on a caller thread.
pub struct RelayContext {
    stats: Arc<SharedStats>,
}

impl RelayContext {
    pub fn new(stats: Arc<SharedStats>) -> Self {
        RelayContext { stats }
    }
}

impl ClientContext for RelayContext {
    fn log(&self, level: RDKafkaLogLevel, fac: &str, log_message: &str) {
        match level {
            RDKafkaLogLevel::Emerg
            | RDKafkaLogLevel::Alert
            | RDKafkaLogLevel::Critical
            | RDKafkaLogLevel::Error => error!(fac, "{}", log_message),
            RDKafkaLogLevel::Warning => warn!(fac, "{}", log_message),
            RDKafkaLogLevel::Notice | RDKafkaLogLevel::Info => info!(fac, "{}", log_message),
            RDKafkaLogLevel::Debug => debug!(fac, "{}", log_message),
        }
    }

    /// Transport-level errors (broker unreachable, connection reset). The
    /// client recovers on its own; nothing is torn down here.
    fn error(&self, error: KafkaError, reason: &str) {
        error!(error = %error, "Kafka client error: {}", reason);
    }

    /// Raw statistics JSON, emitted every `statistics.interval.ms`. Replaces
    /// the shared snapshot wholesale.
    fn stats_raw(&self, statistics: &[u8]) {
        match serde_json::from_slice::<serde_json::Value>(statistics) {
            Ok(snapshot) => self.stats.record(snapshot),
            Err(e) => warn!(error = %e, "Failed to parse statistics payload"),
        }
    }
}

impl ProducerContext for RelayContext {
    type DeliveryOpaque = ();

    fn delivery(&self, delivery_result: &DeliveryResult<'_>, _: ()) {
        match delivery_result {
            Ok(message) => debug!(
                topic = message.topic(),
                partition = message.partition(),
                bytes = message.payload().map(<[u8]>::len).unwrap_or(0),
                "Message delivered"
            ),
            Err((e, message)) => error!(
                topic = message.topic(),
                error = %e,
                "Message delivery failed"
            ),
        }
    }
}

/// Create the producer instance from the current configuration.
///
/// This is the one place a connection handle is built; failure here is fatal
/// to module startup.
pub fn connect(
    general: &GeneralConfig,
    stats: Arc<SharedStats>,
) -> Result<BaseProducer<RelayContext>> {
    let producer: BaseProducer<RelayContext> = ClientConfig::new()
        .set("bootstrap.servers", general.bootstrap_servers())
        .set(
            "statistics.interval.ms",
            general.statistics_interval_ms.to_string(),
        )
        .set("message.timeout.ms", general.message_timeout_ms.to_string())
        .set_log_level(RDKafkaLogLevel::Info)
        .create_with_context(RelayContext::new(stats))?;

    Ok(producer)
}
