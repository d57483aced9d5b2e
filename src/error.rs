//! Error types and result handling for kafka-relay.
//!
//! This module defines the main error type [`Error`] and a convenience
//! [`Result`] type alias used throughout the crate.
//!
//! # Example
//!
//! ```rust
//! use kafka_relay::{Error, Result};
//!
//! fn load_settings() -> Result<()> {
//!     // Simulating a missing configuration file
//!     Err(Error::ConfigNotFound("kafka-relay.toml".into()))
//! }
//!
//! match load_settings() {
//!     Ok(()) => println!("Loaded"),
//!     Err(Error::ConfigNotFound(path)) => eprintln!("No config at {}", path.display()),
//!     Err(e) => eprintln!("Other error: {}", e),
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for kafka-relay operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The configuration file does not exist. Non-fatal: the caller is
    /// expected to run with the module disabled rather than crash.
    #[error("Configuration file not found: {0}")]
    ConfigNotFound(PathBuf),

    /// Malformed or otherwise unusable configuration source.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Kafka client or producer error. When this comes out of
    /// [`Relay::connect`](crate::Relay::connect) it is fatal to startup.
    #[error("Kafka error: {0}")]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// The local send queue rejected a message. The message is dropped;
    /// there is no retry.
    #[error("Failed to enqueue message for topic {topic}: {source}")]
    Enqueue {
        /// Topic the message was destined for
        topic: String,
        /// Underlying client error
        source: rdkafka::error::KafkaError,
    },

    /// JSON serialization error when rendering statistics.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error, typically while reading the configuration file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A convenient Result type alias for kafka-relay operations.
///
/// This is equivalent to `std::result::Result<T, kafka_relay::Error>`.
pub type Result<T> = std::result::Result<T, Error>;
