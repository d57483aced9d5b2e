pub mod config;
pub mod error;
pub mod producer;
pub mod relay;
pub mod scheduler;
pub mod stats;

pub use config::{Config, ConfigStore, GeneralConfig, ReloadOutcome};
pub use error::{Error, Result};
pub use relay::Relay;
