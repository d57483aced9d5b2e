use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::RwLock;

pub const DEFAULT_BROKER: &str = "127.0.0.1:9092";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_brokers", alias = "bootstrap_servers")]
    pub brokers: Vec<String>,
    #[serde(default = "default_statistics_interval_ms")]
    pub statistics_interval_ms: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_flush_timeout_secs")]
    pub flush_timeout_secs: u64,
    #[serde(default = "default_message_timeout_ms")]
    pub message_timeout_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            enabled: false,
            brokers: default_brokers(),
            statistics_interval_ms: default_statistics_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            flush_timeout_secs: default_flush_timeout_secs(),
            message_timeout_ms: default_message_timeout_ms(),
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (config, _raw) = read_source(path.as_ref())?;
        Ok(config)
    }

    /// A configuration with the produce gate closed, used when the
    /// configuration file is absent.
    pub fn disabled() -> Self {
        Config::default()
    }
}

impl GeneralConfig {
    pub fn bootstrap_servers(&self) -> String {
        self.brokers.join(",")
    }
}

/// Outcome of [`ConfigStore::reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// The source was byte-identical to the one currently loaded.
    Unchanged,
    /// The configuration was swapped wholesale.
    Updated,
}

/// Shared configuration state.
///
/// Produce callers read the enabled flag and broker list under the shared
/// lock; reload swaps the whole configuration under the exclusive lock.
/// File I/O and parsing always happen before any lock is taken.
#[derive(Debug)]
pub struct ConfigStore {
    state: RwLock<State>,
}

#[derive(Debug)]
struct State {
    config: Config,
    /// Raw file contents of the last successful load, compared on reload to
    /// detect an unchanged source.
    raw: Option<String>,
}

impl ConfigStore {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (config, raw) = read_source(path.as_ref())?;
        Ok(ConfigStore {
            state: RwLock::new(State {
                config,
                raw: Some(raw),
            }),
        })
    }

    pub fn from_config(config: Config) -> Self {
        ConfigStore {
            state: RwLock::new(State { config, raw: None }),
        }
    }

    pub fn disabled() -> Self {
        ConfigStore::from_config(Config::disabled())
    }

    /// Re-read the source and swap the configuration. A source identical to
    /// the previous load is a no-op; any failure leaves the current
    /// configuration untouched.
    pub fn reload<P: AsRef<Path>>(&self, path: P) -> Result<ReloadOutcome> {
        let (config, raw) = read_source(path.as_ref())?;
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        if state.raw.as_deref() == Some(raw.as_str()) {
            return Ok(ReloadOutcome::Unchanged);
        }
        state.config = config;
        state.raw = Some(raw);
        Ok(ReloadOutcome::Updated)
    }

    pub fn snapshot(&self) -> Config {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .clone()
    }

    pub fn enabled(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .general
            .enabled
    }

    /// Close the produce gate. Called before shutdown starts flushing so no
    /// new messages are accepted while the handle drains.
    pub fn disable(&self) {
        self.state
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .config
            .general
            .enabled = false;
    }
}

fn read_source(path: &Path) -> Result<(Config, String)> {
    if !path.exists() {
        return Err(Error::ConfigNotFound(path.to_path_buf()));
    }
    let raw = std::fs::read_to_string(path)?;

    let settings = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(
            config::Environment::with_prefix("KAFKA_RELAY")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;

    let mut cfg: Config = settings.try_deserialize()?;
    // An explicitly empty broker list still connects to the local broker.
    if cfg.general.brokers.is_empty() {
        cfg.general.brokers = default_brokers();
    }
    Ok((cfg, raw))
}

fn default_brokers() -> Vec<String> {
    vec![DEFAULT_BROKER.to_string()]
}

fn default_statistics_interval_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_flush_timeout_secs() -> u64 {
    10
}

fn default_message_timeout_ms() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, body: &str) -> PathBuf {
        let path = dir.path().join("kafka-relay.toml");
        fs::write(&path, body).unwrap();
        path
    }

    #[test]
    fn load_applies_defaults() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[general]\nenabled = true\n");

        let config = Config::from_file(&path).unwrap();
        assert!(config.general.enabled);
        assert_eq!(config.general.brokers, vec![DEFAULT_BROKER.to_string()]);
        assert_eq!(config.general.statistics_interval_ms, 1000);
        assert_eq!(config.general.poll_interval_ms, 1000);
        assert_eq!(config.general.flush_timeout_secs, 10);
    }

    #[test]
    fn missing_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nope.toml");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[general\nenabled = maybe");

        let err = Config::from_file(&path).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn empty_broker_list_falls_back_to_default() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[general]\nenabled = true\nbrokers = []\n");

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.general.brokers, vec![DEFAULT_BROKER.to_string()]);
    }

    #[test]
    fn broker_list_is_joined_for_the_client() {
        let general = GeneralConfig {
            brokers: vec!["k1:9092".to_string(), "k2:9092".to_string()],
            ..GeneralConfig::default()
        };
        assert_eq!(general.bootstrap_servers(), "k1:9092,k2:9092");
    }

    #[test]
    fn reload_with_unchanged_source_is_a_noop() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[general]\nenabled = true\n");

        let store = ConfigStore::load(&path).unwrap();
        let before = store.snapshot();

        assert_eq!(store.reload(&path).unwrap(), ReloadOutcome::Unchanged);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn reload_swaps_changed_source() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[general]\nenabled = true\n");

        let store = ConfigStore::load(&path).unwrap();
        assert!(store.enabled());

        fs::write(&path, "[general]\nenabled = false\n").unwrap();
        assert_eq!(store.reload(&path).unwrap(), ReloadOutcome::Updated);
        assert!(!store.enabled());
    }

    #[test]
    fn reload_with_malformed_source_keeps_previous_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[general]\nenabled = true\n");

        let store = ConfigStore::load(&path).unwrap();
        fs::write(&path, "[general\nbroken").unwrap();

        assert!(store.reload(&path).is_err());
        assert!(store.enabled());
    }

    #[test]
    fn reload_with_missing_source_keeps_previous_config() {
        let dir = TempDir::new().unwrap();
        let path = write_config(&dir, "[general]\nenabled = true\n");

        let store = ConfigStore::load(&path).unwrap();
        fs::remove_file(&path).unwrap();

        let err = store.reload(&path).unwrap_err();
        assert!(matches!(err, Error::ConfigNotFound(_)));
        assert!(store.enabled());
    }

    #[test]
    fn disable_closes_the_gate() {
        let mut config = Config::default();
        config.general.enabled = true;

        let store = ConfigStore::from_config(config);
        assert!(store.enabled());
        store.disable();
        assert!(!store.enabled());
    }
}
