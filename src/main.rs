use clap::{Parser, Subcommand};
use kafka_relay::{ConfigStore, Error, Relay, ReloadOutcome, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

#[derive(Parser, Debug)]
#[command(name = "kafka-relay")]
#[command(about = "Kafka producer connection manager", long_about = None)]
struct Args {
    #[arg(short, long, value_name = "FILE", default_value = "kafka-relay.toml")]
    config: PathBuf,

    #[arg(short, long, help = "Enable JSON output for logs")]
    json_logs: bool,

    #[arg(short, long, help = "Verbose logging")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the connection manager until interrupted (SIGHUP reloads config)
    Run,
    /// Produce a single message, for diagnostics
    Produce { topic: String, message: String },
    /// Display the latest broker statistics snapshot
    Stats,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(args.json_logs, args.verbose);

    match args.command {
        Command::Run => run(&args.config).await,
        Command::Produce { topic, message } => produce(&args.config, &topic, &message).await,
        Command::Stats => stats(&args.config).await,
    }
}

async fn run(config_path: &PathBuf) -> Result<()> {
    info!("Starting kafka-relay");
    info!("Loading configuration from {:?}", config_path);

    let store = match ConfigStore::load(config_path) {
        Ok(store) => Arc::new(store),
        Err(Error::ConfigNotFound(path)) => {
            // Absent config is not a crash: run with the produce gate closed.
            warn!(path = %path.display(), "Configuration file not found; running disabled");
            Arc::new(ConfigStore::disabled())
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e);
        }
    };

    let general = store.snapshot().general;
    info!(
        enabled = general.enabled,
        brokers = ?general.brokers,
        statistics_interval_ms = general.statistics_interval_ms,
        "Configuration summary"
    );
    if !general.enabled {
        info!("Produce gate is closed; messages will be ignored until enabled");
    }

    let mut relay = Relay::connect(store.clone())?;
    relay.start();

    let mut hangup = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::hangup())?;
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            _ = hangup.recv() => reload(&store, config_path),
        }
    }

    info!("Shutting down");
    relay.shutdown().await;
    Ok(())
}

fn reload(store: &ConfigStore, config_path: &PathBuf) {
    let brokers_before = store.snapshot().general.brokers;
    match store.reload(config_path) {
        Ok(ReloadOutcome::Unchanged) => info!("Configuration unchanged"),
        Ok(ReloadOutcome::Updated) => {
            let general = store.snapshot().general;
            info!(enabled = general.enabled, "Configuration reloaded");
            // The live connection keeps the broker list it was created with.
            if general.brokers != brokers_before {
                warn!(
                    brokers = ?general.brokers,
                    "Broker list changed; the new list takes effect on restart"
                );
            }
        }
        Err(e) => warn!("Reload failed, keeping previous configuration: {}", e),
    }
}

async fn produce(config_path: &PathBuf, topic: &str, message: &str) -> Result<()> {
    let store = Arc::new(ConfigStore::load(config_path)?);
    if !store.enabled() {
        warn!("Module is disabled in configuration; the message will not be sent");
    }

    let relay = Relay::connect(store)?;
    relay.produce(topic, message)?;
    // Shutdown flushes, so the delivery report is serviced before exit.
    relay.shutdown().await;
    Ok(())
}

async fn stats(config_path: &PathBuf) -> Result<()> {
    let store = Arc::new(ConfigStore::load(config_path)?);
    let interval = store.snapshot().general.statistics_interval_ms;
    let relay = Relay::connect(store)?;

    // The first statistics callback arrives one interval after connect; poll
    // until it shows up or the wait is clearly pointless.
    let deadline = tokio::time::Instant::now() + Duration::from_millis(interval + 2000);
    let snapshot = loop {
        if let Some(snapshot) = relay.stats() {
            break Some(snapshot);
        }
        if tokio::time::Instant::now() >= deadline {
            break None;
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    };

    match snapshot {
        Some(value) => println!("stats: {}", serde_json::to_string_pretty(value.as_ref())?),
        None => println!("stats: (no snapshot received yet)"),
    }

    relay.shutdown().await;
    Ok(())
}

fn init_logging(json: bool, verbose: bool) {
    let env_filter = if verbose {
        EnvFilter::new("kafka_relay=debug,info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("kafka_relay=info,warn"))
    };

    let fmt_layer = if json {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
            .with_span_list(false)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_thread_ids(false)
            .with_thread_names(false)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}
