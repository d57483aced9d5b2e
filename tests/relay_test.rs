use kafka_relay::{Config, ConfigStore, GeneralConfig, Relay};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Nothing listens here; enqueueing still works because the client queues
/// locally and fails delivery later.
const UNREACHABLE_BROKER: &str = "127.0.0.1:19092";

fn test_store(enabled: bool) -> Arc<ConfigStore> {
    Arc::new(ConfigStore::from_config(Config {
        general: GeneralConfig {
            enabled,
            brokers: vec![UNREACHABLE_BROKER.to_string()],
            statistics_interval_ms: 1000,
            poll_interval_ms: 50,
            flush_timeout_secs: 2,
            message_timeout_ms: 500,
        },
    }))
}

#[tokio::test]
async fn produce_is_a_noop_when_disabled() {
    let relay = Relay::connect(test_store(false)).unwrap();

    relay.produce("orders", "{\"id\":1}").unwrap();
    assert_eq!(relay.in_flight(), 0);

    relay.shutdown().await;
}

#[tokio::test]
async fn produce_enqueues_when_enabled() {
    let relay = Relay::connect(test_store(true)).unwrap();

    relay.produce("orders", "{\"id\":1}").unwrap();
    assert_eq!(relay.in_flight(), 1);

    relay.shutdown().await;
}

#[tokio::test]
async fn disabling_the_gate_stops_new_messages() {
    let store = test_store(true);
    let relay = Relay::connect(store.clone()).unwrap();

    relay.produce("orders", "one").unwrap();
    assert_eq!(relay.in_flight(), 1);

    store.disable();
    relay.produce("orders", "two").unwrap();
    assert_eq!(relay.in_flight(), 1);

    relay.shutdown().await;
}

#[tokio::test]
async fn emit_absorbs_all_outcomes() {
    let relay = Relay::connect(test_store(true)).unwrap();

    relay.emit("orders", "{\"id\":1}");
    relay.emit("orders", "{\"id\":2}");
    assert_eq!(relay.in_flight(), 2);

    relay.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_bounded_with_messages_outstanding() {
    let relay = Relay::connect(test_store(true)).unwrap();
    for i in 0..10 {
        relay.produce("orders", &format!("{{\"id\":{i}}}")).unwrap();
    }

    let started = Instant::now();
    relay.shutdown().await;

    // Flush timeout is 2s and messages fail after 500ms; well inside the
    // bound either way.
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn stats_are_empty_before_the_first_callback() {
    let relay = Relay::connect(test_store(true)).unwrap();
    assert!(relay.stats().is_none());
    relay.shutdown().await;
}

#[tokio::test]
async fn scheduler_start_is_idempotent() {
    let mut relay = Relay::connect(test_store(true)).unwrap();
    relay.start();
    relay.start();
    relay.shutdown().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn concurrent_producers_do_not_interfere() {
    let mut relay = Relay::connect(test_store(true)).unwrap();
    relay.start();

    let threads = 8;
    let per_thread = 50;
    std::thread::scope(|scope| {
        for t in 0..threads {
            let relay = &relay;
            scope.spawn(move || {
                for i in 0..per_thread {
                    relay
                        .produce("orders", &format!("{{\"t\":{t},\"i\":{i}}}"))
                        .unwrap();
                }
            });
        }
    });

    relay.shutdown().await;
}
