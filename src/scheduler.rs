use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

/// Recurring background service task.
///
/// At most one task runs per scheduler; starting an already-running scheduler
/// is a no-op. Stopping is synchronous: once `stop` returns, no further tick
/// fires.
#[derive(Debug, Default)]
pub struct Scheduler {
    task: Option<Task>,
}

#[derive(Debug)]
struct Task {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler::default()
    }

    pub fn is_running(&self) -> bool {
        self.task.is_some()
    }

    pub fn start<F>(&mut self, interval: Duration, mut tick: F)
    where
        F: FnMut() + Send + 'static,
    {
        if self.task.is_some() {
            debug!("Poll task already running");
            return;
        }

        let (stop_tx, mut stop_rx) = oneshot::channel();
        let handle = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = timer.tick() => tick(),
                }
            }
        });

        self.task = Some(Task {
            stop: stop_tx,
            handle,
        });
        info!(interval_ms = interval.as_millis() as u64, "Poll task started");
    }

    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            let _ = task.stop.send(());
            let _ = task.handle.await;
            info!("Poll task stopped");
        }
    }
}
