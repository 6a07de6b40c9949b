use std::future::Future;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

/// A recurring background task with an explicit start/stop lifetime.
///
/// The first tick fires one full interval after `start`. Ticks never overlap:
/// the next one is scheduled only after the previous tick's future resolves.
/// Dropping the poller aborts the task.
pub struct Poller {
    name: String,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl Poller {
    /// Spawn the polling loop. `tick` returns `false` to end the loop.
    pub fn start<F, Fut>(name: impl Into<String>, interval: Duration, mut tick: F) -> Self
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = bool> + Send + 'static,
    {
        let name = name.into();
        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !tick().await {
                    debug!("poller '{}' finished", task_name);
                    break;
                }
            }
        });
        info!("poller '{}' started (every {}ms)", name, interval.as_millis());
        Self {
            name,
            interval,
            handle: Some(handle),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Cancel the loop. Safe to call more than once.
    pub fn stop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            debug!("poller '{}' stopped", self.name);
        }
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.stop();
    }
}
