//! A long-running plugin counting ticks until it is stopped.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use serde::Deserialize;
use sirbot::prelude::*;
use tokio::sync::Notify;

#[derive(Debug, Deserialize)]
struct TickerConfig {
    #[serde(default = "default_interval")]
    interval_secs: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug)]
pub struct Ticker {
    interval: Duration,
    ticks: AtomicU64,
    shutdown: Notify,
}

impl Default for Ticker {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(default_interval()),
            ticks: AtomicU64::new(0),
            shutdown: Notify::new(),
        }
    }
}

impl Ticker {
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl Plugin for Ticker {
    fn name(&self) -> &str {
        "ticker"
    }

    fn configure(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
        let config = config.get::<TickerConfig>()?;
        if config.interval_secs == 0 {
            return Err("ticker.interval_secs must be positive".into());
        }
        self.interval = Duration::from_secs(config.interval_secs);
        Ok(())
    }

    async fn start(&self, mut ready: ReadySignal) -> Result<(), BoxError> {
        let mut interval = tokio::time::interval(self.interval);
        ready.notify();

        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
                    debug!(ticks, "Tick");
                }
                () = self.shutdown.notified() => break,
            }
        }
        Ok(())
    }

    async fn stop(&self) {
        self.shutdown.notify_one();
        info!(ticks = self.ticks(), "Ticker stopped");
    }

    fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

register_plugin!(static TICKER => || Box::new(Ticker::default()));
