use std::any::Any;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::oneshot;

use super::config::PluginConfig;
use crate::error::BoxError;

// ─── ReadySignal ──────────────────────────────────────────────────────────────

/// Handle a plugin's start task uses to report that it has started.
///
/// The scheduler does not move on to the next priority tier until every
/// plugin in the current tier has either called [`notify`](Self::notify) or
/// returned from [`Plugin::start`]. Long-running plugins (event loops,
/// websocket readers…) notify once their setup is done and keep running.
#[derive(Debug)]
pub struct ReadySignal {
    tx: Option<oneshot::Sender<()>>,
}

impl ReadySignal {
    pub(crate) fn new(tx: oneshot::Sender<()>) -> Self {
        Self { tx: Some(tx) }
    }

    /// A signal nobody listens to. Useful when driving `start` by hand.
    ///
    /// A detached signal reports itself as already notified.
    pub fn detached() -> Self {
        Self { tx: None }
    }

    /// Marks the plugin as started. Calling it more than once is a no-op.
    pub fn notify(&mut self) {
        if let Some(tx) = self.tx.take() {
            let _ = tx.send(());
        }
    }

    /// Whether [`notify`](Self::notify) has already been called.
    pub fn is_notified(&self) -> bool {
        self.tx.is_none()
    }
}

// ─── Plugin ───────────────────────────────────────────────────────────────────

/// A pluggable unit of functionality with a configure/start/stop lifecycle.
///
/// Lifecycle, as driven by the plugin manager and the scheduler:
///
/// ```text
/// create()      ── instantiated
/// configure()   ── configured (synchronous, own section only)
/// start(ready)  ── spawned as a task, tiered by priority
/// stop()        ── on shutdown, reverse tier order
/// ```
///
/// # Example
///
/// ```rust,ignore
/// struct Ticker { interval: Duration }
///
/// #[async_trait]
/// impl Plugin for Ticker {
///     fn name(&self) -> &str { "ticker" }
///
///     fn configure(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
///         self.interval = Duration::from_secs(config.get::<TickerConfig>()?.secs);
///         Ok(())
///     }
///
///     async fn start(&self, mut ready: ReadySignal) -> Result<(), BoxError> {
///         ready.notify();
///         loop { tokio::time::sleep(self.interval).await; }
///     }
///
///     fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
/// }
/// ```
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Short name used as the registry key and configuration section name.
    fn name(&self) -> &str;

    /// Applies the plugin's own configuration section.
    ///
    /// Called exactly once, before the plugin is shared with the rest of the
    /// bot. Returning `Err` aborts startup.
    fn configure(&mut self, config: &PluginConfig) -> Result<(), BoxError>;

    /// Starts the plugin.
    ///
    /// Runs in its own task. Returning `Err` marks the plugin as failed
    /// without affecting other plugins.
    async fn start(&self, ready: ReadySignal) -> Result<(), BoxError>;

    /// Stops the plugin at shutdown. The default does nothing.
    async fn stop(&self) {}

    /// The object request handlers receive when they look this plugin up.
    fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Owned, type-erased plugin as produced by a descriptor factory.
pub type BoxedPlugin = Box<dyn Plugin>;

/// Shared, type-erased plugin once it has been configured.
pub type SharedPlugin = Arc<dyn Plugin>;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ready_signal_notifies_once() {
        let (tx, rx) = oneshot::channel();
        let mut ready = ReadySignal::new(tx);
        assert!(!ready.is_notified());
        ready.notify();
        ready.notify();
        assert!(ready.is_notified());
        assert!(rx.await.is_ok());
    }

    #[test]
    fn test_detached_signal() {
        let mut ready = ReadySignal::detached();
        assert!(ready.is_notified());
        ready.notify();
    }
}
