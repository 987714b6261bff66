//! Priority-tiered plugin start-up.
//!
//! Plugins are grouped by integer priority into a [`PriorityTable`]. The
//! [`Scheduler`] walks the tiers from the highest priority to the lowest:
//!
//! ```text
//! tier 80 ── spawn start(a) ─┐
//!         ── spawn start(b) ─┼─ wait: ready | returned | failed | timeout
//!                            ┘
//! tier 50 ── spawn start(c) ─── wait …
//! ```
//!
//! Within a tier every `start` runs as its own tokio task and the tasks
//! interleave freely. A tier is done once each of its tasks has called
//! [`ReadySignal::notify`], returned, failed, or exceeded the start timeout.
//! A failure is logged and recorded in the [`StartReport`]; it never stops
//! sibling or lower-priority plugins.
//!
//! Tasks that are still running after their tier completes stay in the
//! [`TaskTable`] until [`Scheduler::stop`] aborts them.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future;
use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::error::{CoreError, CoreResult};
use crate::manager::PluginRegistry;
use crate::plugin::{PluginConfig, ReadySignal, SharedPlugin};

/// Message recorded when a start task misses the start timeout.
pub const START_TIMEOUT_MESSAGE: &str = "Timeout while starting";

// =============================================================================
// StartPriority
// =============================================================================

/// Start priority read from a plugin's configuration section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartPriority {
    /// Start in the tier with this priority.
    At(i64),
    /// `priority = false`: configure the plugin but never start it.
    Disabled,
}

impl StartPriority {
    /// Reads the reserved `priority` key.
    ///
    /// | Value | Result |
    /// |-------|--------|
    /// | integer | `At(n)` |
    /// | `false` | `Disabled` |
    /// | absent, `null`, `true` | `At(default)` |
    /// | anything else | [`CoreError::InvalidPriority`] |
    pub fn from_section(plugin: &str, section: &PluginConfig, default: i64) -> CoreResult<Self> {
        match section.priority() {
            None | Some(Value::Null) | Some(Value::Bool(true)) => Ok(Self::At(default)),
            Some(Value::Bool(false)) => Ok(Self::Disabled),
            Some(Value::Number(n)) if n.is_i64() => Ok(Self::At(n.as_i64().unwrap_or(default))),
            Some(other) => Err(CoreError::InvalidPriority {
                plugin: plugin.to_owned(),
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// PriorityTable
// =============================================================================

/// Priority → plugin names sharing it, declaration order kept within a tier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorityTable {
    tiers: BTreeMap<i64, Vec<String>>,
}

impl PriorityTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `name` to the tier for `priority`.
    pub fn insert(&mut self, priority: i64, name: impl Into<String>) {
        self.tiers.entry(priority).or_default().push(name.into());
    }

    /// The names in one tier.
    pub fn get(&self, priority: i64) -> Option<&[String]> {
        self.tiers.get(&priority).map(Vec::as_slice)
    }

    /// Tiers from the highest priority to the lowest.
    pub fn tiers(&self) -> impl DoubleEndedIterator<Item = (i64, &[String])> {
        self.tiers
            .iter()
            .rev()
            .map(|(priority, names)| (*priority, names.as_slice()))
    }

    /// Number of tiers.
    pub fn len(&self) -> usize {
        self.tiers.len()
    }

    /// Whether no plugin is scheduled.
    pub fn is_empty(&self) -> bool {
        self.tiers.is_empty()
    }

    /// Priority of a given plugin, if scheduled.
    pub fn priority_of(&self, name: &str) -> Option<i64> {
        self.tiers
            .iter()
            .find(|(_, names)| names.iter().any(|n| n == name))
            .map(|(priority, _)| *priority)
    }
}

// =============================================================================
// TaskTable
// =============================================================================

/// Plugin name → handle of its start task.
///
/// Cheap to clone; all clones share the same table.
#[derive(Clone, Default)]
pub struct TaskTable {
    inner: Arc<Mutex<HashMap<String, JoinHandle<()>>>>,
}

impl TaskTable {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, name: String, handle: JoinHandle<()>) {
        if let Some(old) = self.inner.lock().insert(name.clone(), handle) {
            warn!(plugin = %name, "Replacing an existing start task");
            old.abort();
        }
    }

    /// Whether a task is recorded for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.inner.lock().contains_key(name)
    }

    /// Number of recorded tasks.
    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }

    /// Sorted names of every recorded task.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Sorted names of recorded tasks that have not finished yet.
    pub fn running(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .lock()
            .iter()
            .filter(|(_, handle)| !handle.is_finished())
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Removes and returns the handle recorded for `name`.
    pub fn remove(&self, name: &str) -> Option<JoinHandle<()>> {
        self.inner.lock().remove(name)
    }

    /// Aborts every task and waits for all of them to wind down.
    pub async fn abort_all(&self) {
        let drained: Vec<(String, JoinHandle<()>)> = self.inner.lock().drain().collect();
        for (name, handle) in drained {
            handle.abort();
            if let Err(e) = handle.await
                && e.is_panic()
            {
                warn!(plugin = %name, error = %e, "Start task panicked");
            }
        }
    }
}

impl fmt::Debug for TaskTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

// =============================================================================
// StartReport
// =============================================================================

/// What happened to one plugin during start-up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    /// Signalled readiness; its task keeps running.
    Running,
    /// `start` returned `Ok` before the tier completed.
    Completed,
    /// `start` failed, panicked or timed out.
    Failed(String),
    /// Configured with `priority = false`; never started.
    Excluded,
}

impl StartOutcome {
    /// Whether the plugin counts as started.
    pub fn is_started(&self) -> bool {
        matches!(self, Self::Running | Self::Completed)
    }
}

/// Per-plugin outcome of a [`Scheduler::start`] run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartReport {
    outcomes: BTreeMap<String, StartOutcome>,
}

impl StartReport {
    /// Creates an empty report.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the outcome for `name`.
    pub fn insert(&mut self, name: impl Into<String>, outcome: StartOutcome) {
        self.outcomes.insert(name.into(), outcome);
    }

    /// Outcome for one plugin.
    pub fn get(&self, name: &str) -> Option<&StartOutcome> {
        self.outcomes.get(name)
    }

    /// Every outcome, sorted by plugin name.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &StartOutcome)> {
        self.outcomes.iter().map(|(n, o)| (n.as_str(), o))
    }

    /// Plugins that failed to start, with the cause.
    pub fn failed(&self) -> impl Iterator<Item = (&str, &str)> {
        self.outcomes.iter().filter_map(|(n, o)| match o {
            StartOutcome::Failed(msg) => Some((n.as_str(), msg.as_str())),
            _ => None,
        })
    }

    /// Whether every scheduled plugin started.
    pub fn all_started(&self) -> bool {
        self.failed().next().is_none()
    }

    /// Number of recorded outcomes.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    /// Whether nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }
}

// =============================================================================
// Scheduler
// =============================================================================

enum Readiness {
    Ready,
    Exited(Result<(), String>),
    Vanished,
    TimedOut,
}

impl Readiness {
    fn from_exit(exit: Result<Result<(), String>, oneshot::error::RecvError>) -> Self {
        match exit {
            Ok(result) => Self::Exited(result),
            // The task dropped its exit sender without sending: it panicked or was aborted.
            Err(_) => Self::Vanished,
        }
    }
}

/// Launches plugin start tasks tier by tier.
#[derive(Debug, Clone, Default)]
pub struct Scheduler {
    tasks: TaskTable,
    start_timeout: Option<Duration>,
}

impl Scheduler {
    /// Creates a scheduler. `start_timeout` bounds how long a single task may
    /// take to become ready; `None` waits forever.
    pub fn new(start_timeout: Option<Duration>) -> Self {
        Self {
            tasks: TaskTable::new(),
            start_timeout,
        }
    }

    /// The table of launched start tasks.
    pub fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    /// Starts every plugin in `table`, highest priority first.
    ///
    /// Names in `table` without a registry entry are skipped with a warning.
    pub async fn start(&self, registry: &PluginRegistry, table: &PriorityTable) -> StartReport {
        let mut report = StartReport::new();

        for (priority, names) in table.tiers() {
            info!(priority, plugins = ?names, "Starting priority tier");

            let waiters: Vec<_> = names
                .iter()
                .filter_map(|name| match registry.get(name) {
                    Some(record) => Some(self.launch(name, Arc::clone(&record.plugin))),
                    None => {
                        warn!(plugin = %name, "Scheduled plugin missing from registry, skipped");
                        None
                    }
                })
                .collect();

            for (name, outcome) in future::join_all(waiters).await {
                report.insert(name, outcome);
            }

            debug!(priority, "Priority tier done");
        }

        let failed = report.failed().count();
        if failed == 0 {
            info!(plugins = report.len(), "All plugins started");
        } else {
            warn!(plugins = report.len(), failed, "Plugins started with failures");
        }
        report
    }

    /// Spawns one start task, records it, and returns a future resolving to
    /// its outcome once it is ready, finished or timed out.
    fn launch(
        &self,
        name: &str,
        plugin: SharedPlugin,
    ) -> impl Future<Output = (String, StartOutcome)> + use<> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (exit_tx, exit_rx) = oneshot::channel::<Result<(), String>>();

        let span = info_span!("plugin_start", plugin = %name);
        let handle = tokio::spawn(
            async move {
                let result = plugin
                    .start(ReadySignal::new(ready_tx))
                    .await
                    .map_err(|e| e.to_string());
                match &result {
                    Ok(()) => debug!("Start task finished"),
                    Err(e) => error!(error = %e, "Task exited with error"),
                }
                let _ = exit_tx.send(result);
            }
            .instrument(span),
        );
        self.tasks.insert(name.to_owned(), handle);

        let tasks = self.tasks.clone();
        let start_timeout = self.start_timeout;
        let name = name.to_owned();

        async move {
            let wait = wait_ready(ready_rx, exit_rx);
            let readiness = match start_timeout {
                Some(limit) => tokio::time::timeout(limit, wait)
                    .await
                    .unwrap_or(Readiness::TimedOut),
                None => wait.await,
            };

            let outcome = match readiness {
                Readiness::Ready => {
                    info!(plugin = %name, "Plugin started");
                    StartOutcome::Running
                }
                Readiness::Exited(Ok(())) => {
                    tasks.remove(&name);
                    info!(plugin = %name, "Plugin started and returned");
                    StartOutcome::Completed
                }
                // Already logged by the task itself.
                Readiness::Exited(Err(message)) => {
                    tasks.remove(&name);
                    StartOutcome::Failed(message)
                }
                Readiness::Vanished => {
                    let message = match tasks.remove(&name) {
                        Some(handle) => match handle.await {
                            Err(e) => e.to_string(),
                            Ok(()) => "start task ended without reporting".to_owned(),
                        },
                        None => "start task vanished".to_owned(),
                    };
                    error!(plugin = %name, error = %message, "Task exited with error");
                    StartOutcome::Failed(message)
                }
                Readiness::TimedOut => {
                    if let Some(handle) = tasks.remove(&name) {
                        handle.abort();
                    }
                    error!(plugin = %name, error = START_TIMEOUT_MESSAGE, "Task exited with error");
                    StartOutcome::Failed(START_TIMEOUT_MESSAGE.to_owned())
                }
            };
            (name, outcome)
        }
    }

    /// Stops started plugins tier by tier, lowest priority first, then
    /// aborts and drains every remaining start task.
    pub async fn stop(&self, registry: &PluginRegistry, table: &PriorityTable, report: &StartReport) {
        for (priority, names) in table.tiers().rev() {
            let stopping: Vec<&SharedPlugin> = names
                .iter()
                .filter(|name| report.get(name).is_some_and(StartOutcome::is_started))
                .filter_map(|name| registry.get(name).map(|r| &r.plugin))
                .collect();
            if stopping.is_empty() {
                continue;
            }

            future::join_all(stopping.iter().map(|plugin| plugin.stop())).await;
            info!(priority, plugins = stopping.len(), "Priority tier stopped");
        }

        self.tasks.abort_all().await;
        debug!("Start tasks drained");
    }
}

async fn wait_ready(
    ready_rx: oneshot::Receiver<()>,
    mut exit_rx: oneshot::Receiver<Result<(), String>>,
) -> Readiness {
    tokio::select! {
        biased;
        exit = &mut exit_rx => Readiness::from_exit(exit),
        ready = ready_rx => match ready {
            Ok(()) => Readiness::Ready,
            // Signal dropped without notifying: whatever the task does next decides.
            Err(_) => Readiness::from_exit(exit_rx.await),
        },
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::any::Any;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::error::BoxError;
    use crate::manager::PluginRecord;
    use crate::plugin::Plugin;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Return,
        ReadyThenPark,
        Fail,
        Hang,
        Panic,
        /// Reports ready after the given number of milliseconds, then returns.
        DelayedReady(u64),
    }

    struct Recorder {
        name: &'static str,
        behaviour: Behaviour,
        log: Arc<Mutex<Vec<String>>>,
        stops: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl Plugin for Recorder {
        fn name(&self) -> &str {
            self.name
        }

        fn configure(&mut self, _config: &PluginConfig) -> Result<(), BoxError> {
            Ok(())
        }

        async fn start(&self, mut ready: ReadySignal) -> Result<(), BoxError> {
            self.log.lock().push(format!("start:{}", self.name));
            match self.behaviour {
                Behaviour::Return => Ok(()),
                Behaviour::ReadyThenPark => {
                    ready.notify();
                    future::pending::<()>().await;
                    Ok(())
                }
                Behaviour::Fail => Err("boom".into()),
                Behaviour::Hang => {
                    future::pending::<()>().await;
                    Ok(())
                }
                Behaviour::Panic => panic!("exploded"),
                Behaviour::DelayedReady(ms) => {
                    tokio::time::sleep(Duration::from_millis(ms)).await;
                    self.log.lock().push(format!("ready:{}", self.name));
                    ready.notify();
                    Ok(())
                }
            }
        }

        async fn stop(&self) {
            self.log.lock().push(format!("stop:{}", self.name));
            self.stops.fetch_add(1, Ordering::SeqCst);
        }

        fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
            self
        }
    }

    struct Fixture {
        registry: PluginRegistry,
        table: PriorityTable,
        log: Arc<Mutex<Vec<String>>>,
        stops: Arc<AtomicUsize>,
    }

    fn fixture(plugins: &[(&'static str, i64, Behaviour)]) -> Fixture {
        let log = Arc::new(Mutex::new(Vec::new()));
        let stops = Arc::new(AtomicUsize::new(0));
        let mut registry = PluginRegistry::new();
        let mut table = PriorityTable::new();
        for &(name, priority, behaviour) in plugins {
            let plugin = Recorder {
                name,
                behaviour,
                log: Arc::clone(&log),
                stops: Arc::clone(&stops),
            };
            registry
                .insert(PluginRecord {
                    plugin: Arc::new(plugin),
                    path: name,
                    config: PluginConfig::empty(),
                })
                .unwrap();
            table.insert(priority, name);
        }
        Fixture {
            registry,
            table,
            log,
            stops,
        }
    }

    #[test]
    fn test_priority_from_section() {
        let p = |v| StartPriority::from_section("p", &PluginConfig::new(v), 50);
        assert_eq!(p(json!({})).unwrap(), StartPriority::At(50));
        assert_eq!(p(json!({ "priority": 80 })).unwrap(), StartPriority::At(80));
        assert_eq!(p(json!({ "priority": -3 })).unwrap(), StartPriority::At(-3));
        assert_eq!(p(json!({ "priority": false })).unwrap(), StartPriority::Disabled);
        assert_eq!(p(json!({ "priority": true })).unwrap(), StartPriority::At(50));
        assert!(matches!(
            p(json!({ "priority": "high" })),
            Err(CoreError::InvalidPriority { .. })
        ));
        assert!(p(json!({ "priority": 1.5 })).is_err());
    }

    #[test]
    fn test_priority_table_orders_tiers_descending() {
        let mut table = PriorityTable::new();
        table.insert(70, "b");
        table.insert(80, "a");
        table.insert(70, "c");
        let tiers: Vec<_> = table.tiers().map(|(p, n)| (p, n.to_vec())).collect();
        assert_eq!(
            tiers,
            vec![
                (80, vec!["a".to_owned()]),
                (70, vec!["b".to_owned(), "c".to_owned()])
            ]
        );
        assert_eq!(table.priority_of("c"), Some(70));
        assert_eq!(table.priority_of("z"), None);
    }

    #[tokio::test]
    async fn test_higher_tier_starts_first() {
        let fx = fixture(&[
            ("low", 10, Behaviour::Return),
            ("high", 90, Behaviour::Return),
            ("mid", 50, Behaviour::Return),
        ]);
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let report = scheduler.start(&fx.registry, &fx.table).await;

        assert_eq!(
            *fx.log.lock(),
            ["start:high", "start:mid", "start:low"]
        );
        assert!(report.all_started());
        assert_eq!(report.get("mid"), Some(&StartOutcome::Completed));
        assert!(scheduler.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_lower_tier_waits_for_higher_tier_ready() {
        let fx = fixture(&[
            ("lo", 10, Behaviour::Return),
            ("hi", 80, Behaviour::DelayedReady(100)),
            ("hi2", 80, Behaviour::DelayedReady(10)),
        ]);
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let report = scheduler.start(&fx.registry, &fx.table).await;

        let log = fx.log.lock().clone();
        let at = |entry: &str| log.iter().position(|l| l == entry).unwrap();
        assert!(at("ready:hi") < at("start:lo"));
        assert!(at("ready:hi2") < at("start:lo"));
        assert_eq!(log.last().map(String::as_str), Some("start:lo"));
        assert!(report.all_started());

        scheduler.stop(&fx.registry, &fx.table, &report).await;
        assert!(scheduler.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_running_plugin_stays_in_task_table() {
        let fx = fixture(&[("daemon", 50, Behaviour::ReadyThenPark)]);
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let report = scheduler.start(&fx.registry, &fx.table).await;

        assert_eq!(report.get("daemon"), Some(&StartOutcome::Running));
        assert!(scheduler.tasks().contains("daemon"));
        assert_eq!(scheduler.tasks().running(), ["daemon"]);

        scheduler.stop(&fx.registry, &fx.table, &report).await;
        assert!(scheduler.tasks().is_empty());
        assert_eq!(fx.stops.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let fx = fixture(&[
            ("broken", 80, Behaviour::Fail),
            ("sibling", 80, Behaviour::Return),
            ("later", 10, Behaviour::Return),
        ]);
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let report = scheduler.start(&fx.registry, &fx.table).await;

        assert_eq!(report.get("broken"), Some(&StartOutcome::Failed("boom".to_owned())));
        assert_eq!(report.get("sibling"), Some(&StartOutcome::Completed));
        assert_eq!(report.get("later"), Some(&StartOutcome::Completed));
        assert_eq!(report.failed().collect::<Vec<_>>(), [("broken", "boom")]);
        assert!(!scheduler.tasks().contains("broken"));
    }

    #[tokio::test]
    async fn test_timeout_fails_and_aborts_task() {
        let fx = fixture(&[
            ("stuck", 80, Behaviour::Hang),
            ("after", 10, Behaviour::Return),
        ]);
        let scheduler = Scheduler::new(Some(Duration::from_millis(50)));
        let report = scheduler.start(&fx.registry, &fx.table).await;

        assert_eq!(
            report.get("stuck"),
            Some(&StartOutcome::Failed(START_TIMEOUT_MESSAGE.to_owned()))
        );
        assert_eq!(report.get("after"), Some(&StartOutcome::Completed));
        assert!(scheduler.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_panic_is_reported_as_failure() {
        let fx = fixture(&[("panicky", 50, Behaviour::Panic)]);
        let scheduler = Scheduler::new(None);
        let report = scheduler.start(&fx.registry, &fx.table).await;

        match report.get("panicky") {
            Some(StartOutcome::Failed(msg)) => assert!(msg.contains("panicked")),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_stop_runs_in_reverse_tier_order_and_skips_failed() {
        let fx = fixture(&[
            ("first", 90, Behaviour::ReadyThenPark),
            ("second", 10, Behaviour::Return),
            ("broken", 50, Behaviour::Fail),
        ]);
        let scheduler = Scheduler::new(Some(Duration::from_secs(5)));
        let report = scheduler.start(&fx.registry, &fx.table).await;
        scheduler.stop(&fx.registry, &fx.table, &report).await;

        let log = fx.log.lock();
        let stops: Vec<_> = log.iter().filter(|l| l.starts_with("stop:")).collect();
        assert_eq!(stops, ["stop:second", "stop:first"]);
        assert_eq!(fx.stops.load(Ordering::SeqCst), 2);
    }
}
