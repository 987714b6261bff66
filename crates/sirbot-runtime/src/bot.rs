//! The bot application.

use std::future::Future;
use std::path::Path;

use axum::Router;
use axum::routing::MethodRouter;
use serde::Serialize;
use sirbot_core::{
    Facades, PluginCatalog, PluginManager, PluginRegistry, PriorityTable, Scheduler, StartOutcome,
    StartReport, TaskTable,
};
use tokio::signal;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{ConfigLoader, SirBotConfig};
use crate::error::RuntimeResult;
use crate::logging;
use crate::middleware::attach_facades;
use crate::server;

/// A configured bot: its plugins, their start schedule and the HTTP
/// application exposing them.
///
/// Construction imports, instantiates and configures every plugin listed in
/// `core.plugins`; nothing is started until [`start`](Self::start) or
/// [`run`](Self::run).
///
/// ```rust,ignore
/// let bot = SirBot::builder().config_file("sirbot.toml").build()?
///     .route("/hello", get(hello));
/// bot.run().await?;
/// ```
pub struct SirBot {
    config: SirBotConfig,
    manager: PluginManager,
    registry: PluginRegistry,
    priorities: PriorityTable,
    excluded: Vec<String>,
    facades: Facades,
    scheduler: Scheduler,
    routes: Router,
    report: Mutex<Option<StartReport>>,
}

impl SirBot {
    /// Builds a bot from `config`, resolving plugins against every plugin
    /// registered with `register_plugin!` in the final binary.
    pub fn new(config: SirBotConfig) -> RuntimeResult<Self> {
        Self::with_catalog(config, PluginCatalog::discover())
    }

    /// Builds a bot resolving plugins against `catalog` only.
    pub fn with_catalog(config: SirBotConfig, catalog: PluginCatalog) -> RuntimeResult<Self> {
        logging::init_from_config(&config.logging);

        let mut manager = PluginManager::new(catalog);
        manager.import_plugins(&config.core.plugins)?;

        let loaded = manager.load(
            |name| config.plugin_section(name),
            config.core.default_priority,
        )?;
        let facades = Facades::new(&loaded.registry);
        let scheduler = Scheduler::new(config.core.start_timeout());

        info!(
            plugins = ?loaded.registry.names().collect::<Vec<_>>(),
            excluded = ?loaded.excluded,
            "Bot configured"
        );

        Ok(Self {
            config,
            manager,
            registry: loaded.registry,
            priorities: loaded.priorities,
            excluded: loaded.excluded,
            facades,
            scheduler,
            routes: Router::new(),
            report: Mutex::new(None),
        })
    }

    /// Layered configuration loading before construction.
    pub fn builder() -> SirBotBuilder {
        SirBotBuilder::new()
    }

    pub fn config(&self) -> &SirBotConfig {
        &self.config
    }

    /// Plugins that take part in the start schedule, by short name.
    pub fn plugins(&self) -> &PluginRegistry {
        &self.registry
    }

    pub fn start_priority(&self) -> &PriorityTable {
        &self.priorities
    }

    /// Plugins configured with `priority = false`.
    pub fn excluded(&self) -> &[String] {
        &self.excluded
    }

    /// Live start tasks, by plugin name.
    pub fn tasks(&self) -> &TaskTable {
        self.scheduler.tasks()
    }

    pub fn facades(&self) -> &Facades {
        &self.facades
    }

    pub fn plugin_manager(&self) -> &PluginManager {
        &self.manager
    }

    /// Adds a route to the HTTP application.
    pub fn route(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.routes = self.routes.route(path, method_router);
        self
    }

    /// Merges a router into the HTTP application.
    pub fn merge(mut self, router: Router) -> Self {
        self.routes = self.routes.merge(router);
        self
    }

    /// The HTTP application with the facade middleware applied.
    pub fn app(&self) -> Router {
        self.routes
            .clone()
            .layer(axum::middleware::from_fn_with_state(
                self.facades.clone(),
                attach_facades,
            ))
    }

    /// Starts every scheduled plugin, highest priority first.
    ///
    /// Until [`stop`](Self::stop) is called, later calls return the first
    /// report without starting anything.
    pub async fn start(&self) -> StartReport {
        let mut guard = self.report.lock().await;
        if let Some(report) = guard.as_ref() {
            warn!("Plugins already started");
            return report.clone();
        }

        info!(plugins = self.registry.len(), "Starting plugins");
        let mut report = self.scheduler.start(&self.registry, &self.priorities).await;
        for name in &self.excluded {
            report.insert(name.clone(), StartOutcome::Excluded);
        }

        *guard = Some(report.clone());
        report
    }

    /// Stops started plugins and drains their tasks.
    ///
    /// Forgets the start report, so a later [`start`](Self::start) starts the
    /// plugins again and a repeated `stop` does not stop them twice.
    pub async fn stop(&self) {
        let mut guard = self.report.lock().await;
        let Some(report) = guard.take() else {
            debug!("Plugins not started, draining tasks only");
            self.scheduler.tasks().abort_all().await;
            return;
        };
        self.scheduler
            .stop(&self.registry, &self.priorities, &report)
            .await;
        info!("Plugins stopped");
    }

    /// Starts plugins, serves HTTP and stops on Ctrl+C or SIGTERM.
    pub async fn run(&self) -> RuntimeResult<()> {
        self.run_until(wait_for_shutdown()).await
    }

    /// Starts plugins, serves HTTP and stops when `shutdown` completes.
    pub async fn run_until<F>(&self, shutdown: F) -> RuntimeResult<()>
    where
        F: Future<Output = ()>,
    {
        self.start().await;

        let listener = match server::serve(&self.config.core.bind_addr(), self.app()).await {
            Ok(listener) => listener,
            Err(e) => {
                self.stop().await;
                return Err(e);
            }
        };
        info!(addr = %listener.local_addr(), "SirBot is running");

        shutdown.await;

        listener.stop().await;
        self.stop().await;
        Ok(())
    }
}

impl std::fmt::Debug for SirBot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SirBot")
            .field("plugins", &self.registry)
            .field("start_priority", &self.priorities)
            .field("excluded", &self.excluded)
            .field("tasks", self.scheduler.tasks())
            .finish_non_exhaustive()
    }
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
pub async fn wait_for_shutdown() {
    #[cfg(unix)]
    {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = signal::ctrl_c() => info!("Received Ctrl+C, shutting down"),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                warn!(error = %e, "Failed to register SIGTERM handler");
                ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    ctrl_c().await;
}

async fn ctrl_c() {
    match signal::ctrl_c().await {
        Ok(()) => info!("Received Ctrl+C, shutting down"),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C"),
    }
}

// =============================================================================
// SirBotBuilder
// =============================================================================

/// Builder loading [`SirBotConfig`] from files, environment and overrides.
///
/// ```rust,ignore
/// let bot = SirBot::builder()
///     .config_file("config/production.toml")
///     .profile("production")
///     .merge(json!({ "core": { "port": 9000 } }))
///     .build()?;
/// ```
pub struct SirBotBuilder {
    config_loader: ConfigLoader,
    catalog: Option<PluginCatalog>,
}

impl SirBotBuilder {
    pub fn new() -> Self {
        Self {
            config_loader: ConfigLoader::new(),
            catalog: None,
        }
    }

    /// Sets a specific configuration file to load.
    pub fn config_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.file(path);
        self
    }

    /// Sets the configuration profile (e.g. "development", "production").
    pub fn profile(mut self, profile: impl AsRef<str>) -> Self {
        self.config_loader = self.config_loader.profile(profile);
        self
    }

    /// Adds a search path for configuration files.
    pub fn search_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_loader = self.config_loader.search_path(path);
        self
    }

    pub fn with_env(mut self) -> Self {
        self.config_loader = self.config_loader.with_env();
        self
    }

    pub fn without_env(mut self) -> Self {
        self.config_loader = self.config_loader.without_env();
        self
    }

    /// Merges overrides on top of every other configuration source.
    pub fn merge<T: Serialize>(mut self, overrides: T) -> Self {
        self.config_loader = self.config_loader.merge(overrides);
        self
    }

    /// Resolves plugins against `catalog` instead of every registered plugin.
    pub fn catalog(mut self, catalog: PluginCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    pub fn build(self) -> RuntimeResult<SirBot> {
        let config = self.config_loader.load()?;
        debug!(plugins = ?config.core.plugins, "Building bot");
        match self.catalog {
            Some(catalog) => SirBot::with_catalog(config, catalog),
            None => SirBot::new(config),
        }
    }
}

impl Default for SirBotBuilder {
    fn default() -> Self {
        Self::new()
    }
}
