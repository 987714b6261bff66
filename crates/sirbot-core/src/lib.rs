//! # SirBot Core
//!
//! The plugin lifecycle engine of the SirBot framework.
//!
//! This crate has no knowledge of HTTP or configuration files. It provides:
//!
//! - **Plugins**: the [`Plugin`] trait, [`PluginDescriptor`]s and the
//!   link-time [`PluginCatalog`] that plugin identifiers resolve against.
//! - **Plugin manager**: [`PluginManager`] imports identifiers, instantiates
//!   and configures plugins, and builds the [`PluginRegistry`] and
//!   [`PriorityTable`].
//! - **Scheduler**: [`Scheduler`] starts plugins tier by tier (highest
//!   priority first, concurrently within a tier) and reports per-plugin
//!   outcomes in a [`StartReport`].
//! - **Facades**: [`Facades`], the read-only aggregate handed to request
//!   handlers.
//!
//! ## Lifecycle
//!
//! ```text
//! unloaded ─import─▶ imported ─instantiate+configure─▶ configured
//!     configured ─priority=false─▶ excluded
//!     configured ─schedule─▶ starting ─▶ running | completed | failed
//! ```

pub mod error;
pub mod facade;
pub mod manager;
pub mod plugin;
pub mod scheduler;

pub use error::{BoxError, CoreError, CoreResult};
pub use facade::Facades;
pub use manager::{LoadedPlugins, PluginManager, PluginRecord, PluginRegistry};
pub use plugin::{
    BoxedPlugin, PLUGINS, Plugin, PluginCatalog, PluginConfig, PluginDescriptor, ReadySignal,
    SharedPlugin,
};
pub use scheduler::{
    PriorityTable, START_TIMEOUT_MESSAGE, Scheduler, StartOutcome, StartPriority, StartReport,
    TaskTable,
};

#[doc(hidden)]
pub use linkme;

// Re-exported so plugin crates do not need their own dependency.
pub use async_trait::async_trait;
