//! # SirBot
//!
//! A plugin-driven bot framework.
//!
//! ## Overview
//!
//! A bot is a set of plugins named in configuration. Each plugin is
//! configured from its own section, started in priority tiers, and exposed
//! to HTTP request handlers through a shared facade registry:
//!
//! ```text
//! ┌───────────────┐  import   ┌───────────────┐  tiers   ┌──────────────────────┐
//! │ core.plugins  │─────────▶│ PluginManager │────────▶│ Scheduler (80, 70..) │
//! └───────────────┘           └───────┬───────┘          └──────────────────────┘
//!                                     │ registry
//!                                     ▼
//!                             ┌───────────────┐  per request  ┌──────────────┐
//!                             │    Facades    │─────────────▶│   handlers   │
//!                             └───────────────┘               └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use sirbot::prelude::*;
//!
//! #[derive(Default)]
//! struct Greeter;
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str { "greeter" }
//!     fn configure(&mut self, _: &PluginConfig) -> Result<(), BoxError> { Ok(()) }
//!     async fn start(&self, mut ready: ReadySignal) -> Result<(), BoxError> {
//!         ready.notify();
//!         Ok(())
//!     }
//!     fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
//! }
//!
//! register_plugin!(static GREETER = "greeter" => || Box::new(Greeter));
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = SirBot::builder()
//!         .merge(serde_json::json!({ "core": { "plugins": ["greeter"] } }))
//!         .build()?;
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use sirbot_core as core;
pub use sirbot_runtime as runtime;

pub use sirbot_core::register_plugin;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use sirbot::prelude::*;
/// ```
pub mod prelude {
    pub use std::any::Any;
    pub use std::sync::Arc;

    // Application
    pub use sirbot_runtime::{PluginFacades, RuntimeError, RuntimeResult, SirBot, SirBotConfig};

    // Plugin contract
    pub use sirbot_core::{
        BoxError, Facades, Plugin, PluginConfig, ReadySignal, StartOutcome, StartReport,
        async_trait, register_plugin,
    };

    // Logging
    pub use sirbot_runtime::prelude::*;
}
