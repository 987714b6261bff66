//! SirBot Runtime - configuration, logging and the HTTP-facing bot application.
//!
//! This crate provides:
//! - Layered configuration loading (`ConfigLoader`, `SirBotConfig`)
//! - Logging setup driven by the `[logging]` table
//! - The bot application (`SirBot`): plugin lifecycle plus an axum router
//!   whose handlers receive the plugin facades
//! - The HTTP listener
//!
//! ```ignore
//! use axum::routing::get;
//! use sirbot_runtime::{PluginFacades, SirBot};
//!
//! async fn hello(PluginFacades(facades): PluginFacades) -> String {
//!     format!("{} plugins loaded", facades.len())
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let bot = SirBot::builder().build()?.route("/hello", get(hello));
//!     bot.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Feature Flags
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log format

pub mod bot;
pub mod config;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod server;

// Re-exports
pub use bot::{SirBot, SirBotBuilder, wait_for_shutdown};
pub use config::{ConfigError, ConfigLoader, ConfigResult, CoreConfig, LoggingConfig, SirBotConfig};
pub use error::{RuntimeError, RuntimeResult};
pub use logging::LoggingBuilder;
pub use middleware::{MissingFacades, PluginFacades, attach_facades};
pub use server::{ListenerHandle, serve};

// Re-exported so bots can declare routes without their own dependency
pub use axum;

// Re-export tracing for use by plugin crates
pub use tracing;
pub use tracing_subscriber;

/// Logging macros for plugin code.
pub mod prelude {
    pub use tracing::{Level, debug, error, info, instrument, span, trace, warn};
}
