//! Plugin system for SirBot.
//!
//! # Architecture
//!
//! A plugin is any type implementing [`Plugin`]. It is described by a static
//! [`PluginDescriptor`] that pairs an identifier (what users list under
//! `core.plugins`) with a factory. Descriptors are collected at link time into
//! [`PLUGINS`] by [`register_plugin!`](crate::register_plugin), and
//! [`PluginCatalog`] resolves identifiers against them.
//!
//! # Quick start
//!
//! ```rust,ignore
//! use sirbot::prelude::*;
//!
//! #[derive(Default)]
//! struct Greeter { greeting: String }
//!
//! #[async_trait]
//! impl Plugin for Greeter {
//!     fn name(&self) -> &str { "greeter" }
//!
//!     fn configure(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
//!         self.greeting = config.get::<GreeterConfig>()?.greeting;
//!         Ok(())
//!     }
//!
//!     async fn start(&self, _ready: ReadySignal) -> Result<(), BoxError> { Ok(()) }
//!
//!     fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> { self }
//! }
//!
//! register_plugin!(static GREETER => || Box::new(Greeter::default()));
//! ```
//!
//! # Configuration
//!
//! Each plugin receives only its own section, keyed by its short name:
//!
//! ```toml
//! [core]
//! plugins = ["hello_bot::greeter"]
//!
//! [greeter]
//! greeting = "hello"
//! priority = 80
//! ```

pub mod config;
pub mod core;
pub mod descriptor;
mod macros;

pub use self::config::{PRIORITY_KEY, PluginConfig};
pub use self::core::{BoxedPlugin, Plugin, ReadySignal, SharedPlugin};
pub use self::descriptor::{PLUGINS, PluginCatalog, PluginDescriptor};
