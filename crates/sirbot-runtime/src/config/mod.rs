//! Configuration for the SirBot runtime.
//!
//! Layered loading (defaults, files, environment, overrides) lives in
//! [`loader`], the typed schema in [`schema`], sanity checks in
//! [`validation`].

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile, load_config, load_config_from_file};
pub use schema::{CoreConfig, LogFormat, LogLevel, LogOutput, LoggingConfig, SirBotConfig};
pub use validation::validate_config;
