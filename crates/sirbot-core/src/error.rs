//! Error types for the SirBot core.

use thiserror::Error;

/// Boxed error returned by plugin hooks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while importing, configuring or scheduling plugins.
///
/// All of these are fatal at startup: they abort bot construction before a
/// single plugin is started. Start failures are *not* represented here; they
/// are isolated per task and surface through
/// [`StartReport`](crate::scheduler::StartReport).
#[derive(Debug, Error)]
pub enum CoreError {
    /// No catalog entry matches the configured identifier.
    #[error("plugin not found: '{path}'")]
    PluginNotFound {
        /// The identifier that could not be resolved.
        path: String,
    },

    /// Two imported plugins declare the same short name.
    #[error("duplicate plugin name: '{name}'")]
    DuplicatePlugin {
        /// The clashing short name.
        name: String,
    },

    /// A plugin's `configure` hook rejected its configuration section.
    #[error("failed to configure plugin '{plugin}': {source}")]
    Configure {
        /// Short name of the plugin.
        plugin: String,
        /// Error returned by the hook.
        #[source]
        source: BoxError,
    },

    /// The `priority` key holds something other than an integer or a boolean.
    #[error("invalid priority for plugin '{plugin}': {value}")]
    InvalidPriority {
        /// Short name of the plugin.
        plugin: String,
        /// The offending value, rendered as JSON.
        value: String,
    },
}

impl CoreError {
    /// Creates a [`CoreError::PluginNotFound`].
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::PluginNotFound { path: path.into() }
    }
}

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;
