//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sirbot_core::PluginConfig;

/// Root configuration structure.
///
/// ```toml
/// [core]
/// plugins = ["hello_bot::greeter", "hello_bot::ticker"]
/// port = 8080
///
/// [logging]
/// level = "info"
/// filters = { sirbot_core = "debug" }
///
/// [greeter]
/// greeting = "Hello"
/// priority = 80
/// ```
///
/// Every top-level key other than `core` and `logging` is a plugin section,
/// keyed by the plugin's short name.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SirBotConfig {
    /// Engine settings.
    #[serde(default)]
    pub core: CoreConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Plugin sections, keyed by plugin short name.
    #[serde(flatten)]
    pub plugins: BTreeMap<String, Value>,
}

impl SirBotConfig {
    /// The section for the named plugin, if present.
    pub fn plugin_section(&self, name: &str) -> Option<PluginConfig> {
        self.plugins.get(name).cloned().map(PluginConfig::new)
    }

    /// Builder-style setter for a plugin section.
    pub fn with_plugin_section(mut self, name: impl Into<String>, section: Value) -> Self {
        self.plugins.insert(name.into(), section);
        self
    }
}

// =============================================================================
// Core
// =============================================================================

/// Engine settings under `[core]`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CoreConfig {
    /// Plugin identifiers to import, in order.
    #[serde(default)]
    pub plugins: Vec<String>,

    /// Host address the HTTP listener binds to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the HTTP listener binds to.
    #[serde(default = "default_port")]
    pub port: u16,

    /// Priority for plugins whose section does not set one.
    #[serde(default = "default_priority")]
    pub default_priority: i64,

    /// Seconds a plugin may take to report it has started. `0` disables the limit.
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,
}

impl CoreConfig {
    /// Start timeout as a [`Duration`], `None` when disabled.
    pub fn start_timeout(&self) -> Option<Duration> {
        (self.start_timeout_secs > 0).then(|| Duration::from_secs(self.start_timeout_secs))
    }

    /// `host:port` for the HTTP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            plugins: Vec::new(),
            host: default_host(),
            port: default_port(),
            default_priority: default_priority(),
            start_timeout_secs: default_start_timeout_secs(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_priority() -> i64 {
    50
}

fn default_start_timeout_secs() -> u64 {
    30
}

// =============================================================================
// Logging
// =============================================================================

/// Logging settings under `[logging]`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct LoggingConfig {
    /// Base level for every target.
    #[serde(default)]
    pub level: LogLevel,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Output destination.
    #[serde(default)]
    pub output: LogOutput,

    /// Log file, required when `output = "file"`.
    #[serde(default)]
    pub file_path: Option<PathBuf>,

    /// Include thread IDs.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    /// Per-target levels, e.g. `sirbot_core = "warn"`.
    #[serde(default)]
    pub filters: BTreeMap<String, LogLevel>,
}

/// Log verbosity.
///
/// Parsing is case-insensitive and accepts the common aliases `warning`,
/// `critical` and `fatal`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Lowercase name, as used in filter directives.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }

    /// The matching [`tracing::Level`].
    pub fn to_tracing_level(self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" | "critical" | "fatal" => Ok(Self::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        value.parse()
    }
}

impl From<LogLevel> for String {
    fn from(level: LogLevel) -> Self {
        level.as_str().to_string()
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` otherwise.
    Json,
}

/// Where log lines go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}
