//! Plugin descriptors and the catalog identifiers are resolved against.

use std::collections::HashMap;
use std::fmt;

use linkme::distributed_slice;
use tracing::{debug, warn};

use super::core::BoxedPlugin;

// ─── PluginDescriptor ─────────────────────────────────────────────────────────

/// A static, `Copy` handle that identifies and instantiates a plugin.
///
/// `path` is the identifier listed under `core.plugins` in the configuration.
/// It is distinct from the short name the plugin reports through
/// [`Plugin::name`](super::Plugin::name), which keys its configuration
/// section and its registry entry.
///
/// Create descriptors with [`register_plugin!`](crate::register_plugin) to
/// have them picked up by [`PluginCatalog::discover`], or build one with
/// [`PluginDescriptor::new`] and hand it to [`PluginCatalog::register`].
#[derive(Clone, Copy)]
pub struct PluginDescriptor {
    /// Identifier used in `core.plugins`.
    pub path: &'static str,

    /// Factory function that creates an unconfigured plugin instance.
    pub create: fn() -> BoxedPlugin,
}

impl PluginDescriptor {
    /// Creates a descriptor.
    pub const fn new(path: &'static str, create: fn() -> BoxedPlugin) -> Self {
        Self { path, create }
    }

    /// Creates a fresh, unconfigured plugin instance.
    #[inline]
    pub fn instantiate(&self) -> BoxedPlugin {
        (self.create)()
    }
}

impl fmt::Debug for PluginDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginDescriptor")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// Every descriptor declared with [`register_plugin!`](crate::register_plugin)
/// in any crate linked into the final binary.
#[distributed_slice]
pub static PLUGINS: [PluginDescriptor];

// ─── PluginCatalog ────────────────────────────────────────────────────────────

/// Lookup table from plugin identifier to descriptor.
///
/// This replaces importing plugin modules by name: an identifier "imports"
/// successfully iff the catalog knows it.
#[derive(Debug, Clone, Default)]
pub struct PluginCatalog {
    entries: HashMap<&'static str, PluginDescriptor>,
}

impl PluginCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a catalog holding every descriptor from [`PLUGINS`].
    pub fn discover() -> Self {
        let mut catalog = Self::new();
        for desc in PLUGINS {
            catalog.register(*desc);
        }
        debug!(count = catalog.len(), "Plugin catalog discovered");
        catalog
    }

    /// Adds a descriptor. A duplicate identifier replaces the earlier entry.
    pub fn register(&mut self, desc: PluginDescriptor) {
        if self.entries.insert(desc.path, desc).is_some() {
            warn!(path = desc.path, "Duplicate plugin identifier, last registration wins");
        }
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, desc: PluginDescriptor) -> Self {
        self.register(desc);
        self
    }

    /// Resolves an identifier.
    pub fn get(&self, path: &str) -> Option<&PluginDescriptor> {
        self.entries.get(path)
    }

    /// Number of known descriptors.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
