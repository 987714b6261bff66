//! Plugin import and instantiation.
//!
//! [`PluginManager`] turns the identifiers listed under `core.plugins` into
//! configured plugin instances:
//!
//! - [`import_plugins`](PluginManager::import_plugins) resolves identifiers
//!   against the [`PluginCatalog`]. The first unknown identifier aborts with
//!   [`CoreError::PluginNotFound`].
//! - [`load`](PluginManager::load) instantiates every imported plugin, hands
//!   it its own configuration section, reads its start priority and returns
//!   the [`PluginRegistry`] plus the [`PriorityTable`]. Plugins whose section
//!   says `priority = false` are configured and then dropped.
//!
//! # Example
//!
//! ```rust,ignore
//! let mut manager = PluginManager::new(PluginCatalog::discover());
//! manager.import_plugins(["hello_bot::greeter"])?;
//! let loaded = manager.load(|name| sections.get(name), 50)?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use crate::error::{CoreError, CoreResult};
use crate::plugin::{BoxedPlugin, PluginCatalog, PluginConfig, PluginDescriptor, SharedPlugin};
use crate::scheduler::{PriorityTable, StartPriority};

// =============================================================================
// PluginRecord / PluginRegistry
// =============================================================================

/// A configured plugin together with where it came from.
#[derive(Clone)]
pub struct PluginRecord {
    /// The live plugin.
    pub plugin: SharedPlugin,
    /// Identifier it was imported under.
    pub path: &'static str,
    /// The section its `configure` hook received.
    pub config: PluginConfig,
}

impl std::fmt::Debug for PluginRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginRecord")
            .field("name", &self.plugin.name())
            .field("path", &self.path)
            .field("config", &self.config)
            .finish()
    }
}

/// Short name → [`PluginRecord`], in load order.
///
/// Built once during startup and never mutated afterwards.
#[derive(Debug, Clone, Default)]
pub struct PluginRegistry {
    records: HashMap<String, PluginRecord>,
    order: Vec<String>,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a record under the plugin's short name.
    pub fn insert(&mut self, record: PluginRecord) -> CoreResult<()> {
        let name = record.plugin.name().to_owned();
        if self.records.contains_key(&name) {
            return Err(CoreError::DuplicatePlugin { name });
        }
        self.order.push(name.clone());
        self.records.insert(name, record);
        Ok(())
    }

    /// Looks a record up by short name.
    pub fn get(&self, name: &str) -> Option<&PluginRecord> {
        self.records.get(name)
    }

    /// Whether a plugin with that short name is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.records.contains_key(name)
    }

    /// Number of registered plugins.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Short names in load order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }

    /// Records in load order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PluginRecord)> {
        self.order
            .iter()
            .filter_map(|name| self.records.get(name).map(|r| (name.as_str(), r)))
    }
}

/// Output of [`PluginManager::load`].
#[derive(Debug, Default)]
pub struct LoadedPlugins {
    /// Plugins that will be started.
    pub registry: PluginRegistry,
    /// Their names grouped by start priority.
    pub priorities: PriorityTable,
    /// Plugins configured with `priority = false`, in load order.
    pub excluded: Vec<String>,
}

// =============================================================================
// PluginManager
// =============================================================================

/// Resolves plugin identifiers and instantiates plugins.
#[derive(Debug, Default)]
pub struct PluginManager {
    catalog: PluginCatalog,
    imported: Vec<PluginDescriptor>,
}

impl PluginManager {
    /// Creates a manager resolving identifiers against `catalog`.
    pub fn new(catalog: PluginCatalog) -> Self {
        Self {
            catalog,
            imported: Vec::new(),
        }
    }

    /// The catalog identifiers are resolved against.
    pub fn catalog(&self) -> &PluginCatalog {
        &self.catalog
    }

    // ─── Import ──────────────────────────────────────────────────────────────

    /// Resolves every identifier, in order.
    ///
    /// Stops at the first identifier the catalog does not know. Identifiers
    /// imported before the failure stay imported. Importing an identifier
    /// twice is a no-op.
    pub fn import_plugins<I, S>(&mut self, names: I) -> CoreResult<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for name in names {
            let name = name.as_ref();
            let desc = *self
                .catalog
                .get(name)
                .ok_or_else(|| CoreError::not_found(name))?;
            if self.has_plugin(name) {
                debug!(path = name, "Plugin already imported");
                continue;
            }
            self.imported.push(desc);
            debug!(path = name, "Plugin imported");
        }
        Ok(())
    }

    /// Whether `path` was imported successfully.
    pub fn has_plugin(&self, path: &str) -> bool {
        self.imported.iter().any(|d| d.path == path)
    }

    /// Imported descriptors, in import order.
    pub fn imported(&self) -> &[PluginDescriptor] {
        &self.imported
    }

    // ─── Instantiate ─────────────────────────────────────────────────────────

    /// Creates a plugin from `desc` and runs its `configure` hook with
    /// `section`.
    pub fn instantiate(
        &self,
        desc: &PluginDescriptor,
        section: &PluginConfig,
    ) -> CoreResult<PluginRecord> {
        Self::configure(desc, desc.instantiate(), section)
    }

    fn configure(
        desc: &PluginDescriptor,
        mut plugin: BoxedPlugin,
        section: &PluginConfig,
    ) -> CoreResult<PluginRecord> {
        plugin
            .configure(section)
            .map_err(|source| CoreError::Configure {
                plugin: plugin.name().to_owned(),
                source,
            })?;
        debug!(plugin = %plugin.name(), path = desc.path, "Plugin configured");
        Ok(PluginRecord {
            plugin: Arc::from(plugin),
            path: desc.path,
            config: section.clone(),
        })
    }

    /// Instantiates and configures every imported plugin.
    ///
    /// `sections` maps a plugin's short name to its configuration section
    /// (`None` when the configuration has no such section).
    /// `default_priority` applies to plugins that do not set one.
    pub fn load<F>(&self, sections: F, default_priority: i64) -> CoreResult<LoadedPlugins>
    where
        F: Fn(&str) -> Option<PluginConfig>,
    {
        let mut loaded = LoadedPlugins::default();

        for desc in &self.imported {
            let plugin = desc.instantiate();
            let name = plugin.name().to_owned();
            if loaded.registry.contains(&name) || loaded.excluded.contains(&name) {
                return Err(CoreError::DuplicatePlugin { name });
            }

            let section = sections(&name).unwrap_or_default();
            let priority = StartPriority::from_section(&name, &section, default_priority)?;
            let record = Self::configure(desc, plugin, &section)?;

            match priority {
                StartPriority::At(priority) => {
                    loaded.registry.insert(record)?;
                    loaded.priorities.insert(priority, name.clone());
                    info!(plugin = %name, priority, "Plugin loaded");
                }
                StartPriority::Disabled => {
                    info!(plugin = %name, "Plugin configured but disabled (priority = false)");
                    loaded.excluded.push(name);
                }
            }
        }

        Ok(loaded)
    }
}

// =============================================================================
// Tests
// =============================================================================
