//! Aggregate plugin facade exposed to request handlers.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::manager::PluginRegistry;
use crate::plugin::SharedPlugin;

struct FacadeEntry {
    plugin: SharedPlugin,
    facade: Arc<dyn Any + Send + Sync>,
}

/// Read-only view of every registered plugin, resolvable by short name.
///
/// Built once from the [`PluginRegistry`] and cloned into every request;
/// cloning only bumps a reference count.
///
/// # Example
///
/// ```rust,ignore
/// async fn greet(facades: Facades) -> String {
///     match facades.get::<Greeter>("greeter") {
///         Some(greeter) => greeter.greet("world"),
///         None => "greeter plugin not loaded".into(),
///     }
/// }
/// ```
#[derive(Clone)]
pub struct Facades {
    entries: Arc<HashMap<String, FacadeEntry>>,
}

impl Facades {
    /// Snapshots the registry.
    pub fn new(registry: &PluginRegistry) -> Self {
        let entries = registry
            .iter()
            .map(|(name, record)| {
                let entry = FacadeEntry {
                    plugin: Arc::clone(&record.plugin),
                    facade: Arc::clone(&record.plugin).facade(),
                };
                (name.to_owned(), entry)
            })
            .collect();
        Self {
            entries: Arc::new(entries),
        }
    }

    /// Facade of the named plugin, downcast to `T`.
    ///
    /// Returns `None` when no such plugin is registered or its facade is not
    /// a `T`.
    pub fn get<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        let facade = Arc::clone(&self.entries.get(name)?.facade);
        facade.downcast::<T>().ok()
    }

    /// Untyped facade of the named plugin.
    pub fn get_any(&self, name: &str) -> Option<Arc<dyn Any + Send + Sync>> {
        self.entries.get(name).map(|e| Arc::clone(&e.facade))
    }

    /// The plugin itself.
    pub fn plugin(&self, name: &str) -> Option<SharedPlugin> {
        self.entries.get(name).map(|e| Arc::clone(&e.plugin))
    }

    /// Whether the named plugin is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Sorted plugin names.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Number of plugins.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no plugin is registered.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Facades {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Facades")
            .field("plugins", &self.names())
            .finish()
    }
}
