//! A plugin's own configuration section.

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

/// Key reserved by the scheduler inside every plugin section.
pub const PRIORITY_KEY: &str = "priority";

/// The configuration section belonging to a single plugin.
///
/// Plugins only ever see their own section, never the whole configuration
/// tree. An absent section is represented as an empty JSON object.
///
/// # Example
///
/// ```rust,ignore
/// #[derive(serde::Deserialize, Default)]
/// #[serde(default)]
/// struct GreeterConfig { greeting: String }
///
/// fn configure(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
///     self.config = config.get::<GreeterConfig>()?;
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct PluginConfig {
    section: Value,
}

impl PluginConfig {
    /// Wraps a raw JSON section. `null` is normalised to an empty object.
    pub fn new(section: Value) -> Self {
        let section = match section {
            Value::Null => Value::Object(Map::new()),
            other => other,
        };
        Self { section }
    }

    /// An empty section.
    pub fn empty() -> Self {
        Self::new(Value::Null)
    }

    /// Deserialises the section into `T`.
    ///
    /// Use `#[serde(default)]` on `T` to make every field optional.
    pub fn get<T: DeserializeOwned>(&self) -> serde_json::Result<T> {
        T::deserialize(&self.section)
    }

    /// Looks up a single top-level key.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.section.get(key)
    }

    /// The raw `priority` value, if the section sets one.
    pub fn priority(&self) -> Option<&Value> {
        self.value(PRIORITY_KEY)
    }

    /// The raw JSON section.
    pub fn as_value(&self) -> &Value {
        &self.section
    }
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self::empty()
    }
}

impl From<Value> for PluginConfig {
    fn from(section: Value) -> Self {
        Self::new(section)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize, Default, PartialEq)]
    #[serde(default)]
    struct Sample {
        greeting: String,
        repeat: u32,
    }

    #[test]
    fn test_null_becomes_empty_object() {
        let cfg = PluginConfig::new(Value::Null);
        assert_eq!(cfg.as_value(), &json!({}));
        assert!(cfg.priority().is_none());
    }

    #[test]
    fn test_typed_access() {
        let cfg = PluginConfig::new(json!({ "greeting": "hi", "priority": 10 }));
        let sample: Sample = cfg.get().unwrap();
        assert_eq!(sample.greeting, "hi");
        assert_eq!(sample.repeat, 0);
        assert_eq!(cfg.priority(), Some(&json!(10)));
    }
}
