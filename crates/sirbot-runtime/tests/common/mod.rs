//! Plugins shared by the integration tests.

#![allow(dead_code)]

use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;
use sirbot_core::{
    BoxError, Plugin, PluginCatalog, PluginConfig, PluginDescriptor, ReadySignal, async_trait,
    register_plugin,
};
use sirbot_runtime::SirBotConfig;

pub const TEST_PLUGIN: &str = "tests.test_plugin.sirbot";
pub const ERROR_PLUGIN: &str = "tests.test_plugin_error.sirbot";
pub const SLOW_PLUGIN: &str = "tests.test_plugin_slow.sirbot";
pub const COUNTED_PLUGIN: &str = "tests.test_plugin_counted.sirbot";

/// Starts, reports ready and keeps running until stopped.
#[derive(Default)]
pub struct TestPlugin {
    config: Mutex<Option<Value>>,
    stops: AtomicUsize,
}

impl TestPlugin {
    pub fn config(&self) -> Option<Value> {
        self.config.lock().clone()
    }

    pub fn stopped(&self) -> bool {
        self.stop_count() > 0
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    pub fn greet(&self) -> &'static str {
        "test"
    }
}

#[async_trait]
impl Plugin for TestPlugin {
    fn name(&self) -> &str {
        "test"
    }

    fn configure(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
        *self.config.lock() = Some(config.as_value().clone());
        Ok(())
    }

    async fn start(&self, mut ready: ReadySignal) -> Result<(), BoxError> {
        ready.notify();
        std::future::pending::<()>().await;
        Ok(())
    }

    async fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }

    fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Fails as soon as it is started.
pub struct ErrorPlugin;

#[async_trait]
impl Plugin for ErrorPlugin {
    fn name(&self) -> &str {
        "test-error"
    }

    fn configure(&mut self, _config: &PluginConfig) -> Result<(), BoxError> {
        Ok(())
    }

    async fn start(&self, _ready: ReadySignal) -> Result<(), BoxError> {
        Err("exception".into())
    }

    fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// Never reports ready.
pub struct SlowPlugin;

#[async_trait]
impl Plugin for SlowPlugin {
    fn name(&self) -> &str {
        "test-slow"
    }

    fn configure(&mut self, _config: &PluginConfig) -> Result<(), BoxError> {
        Ok(())
    }

    async fn start(&self, _ready: ReadySignal) -> Result<(), BoxError> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    }

    fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

pub static CONFIGURE_CALLS: AtomicUsize = AtomicUsize::new(0);

/// Counts `configure` calls across all instances.
pub struct CountedPlugin;

#[async_trait]
impl Plugin for CountedPlugin {
    fn name(&self) -> &str {
        "counted"
    }

    fn configure(&mut self, _config: &PluginConfig) -> Result<(), BoxError> {
        CONFIGURE_CALLS.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn start(&self, _ready: ReadySignal) -> Result<(), BoxError> {
        Ok(())
    }

    fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

register_plugin!(pub static TEST = TEST_PLUGIN => || Box::new(TestPlugin::default()));

/// Catalog with every test plugin, independent of link-time registration.
pub fn catalog() -> PluginCatalog {
    PluginCatalog::new()
        .with(PluginDescriptor::new(TEST_PLUGIN, || {
            Box::new(TestPlugin::default())
        }))
        .with(PluginDescriptor::new(ERROR_PLUGIN, || Box::new(ErrorPlugin)))
        .with(PluginDescriptor::new(SLOW_PLUGIN, || Box::new(SlowPlugin)))
        .with(PluginDescriptor::new(COUNTED_PLUGIN, || Box::new(CountedPlugin)))
}

/// Deserialises a configuration document the way the loader would.
pub fn config(value: Value) -> SirBotConfig {
    serde_json::from_value(value).unwrap()
}
