//! A plugin that builds greetings from its configured prefix.

use serde::Deserialize;
use sirbot::prelude::*;

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GreeterConfig {
    greeting: String,
}

impl Default for GreeterConfig {
    fn default() -> Self {
        Self {
            greeting: "Hello".to_string(),
        }
    }
}

#[derive(Debug, Default)]
pub struct Greeter {
    greeting: String,
}

impl Greeter {
    pub fn greet(&self, name: &str) -> String {
        format!("{}, {name}!", self.greeting)
    }
}

#[async_trait]
impl Plugin for Greeter {
    fn name(&self) -> &str {
        "greeter"
    }

    fn configure(&mut self, config: &PluginConfig) -> Result<(), BoxError> {
        self.greeting = config.get::<GreeterConfig>()?.greeting;
        Ok(())
    }

    async fn start(&self, mut ready: ReadySignal) -> Result<(), BoxError> {
        ready.notify();
        info!(greeting = %self.greeting, "Greeter ready");
        Ok(())
    }

    fn facade(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

register_plugin!(static GREETER => || Box::new(Greeter::default()));
