//! Hello Bot Example
//!
//! Two plugins and two routes:
//!
//! - `greeter` builds greetings from its configured prefix
//! - `ticker` counts ticks in the background until shutdown
//!
//! ```bash
//! cargo run --package hello-bot -- --config demos/hello_bot/sirbot.toml
//! curl http://127.0.0.1:8080/hello/world
//! curl http://127.0.0.1:8080/ticks
//! ```

mod greeter;
mod ticker;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use sirbot::prelude::*;
use sirbot::runtime::axum::extract::Path;
use sirbot::runtime::axum::http::StatusCode;
use sirbot::runtime::axum::routing::get;

use greeter::Greeter;
use ticker::Ticker;

#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (defaults to sirbot.toml in the working directory)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Configuration profile, e.g. "production"
    #[arg(short, long)]
    profile: Option<String>,
}

async fn hello(
    PluginFacades(facades): PluginFacades,
    Path(name): Path<String>,
) -> Result<String, StatusCode> {
    facades
        .get::<Greeter>("greeter")
        .map(|greeter| greeter.greet(&name))
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

async fn ticks(PluginFacades(facades): PluginFacades) -> Result<String, StatusCode> {
    facades
        .get::<Ticker>("ticker")
        .map(|ticker| ticker.ticks().to_string())
        .ok_or(StatusCode::SERVICE_UNAVAILABLE)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = SirBot::builder();
    if let Some(path) = &args.config {
        builder = builder.config_file(path);
    }
    if let Some(profile) = &args.profile {
        builder = builder.profile(profile);
    }

    let bot = builder
        .build()?
        .route("/hello/{name}", get(hello))
        .route("/ticks", get(ticks));

    info!(plugins = ?bot.facades().names(), "Hello bot configured");
    bot.run().await?;

    Ok(())
}
