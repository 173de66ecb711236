mod action;
mod app;
mod broker;
mod config;
mod dispatcher;
mod host;
mod messages;
mod notifier;
mod triggers;

use app::App;
use config::Config;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting implicit-launcher");

    let config = Config::load()?;
    config.validate()?;

    App::new(config)?.run().await
}
