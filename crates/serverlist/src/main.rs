//! Main entry point for the server list tool
//!
//! Loads configuration and profiles, then previews, lists or validates them
//! from the command line.

mod app;
mod cli;
mod config;
mod logging;
mod status;

use anyhow::{anyhow, Result};
use tracing::info;

use app::Application;
use cli::{CliArgs, CliCommand};
use config::AppConfig;
use logging::setup_logging;

#[tokio::main]
async fn main() -> Result<()> {
    let args = CliArgs::parse();

    let mut config = AppConfig::load_from_file(&args.config_path).await?;
    config.apply_overrides(&args);
    config
        .validate()
        .map_err(|e| anyhow!("Configuration validation failed: {}", e))?;

    setup_logging(&config.logging)?;
    info!("Using configuration {}", args.config_path.display());

    let app = Application::new(config).await?;

    match &args.command {
        CliCommand::Preview(preview) => {
            let status = app.preview(preview);
            println!("{}", serde_json::to_string_pretty(&status)?);
            app.save().await?;
        }
        CliCommand::Profiles => {
            for profile in app.profiles() {
                let condition = profile.condition.as_deref().unwrap_or("always");
                let marker = if profile.is_default { " (default)" } else { "" };
                println!("{:>5}  {}{}  [{}]", profile.priority, profile.name, marker, condition);
            }
        }
        CliCommand::Check => {
            let count = app.handler().profiles().snapshot().len();
            println!("Configuration OK, {} profiles loaded", count);
        }
    }

    Ok(())
}
