mod cli;

use std::time::Duration;

use clap::Parser;
use cli::{Cli, Commands, ProbeArgs};
use itembox::client::{ClientConfig, ItemClient};
use itembox::config::Config;
use itembox::observability::init_tracing;
use tracing::{info, warn};

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), AnyError> {
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Commands::Server(args) => {
            info!("Loading configuration");
            let mut config =
                Config::load().map_err(|e| format!("Failed to load config: {}", e))?;
            if let Some(address) = args.address {
                config.server.bind_addr = address;
            }
            itembox::api::run(config).await?
        }
        Commands::Probe(args) => probe(args).await?,
    }

    Ok(())
}

async fn probe(args: ProbeArgs) -> Result<(), AnyError> {
    if !args.timeout.is_finite() || args.timeout <= 0.0 {
        return Err("--timeout must be a positive number of seconds".into());
    }

    let client = ItemClient::new(ClientConfig {
        base_url: args.url.clone(),
        api_token: std::env::var("ITEMBOX_API_TOKEN").ok(),
        max_retries: args.max_retries,
        request_timeout: Duration::from_secs_f64(args.timeout),
        ..ClientConfig::default()
    })?;

    let status = args.scenario.as_status();
    info!(url = %args.url, scenario = status, "Probing fault scenario");

    match client.simulate(status, args.duration).await {
        Ok(response) => {
            info!(status = %response.status, "Scenario recovered");
            Ok(())
        }
        Err(err) => {
            warn!(error = %err, degraded = client.is_degraded(), "Scenario failed");
            Err(err.into())
        }
    }
}
