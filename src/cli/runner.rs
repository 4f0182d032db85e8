//! CLI command execution

use super::commands::{Cli, Commands};
use crate::adapter::{StreamAdapter, StreamEvent};
use crate::auth::Authenticator;
use crate::config::AdapterConfig;
use crate::error::Result;
use std::path::Path;
use tokio::sync::{mpsc, watch};
use tracing::{info, warn};

/// Executes CLI commands
pub struct Runner {
    cli: Cli,
}

impl Runner {
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    pub async fn run(self) -> Result<()> {
        match self.cli.command {
            Commands::Check { config } => check(&config).await,
            Commands::Run { config } => run(&config).await,
        }
    }
}

async fn check(config_path: &Path) -> Result<()> {
    let config = AdapterConfig::from_yaml_file(config_path)?;
    let adapter = StreamAdapter::new(config);

    let creds = adapter.authenticator()?.create_or_renew_credentials().await?;
    info!(instance_url = %creds.instance_url, "authentication succeeded");
    println!("OK: authenticated against {}", creds.instance_url);

    Ok(())
}

async fn run(config_path: &Path) -> Result<()> {
    let config = AdapterConfig::from_yaml_file(config_path)?;
    info!(
        name = %config.name,
        channel = %config.subscription.channel,
        replay_id = config.subscription.replay_id,
        "starting stream adapter"
    );

    let adapter = StreamAdapter::new(config);

    let (event_tx, mut event_rx) = mpsc::channel::<StreamEvent>(16);
    let (stop_tx, stop_rx) = watch::channel(false);

    // ctrl-c flips the shutdown signal; the stream winds down cleanly
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("shutdown signal received");
            let _ = stop_tx.send(true);
        }
    });

    let printer = tokio::spawn(async move {
        while let Some(event) = event_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(line) => println!("{line}"),
                Err(e) => warn!(error = %e, "could not serialize stream event"),
            }
        }
    });

    let result = adapter.start(event_tx, stop_rx).await;
    let _ = printer.await;
    result
}
