mod cli;

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use eth_history_lookup::api::{self, AppState};
use eth_history_lookup::balance;
use eth_history_lookup::cancel::CancelFlag;
use eth_history_lookup::config::Config;
use eth_history_lookup::explorer::EtherscanClient;
use eth_history_lookup::history;
use eth_history_lookup::node::NodeClient;

use crate::cli::{Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;

    let index = EtherscanClient::new(
        &config.etherscan_api_url,
        config.etherscan_api_key.clone(),
        config.etherscan_chain_id,
        config.http_timeout,
    )?;

    match cli.command {
        Commands::History {
            address,
            start_block,
            step,
            delay_ms,
        } => {
            let mut options = config.history.clone();
            if let Some(step) = step {
                anyhow::ensure!(step > 0, "--step must be greater than zero");
                options.step = step;
            }
            if let Some(delay_ms) = delay_ms {
                options.delay = Duration::from_millis(delay_ms);
            }

            let cancel = CancelFlag::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::warn!("interrupt received, stopping after the current window");
                    on_interrupt.cancel();
                }
            });

            let history =
                history::fetch_transactions(&index, &address, start_block, &options, &cancel)
                    .await
                    .context("transaction history failed")?;
            print_json(&history)?;
        }
        Commands::Balance { address, date } => {
            let node = NodeClient::new(config.node_endpoint()?, config.http_timeout)?;
            let report =
                balance::historical_balance(&index, &node, &config.tokens, &address, &date)
                    .await
                    .context("balance lookup failed")?;
            print_json(&report)?;
        }
        Commands::Serve { addr } => {
            let node = NodeClient::new(config.node_endpoint()?, config.http_timeout)?;
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            let state = AppState::new(index, node, config.tokens.clone(), config.history.clone());
            api::run_http_server(&bind, state).await?;
        }
    }

    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();
}
