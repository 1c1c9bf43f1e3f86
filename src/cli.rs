use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "eth-history-lookup",
    version,
    about = "Ethereum transaction history and historical balance lookup"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List every transaction of an address from a block up to the chain head
    History {
        #[arg(long)]
        address: String,
        /// First block to scan (inclusive)
        #[arg(long)]
        start_block: u64,
        /// Blocks per indexing API request (overrides HISTORY_STEP)
        #[arg(long)]
        step: Option<u64>,
        /// Pause between requests in milliseconds (overrides HISTORY_DELAY_MS)
        #[arg(long)]
        delay_ms: Option<u64>,
    },
    /// ETH and token balances of an address at the start of a UTC day
    Balance {
        #[arg(long)]
        address: String,
        /// Calendar date, YYYY-MM-DD
        #[arg(long)]
        date: String,
    },
    /// Run the HTTP API server
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
}
