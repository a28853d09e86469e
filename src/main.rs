//! Kava Rosetta gateway
//!
//! Serves the Rosetta Data and Construction APIs for a Kava node.

use clap::{Parser, Subcommand};
use kava_rosetta::cli;
use kava_rosetta::config::{Config, Mode, DEFAULT_NETWORK};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "kava-rosetta")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "Rosetta API gateway for the Kava blockchain", long_about = None)]
struct Cli {
    /// Chain id
    #[arg(short, long, env = "NETWORK", default_value = DEFAULT_NETWORK, global = true)]
    network: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the Rosetta API server
    Serve {
        /// online or offline
        #[arg(short, long, env = "MODE", default_value = "online")]
        mode: Mode,

        /// Port to listen on
        #[arg(short, long, env = "PORT", default_value = "8000")]
        port: u16,

        /// Tendermint RPC endpoint
        #[arg(long, env = "KAVA_RPC_URL", default_value = "http://localhost:26657")]
        rpc_url: String,

        /// LCD REST endpoint
        #[arg(long, env = "KAVA_LCD_URL", default_value = "http://localhost:1317")]
        lcd_url: String,

        /// Per-request timeout for node calls, in seconds
        #[arg(long, default_value = "30")]
        request_timeout_secs: u64,
    },

    /// Print the address of a compressed secp256k1 public key (hex)
    Derive { public_key: String },

    /// Print the hash of a signed transaction (hex)
    Hash { signed_transaction: String },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            mode,
            port,
            rpc_url,
            lcd_url,
            request_timeout_secs,
        } => {
            let config = Config {
                mode,
                network: cli.network,
                port,
                rpc_url: Some(rpc_url),
                lcd_url: Some(lcd_url),
                request_timeout: Duration::from_secs(request_timeout_secs),
            };
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(cli::cmd_serve(config))?;
        }
        Commands::Derive { public_key } => {
            println!("{}", cli::cmd_derive(&cli.network, &public_key)?);
        }
        Commands::Hash { signed_transaction } => {
            println!("{}", cli::cmd_hash(&cli.network, &signed_transaction)?);
        }
    }

    Ok(())
}
