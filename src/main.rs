//! srtp-relay-crypto - SRTP/SRTCP crypto core inspection tool
//!
//! Lists the supported suites, generates and derives keys, and protects or
//! unprotects single packets given as hex.

mod commands;
mod config;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

#[derive(Parser)]
#[command(name = "srtp-relay-crypto")]
#[command(about = "SRTP/SRTCP crypto core for media relays", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of the platform default
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

/// Suite and key selection shared by the keyed commands
#[derive(clap::Args)]
pub struct KeyArgs {
    /// Crypto suite name (overrides `default_suite`)
    #[arg(short, long)]
    pub suite: Option<String>,

    /// Base64 master key || salt, `inline:` prefix optional (overrides [keys] inline)
    #[arg(short, long)]
    pub key: Option<String>,

    /// Operate on RTCP instead of RTP
    #[arg(long)]
    pub rtcp: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List the supported crypto suites
    Suites {
        /// Print the suite table as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate a random master key and salt
    Keygen {
        /// Crypto suite name (determines key and salt lengths)
        #[arg(short, long)]
        suite: Option<String>,

        /// Store the generated key in the config file
        #[arg(long)]
        save: bool,
    },

    /// Show the session keys derived from the master key
    Derive {
        #[command(flatten)]
        keys: KeyArgs,
    },

    /// Protect an RTP/RTCP packet given as hex
    Protect {
        #[command(flatten)]
        keys: KeyArgs,

        /// Highest index already used on this stream (the next packet goes after it)
        #[arg(long)]
        last_index: Option<u64>,

        /// Packet bytes in hex
        packet: String,
    },

    /// Verify and decrypt an SRTP/SRTCP packet given as hex
    Unprotect {
        #[command(flatten)]
        keys: KeyArgs,

        /// Highest index already accepted on this stream
        #[arg(long)]
        last_index: Option<u64>,

        /// Packet bytes in hex
        packet: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };

    match cli.command {
        Commands::Suites { json } => {
            commands::list_suites(json)?;
        }
        Commands::Keygen { suite, save } => {
            let suite = config.suite(suite.as_deref())?;
            let inline = commands::keygen(suite)?;
            println!("{}", inline);
            if save {
                let config_path = match cli.config {
                    Some(path) => path,
                    None => Config::config_path()?,
                };
                let mut config = config;
                config.default_suite = Some(suite.name.to_string());
                let mut keys = config.keys.take().unwrap_or_default();
                keys.inline = Some(inline);
                config.keys = Some(keys);
                config.save_to(&config_path)?;
                tracing::info!("Saved key to {}", config_path.display());
            }
        }
        Commands::Derive { keys } => {
            commands::derive(&config, &keys)?;
        }
        Commands::Protect {
            keys,
            last_index,
            packet,
        } => {
            commands::protect(&config, &keys, last_index, &packet)?;
        }
        Commands::Unprotect {
            keys,
            last_index,
            packet,
        } => {
            commands::unprotect(&config, &keys, last_index, &packet)?;
        }
    }

    Ok(())
}
