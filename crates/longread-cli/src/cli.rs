//! Command-line interface definitions and parsing

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<String>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Advertise this device and read the identity of every peer found
    Run {
        /// Stop after this many seconds instead of waiting for Ctrl-C
        #[arg(short, long)]
        duration: Option<u64>,
    },
    /// Print the permissions required on a platform version
    Permissions {
        /// Platform API level; defaults to the configured level
        #[arg(short, long)]
        api_level: Option<u32>,
    },
    /// Print the identity record this device serves
    Identity,
}
