/// CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

// Build timestamp injected at compile time
pub const BUILD_TIMESTAMP: &str = env!("BUILD_TIMESTAMP");
pub const VERSION_WITH_BUILD: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (built: ",
    env!("BUILD_TIMESTAMP"),
    ")"
);

#[derive(Parser)]
#[command(name = "flowstack-cli")]
#[command(author, version = VERSION_WITH_BUILD, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Show service status
    Status,

    /// Create a full backup of the deployment
    Backup,

    /// Restore the deployment from a backup archive
    Restore {
        /// Path to the backup archive (.tar.gz)
        backup_file: PathBuf,

        /// Show what would be done without changing anything
        #[arg(long)]
        dry_run: bool,

        /// Restore configuration files only
        #[arg(long)]
        config_only: bool,

        /// Restore the data directory and certificate store only
        #[arg(long)]
        data_only: bool,

        /// Skip the interactive confirmation
        #[arg(long)]
        force: bool,
    },

    /// Pull newer images and recreate the services
    Update {
        /// Create a safety backup before updating
        #[arg(short, long)]
        backup: bool,
    },

    /// One-time host bootstrap
    Setup,

    /// View logs
    Logs {
        /// Service name
        service: String,

        /// Number of lines to show
        #[arg(short = 'n', long, default_value = "100")]
        tail: usize,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// View configuration
    View,

    /// Validate configuration
    Validate,
}
