pub mod refresh;
pub mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// updatch - auto-update coordination server
#[derive(Debug, Parser)]
#[command(name = "updatch", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the update server
    Serve {
        /// Host address to bind to
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on
        #[arg(long)]
        port: Option<u16>,

        /// Public base URL handed to clients in patch links
        #[arg(long)]
        public_url: Option<String>,

        /// Owner of the upstream release feed
        #[arg(long)]
        owner: Option<String>,

        /// Repository name of the upstream release feed
        #[arg(long)]
        repo: Option<String>,

        /// Path to the PEM signing key
        #[arg(long)]
        key: Option<PathBuf>,
    },

    /// Refresh the release catalog once and print the upgrade targets
    Refresh {
        /// Owner of the upstream release feed
        #[arg(long)]
        owner: Option<String>,

        /// Repository name of the upstream release feed
        #[arg(long)]
        repo: Option<String>,

        /// Path to the PEM signing key
        #[arg(long)]
        key: Option<PathBuf>,
    },
}
