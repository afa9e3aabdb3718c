use clap::Parser;
use tracing_subscriber::EnvFilter;

use updatch::cli::{serve::ServeArgs, Cli, Commands};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            host,
            port,
            public_url,
            owner,
            repo,
            key,
        } => {
            updatch::cli::serve::execute(ServeArgs {
                host,
                port,
                public_url,
                owner,
                repo,
                key,
            })
            .await?;
        }
        Commands::Refresh { owner, repo, key } => {
            updatch::cli::refresh::execute(owner, repo, key).await?;
        }
    }

    Ok(())
}
