use std::path::PathBuf;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::server;

/// CLI overrides for the `serve` command.
pub struct ServeArgs {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub public_url: Option<String>,
    pub owner: Option<String>,
    pub repo: Option<String>,
    pub key: Option<PathBuf>,
}

/// Execute the `serve` command: start the update server.
pub async fn execute(args: ServeArgs) -> Result<()> {
    let mut config = ServerConfig::load()?;

    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(public_url) = args.public_url {
        config.public_url = public_url;
    }
    if let Some(owner) = args.owner {
        config.feed_owner = owner;
    }
    if let Some(repo) = args.repo {
        config.feed_repo = repo;
    }
    if let Some(key) = args.key {
        config.private_key = key;
    }
    config.validate()?;

    println!("updatch server starting...");
    println!("Listening on http://{}", config.bind_address());
    println!("Press Ctrl+C to stop");

    server::start(config).await
}
