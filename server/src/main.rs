use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use server::service::HighscoreService;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    if std::env::var("RUST_LOG").is_err() {
        eprintln!("Set RUST_LOG=info for detailed logging");
    }

    let config = ServerConfig::parse();

    let service = Arc::new(HighscoreService::new(config.page_size));
    let mut server = Server::new(&config, service).await?;

    // Handle shutdown gracefully
    tokio::select! {
        result = server.run() => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
