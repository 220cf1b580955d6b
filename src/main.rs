//! ollama-relay HTTP server
//!
//! Starts an Axum web server that relays chat requests to Ollama.

use clap::Parser;
use ollama_relay::{
    cli::{Cli, Command, DEFAULT_CONFIG_PATH, generate_config_template},
    config::Config,
    handlers::{self, AppState},
    provider::OllamaProvider,
    telemetry,
};
use std::net::SocketAddr;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    if let Some(Command::Config { output }) = cli.command {
        match output {
            Some(path) => {
                std::fs::write(&path, generate_config_template())?;
                println!("Wrote configuration template to {}", path);
            }
            None => print!("{}", generate_config_template()),
        }
        return Ok(());
    }

    let explicit = cli.config != DEFAULT_CONFIG_PATH;
    let (config, load_report) = Config::load(&cli.config, explicit)?;

    telemetry::init(&config.observability.log_level);
    load_report.log();

    tracing::info!(
        model_id = %config.ollama.model_id(),
        endpoint = %config.ollama.endpoint(),
        "Starting ollama-relay on {}:{}",
        config.server.host,
        config.server.port
    );

    let provider = Arc::new(OllamaProvider::new(&config.ollama)?);
    let config = Arc::new(config);
    let state = AppState::new(config.clone(), provider)?;
    let app = handlers::router(state);

    let addr = SocketAddr::from((
        config
            .server
            .host
            .parse::<std::net::IpAddr>()
            .unwrap_or_else(|_| std::net::IpAddr::from([0, 0, 0, 0])),
        config.server.port,
    ));

    tracing::info!("Listening on {}", addr);
    tracing::info!("Chat endpoint available at http://{}/ollama/chat", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
