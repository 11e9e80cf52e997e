use anyhow::Context;
use clap::Parser;
use imageseal::config::Config;
use imageseal::watermark::{font_provider_from_config, WatermarkService};
use std::path::PathBuf;

/// ImageSeal - tiled text watermarks for images and PDF documents
#[derive(Parser, Debug)]
#[command(name = "imageseal")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,

    /// Override the listening port
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => Config::from_file(path)
            .map_err(anyhow::Error::msg)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => Config::default(),
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    // Initialize logging subsystem
    imageseal::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    config
        .validate()
        .map_err(|e| anyhow::anyhow!("Invalid configuration: {}", e))?;

    tracing::info!(
        config_file = ?args.config,
        server_address = %config.server.address,
        server_port = config.server.port,
        font_path = ?config.fonts.path,
        "Configuration loaded successfully"
    );

    if args.test {
        tracing::info!("Configuration test successful");
        return Ok(());
    }

    let provider = font_provider_from_config(&config.fonts);
    let service = WatermarkService::from_font_provider(&provider)
        .with_timeout(config.server.request_timeout());

    imageseal::server::serve(&config, service)
        .await
        .context("Server failed")
}
