//! pmx prediction-market execution governor - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// pmx prediction-market execution governor
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via PMX_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    pmx_telemetry::init_logging()?;

    info!("Starting pmx governor v{}", env!("CARGO_PKG_VERSION"));

    // Config path: CLI arg > PMX_CONFIG env var > default
    let config = match args.config.or_else(|| std::env::var("PMX_CONFIG").ok()) {
        Some(path) => {
            info!(config_path = %path, "Loading configuration");
            pmx_bot::AppConfig::from_file(&path)?
        }
        None => pmx_bot::AppConfig::load()?,
    };

    let app = pmx_bot::Application::new(config)?;
    app.run().await?;

    Ok(())
}
