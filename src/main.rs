//! Jarvis Bridge - voice agent to browser UI
//!
//! Serves the UI page over HTTP and relays the agent conversation over
//! WebSocket.

use anyhow::Result;
use clap::Parser;
use jarvis_bridge::app::{self, RunOptions};
use jarvis_bridge::config::Config;
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// HTTP port for the UI page
    #[arg(long)]
    http_port: Option<u16>,

    /// WebSocket port for the bridge
    #[arg(long)]
    ws_port: Option<u16>,

    /// Run the demo agent even when credentials are configured
    #[arg(long)]
    demo: bool,

    /// Do not open the UI in a browser
    #[arg(long)]
    no_browser: bool,

    /// Config file to use instead of the default location
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let dotenv = dotenvy::dotenv();

    // Setup logging before anything can warn; the config level is applied
    // once the file is read, unless --verbose or RUST_LOG decide
    let env_filter = EnvFilter::try_from_default_env().ok();
    let level_fixed = args.verbose || env_filter.is_some();
    let filter = env_filter.unwrap_or_else(|| EnvFilter::new(if args.verbose { "debug" } else { "info" }));
    let builder = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_filter_reloading();
    let log_level = builder.reload_handle();
    tracing::subscriber::set_global_default(builder.finish())?;

    let mut config = match &args.config {
        Some(path) => {
            let mut config = Config::load_from(path)?;
            config.apply_env();
            config
        }
        None => Config::load()?,
    };

    if !level_fixed {
        log_level.reload(EnvFilter::new(&config.log_level))?;
    }

    match dotenv {
        Ok(path) => info!("📄 Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("⚠️ Could not read .env: {}", e),
    }

    if let Some(port) = args.http_port {
        config.http_port = port;
    }
    if let Some(port) = args.ws_port {
        config.ws_port = port;
    }

    let options = RunOptions {
        force_demo: args.demo,
        open_browser: config.open_browser && !args.no_browser,
    };

    app::run(config, options).await?;
    Ok(())
}
