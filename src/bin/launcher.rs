//! Jarvis Launcher - credential check and status monitor
//!
//! Run with: cargo run --bin jarvis-launcher

use anyhow::Result;
use clap::Parser;
use jarvis_bridge::config::Config;
use serde::Deserialize;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about = "Check credentials and watch a running Jarvis bridge")]
struct Args {
    /// Seconds between status polls
    #[arg(short, long, default_value_t = 5)]
    interval: u64,

    /// Print the credential table and exit
    #[arg(long)]
    check: bool,
}

#[derive(Debug, Deserialize)]
struct Status {
    status: String,
    cpu: f32,
    memory: f32,
    voice_enabled: bool,
    clients: usize,
    uptime_secs: u64,
}

fn credential_rows(config: &Config) -> Vec<(&'static str, bool)> {
    vec![
        ("AGENT_ID", config.agent_id.is_some()),
        ("ELEVENLABS_API_KEY", config.elevenlabs_api_key.is_some()),
        ("OPENAI_API_KEY", config.openai_api_key.is_some()),
        ("OPENWEATHER_API_KEY", config.openweather_api_key.is_some()),
        ("EMAIL_ADDRESS", config.email_address.is_some()),
        ("EMAIL_PASSWORD", config.email_password.is_some()),
    ]
}

fn print_credentials(config: &Config) {
    println!("🔑 Credentials");
    for (name, present) in credential_rows(config) {
        let mark = if present { "✅ configured" } else { "❌ missing" };
        println!("   {:<22} {}", name, mark);
    }
    if config.voice_credentials().is_none() {
        println!("   ⚠️ Voice disabled: the bridge will run in demo mode");
    }
    println!();
}

fn format_uptime(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();

    let args = Args::parse();
    let _ = dotenvy::dotenv();
    let config = Config::load()?;

    print_credentials(&config);
    if args.check {
        return Ok(());
    }

    let status_url = format!("{}/api/status", config.http_url());
    println!("🌐 UI:        {}", config.http_url());
    println!("🔌 WebSocket: {}", config.ws_url());
    println!("📡 Polling {} every {}s (Ctrl+C to stop)", status_url, args.interval);
    println!();

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(3))
        .build()?;
    let mut ticker = tokio::time::interval(Duration::from_secs(args.interval.max(1)));

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let status = match client.get(&status_url).send().await {
            Ok(response) => response.json::<Status>().await.map_err(anyhow::Error::from),
            Err(e) => Err(e.into()),
        };

        match status {
            Ok(s) => println!(
                "🟢 {} | up {} | CPU {:>5.1}% | MEM {:>5.1}% | clients {} | voice {}",
                s.status,
                format_uptime(s.uptime_secs),
                s.cpu,
                s.memory,
                s.clients,
                if s.voice_enabled { "on" } else { "demo" }
            ),
            Err(e) => println!("🔴 offline ({})", e),
        }
    }

    println!("👋 Launcher stopped");
    Ok(())
}
