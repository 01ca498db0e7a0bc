use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use mitosis::{
    config::Tuning,
    engine::EngineSettings,
    web::{self, WebServerConfig},
};

#[derive(Debug, Parser)]
#[command(author, version, about = "Authoritative evolution-arena server")]
struct Cli {
    /// Path to a tuning YAML file (built-in defaults when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    #[arg(long, default_value_t = 8080)]
    port: u16,

    /// Simulation frequency in ticks per second
    #[arg(long, default_value_t = 60)]
    tick_rate: u32,

    /// Number of AI-controlled cells (tuning default when omitted)
    #[arg(long)]
    bots: Option<usize>,

    /// Master seed; a random one is drawn when omitted
    #[arg(long)]
    seed: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let cli = Cli::parse();
    let tuning = match &cli.config {
        Some(path) => Tuning::from_yaml(path)?,
        None => Tuning::default(),
    };

    let settings = EngineSettings {
        seed: cli.seed.unwrap_or_else(rand::random),
        tick_rate_hz: cli.tick_rate,
        bot_count: cli.bots.unwrap_or(tuning.bots.count),
    };

    web::run(WebServerConfig {
        host: cli.host,
        port: cli.port,
        settings,
        tuning,
    })
    .await
}
