mod collector;
mod config;
mod detector;
mod error;
mod reader;
mod sink;
mod stats;
mod types;

use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use crate::collector::Collector;
use crate::config::Config;
use crate::error::Result;
use crate::reader::HttpPageReader;
use crate::sink::CsvSink;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = init_logging(&cfg) {
        eprintln!("Logging setup error: {e}");
        std::process::exit(1);
    }

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

fn init_logging(cfg: &Config) -> Result<()> {
    let filter = EnvFilter::new(&cfg.log_level);
    match &cfg.log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Arc::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt().with_env_filter(filter).init();
        }
    }
    Ok(())
}

async fn run(cfg: Config) -> Result<()> {
    info!(url = %cfg.game_url, "starting crash round recorder");

    let sink = CsvSink::open(&cfg.csv_path)?;
    let reader = HttpPageReader::new(&cfg)?;
    let collector = Collector::new(&cfg, reader, sink);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, stopping after the current tick");
            let _ = shutdown_tx.send(true);
        }
    });

    collector.run(shutdown_rx).await
}
