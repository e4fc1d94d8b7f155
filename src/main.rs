use log::{error, info, warn};
use std::io;
use tokio::io::BufReader;
use tokio::sync::mpsc;
use tokio::time::Instant;

use atc_status_bridge::config::BridgeConfig;
use atc_status_bridge::engine::Engine;
use atc_status_bridge::ingest::read_readings;
use atc_status_bridge::publish::JsonLineSink;
use atc_status_bridge::runtime::{run, timer_channel};

const READING_QUEUE_DEPTH: usize = 256;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp_secs()
        .init();

    // Load configuration
    let config = match BridgeConfig::new() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if !config.enable {
        info!("Status bridge disabled by configuration (ATC_ENABLE), exiting");
        return Ok(());
    }

    info!("Starting sensor status bridge");

    let (timers, fired) = timer_channel();
    let engine = Engine::new(config, JsonLineSink::new(io::stdout()), timers, Instant::now());
    info!("{} devices preconfigured", engine.registry().len());

    // Readings arrive as JSON lines on stdin
    let (tx, rx) = mpsc::channel(READING_QUEUE_DEPTH);
    tokio::spawn(async move {
        match read_readings(BufReader::new(tokio::io::stdin()), tx).await {
            Ok(count) => info!("Input finished after {} readings", count),
            Err(e) => error!("Reading input failed: {}", e),
        }
    });

    // Handle Ctrl+C gracefully
    let (stop_tx, mut stop_rx) = tokio::sync::oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            return;
        }
        let _ = stop_tx.send(());
    });

    // Run the engine or wait for shutdown signal
    tokio::select! {
        engine = run(engine, rx, fired) => {
            info!(
                "All input processed, {} devices seen, {} updates published",
                engine.registry().len(),
                engine.sink().published()
            );
        }
        _ = &mut stop_rx => {
            info!("Program terminated by user. Exiting gracefully.");
        }
    }

    Ok(())
}
