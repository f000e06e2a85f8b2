// server/src/main.rs

// Entry point for the clinicdb operator CLI: parses arguments and
// dispatches to the cli module.

use anyhow::Result;
use clinicdb_server::cli::cli::start_cli;
use log::info;
use tokio::signal::unix::{signal, SignalKind};

async fn handle_signals() {
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to set up SIGTERM handler");
    let mut sigint = signal(SignalKind::interrupt()).expect("failed to set up SIGINT handler");

    tokio::select! {
        _ = sigterm.recv() => {
            info!("received SIGTERM, shutting down");
        }
        _ = sigint.recv() => {
            info!("received SIGINT, shutting down");
        }
    }
    std::process::exit(130);
}

#[tokio::main]
async fn main() -> Result<()> {
    env_logger::init();

    tokio::spawn(handle_signals());

    start_cli().await
}
