// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Warden Authors

//! Warden daemon (wardend)
//!
//! Background process that runs the scheduler loop: fires due jobs,
//! fans operations out to agent queues, and sweeps expired entries.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod lifecycle;

use std::path::PathBuf;

use tokio::signal::unix::{signal, SignalKind};
use tracing::info;

use crate::lifecycle::LifecycleError;
use warden_engine::EngineConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();
    let config_path = if args.len() > 1 {
        PathBuf::from(&args[1])
    } else {
        PathBuf::from("/etc/warden/warden.toml")
    };

    let config = EngineConfig::load(&config_path)?;

    let _log_guard = setup_logging(&config)?;

    info!(
        config = %config_path.display(),
        data_dir = %config.data_dir.display(),
        "starting wardend"
    );

    let daemon = lifecycle::startup(&config).await?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    info!("daemon ready");

    // Signal ready for parent process (e.g., systemd, CLI waiting for startup)
    println!("READY");

    tokio::select! {
        _ = sigterm.recv() => info!("received SIGTERM"),
        _ = sigint.recv() => info!("received SIGINT"),
    }

    daemon.shutdown().await;
    info!("daemon stopped");
    Ok(())
}

fn setup_logging(
    config: &EngineConfig,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let log_dir = config.data_dir.join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, "wardend.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(non_blocking))
        .init();

    Ok(guard)
}
