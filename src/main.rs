// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! EcoTrack API Server
//!
//! Logs environmental actions, tracks GPS trips from device location
//! reports and serves impact statistics.

use ecotrack::{
    config::{Config, StorageKind},
    db::{AnyStore, EcoDb, FileStore, MemoryStore},
    services::{EcoTracker, ReportedLocationProvider},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Structured JSON logging
    init_logging()?;

    let config = Config::from_env()?;
    tracing::info!(port = config.port, storage = ?config.storage, "Starting EcoTrack API");

    let store = match config.storage {
        StorageKind::File => {
            tracing::info!(path = %config.data_dir.display(), "Opening file store");
            AnyStore::File(FileStore::open(&config.data_dir).await?)
        }
        StorageKind::Memory => {
            tracing::warn!("Using in-memory store; data is lost on restart");
            AnyStore::Memory(MemoryStore::new())
        }
    };

    let provider = Arc::new(ReportedLocationProvider::new(config.fix_max_age));
    let tracker = EcoTracker::new(
        EcoDb::new(store),
        provider,
        config.tracker_config(),
        config.scoring_config(),
    );

    // Pick up sampling for a trip that was active before a restart
    if let Some(trip) = tracker.trips().restore().await? {
        tracing::info!(trip_id = %trip.id, status = trip.status.as_str(), "Current trip restored");
    }

    let state = Arc::new(AppState {
        config: config.clone(),
        tracker,
    });

    let app = ecotrack::routes::create_router(state.clone());

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.tracker.trips().shutdown().await;
    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() -> Result<(), Box<dyn std::error::Error>> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("ecotrack=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
