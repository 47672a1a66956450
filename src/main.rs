// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::process::ExitCode;

use fundio_server::{
    api::router,
    config::Config,
    logging::init_logging,
    state::AppState,
};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    init_logging(config.log_format);

    let state = match AppState::from_config(&config) {
        Ok(state) => state,
        Err(e) => {
            error!(error = %e, "Failed to initialise application state");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = CancellationToken::new();

    // Background refresh of the tracked wallets
    let refresher_handle = match config.wallet_refresh_interval {
        Some(interval) if !config.tracked_wallets.is_empty() => {
            Some(tokio::spawn(state.refresher.clone().run(
                config.tracked_wallets.clone(),
                state.snapshots.clone(),
                interval,
                shutdown.clone(),
            )))
        }
        Some(_) => {
            warn!("WALLET_REFRESH_INTERVAL_SECS set but TRACKED_WALLETS is empty");
            None
        }
        None => None,
    };

    let app = router(state);
    let addr = config.bind_address();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!(%addr, error = %e, "Failed to bind listener");
            return ExitCode::FAILURE;
        }
    };

    info!(%addr, bridge_mode = ?config.bridge_mode, "Fundio server listening (docs at /docs)");

    let server_shutdown = shutdown.clone();
    let served = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Shutdown signal received"),
                _ = server_shutdown.cancelled() => {}
            }
        })
        .await;

    shutdown.cancel();
    if let Some(handle) = refresher_handle {
        let _ = handle.await;
    }

    match served {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "HTTP server failed");
            ExitCode::FAILURE
        }
    }
}
