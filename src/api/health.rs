// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Health checks. Balance failures degrade to empty results, so an unhealthy
//! upstream reports `degraded` but never fails readiness.

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::bridge::ExecutionMode;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Ok,
    Degraded,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct StatusReport {
    pub status: ServiceStatus,
    pub components: ComponentReport,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ComponentReport {
    pub bridge_mode: ExecutionMode,
    /// `None` after a successful fetch, otherwise the last upstream failure.
    pub balance_upstream_error: Option<String>,
    pub tracked_wallets: usize,
    /// When the tracked wallets were last refreshed, if ever.
    pub last_refresh: Option<DateTime<Utc>>,
    pub transfers_in_flight: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LiveResponse {
    pub status: ServiceStatus,
}

async fn report(state: &AppState) -> StatusReport {
    let balance_upstream_error = state.balances.last_failure().map(|f| f.to_string());
    let last_refresh = state
        .snapshots
        .read()
        .await
        .iter()
        .map(|s| s.refreshed_at)
        .max();

    StatusReport {
        status: if balance_upstream_error.is_none() {
            ServiceStatus::Ok
        } else {
            ServiceStatus::Degraded
        },
        components: ComponentReport {
            bridge_mode: state.transfers.mode(),
            balance_upstream_error,
            tracked_wallets: state.tracked_wallets.len(),
            last_refresh,
            transfers_in_flight: state.transfers.in_flight().await,
        },
    }
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "Health",
    responses(
        (status = 200, description = "Component status", body = StatusReport)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<StatusReport> {
    Json(report(&state).await)
}

#[utoipa::path(
    get,
    path = "/health/live",
    tag = "Health",
    responses(
        (status = 200, description = "Process is up", body = LiveResponse)
    )
)]
pub async fn liveness() -> Json<LiveResponse> {
    Json(LiveResponse {
        status: ServiceStatus::Ok,
    })
}

#[utoipa::path(
    get,
    path = "/health/ready",
    tag = "Health",
    responses(
        (status = 200, description = "Ready to serve", body = StatusReport)
    )
)]
pub async fn readiness(State(state): State<AppState>) -> Json<StatusReport> {
    Json(report(&state).await)
}
