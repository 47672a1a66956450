// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    balances::{AddressBalance, FormattedValuation, TrackedWallet, ValuationResult, WalletSnapshot},
    error::{ApiError, ErrorBody},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct BalancesResponse {
    pub address: String,
    pub balances: Vec<AddressBalance>,
    /// Why the upstream call degraded, when `balances` is empty because of it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upstream_error: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ValuationResponse {
    pub address: String,
    pub valuation: ValuationResult,
    pub formatted: FormattedValuation,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshRequest {
    /// Wallets to refresh. Empty means the configured tracked wallets.
    #[serde(default)]
    pub wallets: Vec<TrackedWallet>,
}

/// Latest snapshots from the last refresh of the tracked wallets.
#[utoipa::path(
    get,
    path = "/v1/wallets",
    tag = "Wallets",
    responses(
        (status = 200, description = "Latest wallet snapshots", body = Vec<WalletSnapshot>)
    )
)]
pub async fn list_snapshots(State(state): State<AppState>) -> Json<Vec<WalletSnapshot>> {
    Json(state.snapshots.read().await.clone())
}

#[utoipa::path(
    get,
    path = "/v1/wallets/{address}/balances",
    tag = "Wallets",
    params(("address" = String, Path, description = "Tracked address")),
    responses(
        (status = 200, description = "Balances (empty when the upstream is unavailable)", body = BalancesResponse)
    )
)]
pub async fn get_balances(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<BalancesResponse> {
    let (balances, failure) = state.balances.fetch_balances_reporting(&address).await;
    let upstream_error = failure.map(|f| f.to_string());

    Json(BalancesResponse {
        address,
        balances,
        upstream_error,
    })
}

#[utoipa::path(
    get,
    path = "/v1/wallets/{address}/valuation",
    tag = "Wallets",
    params(("address" = String, Path, description = "Tracked address")),
    responses(
        (status = 200, description = "USD valuation with the withdrawable/deposit split", body = ValuationResponse)
    )
)]
pub async fn get_valuation(
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Json<ValuationResponse> {
    let (_, valuation) = state
        .balances
        .valuate_address(&address, state.allocation)
        .await;

    Json(ValuationResponse {
        address,
        formatted: FormattedValuation::from(&valuation),
        valuation,
    })
}

/// Refresh wallets one at a time.
///
/// Refreshing the configured wallets also updates `GET /v1/wallets`.
#[utoipa::path(
    post,
    path = "/v1/wallets/refresh",
    tag = "Wallets",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "Fresh snapshots in request order", body = Vec<WalletSnapshot>),
        (status = 422, description = "No wallets to refresh", body = ErrorBody)
    )
)]
pub async fn refresh_wallets(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<Vec<WalletSnapshot>>, ApiError> {
    let use_tracked = request.wallets.is_empty();
    let wallets: &[TrackedWallet] = if use_tracked {
        &state.tracked_wallets
    } else {
        &request.wallets
    };

    if wallets.is_empty() {
        return Err(ApiError::unprocessable(
            "No wallets given and none configured in TRACKED_WALLETS",
        ));
    }
    if let Some(blank) = wallets.iter().find(|w| w.address.trim().is_empty()) {
        return Err(ApiError::bad_request(format!(
            "Wallet `{}` has an empty address",
            blank.name
        )));
    }

    let snapshots = state.refresher.refresh_all(wallets).await;
    if use_tracked {
        *state.snapshots.write().await = snapshots.clone();
    }

    Ok(Json(snapshots))
}
