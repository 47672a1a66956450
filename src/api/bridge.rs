// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    blockchain::Chain,
    bridge::{
        AllowanceStatus, CancelOutcome, CompletionStatus, ExecutionMode, TransactionStatus,
        TransferQuote, TransferRecord, TransferRequest,
    },
    error::{ApiError, ErrorBody},
    state::AppState,
};

#[derive(Debug, Serialize, ToSchema)]
pub struct TokenInfo {
    pub symbol: String,
    pub name: String,
    pub decimals: u8,
    pub address: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworkInfo {
    pub chain: Chain,
    pub name: String,
    pub chain_id: u64,
    pub wormhole_chain_id: u16,
    pub native_symbol: String,
    pub explorer_url: String,
    pub tokens: Vec<TokenInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NetworksResponse {
    pub mode: ExecutionMode,
    pub networks: Vec<NetworkInfo>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ApproveResponse {
    pub tx_hash: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CancelResponse {
    pub id: Uuid,
    pub outcome: CancelOutcome,
}

/// Supported chains and their bridgeable tokens.
#[utoipa::path(
    get,
    path = "/v1/bridge/networks",
    tag = "Bridge",
    responses(
        (status = 200, description = "Supported networks", body = NetworksResponse)
    )
)]
pub async fn list_networks(State(state): State<AppState>) -> Json<NetworksResponse> {
    let networks = Chain::ALL
        .into_iter()
        .map(|chain| {
            let network = chain.network();
            NetworkInfo {
                chain,
                name: network.name.to_string(),
                chain_id: network.chain_id,
                wormhole_chain_id: network.wormhole_chain_id,
                native_symbol: network.native_symbol.to_string(),
                explorer_url: network.explorer_url.to_string(),
                tokens: chain
                    .tokens()
                    .iter()
                    .map(|t| TokenInfo {
                        symbol: t.symbol.to_string(),
                        name: t.name.to_string(),
                        decimals: t.decimals,
                        address: t.address.to_string(),
                    })
                    .collect(),
            }
        })
        .collect();

    Json(NetworksResponse {
        mode: state.transfers.mode(),
        networks,
    })
}

#[utoipa::path(
    post,
    path = "/v1/bridge/quote",
    tag = "Bridge",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Fee and time estimate", body = TransferQuote),
        (status = 400, description = "Invalid request", body = ErrorBody)
    )
)]
pub async fn quote(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TransferQuote>, ApiError> {
    let quote = state.transfers.flow().quote(&request).await?;
    Ok(Json(quote))
}

#[utoipa::path(
    post,
    path = "/v1/bridge/allowance",
    tag = "Bridge",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Current bridge allowance", body = AllowanceStatus),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 502, description = "Chain unavailable", body = ErrorBody)
    )
)]
pub async fn allowance(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<AllowanceStatus>, ApiError> {
    let status = state.transfers.flow().allowance_status(&request).await?;
    Ok(Json(status))
}

/// Approve the token bridge to spend the requested amount.
///
/// Must complete before a live transfer for the same amount is started.
#[utoipa::path(
    post,
    path = "/v1/bridge/approve",
    tag = "Bridge",
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Approval confirmed", body = ApproveResponse),
        (status = 400, description = "Invalid request", body = ErrorBody),
        (status = 502, description = "Approval failed on chain", body = ErrorBody)
    )
)]
pub async fn approve(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<ApproveResponse>, ApiError> {
    let tx_hash = state.transfers.flow().approve(&request).await?;
    Ok(Json(ApproveResponse { tx_hash }))
}

/// Start a transfer in the background. Poll its id for progress.
#[utoipa::path(
    post,
    path = "/v1/bridge/transfers",
    tag = "Bridge",
    request_body = TransferRequest,
    responses(
        (status = 202, description = "Transfer started", body = TransferRecord),
        (status = 400, description = "Invalid request", body = ErrorBody)
    )
)]
pub async fn start_transfer(
    State(state): State<AppState>,
    Json(request): Json<TransferRequest>,
) -> Result<(StatusCode, Json<TransferRecord>), ApiError> {
    let record = state.transfers.spawn(request).await?;
    Ok((StatusCode::ACCEPTED, Json(record)))
}

#[utoipa::path(
    get,
    path = "/v1/bridge/transfers/{transfer_id}",
    tag = "Bridge",
    params(("transfer_id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Latest progress", body = TransferRecord),
        (status = 404, description = "Unknown transfer", body = ErrorBody)
    )
)]
pub async fn get_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<TransferRecord>, ApiError> {
    state
        .transfers
        .get(transfer_id)
        .await
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Transfer not found"))
}

/// Cancel a transfer. Only effective before the source transaction is sent.
#[utoipa::path(
    post,
    path = "/v1/bridge/transfers/{transfer_id}/cancel",
    tag = "Bridge",
    params(("transfer_id" = Uuid, Path, description = "Transfer id")),
    responses(
        (status = 200, description = "Cancel outcome", body = CancelResponse),
        (status = 404, description = "Unknown transfer", body = ErrorBody)
    )
)]
pub async fn cancel_transfer(
    State(state): State<AppState>,
    Path(transfer_id): Path<Uuid>,
) -> Result<Json<CancelResponse>, ApiError> {
    let outcome = state
        .transfers
        .cancel(transfer_id)
        .await
        .ok_or_else(|| ApiError::not_found("Transfer not found"))?;

    Ok(Json(CancelResponse {
        id: transfer_id,
        outcome,
    }))
}

/// Receipt state and confirmation depth of a transaction on `chain`.
#[utoipa::path(
    get,
    path = "/v1/bridge/transactions/{chain}/{tx_hash}",
    tag = "Bridge",
    params(
        ("chain" = Chain, Path, description = "Chain the transaction was sent on"),
        ("tx_hash" = String, Path, description = "0x-prefixed transaction hash")
    ),
    responses(
        (status = 200, description = "Transaction status", body = TransactionStatus),
        (status = 400, description = "Malformed hash", body = ErrorBody),
        (status = 502, description = "Chain unavailable", body = ErrorBody)
    )
)]
pub async fn transaction_status(
    State(state): State<AppState>,
    Path((chain, tx_hash)): Path<(Chain, String)>,
) -> Result<Json<TransactionStatus>, ApiError> {
    let status = state
        .transfers
        .flow()
        .transaction_status(chain, &tx_hash)
        .await?;
    Ok(Json(status))
}

/// Whether the token bridge on `chain` has redeemed the signed transfer.
#[utoipa::path(
    get,
    path = "/v1/bridge/completions/{chain}/{vaa_hash}",
    tag = "Bridge",
    params(
        ("chain" = Chain, Path, description = "Target chain of the transfer"),
        ("vaa_hash" = String, Path, description = "0x-prefixed hash of the signed message")
    ),
    responses(
        (status = 200, description = "Redemption status", body = CompletionStatus),
        (status = 400, description = "Malformed hash", body = ErrorBody),
        (status = 502, description = "Chain unavailable", body = ErrorBody)
    )
)]
pub async fn transfer_completion(
    State(state): State<AppState>,
    Path((chain, vaa_hash)): Path<(Chain, String)>,
) -> Result<Json<CompletionStatus>, ApiError> {
    let status = state
        .transfers
        .flow()
        .transfer_completion(chain, &vaa_hash)
        .await?;
    Ok(Json(status))
}
