// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    balances::{
        AddressBalance, FormattedValuation, TrackedWallet, ValuationResult, WalletSnapshot,
    },
    blockchain::Chain,
    bridge::{
        AllowanceStatus, CancelOutcome, CompletionStatus, ExecutionMode, TransactionStatus,
        TransferProgress, TransferQuote, TransferRecord, TransferRequest, TransferState, TxState,
    },
    error::ErrorBody,
    state::AppState,
};

pub mod bridge;
pub mod health;
pub mod wallets;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/wallets", get(wallets::list_snapshots))
        .route("/wallets/refresh", post(wallets::refresh_wallets))
        .route("/wallets/{address}/balances", get(wallets::get_balances))
        .route("/wallets/{address}/valuation", get(wallets::get_valuation))
        .route("/bridge/networks", get(bridge::list_networks))
        .route("/bridge/quote", post(bridge::quote))
        .route("/bridge/allowance", post(bridge::allowance))
        .route("/bridge/approve", post(bridge::approve))
        .route("/bridge/transfers", post(bridge::start_transfer))
        .route("/bridge/transfers/{transfer_id}", get(bridge::get_transfer))
        .route(
            "/bridge/transfers/{transfer_id}/cancel",
            post(bridge::cancel_transfer),
        )
        .route(
            "/bridge/transactions/{chain}/{tx_hash}",
            get(bridge::transaction_status),
        )
        .route(
            "/bridge/completions/{chain}/{vaa_hash}",
            get(bridge::transfer_completion),
        );

    Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
        .nest("/v1", v1_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        wallets::list_snapshots,
        wallets::get_balances,
        wallets::get_valuation,
        wallets::refresh_wallets,
        bridge::list_networks,
        bridge::quote,
        bridge::allowance,
        bridge::approve,
        bridge::start_transfer,
        bridge::get_transfer,
        bridge::cancel_transfer,
        bridge::transaction_status,
        bridge::transfer_completion
    ),
    components(
        schemas(
            ErrorBody,
            health::ServiceStatus,
            health::StatusReport,
            health::ComponentReport,
            health::LiveResponse,
            AddressBalance,
            ValuationResult,
            FormattedValuation,
            TrackedWallet,
            WalletSnapshot,
            wallets::BalancesResponse,
            wallets::ValuationResponse,
            wallets::RefreshRequest,
            Chain,
            ExecutionMode,
            TransferRequest,
            TransferProgress,
            TransferState,
            TransferQuote,
            AllowanceStatus,
            TransferRecord,
            CancelOutcome,
            TxState,
            TransactionStatus,
            CompletionStatus,
            bridge::TokenInfo,
            bridge::NetworkInfo,
            bridge::NetworksResponse,
            bridge::ApproveResponse,
            bridge::CancelResponse
        )
    ),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Wallets", description = "Tracked wallet balances and valuation"),
        (name = "Bridge", description = "Cross-chain token bridge transfers")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use super::*;
    use crate::balances::{AllocationSplit, BalanceFetchClient, PriceSource};
    use crate::bridge::SimulatedExecutor;
    use crate::http::testing::{ok, ScriptedFetch};

    const USDC_BALANCE: &str = r#"{"EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v":{"amount":"12345670000","uiAmount":12345.67,"slot":1,"isFrozen":false}}"#;

    fn state_with(body: &str, wallets: Vec<TrackedWallet>) -> AppState {
        let http = Arc::new(ScriptedFetch::always(ok(body)));
        let prices = PriceSource::fallback_only(http.clone());
        let balances = Arc::new(BalanceFetchClient::new(http, "https://b.example", prices));
        let executor = Arc::new(SimulatedExecutor::new(Duration::from_millis(100)));
        AppState::new(balances, executor, wallets, AllocationSplit::default())
    }

    fn state() -> AppState {
        state_with(USDC_BALANCE, Vec::new())
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn transfer_body(amount: &str) -> Value {
        json!({
            "source_chain": "ethereum",
            "target_chain": "polygon",
            "token_symbol": "USDC",
            "amount": amount,
            "recipient_address": "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12",
            "sender_address": "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266"
        })
    }

    #[tokio::test]
    async fn router_builds_with_all_routes() {
        let app = router(state());
        let _ = app.into_make_service();
    }

    #[tokio::test]
    async fn liveness_and_health_respond() {
        let (status, body) = send(router(state()), get("/health/live")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");

        let (status, body) = send(router(state()), get("/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["components"]["bridge_mode"], "simulated");
        assert_eq!(body["components"]["transfers_in_flight"], 0);
    }

    #[tokio::test]
    async fn responses_carry_a_request_id() {
        let response = router(state()).oneshot(get("/health/live")).await.unwrap();
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test(start_paused = true)]
    async fn valuation_is_formatted() {
        let (status, body) = send(router(state()), get("/v1/wallets/addr1/valuation")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["address"], "addr1");
        assert_eq!(body["formatted"]["balance"], "$12,345.67");
        assert_eq!(body["formatted"]["withdrawable"], "$8,641.97");
        assert_eq!(body["formatted"]["deposit"], "$3,703.70");
    }

    #[tokio::test(start_paused = true)]
    async fn degraded_balances_are_empty_not_errors() {
        let (status, body) = send(
            router(state_with(r#"{"error":"bad address"}"#, Vec::new())),
            get("/v1/wallets/addr1/balances"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["balances"], json!([]));
        assert!(body["upstream_error"].as_str().unwrap().contains("bad address"));
    }

    #[tokio::test(start_paused = true)]
    async fn health_reports_degraded_after_upstream_failure() {
        let state = state_with(r#"{"error":"bad address"}"#, Vec::new());
        send(router(state.clone()), get("/v1/wallets/addr1/balances")).await;

        let (status, body) = send(router(state), get("/health/ready")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "degraded");
        assert!(body["components"]["balance_upstream_error"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_without_wallets_is_unprocessable() {
        let (status, body) =
            send(router(state()), post_json("/v1/wallets/refresh", json!({}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["error"].is_string());
    }

    #[tokio::test(start_paused = true)]
    async fn refresh_of_tracked_wallets_updates_snapshots() {
        let wallets = vec![
            TrackedWallet { name: "treasury".into(), address: "t1".into() },
            TrackedWallet { name: "ops".into(), address: "o1".into() },
        ];
        let state = state_with(USDC_BALANCE, wallets);

        let (status, body) = send(
            router(state.clone()),
            post_json("/v1/wallets/refresh", json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 2);
        assert_eq!(body[1]["name"], "ops");

        let (_, listed) = send(router(state), get("/v1/wallets")).await;
        assert_eq!(listed.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn networks_list_every_chain() {
        let (status, body) = send(router(state()), get("/v1/bridge/networks")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["mode"], "simulated");
        assert_eq!(body["networks"].as_array().unwrap().len(), 6);
        assert_eq!(body["networks"][0]["tokens"][0]["symbol"], "USDC");
    }

    #[tokio::test]
    async fn quote_rejects_same_chain() {
        let mut body = transfer_body("1");
        body["target_chain"] = json!("ethereum");
        let (status, _) = send(router(state()), post_json("/v1/bridge/quote", body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test(start_paused = true)]
    async fn transfer_lifecycle_over_http() {
        let state = state();

        let (status, record) = send(
            router(state.clone()),
            post_json("/v1/bridge/transfers", transfer_body("100")),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let id = record["id"].as_str().unwrap().to_string();

        tokio::time::sleep(Duration::from_secs(1)).await;

        let (status, record) =
            send(router(state.clone()), get(&format!("/v1/bridge/transfers/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(record["progress"]["completed"], true);
        assert_eq!(record["progress"]["state"], "completed");
        assert_eq!(
            record["progress"]["source_tx_hash"].as_str().unwrap().len(),
            66
        );

        let (status, body) = send(
            router(state),
            post_json(&format!("/v1/bridge/transfers/{id}/cancel"), json!({})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "already_finished");
    }

    #[tokio::test]
    async fn unknown_transfer_is_not_found() {
        let id = uuid::Uuid::new_v4();
        let (status, _) =
            send(router(state()), get(&format!("/v1/bridge/transfers/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(router(state()), get("/v1/bridge/transfers/not-a-uuid")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn simulated_transaction_status_and_completion() {
        let hash = format!("0x{}", "ab".repeat(32));

        let (status, body) = send(
            router(state()),
            get(&format!("/v1/bridge/transactions/arbitrum/{hash}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "confirmed");
        assert_eq!(body["confirmations"], 12);
        assert_eq!(body["tx_hash"], hash);

        let (status, body) = send(
            router(state()),
            get(&format!("/v1/bridge/completions/polygon/{hash}")),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["completed"], true);
        assert_eq!(body["chain"], "polygon");

        let (status, body) =
            send(router(state()), get("/v1/bridge/transactions/ethereum/0x12")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());
    }

    #[test]
    fn openapi_document_lists_bridge_paths() {
        let doc = ApiDoc::openapi();
        assert!(doc.paths.paths.contains_key("/v1/bridge/transfers"));
        assert!(doc.paths.paths.contains_key("/v1/wallets/{address}/valuation"));
        assert!(doc
            .paths
            .paths
            .contains_key("/v1/bridge/transactions/{chain}/{tx_hash}"));
    }
}
