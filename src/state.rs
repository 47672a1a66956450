// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tracing::info;

use crate::balances::{
    AllocationSplit, BalanceFetchClient, PriceSource, RetryPolicy, SnapshotStore, TrackedWallet,
    WalletRefresher,
};
use crate::blockchain::{ChainError, EvmBridgeChain};
use crate::bridge::{
    ExecutionMode, HttpAttestationSource, LiveExecutor, SimulatedExecutor, TransferExecutor,
    TransferRegistry,
};
use crate::config::{Config, ConfigError, BRIDGE_SIGNER_KEY_ENV};
use crate::http::{HttpFetch, ReqwestFetch, TransportError};

/// Timeout for every outbound HTTP request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

#[derive(Debug, thiserror::Error)]
pub enum StateError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("HTTP client: {0}")]
    Http(#[from] TransportError),

    #[error("Bridge signer: {0}")]
    Signer(#[from] ChainError),
}

#[derive(Clone)]
pub struct AppState {
    pub balances: Arc<BalanceFetchClient>,
    pub refresher: Arc<WalletRefresher>,
    pub snapshots: SnapshotStore,
    pub tracked_wallets: Arc<Vec<TrackedWallet>>,
    pub transfers: Arc<TransferRegistry>,
    pub allocation: AllocationSplit,
}

impl AppState {
    pub fn new(
        balances: Arc<BalanceFetchClient>,
        executor: Arc<dyn TransferExecutor>,
        tracked_wallets: Vec<TrackedWallet>,
        allocation: AllocationSplit,
    ) -> Self {
        Self {
            refresher: Arc::new(WalletRefresher::new(balances.clone(), allocation)),
            balances,
            snapshots: Arc::new(RwLock::new(Vec::new())),
            tracked_wallets: Arc::new(tracked_wallets),
            transfers: Arc::new(TransferRegistry::new(executor)),
            allocation,
        }
    }

    /// Wire every client from the runtime configuration.
    pub fn from_config(config: &Config) -> Result<Self, StateError> {
        let http: Arc<dyn HttpFetch> = Arc::new(ReqwestFetch::new(HTTP_TIMEOUT)?);

        let prices = PriceSource::new(http.clone(), config.price_api_base_url.clone());
        let policy = RetryPolicy {
            min_interval: config.balance_min_interval,
            ..RetryPolicy::default()
        };
        let balances = Arc::new(
            BalanceFetchClient::new(http.clone(), config.balance_api_base_url.clone(), prices)
                .with_policy(policy),
        );

        let executor: Arc<dyn TransferExecutor> = match config.bridge_mode {
            ExecutionMode::Simulated => Arc::new(SimulatedExecutor::default()),
            ExecutionMode::Live => {
                let key = config
                    .bridge_signer_key
                    .as_ref()
                    .ok_or(ConfigError::Missing(BRIDGE_SIGNER_KEY_ENV))?;
                let chain =
                    EvmBridgeChain::from_private_key(key.expose(), config.rpc_overrides.clone())?;
                let attestations =
                    HttpAttestationSource::new(http, config.attestation_api_base_url.clone());
                Arc::new(LiveExecutor::new(Arc::new(chain), Arc::new(attestations)))
            }
        };

        info!(
            bridge_mode = ?config.bridge_mode,
            tracked_wallets = config.tracked_wallets.len(),
            price_api = config.price_api_base_url.is_some(),
            "Application state initialised"
        );

        Ok(Self::new(
            balances,
            executor,
            config.tracked_wallets.clone(),
            config.allocation,
        ))
    }
}
