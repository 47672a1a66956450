// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Wallet Refresher
//!
//! Refreshes every tracked wallet one at a time: fetch balances, price them,
//! value them, then pause before the next wallet. The pause (default 2 s) is
//! added on top of the balance client's own request spacing.
//!
//! ## Background mode
//!
//! [`WalletRefresher::run`] repeats the sweep every `interval` and publishes
//! the snapshots to a shared [`SnapshotStore`]. It stops on a
//! `tokio_util::sync::CancellationToken`.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use utoipa::ToSchema;

use super::client::BalanceFetchClient;
use super::types::{AddressBalance, ValuationResult};
use super::valuation::{format_usd, AllocationSplit};

const DEFAULT_WALLET_PAUSE: Duration = Duration::from_millis(2000);

/// A named address the dashboard tracks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TrackedWallet {
    pub name: String,
    pub address: String,
}

/// Display strings for a valuation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct FormattedValuation {
    pub balance: String,
    pub withdrawable: String,
    pub deposit: String,
}

impl From<&ValuationResult> for FormattedValuation {
    fn from(v: &ValuationResult) -> Self {
        Self {
            balance: format_usd(v.total_value),
            withdrawable: format_usd(v.withdrawable_value),
            deposit: format_usd(v.deposit_value),
        }
    }
}

/// Result of refreshing one tracked wallet.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct WalletSnapshot {
    pub name: String,
    pub address: String,
    pub balances: Vec<AddressBalance>,
    pub valuation: ValuationResult,
    pub formatted: FormattedValuation,
    pub refreshed_at: DateTime<Utc>,
}

/// Latest snapshots published by the refresher.
pub type SnapshotStore = Arc<RwLock<Vec<WalletSnapshot>>>;

pub struct WalletRefresher {
    client: Arc<BalanceFetchClient>,
    split: AllocationSplit,
    pause: Duration,
}

impl WalletRefresher {
    pub fn new(client: Arc<BalanceFetchClient>, split: AllocationSplit) -> Self {
        Self {
            client,
            split,
            pause: DEFAULT_WALLET_PAUSE,
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub async fn refresh_one(&self, wallet: &TrackedWallet) -> WalletSnapshot {
        let (balances, valuation) = self
            .client
            .valuate_address(&wallet.address, self.split)
            .await;

        WalletSnapshot {
            name: wallet.name.clone(),
            address: wallet.address.clone(),
            formatted: FormattedValuation::from(&valuation),
            balances,
            valuation,
            refreshed_at: Utc::now(),
        }
    }

    /// Refresh `wallets` strictly in order, pausing between wallets.
    pub async fn refresh_all(&self, wallets: &[TrackedWallet]) -> Vec<WalletSnapshot> {
        let mut snapshots = Vec::with_capacity(wallets.len());
        for (index, wallet) in wallets.iter().enumerate() {
            if index > 0 {
                tokio::time::sleep(self.pause).await;
            }
            let snapshot = self.refresh_one(wallet).await;
            info!(
                wallet = %wallet.name,
                total = %snapshot.formatted.balance,
                "Wallet refreshed"
            );
            snapshots.push(snapshot);
        }
        snapshots
    }

    /// Sweep `wallets` every `interval` until `shutdown` is cancelled.
    ///
    /// Should be spawned as a background task:
    /// ```rust,ignore
    /// tokio::spawn(state.refresher.clone().run(wallets, store, interval, shutdown));
    /// ```
    pub async fn run(
        self: Arc<Self>,
        wallets: Vec<TrackedWallet>,
        store: SnapshotStore,
        interval: Duration,
        shutdown: CancellationToken,
    ) {
        if wallets.is_empty() {
            warn!("Wallet refresher has no tracked wallets, not starting");
            return;
        }

        info!(
            wallets = wallets.len(),
            interval_secs = interval.as_secs(),
            "Wallet refresher starting"
        );

        loop {
            if shutdown.is_cancelled() {
                info!("Wallet refresher shutting down");
                return;
            }

            let snapshots = tokio::select! {
                snapshots = self.refresh_all(&wallets) => snapshots,
                _ = shutdown.cancelled() => {
                    info!("Wallet refresher shutting down");
                    return;
                }
            };
            *store.write().await = snapshots;

            tokio::select! {
                _ = tokio::time::sleep(interval) => {},
                _ = shutdown.cancelled() => {
                    info!("Wallet refresher shutting down");
                    return;
                }
            }
        }
    }
}

/// Parse `name=address,name=address`. Entries without a name use the address.
pub fn parse_tracked_wallets(raw: &str) -> Vec<TrackedWallet> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .filter_map(|entry| {
            let (name, address) = match entry.split_once('=') {
                Some((name, address)) => (name.trim(), address.trim()),
                None => (entry, entry),
            };
            if address.is_empty() {
                return None;
            }
            let name = if name.is_empty() { address } else { name };
            Some(TrackedWallet {
                name: name.to_string(),
                address: address.to_string(),
            })
        })
        .collect()
}
