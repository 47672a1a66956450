// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Tracked-address balances, prices and USD valuation.

pub mod client;
pub mod prices;
pub mod refresh;
pub mod types;
pub mod valuation;

pub use client::{BalanceFetchClient, RetryPolicy, DEFAULT_BALANCE_API_BASE_URL};
pub use prices::{fallback_price, PriceSource};
pub use refresh::{
    parse_tracked_wallets, FormattedValuation, SnapshotStore, TrackedWallet, WalletRefresher,
    WalletSnapshot,
};
pub use types::{AddressBalance, UpstreamFailure, ValuationResult};
pub use valuation::{format_usd, valuate, AllocationSplit};
