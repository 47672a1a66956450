// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Fundio - treasury balance and cross-chain bridge service
//!
//! Tracks wallet balances through a rate-limited upstream API, values them
//! in USD with a withdrawable/deposit split, and drives token bridge
//! transfers either against real EVM chains or as a timed simulation.
//!
//! ## Modules
//!
//! - `api` - HTTP API handlers (Axum)
//! - `balances` - Balance fetching, pricing and valuation
//! - `blockchain` - EVM chain catalogue and Token Bridge contract client
//! - `bridge` - Four-step transfer flow with simulated and live executors
//! - `http` - Outbound HTTP seam shared by the upstream clients

pub mod api;
pub mod balances;
pub mod blockchain;
pub mod bridge;
pub mod config;
pub mod error;
pub mod http;
pub mod logging;
pub mod state;
