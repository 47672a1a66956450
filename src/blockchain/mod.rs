// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM integration for the token bridge.
//!
//! This module provides functionality for:
//! - The supported chain and token registry
//! - Amount conversion between decimal strings and base units
//! - Contract bindings and `LogMessagePublished` sequence decoding
//! - The [`BridgeChain`] signing/transaction capability

pub mod amounts;
pub mod client;
pub mod contracts;
pub mod types;

pub use amounts::{format_amount, parse_amount};
pub use client::{
    create_signer, parse_address, parse_tx_hash, BridgeChain, BridgeTransferParams, ChainError,
    EvmBridgeChain, ReceiptLog, TxReceipt,
};
pub use types::*;
