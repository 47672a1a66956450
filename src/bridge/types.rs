// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bridge transfer requests, progress snapshots and errors.

use alloy::primitives::U256;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::{parse_amount, Chain, ChainError, Erc20Token, NetworkConfig, TxReceipt};

/// Number of steps every transfer reports.
pub const TOTAL_STEPS: u8 = 4;

/// Lifecycle of a transfer. `Completed` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TransferState {
    Idle,
    Preparing,
    SourceSubmitted,
    AwaitingAttestation,
    Completed,
    Failed,
}

impl TransferState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TransferState::Completed | TransferState::Failed)
    }
}

/// Which executor drives a flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    Simulated,
    Live,
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simulated" | "simulation" | "sim" => Ok(ExecutionMode::Simulated),
            "live" => Ok(ExecutionMode::Live),
            other => Err(format!("Unknown bridge mode `{other}`")),
        }
    }
}

/// A user's request to move tokens between chains.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferRequest {
    pub source_chain: Chain,
    pub target_chain: Chain,
    /// Token symbol as listed on the source chain (e.g. "USDC")
    pub token_symbol: String,
    /// Human-readable amount (e.g. "100.5")
    pub amount: String,
    /// Pre-validated recipient on the target chain
    pub recipient_address: String,
    pub sender_address: String,
}

/// A request that passed validation, with its token and base-unit amount resolved.
#[derive(Debug, Clone)]
pub struct ValidatedTransfer {
    pub request: TransferRequest,
    pub token: &'static Erc20Token,
    pub amount: U256,
}

impl ValidatedTransfer {
    pub fn source(&self) -> &'static NetworkConfig {
        self.request.source_chain.network()
    }

    pub fn target(&self) -> &'static NetworkConfig {
        self.request.target_chain.network()
    }
}

impl TransferRequest {
    /// Check every precondition that does not need the network.
    pub fn validate(&self) -> Result<ValidatedTransfer, TransferError> {
        if self.source_chain == self.target_chain {
            return Err(TransferError::InvalidRequest(
                "source and target chain must differ".to_string(),
            ));
        }
        if self.recipient_address.trim().is_empty() {
            return Err(TransferError::InvalidRequest(
                "recipient address is required".to_string(),
            ));
        }
        if self.sender_address.trim().is_empty() {
            return Err(TransferError::InvalidRequest(
                "sender address is required".to_string(),
            ));
        }

        let token = self.source_chain.token(&self.token_symbol).ok_or_else(|| {
            TransferError::UnsupportedToken {
                symbol: self.token_symbol.clone(),
                chain: self.source_chain,
            }
        })?;

        let amount = parse_amount(&self.amount, token.decimals)
            .map_err(|e| TransferError::InvalidRequest(e.to_string()))?;
        if amount.is_zero() {
            return Err(TransferError::InvalidRequest(
                "amount must be greater than zero".to_string(),
            ));
        }

        Ok(ValidatedTransfer {
            request: self.clone(),
            token,
            amount,
        })
    }
}

/// Snapshot of a transfer, emitted once per step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferProgress {
    pub step: u8,
    pub total_steps: u8,
    pub state: TransferState,
    pub message: String,
    pub source_tx_hash: Option<String>,
    /// Core bridge sequence number, as a decimal string
    pub sequence: Option<String>,
    /// Signed attestation (VAA), base64
    pub attestation: Option<String>,
    pub completed: bool,
    pub error: Option<String>,
}

impl Default for TransferProgress {
    fn default() -> Self {
        Self {
            step: 0,
            total_steps: TOTAL_STEPS,
            state: TransferState::Idle,
            message: String::new(),
            source_tx_hash: None,
            sequence: None,
            attestation: None,
            completed: false,
            error: None,
        }
    }
}

impl TransferProgress {
    pub fn is_terminal(&self) -> bool {
        self.completed || self.error.is_some()
    }
}

/// Fee and timing estimate for a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransferQuote {
    /// Estimated fee in the source chain's native token
    pub fee: String,
    pub fee_symbol: String,
    pub estimated_minutes: u32,
    pub route: String,
    pub mode: ExecutionMode,
}

/// Whether the bridge may already spend the requested amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AllowanceStatus {
    pub required: String,
    pub current: String,
    pub needs_approval: bool,
}

/// Mining state of a source chain transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum TxState {
    Pending,
    Confirmed,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TransactionStatus {
    pub chain: Chain,
    pub tx_hash: String,
    pub status: TxState,
    /// Blocks mined since the including block; 0 while pending
    pub confirmations: u64,
    pub block_number: Option<u64>,
}

/// Whether the target chain's token bridge has redeemed a transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct CompletionStatus {
    pub chain: Chain,
    pub vaa_hash: String,
    pub completed: bool,
}

/// Estimated minutes until a transfer can be redeemed.
pub fn estimated_minutes(source: Chain, target: Chain) -> u32 {
    const BASE_MINUTES: u32 = 15;
    const ETHEREUM_FINALITY_MINUTES: u32 = 10;

    if source == Chain::Ethereum || target == Chain::Ethereum {
        BASE_MINUTES + ETHEREUM_FINALITY_MINUTES
    } else {
        BASE_MINUTES
    }
}

/// Errors surfaced by a transfer. None are retried automatically.
#[derive(Debug, thiserror::Error)]
pub enum TransferError {
    #[error("Invalid transfer request: {0}")]
    InvalidRequest(String),

    #[error("Token {symbol} is not supported on {chain}")]
    UnsupportedToken { symbol: String, chain: Chain },

    #[error("Insufficient allowance: {required} required, {available} approved")]
    InsufficientAllowance { required: String, available: String },

    #[error("Insufficient balance: {required} required, {available} available")]
    InsufficientBalance { required: String, available: String },

    #[error("Attestation not available after {waited_secs}s")]
    AttestationTimeout { waited_secs: u64 },

    #[error("Transaction {} failed on chain", .receipt.tx_hash)]
    TransactionFailed { receipt: Box<TxReceipt> },

    #[error("Transfer cancelled")]
    Cancelled,

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("Attestation service error: {0}")]
    Attestation(String),
}
