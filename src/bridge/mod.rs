// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Cross-chain token bridge transfers.
//!
//! A [`TransferFlow`] drives one transfer through four steps using either the
//! [`SimulatedExecutor`] or the [`LiveExecutor`]. The [`TransferRegistry`]
//! runs flows in the background for the HTTP API.

pub mod attestation;
pub mod flow;
pub mod live;
pub mod registry;
pub mod simulated;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use attestation::{
    AttestationError, AttestationSource, HttpAttestationSource, DEFAULT_ATTESTATION_API_BASE_URL,
};
pub use flow::{CancelHandle, StepContext, TransferExecutor, TransferFlow};
pub use live::LiveExecutor;
pub use registry::{CancelOutcome, TransferRecord, TransferRegistry};
pub use simulated::SimulatedExecutor;
pub use types::{
    AllowanceStatus, CompletionStatus, ExecutionMode, TransactionStatus, TransferError,
    TransferProgress, TransferQuote, TransferRequest, TransferState, TxState, ValidatedTransfer,
    TOTAL_STEPS,
};
