// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Simulated bridge executor for demos and non-production environments.
//!
//! Walks the four steps with fixed messages and a fixed delay between them.
//! Nothing touches a chain: the source transaction hash and the sequence are
//! synthetic. It never fails unless cancelled before step 2.

use std::time::Duration;

use alloy::primitives::{B256, TxHash};
use async_trait::async_trait;
use uuid::Uuid;

use super::flow::{StepContext, TransferExecutor};
use super::types::{
    estimated_minutes, AllowanceStatus, ExecutionMode, TransactionStatus, TransferError,
    TransferQuote, TransferState, TxState, ValidatedTransfer,
};
use crate::blockchain::{format_amount, Chain};

const DEFAULT_STEP_DELAY: Duration = Duration::from_millis(1500);

/// Fee quoted in simulated mode, in the source chain's native token.
const SIMULATED_FEE: &str = "0.001";

/// Confirmations reported for any transaction in simulated mode.
const SIMULATED_CONFIRMATIONS: u64 = 12;

pub struct SimulatedExecutor {
    step_delay: Duration,
}

impl SimulatedExecutor {
    pub fn new(step_delay: Duration) -> Self {
        Self { step_delay }
    }
}

impl Default for SimulatedExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_STEP_DELAY)
    }
}

#[async_trait]
impl TransferExecutor for SimulatedExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Simulated
    }

    async fn execute(
        &self,
        _transfer: &ValidatedTransfer,
        ctx: &mut StepContext<'_>,
    ) -> Result<(), TransferError> {
        ctx.pause(self.step_delay).await?;
        ctx.step(1, TransferState::Preparing, "Preparing transfer...");

        ctx.pause(self.step_delay).await?;
        ctx.begin_submission()?;
        ctx.record_source_tx(synthetic_tx_hash());
        ctx.record_sequence(synthetic_sequence());
        ctx.step(
            2,
            TransferState::SourceSubmitted,
            "Submitting transaction on source chain...",
        );

        ctx.pause(self.step_delay).await?;
        ctx.step(3, TransferState::AwaitingAttestation, "Generating attestation...");

        ctx.pause(self.step_delay).await?;
        ctx.complete("Transfer completed");
        Ok(())
    }

    async fn approve(&self, _transfer: &ValidatedTransfer) -> Result<String, TransferError> {
        tokio::time::sleep(self.step_delay).await;
        Ok(synthetic_tx_hash())
    }

    async fn allowance_status(
        &self,
        transfer: &ValidatedTransfer,
    ) -> Result<AllowanceStatus, TransferError> {
        Ok(AllowanceStatus {
            required: format_amount(transfer.amount, transfer.token.decimals),
            current: "unlimited".to_string(),
            needs_approval: false,
        })
    }

    async fn quote(&self, transfer: &ValidatedTransfer) -> TransferQuote {
        let source = transfer.request.source_chain;
        let target = transfer.request.target_chain;
        TransferQuote {
            fee: SIMULATED_FEE.to_string(),
            fee_symbol: transfer.source().native_symbol.to_string(),
            estimated_minutes: estimated_minutes(source, target),
            route: format!(
                "Wormhole Token Bridge: {} → {}",
                transfer.source().name,
                transfer.target().name
            ),
            mode: ExecutionMode::Simulated,
        }
    }

    async fn transaction_status(
        &self,
        chain: Chain,
        tx_hash: TxHash,
    ) -> Result<TransactionStatus, TransferError> {
        Ok(TransactionStatus {
            chain,
            tx_hash: format!("{tx_hash:?}"),
            status: TxState::Confirmed,
            confirmations: SIMULATED_CONFIRMATIONS,
            block_number: None,
        })
    }

    /// Simulated transfers always run to completion.
    async fn is_transfer_completed(
        &self,
        _chain: Chain,
        _vaa_hash: B256,
    ) -> Result<bool, TransferError> {
        Ok(true)
    }
}

/// Random 32-byte hash rendered as `0x` + 64 hex digits.
pub fn synthetic_tx_hash() -> String {
    format!(
        "0x{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

fn synthetic_sequence() -> u64 {
    (Uuid::new_v4().as_u128() % 1_000_000) as u64
}
