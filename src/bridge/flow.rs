// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Transfer Flow
//!
//! Drives one bridge transfer through four steps:
//!
//! 1. Preparing: resolve parameters, check balance and allowance.
//! 2. Source submitted: broadcast the bridge transfer and wait for it.
//! 3. Awaiting attestation: poll for the signed message.
//! 4. Completed: the transfer is ready to redeem on the target chain.
//!
//! The steps themselves are implemented by a [`TransferExecutor`]
//! (`SimulatedExecutor` or `LiveExecutor`) chosen when the flow is built.
//! Each step emits exactly one [`TransferProgress`] through the caller's
//! callback. A failure emits one further snapshot in state `Failed`.
//!
//! ## Cancellation
//!
//! [`TransferFlow::cancel`] is cooperative and only takes effect before step 2
//! is entered. Once a submission has been broadcast the flow runs to a
//! terminal state.

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{B256, TxHash};
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::types::{
    AllowanceStatus, CompletionStatus, ExecutionMode, TransactionStatus, TransferError,
    TransferProgress, TransferQuote, TransferRequest, TransferState, ValidatedTransfer,
    TOTAL_STEPS,
};
use crate::blockchain::{parse_tx_hash, Chain};

/// Progress callback invoked once per snapshot.
pub type ProgressCallback<'a> = dyn FnMut(&TransferProgress) + Send + 'a;

/// Step implementation behind a [`TransferFlow`].
#[async_trait]
pub trait TransferExecutor: Send + Sync {
    fn mode(&self) -> ExecutionMode;

    /// Run steps 1 to 4, reporting through `ctx`.
    async fn execute(
        &self,
        transfer: &ValidatedTransfer,
        ctx: &mut StepContext<'_>,
    ) -> Result<(), TransferError>;

    /// Grant the bridge contract an allowance for the transfer amount.
    async fn approve(&self, transfer: &ValidatedTransfer) -> Result<String, TransferError>;

    async fn allowance_status(
        &self,
        transfer: &ValidatedTransfer,
    ) -> Result<AllowanceStatus, TransferError>;

    async fn quote(&self, transfer: &ValidatedTransfer) -> TransferQuote;

    /// Mining state and confirmation count of a transaction on `chain`.
    async fn transaction_status(
        &self,
        chain: Chain,
        tx_hash: TxHash,
    ) -> Result<TransactionStatus, TransferError>;

    /// Whether `chain`'s token bridge has redeemed the message `vaa_hash`.
    async fn is_transfer_completed(
        &self,
        chain: Chain,
        vaa_hash: B256,
    ) -> Result<bool, TransferError>;
}

const GATE_OPEN: u8 = 0;
const GATE_SUBMITTED: u8 = 1;
const GATE_CANCELLED: u8 = 2;

/// Shared cancel switch of one flow.
///
/// Cancellation and the start of submission race for the same gate, so
/// exactly one of them wins: a cancel accepted here is guaranteed to stop
/// the flow before anything is broadcast.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    token: CancellationToken,
    gate: Arc<AtomicU8>,
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self {
            token: CancellationToken::new(),
            gate: Arc::new(AtomicU8::new(GATE_OPEN)),
        }
    }
}

impl CancelHandle {
    /// Request cancellation. Returns `false` once submission has started,
    /// in which case the flow runs on to a terminal state.
    pub fn cancel(&self) -> bool {
        match self.gate.compare_exchange(
            GATE_OPEN,
            GATE_CANCELLED,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) | Err(GATE_CANCELLED) => {
                self.token.cancel();
                true
            }
            Err(_) => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.gate.load(Ordering::Acquire) == GATE_CANCELLED
    }

    /// Whether the flow has passed the point where cancel is honoured.
    pub fn submission_started(&self) -> bool {
        self.gate.load(Ordering::Acquire) == GATE_SUBMITTED
    }

    fn begin_submission(&self) -> bool {
        matches!(
            self.gate.compare_exchange(
                GATE_OPEN,
                GATE_SUBMITTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            ),
            Ok(_) | Err(GATE_SUBMITTED)
        )
    }
}

/// Progress state and cancellation gate handed to an executor.
pub struct StepContext<'a> {
    progress: TransferProgress,
    on_progress: &'a mut ProgressCallback<'a>,
    cancel: CancelHandle,
}

impl<'a> StepContext<'a> {
    pub fn new(on_progress: &'a mut ProgressCallback<'a>, cancel: CancelHandle) -> Self {
        Self {
            progress: TransferProgress::default(),
            on_progress,
            cancel,
        }
    }

    pub fn progress(&self) -> &TransferProgress {
        &self.progress
    }

    /// Move to `step` and emit a snapshot.
    pub fn step(&mut self, step: u8, state: TransferState, message: impl Into<String>) {
        self.progress.step = step;
        self.progress.state = state;
        self.progress.message = message.into();
        self.emit();
    }

    /// Emit the final step as completed.
    pub fn complete(&mut self, message: impl Into<String>) {
        self.progress.completed = true;
        self.step(TOTAL_STEPS, TransferState::Completed, message);
    }

    pub fn record_source_tx(&mut self, tx_hash: impl Into<String>) {
        self.progress.source_tx_hash = Some(tx_hash.into());
    }

    pub fn record_sequence(&mut self, sequence: u64) {
        self.progress.sequence = Some(sequence.to_string());
    }

    pub fn record_attestation(&mut self, attestation: impl Into<String>) {
        self.progress.attestation = Some(attestation.into());
    }

    /// Gate before step 2. Fails with `Cancelled` if cancellation was
    /// requested; afterwards cancellation is ignored.
    pub fn begin_submission(&mut self) -> Result<(), TransferError> {
        if self.cancel.begin_submission() {
            Ok(())
        } else {
            Err(TransferError::Cancelled)
        }
    }

    /// Sleep for `duration`. Before submission a cancel request ends the
    /// pause early with `Cancelled`.
    pub fn pause(
        &self,
        duration: Duration,
    ) -> impl Future<Output = Result<(), TransferError>> + Send + 'static {
        let cancel = (!self.cancel.submission_started()).then(|| self.cancel.token.clone());
        async move {
            let Some(cancel) = cancel else {
                tokio::time::sleep(duration).await;
                return Ok(());
            };
            tokio::select! {
                _ = tokio::time::sleep(duration) => Ok(()),
                _ = cancel.cancelled() => Err(TransferError::Cancelled),
            }
        }
    }

    fn fail(&mut self, error: &TransferError) {
        self.progress.state = TransferState::Failed;
        self.progress.completed = false;
        self.progress.error = Some(error.to_string());
        self.progress.message = error.to_string();
        self.emit();
    }

    fn emit(&mut self) {
        (self.on_progress)(&self.progress);
    }

    fn into_progress(self) -> TransferProgress {
        self.progress
    }
}

/// One bridge transfer driven by an executor.
pub struct TransferFlow {
    executor: Arc<dyn TransferExecutor>,
    cancel: CancelHandle,
}

impl TransferFlow {
    pub fn new(executor: Arc<dyn TransferExecutor>) -> Self {
        Self {
            executor,
            cancel: CancelHandle::default(),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.executor.mode()
    }

    /// Request cancellation. Only effective before step 2; returns whether
    /// the request was accepted.
    pub fn cancel(&self) -> bool {
        self.cancel.cancel()
    }

    /// Handle that cancels this flow, for use from another task.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Validate `request` and run it to a terminal state.
    ///
    /// Returns the final snapshot on success. Validation errors are returned
    /// before any snapshot is emitted.
    pub async fn start<F>(
        &self,
        request: &TransferRequest,
        mut on_progress: F,
    ) -> Result<TransferProgress, TransferError>
    where
        F: FnMut(&TransferProgress) + Send,
    {
        let transfer = request.validate()?;

        info!(
            mode = ?self.mode(),
            source = %request.source_chain,
            target = %request.target_chain,
            token = %transfer.token.symbol,
            amount = %request.amount,
            "Bridge transfer starting"
        );

        let mut ctx = StepContext::new(&mut on_progress, self.cancel.clone());
        let outcome = if self.cancel.is_cancelled() {
            Err(TransferError::Cancelled)
        } else {
            self.executor.execute(&transfer, &mut ctx).await
        };

        match outcome {
            Ok(()) => {
                let progress = ctx.into_progress();
                info!(
                    source_tx_hash = progress.source_tx_hash.as_deref().unwrap_or_default(),
                    sequence = progress.sequence.as_deref().unwrap_or_default(),
                    "Bridge transfer completed"
                );
                Ok(progress)
            }
            Err(error) => {
                warn!(
                    step = ctx.progress().step,
                    error = %error,
                    "Bridge transfer failed"
                );
                ctx.fail(&error);
                Err(error)
            }
        }
    }

    /// Approve the bridge to spend the requested amount. Returns the tx hash.
    pub async fn approve(&self, request: &TransferRequest) -> Result<String, TransferError> {
        let transfer = request.validate()?;
        let tx_hash = self.executor.approve(&transfer).await?;
        info!(
            source = %request.source_chain,
            token = %transfer.token.symbol,
            tx_hash = %tx_hash,
            "Bridge allowance approved"
        );
        Ok(tx_hash)
    }

    pub async fn allowance_status(
        &self,
        request: &TransferRequest,
    ) -> Result<AllowanceStatus, TransferError> {
        let transfer = request.validate()?;
        self.executor.allowance_status(&transfer).await
    }

    pub async fn quote(&self, request: &TransferRequest) -> Result<TransferQuote, TransferError> {
        let transfer = request.validate()?;
        Ok(self.executor.quote(&transfer).await)
    }

    pub async fn transaction_status(
        &self,
        chain: Chain,
        tx_hash: &str,
    ) -> Result<TransactionStatus, TransferError> {
        let hash = parse_tx_hash(tx_hash)
            .map_err(|e| TransferError::InvalidRequest(format!("tx hash: {e}")))?;
        self.executor.transaction_status(chain, hash).await
    }

    /// Check redemption of a transfer on its target `chain`.
    pub async fn transfer_completion(
        &self,
        chain: Chain,
        vaa_hash: &str,
    ) -> Result<CompletionStatus, TransferError> {
        let hash: B256 = vaa_hash
            .trim()
            .parse()
            .map_err(|e| TransferError::InvalidRequest(format!("vaa hash: {e}")))?;
        let completed = self.executor.is_transfer_completed(chain, hash).await?;
        Ok(CompletionStatus {
            chain,
            vaa_hash: format!("{hash:?}"),
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::simulated::SimulatedExecutor;
    use crate::bridge::testing::{request, FlakyExecutor};

    #[tokio::test(start_paused = true)]
    async fn validation_errors_emit_nothing() {
        let flow = TransferFlow::new(Arc::new(SimulatedExecutor::default()));
        let mut snapshots = Vec::new();

        let mut bad = request("100");
        bad.amount = "-1".to_string();
        let result = flow.start(&bad, |p| snapshots.push(p.clone())).await;

        assert!(matches!(result, Err(TransferError::InvalidRequest(_))));
        assert!(snapshots.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn executor_failure_emits_one_failed_snapshot() {
        let flow = TransferFlow::new(Arc::new(FlakyExecutor));
        let mut snapshots = Vec::new();

        let result = flow.start(&request("1"), |p| snapshots.push(p.clone())).await;

        assert!(matches!(result, Err(TransferError::Attestation(_))));
        assert_eq!(snapshots.len(), 2);
        let last = snapshots.last().unwrap();
        assert_eq!(last.state, TransferState::Failed);
        assert_eq!(last.step, 1);
        assert!(last.error.is_some());
        assert!(last.is_terminal());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_before_start_never_runs_executor() {
        let flow = TransferFlow::new(Arc::new(SimulatedExecutor::default()));
        flow.cancel();
        let mut snapshots = Vec::new();

        let result = flow.start(&request("1"), |p| snapshots.push(p.clone())).await;

        assert!(matches!(result, Err(TransferError::Cancelled)));
        assert_eq!(snapshots.len(), 1);
        assert_eq!(snapshots[0].state, TransferState::Failed);
    }

    #[test]
    fn cancel_and_submission_are_exclusive() {
        let submitted = CancelHandle::default();
        assert!(submitted.begin_submission());
        assert!(!submitted.cancel());
        assert!(!submitted.is_cancelled());
        assert!(submitted.submission_started());

        let cancelled = CancelHandle::default();
        assert!(cancelled.cancel());
        assert!(cancelled.cancel());
        assert!(!cancelled.begin_submission());
        assert!(!cancelled.submission_started());
    }

    #[tokio::test(start_paused = true)]
    async fn quote_and_allowance_validate_first() {
        let flow = TransferFlow::new(Arc::new(SimulatedExecutor::default()));
        let mut bad = request("1");
        bad.token_symbol = "NOPE".to_string();

        assert!(matches!(
            flow.quote(&bad).await,
            Err(TransferError::UnsupportedToken { .. })
        ));
        assert!(flow.allowance_status(&bad).await.is_err());
        assert!(flow.approve(&bad).await.is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn malformed_hashes_are_rejected() {
        let flow = TransferFlow::new(Arc::new(SimulatedExecutor::default()));

        assert!(matches!(
            flow.transaction_status(Chain::Ethereum, "0xabc").await,
            Err(TransferError::InvalidRequest(_))
        ));
        assert!(matches!(
            flow.transfer_completion(Chain::Polygon, "not-a-hash").await,
            Err(TransferError::InvalidRequest(_))
        ));
    }
}
