// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Live Bridge Executor
//!
//! Runs a transfer against real chains through an injected [`BridgeChain`]
//! and [`AttestationSource`].
//!
//! - The request's sender must be the configured signer; anything else is
//!   rejected before the chain is touched.
//! - Step 1 resolves contract addresses and the bytes32 recipient, then
//!   checks spendable balance and the bridge allowance. An allowance below
//!   the amount fails with `InsufficientAllowance`; approval is never
//!   performed implicitly.
//! - Step 2 calls `transferTokens` on the source token bridge, waits for the
//!   receipt and reads the sequence from the core bridge's
//!   `LogMessagePublished` log.
//! - Step 3 polls for the signed attestation until it appears or the
//!   timeout elapses.
//! - Step 4 reports the transfer as ready to redeem. Redemption needs a
//!   signature on the target chain and is left to the caller.

use std::sync::Arc;
use std::time::Duration;

use alloy::primitives::{Address, TxHash, B256, U256};
use async_trait::async_trait;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::attestation::{AttestationError, AttestationSource};
use super::flow::{StepContext, TransferExecutor};
use super::types::{
    estimated_minutes, AllowanceStatus, ExecutionMode, TransactionStatus, TransferError,
    TransferQuote, TransferState, TxState, ValidatedTransfer,
};
use crate::blockchain::contracts::{address_to_bytes32, parse_sequence};
use crate::blockchain::{
    format_amount, parse_address, BridgeChain, BridgeTransferParams, Chain, NetworkConfig,
};

const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(5);
const DEFAULT_ATTESTATION_TIMEOUT: Duration = Duration::from_secs(15 * 60);

/// Gas budgeted for a token bridge transfer when quoting.
const TRANSFER_GAS_ESTIMATE: u64 = 200_000;

/// Fee quoted when the gas price cannot be read.
const FALLBACK_FEE: &str = "0.05";

pub struct LiveExecutor {
    chain: Arc<dyn BridgeChain>,
    attestations: Arc<dyn AttestationSource>,
    poll_interval: Duration,
    attestation_timeout: Duration,
}

impl LiveExecutor {
    pub fn new(chain: Arc<dyn BridgeChain>, attestations: Arc<dyn AttestationSource>) -> Self {
        Self {
            chain,
            attestations,
            poll_interval: DEFAULT_POLL_INTERVAL,
            attestation_timeout: DEFAULT_ATTESTATION_TIMEOUT,
        }
    }

    pub fn with_attestation_polling(mut self, interval: Duration, timeout: Duration) -> Self {
        self.poll_interval = interval;
        self.attestation_timeout = timeout;
        self
    }

    /// The signer, provided it is the account named as the request's sender.
    fn signing_owner(&self, transfer: &ValidatedTransfer) -> Result<Address, TransferError> {
        let sender = parse_address(&transfer.request.sender_address)
            .map_err(|e| TransferError::InvalidRequest(format!("sender: {e}")))?;
        let signer = self.chain.signer_address();
        if sender != signer {
            return Err(TransferError::InvalidRequest(format!(
                "sender {sender} is not the configured signer {signer}"
            )));
        }
        Ok(signer)
    }

    async fn current_allowance(
        &self,
        transfer: &ValidatedTransfer,
        owner: Address,
    ) -> Result<U256, TransferError> {
        let network = transfer.source();
        let bridge = parse_address(network.token_bridge)?;
        Ok(self
            .chain
            .allowance(network, transfer.token, owner, bridge)
            .await?)
    }

    async fn await_attestation(
        &self,
        network: &NetworkConfig,
        tx_hash: &str,
        sequence: u64,
    ) -> Result<String, TransferError> {
        let started = Instant::now();
        let deadline = started + self.attestation_timeout;

        loop {
            match self
                .attestations
                .fetch(network.wormhole_chain_id, tx_hash, sequence)
                .await
            {
                Ok(Some(vaa)) => {
                    info!(
                        tx_hash,
                        sequence,
                        waited_secs = started.elapsed().as_secs(),
                        "Attestation available"
                    );
                    return Ok(vaa);
                }
                Ok(None) => debug!(tx_hash, sequence, "Attestation pending"),
                Err(AttestationError::Transient(e)) => {
                    warn!(tx_hash, sequence, error = %e, "Attestation poll failed, will retry");
                }
                Err(AttestationError::Rejected(e)) => return Err(TransferError::Attestation(e)),
            }

            if Instant::now() + self.poll_interval > deadline {
                return Err(TransferError::AttestationTimeout {
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.poll_interval).await;
        }
    }
}

#[async_trait]
impl TransferExecutor for LiveExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Live
    }

    async fn execute(
        &self,
        transfer: &ValidatedTransfer,
        ctx: &mut StepContext<'_>,
    ) -> Result<(), TransferError> {
        let source = transfer.source();
        let target = transfer.target();
        let token = transfer.token;
        let owner = self.signing_owner(transfer)?;

        ctx.step(1, TransferState::Preparing, "Preparing transfer...");

        let token_address = parse_address(token.address)?;
        let recipient = parse_address(&transfer.request.recipient_address)
            .map(address_to_bytes32)
            .map_err(|e| TransferError::InvalidRequest(format!("recipient: {e}")))?;

        let balance = self.chain.token_balance(source, token, owner).await?;
        if balance < transfer.amount {
            return Err(TransferError::InsufficientBalance {
                required: format_amount(transfer.amount, token.decimals),
                available: format_amount(balance, token.decimals),
            });
        }

        let allowance = self.current_allowance(transfer, owner).await?;
        if allowance < transfer.amount {
            return Err(TransferError::InsufficientAllowance {
                required: format_amount(transfer.amount, token.decimals),
                available: format_amount(allowance, token.decimals),
            });
        }

        ctx.begin_submission()?;

        let params = BridgeTransferParams {
            token: token_address,
            amount: transfer.amount,
            recipient_chain: target.wormhole_chain_id,
            recipient,
            arbiter_fee: U256::ZERO,
            nonce: transfer_nonce(),
        };
        let tx_hash = self.chain.submit_transfer(source, &params).await?;
        ctx.record_source_tx(tx_hash.clone());
        info!(
            network = %source.name,
            tx_hash = %tx_hash,
            explorer = %source.tx_url(&tx_hash),
            "Bridge transfer submitted"
        );

        let receipt = self.chain.wait_for_confirmation(source, &tx_hash).await?;
        if !receipt.success {
            return Err(TransferError::TransactionFailed {
                receipt: Box::new(receipt),
            });
        }

        let core_bridge = parse_address(source.core_bridge)?;
        let sequence = parse_sequence(&receipt.logs, Some(core_bridge))?;
        ctx.record_sequence(sequence);
        ctx.step(
            2,
            TransferState::SourceSubmitted,
            format!("Transaction confirmed on {} (sequence {sequence})", source.name),
        );

        ctx.step(
            3,
            TransferState::AwaitingAttestation,
            "Waiting for guardian attestation...",
        );
        let vaa = self.await_attestation(source, &tx_hash, sequence).await?;
        ctx.record_attestation(vaa);

        ctx.complete(format!("Attestation ready; redeem on {}", target.name));
        Ok(())
    }

    async fn approve(&self, transfer: &ValidatedTransfer) -> Result<String, TransferError> {
        self.signing_owner(transfer)?;
        let network = transfer.source();
        let bridge = parse_address(network.token_bridge)?;
        Ok(self
            .chain
            .approve(network, transfer.token, bridge, transfer.amount)
            .await?)
    }

    async fn allowance_status(
        &self,
        transfer: &ValidatedTransfer,
    ) -> Result<AllowanceStatus, TransferError> {
        let owner = self.signing_owner(transfer)?;
        let allowance = self.current_allowance(transfer, owner).await?;
        let decimals = transfer.token.decimals;
        Ok(AllowanceStatus {
            required: format_amount(transfer.amount, decimals),
            current: format_amount(allowance, decimals),
            needs_approval: allowance < transfer.amount,
        })
    }

    async fn quote(&self, transfer: &ValidatedTransfer) -> TransferQuote {
        let source = transfer.source();
        let fee = match self.chain.gas_price(source).await {
            Ok(gas_price) => {
                let wei = U256::from(gas_price) * U256::from(TRANSFER_GAS_ESTIMATE);
                format_amount(wei, 18)
            }
            Err(e) => {
                warn!(network = %source.name, error = %e, "Gas price unavailable, using fallback fee");
                FALLBACK_FEE.to_string()
            }
        };

        TransferQuote {
            fee,
            fee_symbol: source.native_symbol.to_string(),
            estimated_minutes: estimated_minutes(
                transfer.request.source_chain,
                transfer.request.target_chain,
            ),
            route: format!("Wormhole Token Bridge: {} → {}", source.name, transfer.target().name),
            mode: ExecutionMode::Live,
        }
    }

    async fn transaction_status(
        &self,
        chain: Chain,
        tx_hash: TxHash,
    ) -> Result<TransactionStatus, TransferError> {
        let network = chain.network();
        let tx_hash_text = format!("{tx_hash:?}");

        let Some(receipt) = self.chain.receipt(network, tx_hash).await? else {
            return Ok(TransactionStatus {
                chain,
                tx_hash: tx_hash_text,
                status: TxState::Pending,
                confirmations: 0,
                block_number: None,
            });
        };

        let head = self.chain.block_number(network).await?;
        Ok(TransactionStatus {
            chain,
            tx_hash: tx_hash_text,
            status: if receipt.success {
                TxState::Confirmed
            } else {
                TxState::Failed
            },
            confirmations: head.saturating_sub(receipt.block_number),
            block_number: Some(receipt.block_number),
        })
    }

    async fn is_transfer_completed(
        &self,
        chain: Chain,
        vaa_hash: B256,
    ) -> Result<bool, TransferError> {
        Ok(self
            .chain
            .is_transfer_completed(chain.network(), vaa_hash)
            .await?)
    }
}

fn transfer_nonce() -> u32 {
    (Uuid::new_v4().as_u128() & u128::from(u32::MAX)) as u32
}
