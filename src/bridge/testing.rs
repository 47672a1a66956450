// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Test doubles for the bridge flow.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use alloy::primitives::{Address, Bytes, TxHash, B256, U256};
use async_trait::async_trait;

use super::attestation::{AttestationError, AttestationSource};
use super::flow::{StepContext, TransferExecutor};
use super::types::{
    AllowanceStatus, ExecutionMode, TransactionStatus, TransferError, TransferQuote,
    TransferRequest, TransferState, ValidatedTransfer,
};
use crate::blockchain::contracts::{address_to_bytes32, LOG_MESSAGE_PUBLISHED_TOPIC};
use crate::blockchain::{
    parse_address, BridgeChain, BridgeTransferParams, Chain, ChainError, Erc20Token,
    NetworkConfig, ReceiptLog, TxReceipt,
};

/// Ethereum → Polygon USDC transfer of `amount`.
pub fn request(amount: &str) -> TransferRequest {
    TransferRequest {
        source_chain: Chain::Ethereum,
        target_chain: Chain::Polygon,
        token_symbol: "USDC".to_string(),
        amount: amount.to_string(),
        recipient_address: "0x742d35Cc6634C0532925a3b844Bc9e7595f4aB12".to_string(),
        sender_address: "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266".to_string(),
    }
}

/// In-memory chain with call counters.
pub struct MockChain {
    balance: U256,
    allowance: Mutex<U256>,
    success: bool,
    sequence: u64,
    gas_price: Result<u128, ChainError>,
    confirmation_delay: Duration,
    pending: bool,
    head_block: u64,
    redeemed: Vec<B256>,
    params: Mutex<Option<BridgeTransferParams>>,
    spender: Mutex<Option<Address>>,
    pub submit_calls: AtomicUsize,
    pub approve_calls: AtomicUsize,
}

impl MockChain {
    pub const TX_HASH: &'static str =
        "0x5f2a8c4e1b7d3a9f0e6c2b8d4a1f7e3c9b5d0a6e2f8c4b1d7a3e9f5c0b6d2a8e";
    pub const RECEIPT_BLOCK: u64 = 19_000_000;

    pub fn new(balance: U256, allowance: U256) -> Self {
        Self {
            balance,
            allowance: Mutex::new(allowance),
            success: true,
            sequence: 1,
            gas_price: Ok(1_000_000_000),
            confirmation_delay: Duration::ZERO,
            pending: false,
            head_block: Self::RECEIPT_BLOCK + 12,
            redeemed: Vec::new(),
            params: Mutex::new(None),
            spender: Mutex::new(None),
            submit_calls: AtomicUsize::new(0),
            approve_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_sequence(mut self, sequence: u64) -> Self {
        self.sequence = sequence;
        self
    }

    pub fn with_gas_price(mut self, gas_price: Result<u128, ChainError>) -> Self {
        self.gas_price = gas_price;
        self
    }

    pub fn reverting(mut self) -> Self {
        self.success = false;
        self
    }

    /// Delay `wait_for_confirmation` by `delay`.
    pub fn with_confirmation_delay(mut self, delay: Duration) -> Self {
        self.confirmation_delay = delay;
        self
    }

    /// Receipts are not available yet.
    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    pub fn with_head_block(mut self, head_block: u64) -> Self {
        self.head_block = head_block;
        self
    }

    pub fn with_redeemed(mut self, vaa_hash: B256) -> Self {
        self.redeemed.push(vaa_hash);
        self
    }

    fn receipt_for(
        &self,
        network: &NetworkConfig,
        tx_hash: &str,
    ) -> Result<TxReceipt, ChainError> {
        let mut data = vec![0u8; 32 * 4];
        data[24..32].copy_from_slice(&self.sequence.to_be_bytes());
        let log = ReceiptLog {
            address: parse_address(network.core_bridge)?,
            topics: vec![
                LOG_MESSAGE_PUBLISHED_TOPIC,
                address_to_bytes32(parse_address(network.token_bridge)?),
            ],
            data: Bytes::from(data),
        };

        Ok(TxReceipt {
            tx_hash: tx_hash.to_string(),
            block_number: Self::RECEIPT_BLOCK,
            gas_used: 120_000,
            success: self.success,
            logs: if self.success { vec![log] } else { Vec::new() },
        })
    }

    pub fn last_params(&self) -> Option<BridgeTransferParams> {
        self.params.lock().unwrap().clone()
    }

    pub fn last_spender(&self) -> Option<Address> {
        *self.spender.lock().unwrap()
    }
}

#[async_trait]
impl BridgeChain for MockChain {
    fn signer_address(&self) -> Address {
        parse_address("0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266").unwrap()
    }

    async fn token_balance(
        &self,
        _network: &NetworkConfig,
        _token: &Erc20Token,
        _owner: Address,
    ) -> Result<U256, ChainError> {
        Ok(self.balance)
    }

    async fn allowance(
        &self,
        _network: &NetworkConfig,
        _token: &Erc20Token,
        _owner: Address,
        _spender: Address,
    ) -> Result<U256, ChainError> {
        Ok(*self.allowance.lock().unwrap())
    }

    async fn approve(
        &self,
        _network: &NetworkConfig,
        _token: &Erc20Token,
        spender: Address,
        amount: U256,
    ) -> Result<String, ChainError> {
        self.approve_calls.fetch_add(1, Ordering::SeqCst);
        *self.allowance.lock().unwrap() = amount;
        *self.spender.lock().unwrap() = Some(spender);
        Ok(Self::TX_HASH.to_string())
    }

    async fn submit_transfer(
        &self,
        _network: &NetworkConfig,
        params: &BridgeTransferParams,
    ) -> Result<String, ChainError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);
        *self.params.lock().unwrap() = Some(params.clone());
        Ok(Self::TX_HASH.to_string())
    }

    async fn wait_for_confirmation(
        &self,
        network: &NetworkConfig,
        tx_hash: &str,
    ) -> Result<TxReceipt, ChainError> {
        tokio::time::sleep(self.confirmation_delay).await;
        self.receipt_for(network, tx_hash)
    }

    async fn gas_price(&self, _network: &NetworkConfig) -> Result<u128, ChainError> {
        self.gas_price.clone()
    }

    async fn receipt(
        &self,
        network: &NetworkConfig,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>, ChainError> {
        if self.pending {
            return Ok(None);
        }
        self.receipt_for(network, &format!("{tx_hash:?}")).map(Some)
    }

    async fn block_number(&self, _network: &NetworkConfig) -> Result<u64, ChainError> {
        Ok(self.head_block)
    }

    async fn is_transfer_completed(
        &self,
        _network: &NetworkConfig,
        vaa_hash: B256,
    ) -> Result<bool, ChainError> {
        Ok(self.redeemed.contains(&vaa_hash))
    }
}

/// Attestation source that becomes ready after a number of pending polls.
pub struct MockAttestations {
    pending_polls: Option<usize>,
    last_key: Mutex<Option<(u16, String, u64)>>,
    pub calls: AtomicUsize,
}

impl MockAttestations {
    pub const VAA: &'static str = "AQAAAAMNAKm0c2lnbmVk";

    pub fn ready_after(pending_polls: usize) -> Self {
        Self {
            pending_polls: Some(pending_polls),
            last_key: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn never() -> Self {
        Self {
            pending_polls: None,
            last_key: Mutex::new(None),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn last_key(&self) -> Option<(u16, String, u64)> {
        self.last_key.lock().unwrap().clone()
    }
}

#[async_trait]
impl AttestationSource for MockAttestations {
    async fn fetch(
        &self,
        wormhole_chain_id: u16,
        tx_hash: &str,
        sequence: u64,
    ) -> Result<Option<String>, AttestationError> {
        let seen = self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_key.lock().unwrap() = Some((wormhole_chain_id, tx_hash.to_string(), sequence));
        match self.pending_polls {
            Some(pending) if seen >= pending => Ok(Some(Self::VAA.to_string())),
            _ => Ok(None),
        }
    }
}

/// Executor that fails with an attestation error right after step 1.
pub struct FlakyExecutor;

#[async_trait]
impl TransferExecutor for FlakyExecutor {
    fn mode(&self) -> ExecutionMode {
        ExecutionMode::Live
    }

    async fn execute(
        &self,
        _transfer: &ValidatedTransfer,
        ctx: &mut StepContext<'_>,
    ) -> Result<(), TransferError> {
        ctx.step(1, TransferState::Preparing, "Preparing transfer...");
        Err(TransferError::Attestation("guardian network unreachable".to_string()))
    }

    async fn approve(&self, _transfer: &ValidatedTransfer) -> Result<String, TransferError> {
        Err(TransferError::Attestation("unsupported".to_string()))
    }

    async fn allowance_status(
        &self,
        _transfer: &ValidatedTransfer,
    ) -> Result<AllowanceStatus, TransferError> {
        Err(TransferError::Attestation("unsupported".to_string()))
    }

    async fn quote(&self, transfer: &ValidatedTransfer) -> TransferQuote {
        TransferQuote {
            fee: "0".to_string(),
            fee_symbol: transfer.source().native_symbol.to_string(),
            estimated_minutes: 0,
            route: String::new(),
            mode: ExecutionMode::Live,
        }
    }

    async fn transaction_status(
        &self,
        _chain: Chain,
        _tx_hash: TxHash,
    ) -> Result<TransactionStatus, TransferError> {
        Err(TransferError::Attestation("unsupported".to_string()))
    }

    async fn is_transfer_completed(
        &self,
        _chain: Chain,
        _vaa_hash: B256,
    ) -> Result<bool, TransferError> {
        Err(TransferError::Attestation("unsupported".to_string()))
    }
}
