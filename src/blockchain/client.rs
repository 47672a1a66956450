// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Chain transaction interface used by the live bridge flow.
//!
//! [`BridgeChain`] is the signing/transaction capability the transfer flow
//! depends on. [`EvmBridgeChain`] implements it over alloy HTTP providers with
//! a local private-key signer; tests substitute their own implementation.

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use alloy::{
    network::{Ethereum, EthereumWallet},
    primitives::{Address, Bytes, FixedBytes, TxHash, U256},
    providers::{
        fillers::{
            BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller,
            WalletFiller,
        },
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{TransactionReceipt, TransactionRequest},
    signers::local::PrivateKeySigner,
    sol_types::SolCall,
};
use async_trait::async_trait;

use super::contracts::{ITokenBridge, IERC20};
use super::types::{Erc20Token, NetworkConfig};

/// Default upper bound on waiting for a receipt.
const DEFAULT_CONFIRMATION_TIMEOUT: Duration = Duration::from_secs(300);

/// Default interval between receipt polls.
const DEFAULT_CONFIRMATION_POLL: Duration = Duration::from_secs(3);

/// HTTP provider with the recommended fillers plus a signing wallet.
type SigningProvider = FillProvider<
    JoinFill<
        JoinFill<
            Identity,
            JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
        >,
        WalletFiller<EthereumWallet>,
    >,
    RootProvider<Ethereum>,
>;

/// One log entry of a confirmed transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptLog {
    pub address: Address,
    pub topics: Vec<FixedBytes<32>>,
    pub data: Bytes,
}

/// Transaction receipt after confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxReceipt {
    /// Transaction hash
    pub tx_hash: String,
    /// Block number where transaction was included
    pub block_number: u64,
    /// Gas actually used
    pub gas_used: u64,
    /// Whether the transaction was successful
    pub success: bool,
    /// Logs emitted by the transaction
    pub logs: Vec<ReceiptLog>,
}

/// Arguments of the token bridge `transferTokens` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeTransferParams {
    pub token: Address,
    pub amount: U256,
    pub recipient_chain: u16,
    pub recipient: FixedBytes<32>,
    pub arbiter_fee: U256,
    pub nonce: u32,
}

/// Signing and transaction capability for one EVM account.
///
/// Every method takes the network it should act on, so one implementation
/// can serve transfers from any supported source chain.
#[async_trait]
pub trait BridgeChain: Send + Sync {
    /// Address transactions are signed from.
    fn signer_address(&self) -> Address;

    /// ERC-20 balance of `owner`, in base units.
    async fn token_balance(
        &self,
        network: &NetworkConfig,
        token: &Erc20Token,
        owner: Address,
    ) -> Result<U256, ChainError>;

    /// ERC-20 allowance granted by `owner` to `spender`, in base units.
    async fn allowance(
        &self,
        network: &NetworkConfig,
        token: &Erc20Token,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError>;

    /// Broadcast `approve(spender, amount)` and return the transaction hash.
    async fn approve(
        &self,
        network: &NetworkConfig,
        token: &Erc20Token,
        spender: Address,
        amount: U256,
    ) -> Result<String, ChainError>;

    /// Broadcast the token bridge transfer and return the transaction hash.
    async fn submit_transfer(
        &self,
        network: &NetworkConfig,
        params: &BridgeTransferParams,
    ) -> Result<String, ChainError>;

    /// Wait until `tx_hash` is mined and return its receipt.
    async fn wait_for_confirmation(
        &self,
        network: &NetworkConfig,
        tx_hash: &str,
    ) -> Result<TxReceipt, ChainError>;

    /// Current gas price in wei.
    async fn gas_price(&self, network: &NetworkConfig) -> Result<u128, ChainError>;

    /// Receipt of `tx_hash`, or `None` while it is not yet mined.
    async fn receipt(
        &self,
        network: &NetworkConfig,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>, ChainError>;

    /// Latest block number.
    async fn block_number(&self, network: &NetworkConfig) -> Result<u64, ChainError>;

    /// Whether the token bridge on `network` already redeemed the transfer
    /// whose signed message hashes to `vaa_hash`.
    async fn is_transfer_completed(
        &self,
        network: &NetworkConfig,
        vaa_hash: FixedBytes<32>,
    ) -> Result<bool, ChainError>;
}

/// alloy-backed [`BridgeChain`] signing with a local private key.
pub struct EvmBridgeChain {
    wallet: EthereumWallet,
    signer_address: Address,
    /// RPC URL overrides keyed by EVM chain id
    rpc_overrides: HashMap<u64, String>,
    confirmation_timeout: Duration,
    confirmation_poll: Duration,
}

impl EvmBridgeChain {
    /// Create a chain client from a hex private key (with or without `0x`).
    pub fn from_private_key(
        private_key_hex: &str,
        rpc_overrides: HashMap<u64, String>,
    ) -> Result<Self, ChainError> {
        let signer = create_signer(private_key_hex)?;
        let signer_address = signer.address();

        Ok(Self {
            wallet: EthereumWallet::from(signer),
            signer_address,
            rpc_overrides,
            confirmation_timeout: DEFAULT_CONFIRMATION_TIMEOUT,
            confirmation_poll: DEFAULT_CONFIRMATION_POLL,
        })
    }

    pub fn with_confirmation_timeout(mut self, timeout: Duration) -> Self {
        self.confirmation_timeout = timeout;
        self
    }

    fn rpc_url<'a>(&'a self, network: &'a NetworkConfig) -> &'a str {
        self.rpc_overrides
            .get(&network.chain_id)
            .map(String::as_str)
            .unwrap_or(network.rpc_url)
    }

    fn provider(&self, network: &NetworkConfig) -> Result<SigningProvider, ChainError> {
        let url: url::Url = self
            .rpc_url(network)
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        Ok(ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .connect_http(url))
    }

    async fn send_transaction(
        &self,
        provider: &SigningProvider,
        tx: TransactionRequest,
    ) -> Result<String, ChainError> {
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::TransactionFailed(format!("Failed to send: {}", e)))?;

        Ok(format!("{:?}", pending.tx_hash()))
    }
}

#[async_trait]
impl BridgeChain for EvmBridgeChain {
    fn signer_address(&self) -> Address {
        self.signer_address
    }

    async fn token_balance(
        &self,
        network: &NetworkConfig,
        token: &Erc20Token,
        owner: Address,
    ) -> Result<U256, ChainError> {
        let provider = self.provider(network)?;
        let contract = IERC20::new(parse_address(token.address)?, provider);

        contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }

    async fn allowance(
        &self,
        network: &NetworkConfig,
        token: &Erc20Token,
        owner: Address,
        spender: Address,
    ) -> Result<U256, ChainError> {
        let provider = self.provider(network)?;
        let contract = IERC20::new(parse_address(token.address)?, provider);

        contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }

    async fn approve(
        &self,
        network: &NetworkConfig,
        token: &Erc20Token,
        spender: Address,
        amount: U256,
    ) -> Result<String, ChainError> {
        let provider = self.provider(network)?;

        let call = IERC20::approveCall { spender, amount };
        let tx = TransactionRequest::default()
            .from(self.signer_address)
            .to(parse_address(token.address)?)
            .input(call.abi_encode().into());

        let tx_hash = self.send_transaction(&provider, tx).await?;
        tracing::info!(
            network = %network.name,
            token = %token.symbol,
            tx_hash = %tx_hash,
            "Approval submitted"
        );

        let receipt = self.wait_for_confirmation(network, &tx_hash).await?;
        if !receipt.success {
            return Err(ChainError::TransactionFailed(format!(
                "approval {tx_hash} reverted"
            )));
        }

        Ok(tx_hash)
    }

    async fn submit_transfer(
        &self,
        network: &NetworkConfig,
        params: &BridgeTransferParams,
    ) -> Result<String, ChainError> {
        let provider = self.provider(network)?;

        let call = ITokenBridge::transferTokensCall {
            token: params.token,
            amount: params.amount,
            recipientChain: params.recipient_chain,
            recipient: params.recipient,
            arbiterFee: params.arbiter_fee,
            nonce: params.nonce,
        };
        let tx = TransactionRequest::default()
            .from(self.signer_address)
            .to(parse_address(network.token_bridge)?)
            .input(call.abi_encode().into());

        self.send_transaction(&provider, tx).await
    }

    async fn wait_for_confirmation(
        &self,
        network: &NetworkConfig,
        tx_hash: &str,
    ) -> Result<TxReceipt, ChainError> {
        let hash = parse_tx_hash(tx_hash)?;

        let deadline = tokio::time::Instant::now() + self.confirmation_timeout;
        loop {
            if let Some(receipt) = self.receipt(network, hash).await? {
                return Ok(receipt);
            }

            if tokio::time::Instant::now() >= deadline {
                return Err(ChainError::ConfirmationTimeout(tx_hash.to_string()));
            }
            tokio::time::sleep(self.confirmation_poll).await;
        }
    }

    async fn gas_price(&self, network: &NetworkConfig) -> Result<u128, ChainError> {
        let provider = self.provider(network)?;
        provider
            .get_gas_price()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn receipt(
        &self,
        network: &NetworkConfig,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>, ChainError> {
        let provider = self.provider(network)?;
        let receipt = provider
            .get_transaction_receipt(tx_hash)
            .await
            .map_err(|e| ChainError::Rpc(format!("Failed to get receipt: {}", e)))?;

        Ok(receipt.map(|r| convert_receipt(&format!("{tx_hash:?}"), &r)))
    }

    async fn block_number(&self, network: &NetworkConfig) -> Result<u64, ChainError> {
        let provider = self.provider(network)?;
        provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn is_transfer_completed(
        &self,
        network: &NetworkConfig,
        vaa_hash: FixedBytes<32>,
    ) -> Result<bool, ChainError> {
        let provider = self.provider(network)?;
        let bridge = ITokenBridge::new(parse_address(network.token_bridge)?, provider);

        bridge
            .isTransferCompleted(vaa_hash)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))
    }
}

fn convert_receipt(tx_hash: &str, receipt: &TransactionReceipt) -> TxReceipt {
    let logs = receipt
        .inner
        .logs()
        .iter()
        .map(|log| ReceiptLog {
            address: log.address(),
            topics: log.topics().to_vec(),
            data: log.data().data.clone(),
        })
        .collect();

    TxReceipt {
        tx_hash: tx_hash.to_string(),
        block_number: receipt.block_number.unwrap_or(0),
        gas_used: receipt.gas_used as u64,
        success: receipt.status(),
        logs,
    }
}

/// Create a signer from a hex-encoded private key.
pub fn create_signer(private_key_hex: &str) -> Result<PrivateKeySigner, ChainError> {
    let trimmed = private_key_hex.trim();
    let stripped = trimmed.strip_prefix("0x").unwrap_or(trimmed);
    let key_bytes = alloy::hex::decode(stripped)
        .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))?;

    PrivateKeySigner::from_slice(&key_bytes)
        .map_err(|e| ChainError::InvalidPrivateKey(e.to_string()))
}

/// Parse a `0x`-prefixed 32-byte transaction hash.
pub fn parse_tx_hash(tx_hash: &str) -> Result<TxHash, ChainError> {
    TxHash::from_str(tx_hash.trim())
        .map_err(|e| ChainError::InvalidAddress(format!("Invalid tx hash: {}", e)))
}

/// Parse and checksum-normalise an EVM address.
pub fn parse_address(address: &str) -> Result<Address, ChainError> {
    Address::from_str(address.trim()).map_err(|e| ChainError::InvalidAddress(e.to_string()))
}

/// Errors that can occur during blockchain operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Timed out waiting for confirmation of {0}")]
    ConfirmationTimeout(String),
}
