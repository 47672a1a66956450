// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Solidity bindings for the contracts the bridge flow touches.

use alloy::{
    primitives::{Address, FixedBytes, U256},
    sol,
    sol_types::SolEvent,
};

use super::client::{ChainError, ReceiptLog};

sol! {
    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address account) external view returns (uint256);
        function allowance(address owner, address spender) external view returns (uint256);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}

sol! {
    #[sol(rpc)]
    interface ITokenBridge {
        function transferTokens(
            address token,
            uint256 amount,
            uint16 recipientChain,
            bytes32 recipient,
            uint256 arbiterFee,
            uint32 nonce
        ) external payable returns (uint64 sequence);

        function isTransferCompleted(bytes32 hash) external view returns (bool);
    }
}

sol! {
    interface IWormholeCore {
        event LogMessagePublished(
            address indexed sender,
            uint64 sequence,
            uint32 nonce,
            bytes payload,
            uint8 consistencyLevel
        );
    }
}

/// Topic0 of the core bridge's `LogMessagePublished` event.
pub const LOG_MESSAGE_PUBLISHED_TOPIC: FixedBytes<32> =
    IWormholeCore::LogMessagePublished::SIGNATURE_HASH;

/// Left-pad a 20-byte EVM address into the bytes32 recipient format.
pub fn address_to_bytes32(address: Address) -> FixedBytes<32> {
    address.into_word()
}

/// Find the sequence number the core bridge assigned to a transfer.
///
/// The sequence is the first word of the `LogMessagePublished` data. When
/// `core_bridge` is given, logs emitted by other contracts are ignored.
pub fn parse_sequence(logs: &[ReceiptLog], core_bridge: Option<Address>) -> Result<u64, ChainError> {
    let log = logs
        .iter()
        .filter(|log| core_bridge.map(|addr| log.address == addr).unwrap_or(true))
        .find(|log| log.topics.first() == Some(&LOG_MESSAGE_PUBLISHED_TOPIC))
        .ok_or_else(|| {
            ChainError::Contract("receipt has no LogMessagePublished event".to_string())
        })?;

    if log.data.len() < 32 {
        return Err(ChainError::Contract(
            "LogMessagePublished data too short".to_string(),
        ));
    }

    let word = U256::from_be_slice(&log.data[..32]);
    u64::try_from(word)
        .map_err(|_| ChainError::Contract("sequence does not fit in u64".to_string()))
}
