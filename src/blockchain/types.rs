// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Bridge network and token registry.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// EVM chains the bridge modal can move stablecoins between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Chain {
    Ethereum,
    Polygon,
    Bsc,
    Arbitrum,
    Avalanche,
    Optimism,
}

impl Chain {
    pub const ALL: [Chain; 6] = [
        Chain::Ethereum,
        Chain::Polygon,
        Chain::Bsc,
        Chain::Arbitrum,
        Chain::Avalanche,
        Chain::Optimism,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ethereum",
            Chain::Polygon => "polygon",
            Chain::Bsc => "bsc",
            Chain::Arbitrum => "arbitrum",
            Chain::Avalanche => "avalanche",
            Chain::Optimism => "optimism",
        }
    }

    /// Static network configuration for this chain.
    pub fn network(&self) -> &'static NetworkConfig {
        match self {
            Chain::Ethereum => &ETHEREUM,
            Chain::Polygon => &POLYGON,
            Chain::Bsc => &BSC,
            Chain::Arbitrum => &ARBITRUM,
            Chain::Avalanche => &AVALANCHE,
            Chain::Optimism => &OPTIMISM,
        }
    }

    /// Environment variable that overrides the default RPC endpoint.
    pub fn rpc_env_var(&self) -> &'static str {
        match self {
            Chain::Ethereum => "ETHEREUM_RPC_URL",
            Chain::Polygon => "POLYGON_RPC_URL",
            Chain::Bsc => "BSC_RPC_URL",
            Chain::Arbitrum => "ARBITRUM_RPC_URL",
            Chain::Avalanche => "AVALANCHE_RPC_URL",
            Chain::Optimism => "OPTIMISM_RPC_URL",
        }
    }

    /// Tokens the bridge supports on this chain.
    pub fn tokens(&self) -> &'static [Erc20Token] {
        match self {
            Chain::Ethereum => ETHEREUM_TOKENS,
            Chain::Polygon => POLYGON_TOKENS,
            Chain::Bsc => BSC_TOKENS,
            Chain::Arbitrum => ARBITRUM_TOKENS,
            Chain::Avalanche => AVALANCHE_TOKENS,
            Chain::Optimism => OPTIMISM_TOKENS,
        }
    }

    /// Look up a token by symbol (case-insensitive).
    pub fn token(&self, symbol: &str) -> Option<&'static Erc20Token> {
        let wanted = symbol.trim();
        self.tokens()
            .iter()
            .find(|t| t.symbol.eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        Chain::ALL
            .into_iter()
            .find(|c| c.as_str() == value)
            .ok_or_else(|| format!("Unsupported chain `{value}`"))
    }
}

/// Per-chain network configuration.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Network name for display
    pub name: &'static str,
    /// EVM chain ID
    pub chain_id: u64,
    /// Wormhole chain ID (u16 on the wire)
    pub wormhole_chain_id: u16,
    /// Default RPC endpoint URL
    pub rpc_url: &'static str,
    /// Wormhole token bridge contract
    pub token_bridge: &'static str,
    /// Wormhole core bridge contract (emits `LogMessagePublished`)
    pub core_bridge: &'static str,
    /// Block explorer URL
    pub explorer_url: &'static str,
    /// Native gas token symbol
    pub native_symbol: &'static str,
}

impl NetworkConfig {
    pub fn tx_url(&self, tx_hash: &str) -> String {
        format!("{}/tx/{}", self.explorer_url, tx_hash)
    }
}

pub const ETHEREUM: NetworkConfig = NetworkConfig {
    name: "Ethereum",
    chain_id: 1,
    wormhole_chain_id: 2,
    rpc_url: "https://eth.llamarpc.com",
    token_bridge: "0x3ee18B2214AFF97000D974cf647E7C347E8fa585",
    core_bridge: "0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B",
    explorer_url: "https://etherscan.io",
    native_symbol: "ETH",
};

pub const POLYGON: NetworkConfig = NetworkConfig {
    name: "Polygon",
    chain_id: 137,
    wormhole_chain_id: 5,
    rpc_url: "https://polygon.llamarpc.com",
    token_bridge: "0x5a58505a96D1dbf8dF91cB21B54419FC36e93fdE",
    core_bridge: "0x7A4B5a56256163F07b2C80A7cA55aBE66c4ec4d7",
    explorer_url: "https://polygonscan.com",
    native_symbol: "MATIC",
};

pub const BSC: NetworkConfig = NetworkConfig {
    name: "BNB Smart Chain",
    chain_id: 56,
    wormhole_chain_id: 4,
    rpc_url: "https://bsc.llamarpc.com",
    token_bridge: "0xB6F6D86a8f9879A9c87f643768d9efc38c1Da6E7",
    core_bridge: "0x98f3c9e6E3fAce36bAAd05FE09d375Ef1464288B",
    explorer_url: "https://bscscan.com",
    native_symbol: "BNB",
};

pub const ARBITRUM: NetworkConfig = NetworkConfig {
    name: "Arbitrum One",
    chain_id: 42161,
    wormhole_chain_id: 23,
    rpc_url: "https://arb1.arbitrum.io/rpc",
    token_bridge: "0x0b2402144Bb366A632D14B83F244D2e0e21bD39c",
    core_bridge: "0xa5f208e072434bC67592E4C49C1B991BA79BCA46",
    explorer_url: "https://arbiscan.io",
    native_symbol: "ETH",
};

pub const AVALANCHE: NetworkConfig = NetworkConfig {
    name: "Avalanche C-Chain",
    chain_id: 43114,
    wormhole_chain_id: 6,
    rpc_url: "https://api.avax.network/ext/bc/C/rpc",
    token_bridge: "0x0e082F06FF657D94310cB8cE8B0D9a04541d8052",
    core_bridge: "0x54a8e5f9c4CbA08F9943965859F6c34eAF03E26c",
    explorer_url: "https://snowtrace.io",
    native_symbol: "AVAX",
};

pub const OPTIMISM: NetworkConfig = NetworkConfig {
    name: "Optimism",
    chain_id: 10,
    wormhole_chain_id: 24,
    rpc_url: "https://mainnet.optimism.io",
    token_bridge: "0x1D68124e65faFC907325e3EDbF8c4d84499DAa8b",
    core_bridge: "0xEe91C335eab126dF5fDB3797EA9d6aD93aeC9722",
    explorer_url: "https://optimistic.etherscan.io",
    native_symbol: "ETH",
};

/// Bridgeable ERC-20 token on one chain.
#[derive(Debug, Clone)]
pub struct Erc20Token {
    pub symbol: &'static str,
    pub name: &'static str,
    pub decimals: u8,
    /// Contract address on the chain this entry is listed under
    pub address: &'static str,
}

const fn token(
    symbol: &'static str,
    name: &'static str,
    address: &'static str,
    decimals: u8,
) -> Erc20Token {
    Erc20Token {
        symbol,
        name,
        decimals,
        address,
    }
}

const ETHEREUM_TOKENS: &[Erc20Token] = &[
    token("USDC", "USD Coin", "0xA0b86991c6218b36c1d19D4a2e9Eb0cE3606eB48", 6),
    token("USDT", "Tether USD", "0xdAC17F958D2ee523a2206206994597C13D831ec7", 6),
    token("WETH", "Wrapped Ether", "0xC02aaA39b223FE8D0A0e5C4F27eAD9083C756Cc2", 18),
];

const POLYGON_TOKENS: &[Erc20Token] = &[
    token("USDC", "USD Coin", "0x2791Bca1f2de4661ED88A30C99A7a9449Aa84174", 6),
    token("USDT", "Tether USD", "0xc2132D05D31c914a87C6611C10748AEb04B58e8F", 6),
    token("WETH", "Wrapped Ether", "0x7ceB23fD6bC0adD59E62ac25578270cFf1b9f619", 18),
];

// Binance-peg stablecoins use 18 decimals.
const BSC_TOKENS: &[Erc20Token] = &[
    token("USDC", "USD Coin", "0x8AC76a51cc950d9822D68b83fE1Ad97B32Cd580d", 18),
    token("USDT", "Tether USD", "0x55d398326f99059fF775485246999027B3197955", 18),
    token("WETH", "Wrapped Ether", "0x2170Ed0880ac9A755fd29B2688956BD959F933F8", 18),
];

const ARBITRUM_TOKENS: &[Erc20Token] = &[
    token("USDC", "USD Coin", "0xaf88d065e77c8cC2239327C5EDb3A432268e5831", 6),
    token("USDT", "Tether USD", "0xFd086bC7CD5C481DCC9C85ebE478A1C0b69FCbb9", 6),
    token("WETH", "Wrapped Ether", "0x82aF49447D8a07e3bd95BD0d56f35241523fBab1", 18),
];

const AVALANCHE_TOKENS: &[Erc20Token] = &[
    token("USDC", "USD Coin", "0xB97EF9Ef8734C71904D8002F8b6Bc66Dd9c48a6E", 6),
    token("USDT", "Tether USD", "0x9702230A8Ea53601f5cD2dc00fDBc13d4dF4A8c7", 6),
    token("WETH", "Wrapped Ether", "0x49D5c2BdFfac6CE2BFdB6640F4F80f226bc10bAB", 18),
];

const OPTIMISM_TOKENS: &[Erc20Token] = &[
    token("USDC", "USD Coin", "0x0b2C639c533813f4Aa9D7837CAf62653d097Ff85", 6),
    token("USDT", "Tether USD", "0x94b008aA00579c1307B0EF2c499aD98a8ce58e58", 6),
    token("WETH", "Wrapped Ether", "0x4200000000000000000000000000000000000006", 18),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wormhole_chain_ids_match_registry() {
        assert_eq!(Chain::Ethereum.network().wormhole_chain_id, 2);
        assert_eq!(Chain::Bsc.network().wormhole_chain_id, 4);
        assert_eq!(Chain::Polygon.network().wormhole_chain_id, 5);
        assert_eq!(Chain::Avalanche.network().wormhole_chain_id, 6);
        assert_eq!(Chain::Arbitrum.network().wormhole_chain_id, 23);
        assert_eq!(Chain::Optimism.network().wormhole_chain_id, 24);
    }

    #[test]
    fn chain_parses_case_insensitively() {
        assert_eq!("Polygon".parse::<Chain>().unwrap(), Chain::Polygon);
        assert_eq!(" bsc ".parse::<Chain>().unwrap(), Chain::Bsc);
        assert!("solana".parse::<Chain>().is_err());
    }

    #[test]
    fn token_lookup_is_case_insensitive() {
        let usdc = Chain::Ethereum.token("usdc").unwrap();
        assert_eq!(usdc.decimals, 6);
        assert_eq!(Chain::Bsc.token("USDC").unwrap().decimals, 18);
        assert!(Chain::Optimism.token("DAI").is_none());
    }

    #[test]
    fn every_chain_lists_the_same_symbols() {
        for chain in Chain::ALL {
            let symbols: Vec<_> = chain.tokens().iter().map(|t| t.symbol).collect();
            assert_eq!(symbols, vec!["USDC", "USDT", "WETH"], "{chain}");
        }
    }

    #[test]
    fn serde_uses_lowercase_names() {
        let json = serde_json::to_string(&Chain::Arbitrum).unwrap();
        assert_eq!(json, "\"arbitrum\"");
        let parsed: Chain = serde_json::from_str("\"avalanche\"").unwrap();
        assert_eq!(parsed, Chain::Avalanche);
    }
}
