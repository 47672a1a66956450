// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup by [`Config::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `BALANCE_API_BASE_URL` | Upstream balance API | `https://lite-api.jup.ag/ultra/v1/balances` |
//! | `PRICE_API_BASE_URL` | Price API (`/price?ids=`) | Fallback table only |
//! | `ATTESTATION_API_BASE_URL` | Attestation API | `https://api.wormholescan.io` |
//! | `BRIDGE_MODE` | `simulated` or `live` | `simulated` |
//! | `BRIDGE_SIGNER_KEY` | Hex private key for live transfers | Required when live |
//! | `TRACKED_WALLETS` | `name=address,...` | None |
//! | `WALLET_REFRESH_INTERVAL_SECS` | Background refresh period, `0` disables | `0` |
//! | `BALANCE_MIN_INTERVAL_MS` | Spacing between balance requests | `1500` |
//! | `WITHDRAWABLE_SHARE` | Withdrawable share of wallet value | `0.7` |
//! | `<CHAIN>_RPC_URL` | RPC override per chain, e.g. `POLYGON_RPC_URL` | Public RPC |

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use rust_decimal::Decimal;

use crate::balances::{
    parse_tracked_wallets, AllocationSplit, TrackedWallet, DEFAULT_BALANCE_API_BASE_URL,
};
use crate::blockchain::Chain;
use crate::bridge::{ExecutionMode, DEFAULT_ATTESTATION_API_BASE_URL};
use crate::logging::LogFormat;

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const BALANCE_API_BASE_URL_ENV: &str = "BALANCE_API_BASE_URL";
pub const PRICE_API_BASE_URL_ENV: &str = "PRICE_API_BASE_URL";
pub const ATTESTATION_API_BASE_URL_ENV: &str = "ATTESTATION_API_BASE_URL";
pub const BRIDGE_MODE_ENV: &str = "BRIDGE_MODE";

/// Hex-encoded private key used to sign live bridge transactions.
///
/// Only read when `BRIDGE_MODE=live`. Never logged.
pub const BRIDGE_SIGNER_KEY_ENV: &str = "BRIDGE_SIGNER_KEY";

pub const TRACKED_WALLETS_ENV: &str = "TRACKED_WALLETS";
pub const WALLET_REFRESH_INTERVAL_SECS_ENV: &str = "WALLET_REFRESH_INTERVAL_SECS";
pub const BALANCE_MIN_INTERVAL_MS_ENV: &str = "BALANCE_MIN_INTERVAL_MS";
pub const WITHDRAWABLE_SHARE_ENV: &str = "WITHDRAWABLE_SHARE";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 8080;
const DEFAULT_BALANCE_MIN_INTERVAL_MS: u64 = 1500;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name} is invalid: {reason}")]
    Invalid { name: String, reason: String },

    #[error("{0} is required")]
    Missing(&'static str),
}

/// Signing key wrapper that keeps the key out of `Debug` output.
#[derive(Clone)]
pub struct SignerKey(String);

impl SignerKey {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SignerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SignerKey(<redacted>)")
    }
}

/// Fully resolved runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub balance_api_base_url: String,
    pub price_api_base_url: Option<String>,
    pub attestation_api_base_url: String,
    pub bridge_mode: ExecutionMode,
    pub bridge_signer_key: Option<SignerKey>,
    pub tracked_wallets: Vec<TrackedWallet>,
    pub wallet_refresh_interval: Option<Duration>,
    pub balance_min_interval: Duration,
    pub allocation: AllocationSplit,
    /// RPC URL overrides keyed by EVM chain id
    pub rpc_overrides: HashMap<u64, String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup. Values are trimmed and empty
    /// values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env_optional = |name: &str| -> Option<String> {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let env_or_default =
            |name: &str, default: &str| env_optional(name).unwrap_or_else(|| default.to_string());

        let port = match env_optional(PORT_ENV) {
            Some(raw) => parse_var(PORT_ENV, &raw)?,
            None => DEFAULT_PORT,
        };

        let log_format = match env_optional(LOG_FORMAT_ENV) {
            Some(raw) => parse_var(LOG_FORMAT_ENV, &raw)?,
            None => LogFormat::Pretty,
        };

        let bridge_mode = match env_optional(BRIDGE_MODE_ENV) {
            Some(raw) => parse_var(BRIDGE_MODE_ENV, &raw)?,
            None => ExecutionMode::Simulated,
        };

        let bridge_signer_key = env_optional(BRIDGE_SIGNER_KEY_ENV).map(SignerKey);
        if bridge_mode == ExecutionMode::Live && bridge_signer_key.is_none() {
            return Err(ConfigError::Missing(BRIDGE_SIGNER_KEY_ENV));
        }

        let wallet_refresh_interval = match env_optional(WALLET_REFRESH_INTERVAL_SECS_ENV) {
            Some(raw) => {
                let secs: u64 = parse_var(WALLET_REFRESH_INTERVAL_SECS_ENV, &raw)?;
                (secs > 0).then(|| Duration::from_secs(secs))
            }
            None => None,
        };

        let balance_min_interval = match env_optional(BALANCE_MIN_INTERVAL_MS_ENV) {
            Some(raw) => Duration::from_millis(parse_var(BALANCE_MIN_INTERVAL_MS_ENV, &raw)?),
            None => Duration::from_millis(DEFAULT_BALANCE_MIN_INTERVAL_MS),
        };

        let allocation = match env_optional(WITHDRAWABLE_SHARE_ENV) {
            Some(raw) => {
                let share: Decimal = parse_var(WITHDRAWABLE_SHARE_ENV, &raw)?;
                AllocationSplit::new(share).map_err(|reason| ConfigError::Invalid {
                    name: WITHDRAWABLE_SHARE_ENV.to_string(),
                    reason,
                })?
            }
            None => AllocationSplit::default(),
        };

        let mut rpc_overrides = HashMap::new();
        for chain in Chain::ALL {
            if let Some(url) = env_optional(chain.rpc_env_var()) {
                url::Url::parse(&url).map_err(|e| ConfigError::Invalid {
                    name: chain.rpc_env_var().to_string(),
                    reason: e.to_string(),
                })?;
                rpc_overrides.insert(chain.network().chain_id, url);
            }
        }

        Ok(Self {
            host: env_or_default(HOST_ENV, DEFAULT_HOST),
            port,
            log_format,
            balance_api_base_url: env_or_default(
                BALANCE_API_BASE_URL_ENV,
                DEFAULT_BALANCE_API_BASE_URL,
            ),
            price_api_base_url: env_optional(PRICE_API_BASE_URL_ENV),
            attestation_api_base_url: env_or_default(
                ATTESTATION_API_BASE_URL_ENV,
                DEFAULT_ATTESTATION_API_BASE_URL,
            ),
            bridge_mode,
            bridge_signer_key,
            tracked_wallets: env_optional(TRACKED_WALLETS_ENV)
                .map(|raw| parse_tracked_wallets(&raw))
                .unwrap_or_default(),
            wallet_refresh_interval,
            balance_min_interval,
            allocation,
            rpc_overrides,
        })
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_var<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: fmt::Display,
{
    raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
        name: name.to_string(),
        reason: e.to_string(),
    })
}
