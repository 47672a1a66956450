// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Balance and valuation types, plus the upstream wire formats.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// One upstream-reported holding of a tracked address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AddressBalance {
    /// Token mint (Solana) or contract id
    #[serde(alias = "mint", alias = "mintOrTokenId", alias = "tokenId")]
    pub mint_or_token_id: String,
    /// Amount in base units, as an integer string
    #[serde(alias = "rawAmount", alias = "amount")]
    pub raw_amount: String,
    /// Token decimals
    #[serde(default)]
    pub decimals: u8,
    /// Amount scaled by decimals
    #[serde(alias = "uiAmount")]
    pub ui_amount: f64,
    /// Frozen holdings are excluded from valuation
    #[serde(default, alias = "isFrozen")]
    pub frozen: bool,
}

/// USD valuation of a set of balances with the allocation split applied.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ValuationResult {
    pub total_value: Decimal,
    pub withdrawable_value: Decimal,
    pub deposit_value: Decimal,
}

/// Why a balance fetch degraded to an empty result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamFailure {
    #[error("rate limited after {attempts} attempts")]
    RateLimited { attempts: u32 },

    #[error("upstream returned HTTP {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("upstream error: {0}")]
    Upstream(String),
}

/// Accepted shapes of a balance response body.
///
/// Order matters for the untagged match: an `error` object wins, then the
/// list form, then the per-mint map returned by Jupiter Ultra.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum BalanceResponseBody {
    Error { error: String },
    List { balances: Vec<AddressBalance> },
    Keyed(HashMap<String, KeyedBalance>),
}

#[derive(Debug, Deserialize)]
pub(crate) struct KeyedBalance {
    amount: String,
    #[serde(rename = "uiAmount")]
    ui_amount: f64,
    #[serde(rename = "isFrozen", default)]
    is_frozen: bool,
}

impl BalanceResponseBody {
    pub(crate) fn into_balances(self) -> Result<Vec<AddressBalance>, UpstreamFailure> {
        match self {
            BalanceResponseBody::Error { error } => Err(UpstreamFailure::Upstream(error)),
            BalanceResponseBody::List { balances } => Ok(balances),
            BalanceResponseBody::Keyed(map) => {
                let mut balances: Vec<AddressBalance> = map
                    .into_iter()
                    .map(|(mint, entry)| AddressBalance {
                        decimals: infer_decimals(&entry.amount, entry.ui_amount),
                        mint_or_token_id: mint,
                        raw_amount: entry.amount,
                        ui_amount: entry.ui_amount,
                        frozen: entry.is_frozen,
                    })
                    .collect();
                balances.sort_by(|a, b| a.mint_or_token_id.cmp(&b.mint_or_token_id));
                Ok(balances)
            }
        }
    }
}

/// Recover token decimals from a raw amount and its scaled value.
fn infer_decimals(raw_amount: &str, ui_amount: f64) -> u8 {
    let Ok(raw) = raw_amount.trim().parse::<f64>() else {
        return 0;
    };
    if ui_amount <= 0.0 || raw <= 0.0 {
        return 0;
    }
    let ratio = raw / ui_amount;
    if ratio < 1.0 {
        return 0;
    }
    ratio.log10().round().clamp(0.0, 36.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(body: &str) -> Result<Vec<AddressBalance>, UpstreamFailure> {
        serde_json::from_str::<BalanceResponseBody>(body)
            .map_err(|e| UpstreamFailure::Malformed(e.to_string()))?
            .into_balances()
    }

    #[test]
    fn list_form_accepts_camel_case_keys() {
        let body = r#"{"balances":[{"mint":"EPjF","rawAmount":"2500000","decimals":6,"uiAmount":2.5,"isFrozen":false}]}"#;
        let balances = parse(body).unwrap();
        assert_eq!(balances.len(), 1);
        assert_eq!(balances[0].mint_or_token_id, "EPjF");
        assert_eq!(balances[0].decimals, 6);
        assert_eq!(balances[0].ui_amount, 2.5);
    }

    #[test]
    fn keyed_form_infers_decimals() {
        let body = r#"{
            "So11111111111111111111111111111111111111112": {"amount":"1500000000","uiAmount":1.5,"slot":1,"isFrozen":false},
            "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v": {"amount":"10000000","uiAmount":10.0,"slot":1,"isFrozen":true}
        }"#;
        let balances = parse(body).unwrap();
        assert_eq!(balances.len(), 2);
        let usdc = &balances[0];
        assert_eq!(usdc.mint_or_token_id, "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v");
        assert_eq!(usdc.decimals, 6);
        assert!(usdc.frozen);
        assert_eq!(balances[1].decimals, 9);
    }

    #[test]
    fn error_body_is_an_upstream_failure() {
        let err = parse(r#"{"error":"invalid address"}"#).unwrap_err();
        assert_eq!(err, UpstreamFailure::Upstream("invalid address".to_string()));
    }

    #[test]
    fn empty_object_is_no_balances() {
        assert!(parse("{}").unwrap().is_empty());
    }

    #[test]
    fn zero_amount_has_unknown_decimals() {
        assert_eq!(infer_decimals("0", 0.0), 0);
        assert_eq!(infer_decimals("garbage", 1.0), 0);
    }
}
