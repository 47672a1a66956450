// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! USD valuation of balances and the withdrawable/deposit split.

use std::collections::HashMap;

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use super::types::{AddressBalance, ValuationResult};

/// Share of a wallet's value treated as withdrawable; the rest is deposit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationSplit {
    withdrawable_share: Decimal,
}

impl AllocationSplit {
    /// `share` must lie in `[0, 1]`.
    pub fn new(share: Decimal) -> Result<Self, String> {
        if share < Decimal::ZERO || share > Decimal::ONE {
            return Err(format!("withdrawable share must be between 0 and 1, got {share}"));
        }
        Ok(Self {
            withdrawable_share: share,
        })
    }

    pub fn withdrawable_share(&self) -> Decimal {
        self.withdrawable_share
    }

    pub fn deposit_share(&self) -> Decimal {
        Decimal::ONE - self.withdrawable_share
    }
}

impl Default for AllocationSplit {
    fn default() -> Self {
        Self {
            withdrawable_share: Decimal::new(7, 1),
        }
    }
}

/// Value non-frozen balances at `prices` and split the total.
///
/// Tokens absent from `prices` contribute nothing. An entry whose value
/// would overflow the running total is skipped with a warning.
pub fn valuate(
    balances: &[AddressBalance],
    prices: &HashMap<String, Decimal>,
    split: AllocationSplit,
) -> ValuationResult {
    let mut total_value = Decimal::ZERO;

    for balance in balances.iter().filter(|b| !b.frozen) {
        let Some(price) = prices.get(&balance.mint_or_token_id) else {
            continue;
        };
        let Some(amount) = Decimal::from_f64(balance.ui_amount) else {
            continue;
        };

        match amount
            .checked_mul(*price)
            .and_then(|value| total_value.checked_add(value))
        {
            Some(sum) => total_value = sum,
            None => warn!(
                token = %balance.mint_or_token_id,
                ui_amount = balance.ui_amount,
                price = %price,
                "Balance value overflows, excluded from valuation"
            ),
        }
    }

    // share <= 1, so the product never exceeds the total
    let withdrawable_value = total_value
        .checked_mul(split.withdrawable_share())
        .unwrap_or(total_value);

    ValuationResult {
        total_value,
        withdrawable_value,
        deposit_value: total_value - withdrawable_value,
    }
}

/// Render a USD amount as `$1,234.56`.
pub fn format_usd(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let text = format!("{:.2}", rounded.abs());
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{sign}${grouped}.{fraction}")
}
