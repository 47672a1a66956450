// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Conversion between human-readable token amounts and base units.

use alloy::primitives::U256;

use super::client::ChainError;

/// Parse a human-readable amount to the token's smallest unit.
///
/// # Arguments
/// * `amount` - Amount as a string (e.g., "1.5")
/// * `decimals` - Number of decimals (18 for WETH, 6 for USDC)
///
/// # Returns
/// * `Ok(U256)` - Amount in smallest unit
/// * `Err` - If the string is not a plain decimal or has more fractional
///   digits than `decimals`
pub fn parse_amount(amount: &str, decimals: u8) -> Result<U256, ChainError> {
    let amount = amount.trim();
    if amount.is_empty() {
        return Err(ChainError::InvalidAmount("Amount is empty".to_string()));
    }

    let parts: Vec<&str> = amount.split('.').collect();
    if parts.len() > 2 {
        return Err(ChainError::InvalidAmount(
            "Invalid amount format".to_string(),
        ));
    }

    let whole_str = if parts[0].is_empty() { "0" } else { parts[0] };
    if !whole_str.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ChainError::InvalidAmount("Invalid whole number".to_string()));
    }
    let whole = U256::from_str_radix(whole_str, 10)
        .map_err(|_| ChainError::InvalidAmount("Invalid whole number".to_string()))?;

    let decimal_part = if parts.len() == 2 {
        let dec_str = parts[1];
        if !dec_str.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ChainError::InvalidAmount("Invalid decimal".to_string()));
        }
        if dec_str.len() > decimals as usize {
            return Err(ChainError::InvalidAmount(format!(
                "Too many decimal places (max {})",
                decimals
            )));
        }
        // Pad with zeros to match decimals
        let padded = format!("{:0<width$}", dec_str, width = decimals as usize);
        if padded.is_empty() {
            U256::ZERO
        } else {
            U256::from_str_radix(&padded, 10)
                .map_err(|_| ChainError::InvalidAmount("Invalid decimal".to_string()))?
        }
    } else {
        U256::ZERO
    };

    let multiplier = U256::from(10u64).pow(U256::from(decimals));
    whole
        .checked_mul(multiplier)
        .and_then(|w| w.checked_add(decimal_part))
        .ok_or_else(|| ChainError::InvalidAmount("Amount overflow".to_string()))
}

/// Format base units to a human-readable amount.
pub fn format_amount(amount: U256, decimals: u8) -> String {
    if amount.is_zero() {
        return "0".to_string();
    }

    let divisor = U256::from(10u64).pow(U256::from(decimals));
    let whole = amount / divisor;
    let remainder = amount % divisor;

    if remainder.is_zero() {
        whole.to_string()
    } else {
        let decimal_str = format!("{:0>width$}", remainder, width = decimals as usize);
        let trimmed = decimal_str.trim_end_matches('0');
        if trimmed.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, trimmed)
        }
    }
}
