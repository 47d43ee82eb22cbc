//! Token amount conversion between decimal strings and smallest units.
//!
//! Amounts enter the system as human-readable decimal strings ("1.5") and are
//! converted once, exactly, into the token's smallest unit. Everything past this
//! boundary works on `U256`; floating point is never involved.

use alloy_primitives::U256;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;

/// Decimal scale of the bridged stablecoin.
pub const TOKEN_DECIMALS: u32 = 6;

/// Errors produced while parsing a decimal token amount.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AmountError {
	/// The input is not a decimal number.
	#[error("Invalid amount '{0}': expected a decimal number")]
	NotNumeric(String),
	/// The input is zero or negative.
	#[error("Invalid amount '{0}': must be greater than zero")]
	NonPositive(String),
	/// The input has more fractional digits than the token supports.
	#[error("Invalid amount '{input}': at most {decimals} decimal places are supported")]
	TooPrecise { input: String, decimals: u32 },
	/// The scaled amount does not fit the supported range.
	#[error("Invalid amount '{0}': value out of range")]
	Overflow(String),
}

/// Parses a decimal string into the token's smallest unit.
///
/// `"1.0"` with 6 decimals becomes `1_000_000`, `"0.2"` becomes `200_000`.
/// Inputs with more fractional digits than `decimals` are rejected rather than
/// rounded, so the debited amount is always exactly what the caller typed.
pub fn parse_token_amount(input: &str, decimals: u32) -> Result<U256, AmountError> {
	let trimmed = input.trim();
	let value = Decimal::from_str_exact(trimmed)
		.map_err(|_| AmountError::NotNumeric(input.to_string()))?;

	if value <= Decimal::ZERO {
		return Err(AmountError::NonPositive(input.to_string()));
	}

	// "1.500000000" is still exactly representable at 6 decimals
	let value = value.normalize();
	if value.scale() > decimals {
		return Err(AmountError::TooPrecise {
			input: input.to_string(),
			decimals,
		});
	}

	let multiplier = 10u64
		.checked_pow(decimals)
		.map(Decimal::from)
		.ok_or_else(|| AmountError::Overflow(input.to_string()))?;
	let units = value
		.checked_mul(multiplier)
		.and_then(|scaled| scaled.trunc().to_u128())
		.ok_or_else(|| AmountError::Overflow(input.to_string()))?;

	Ok(U256::from(units))
}

/// Formats a smallest-unit amount with decimal places for display.
///
/// Trailing fractional zeros are dropped, so `1_500_000` at 6 decimals is "1.5"
/// and `1_000_000` is "1".
pub fn format_token_amount(amount: U256, decimals: u32) -> String {
	let amount = amount.to_string();
	if decimals == 0 {
		return amount;
	}

	let decimal_places = decimals as usize;

	let (integer_part, decimal_part) = if amount.len() <= decimal_places {
		let decimal_str = format!("{:0>width$}", amount, width = decimal_places);
		("0".to_string(), decimal_str)
	} else {
		let split_pos = amount.len() - decimal_places;
		(
			amount[..split_pos].to_string(),
			amount[split_pos..].to_string(),
		)
	};

	let decimal_trimmed = decimal_part.trim_end_matches('0');

	if decimal_trimmed.is_empty() {
		integer_part
	} else {
		format!("{}.{}", integer_part, decimal_trimmed)
	}
}
