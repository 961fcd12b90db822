//! Parsing utilities
//!
//! Remote nodes return numeric fields as JSON numbers, decimal strings or `0x`-prefixed hex
//! strings. The helpers here accept all three and produce one canonical value: `u64` for
//! heights, nonces and counters, a decimal string for amounts, unix seconds for timestamps.

use std::str::FromStr;

use alloy_primitives::U256;
use chrono::DateTime;
use serde_json::{Number, Value};

/// Largest integer a JSON float carries without rounding (2^53)
const MAX_EXACT_FLOAT: f64 = 9_007_199_254_740_992.0;

fn strip_hex_prefix(s: &str) -> Option<&str> {
	s.strip_prefix("0x").or_else(|| s.strip_prefix("0X"))
}

fn number_to_u64(number: &Number) -> Result<u64, String> {
	if let Some(n) = number.as_u64() {
		return Ok(n);
	}
	match number.as_f64() {
		Some(f) if f >= 0.0 && f.fract() == 0.0 && f <= MAX_EXACT_FLOAT => Ok(f as u64),
		_ => Err(format!("'{}' is not an unsigned 64-bit integer", number)),
	}
}

/// Parses a number, decimal string or hex string into a `u64`
pub fn parse_u64_str(s: &str) -> Result<u64, String> {
	let s = s.trim();
	if let Some(hex) = strip_hex_prefix(s) {
		if hex.is_empty() {
			return Err(format!("'{}' is an empty hex string", s));
		}
		return u64::from_str_radix(hex, 16)
			.map_err(|e| format!("Invalid hex integer '{}': {}", s, e));
	}
	if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
		return Err(format!("'{}' is not an unsigned integer", s));
	}
	s.parse::<u64>()
		.map_err(|e| format!("Invalid integer '{}': {}", s, e))
}

/// Parses a JSON value holding a number, decimal string or hex string into a `u64`
pub fn parse_u64(value: &Value) -> Result<u64, String> {
	match value {
		Value::Number(number) => number_to_u64(number),
		Value::String(s) => parse_u64_str(s),
		other => Err(format!("Expected an integer, got {}", other)),
	}
}

/// Parses an amount into its canonical decimal string
///
/// Decimal strings of any length are kept as they are, minus leading zeros. Hex strings are
/// converted through a 256-bit integer.
pub fn parse_amount_str(s: &str) -> Result<String, String> {
	let s = s.trim();
	if let Some(hex) = strip_hex_prefix(s) {
		if hex.is_empty() {
			return Err(format!("'{}' is an empty hex string", s));
		}
		return U256::from_str_radix(hex, 16)
			.map(|n| n.to_string())
			.map_err(|e| format!("Invalid hex amount '{}': {}", s, e));
	}
	if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
		return Err(format!("'{}' is not a decimal amount", s));
	}
	let trimmed = s.trim_start_matches('0');
	Ok(if trimmed.is_empty() {
		"0".to_string()
	} else {
		trimmed.to_string()
	})
}

/// Parses a JSON value holding an amount into its canonical decimal string
pub fn parse_amount(value: &Value) -> Result<String, String> {
	match value {
		Value::Number(number) => number_to_u64(number).map(|n| n.to_string()),
		Value::String(s) => parse_amount_str(s),
		other => Err(format!("Expected an amount, got {}", other)),
	}
}

/// Parses a timestamp into unix seconds
///
/// Accepts RFC 3339 strings, and unix seconds as number, decimal string or hex string.
pub fn parse_timestamp(value: &Value) -> Result<u64, String> {
	match value {
		Value::String(s) => {
			if let Ok(datetime) = DateTime::parse_from_rfc3339(s.trim()) {
				return u64::try_from(datetime.timestamp())
					.map_err(|_| format!("Timestamp '{}' is before the unix epoch", s));
			}
			parse_u64_str(s)
		}
		other => parse_u64(other),
	}
}

/// Formats a `u64` as a `0x`-prefixed hex string
pub fn to_hex_u64(n: u64) -> String {
	format!("0x{:x}", n)
}

/// Parses an `"txhash:index"` outpoint, dropping a `0x` prefix from the hash
pub fn parse_outpoint(s: &str) -> Result<(String, u32), String> {
	let (hash, index) = s
		.rsplit_once(':')
		.ok_or_else(|| format!("Outpoint '{}' is not of the form txhash:index", s))?;
	let hash = strip_hex_prefix(hash).unwrap_or(hash);
	if hash.is_empty() {
		return Err(format!("Outpoint '{}' has an empty hash", s));
	}
	let index = u32::from_str(index).map_err(|e| format!("Invalid outpoint index '{}': {}", s, e))?;
	Ok((hash.to_string(), index))
}
