//! Chain-level identifiers shared by the source and destination adapters.

use crate::utils::{with_0x_prefix, without_0x_prefix};
use alloy_primitives::{hex, Address, B256};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while parsing a destination recipient.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecipientError {
	/// The input is not valid hex.
	#[error("Invalid recipient '{0}': not a hex string")]
	NotHex(String),
	/// The decoded value is neither 20 nor 32 bytes long.
	#[error("Invalid recipient '{input}': expected 20 or 32 bytes, got {len}")]
	InvalidLength { input: String, len: usize },
}

/// Transaction identifier returned by a chain adapter.
///
/// Kept as raw bytes because the destination ledger may not use 32-byte
/// hashes. Displayed and serialized as `0x`-prefixed hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransactionHash(pub Vec<u8>);

impl TransactionHash {
	/// Returns true if the hash carries no bytes.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}

impl From<B256> for TransactionHash {
	fn from(hash: B256) -> Self {
		Self(hash.to_vec())
	}
}

impl fmt::Display for TransactionHash {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "0x{}", hex::encode(&self.0))
	}
}

impl Serialize for TransactionHash {
	fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
	where
		S: Serializer,
	{
		serializer.serialize_str(&self.to_string())
	}
}

/// A 32-byte account identity on the destination ledger.
///
/// Non-EVM ledgers address accounts with 32-byte keys, while EVM addresses are
/// 20 bytes. Both are carried left-padded in a single word, which is also how
/// the burn message encodes the mint recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Recipient(pub B256);

impl Recipient {
	/// Left-pads an EVM address into a recipient word.
	pub fn from_address(address: Address) -> Self {
		Self(address.into_word())
	}

	/// Returns the embedded EVM address if the upper 12 bytes are zero.
	pub fn as_address(&self) -> Option<Address> {
		if self.0[..12].iter().all(|&b| b == 0) {
			Some(Address::from_slice(&self.0[12..]))
		} else {
			None
		}
	}
}

impl FromStr for Recipient {
	type Err = RecipientError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes = hex::decode(without_0x_prefix(s.trim()))
			.map_err(|_| RecipientError::NotHex(s.to_string()))?;

		match bytes.len() {
			20 => Ok(Self::from_address(Address::from_slice(&bytes))),
			32 => Ok(Self(B256::from_slice(&bytes))),
			len => Err(RecipientError::InvalidLength {
				input: s.to_string(),
				len,
			}),
		}
	}
}

impl fmt::Display for Recipient {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", with_0x_prefix(&hex::encode(self.0)))
	}
}
