//! Delegated-authorization types.
//!
//! A [`Permit`] records what a token owner allows a spender to move and until
//! when. The stored permit always carries the owner's true intended values; any
//! narrowing to the verifying contract's field widths happens only when the
//! typed-data hash is computed.

use crate::utils::{with_0x_prefix, without_0x_prefix};
use alloy_primitives::{hex, Address, Bytes, B256, U256};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Length of a serialized secp256k1 signature (r || s || v).
pub const SIGNATURE_LENGTH: usize = 65;

/// Errors produced while parsing or decomposing a permit signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
	/// The input is not valid hex.
	#[error("Invalid signature: not a hex string")]
	NotHex,
	/// The signature is not 65 bytes long.
	#[error("Invalid signature length: expected {SIGNATURE_LENGTH} bytes, got {0}")]
	InvalidLength(usize),
}

/// A deadline-bounded authorization for a spender to move an owner's tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permit {
	pub owner: Address,
	pub spender: Address,
	pub token: Address,
	#[serde(
		serialize_with = "serialize_u256",
		deserialize_with = "deserialize_u256"
	)]
	pub value: U256,
	#[serde(
		serialize_with = "serialize_u256",
		deserialize_with = "deserialize_u256"
	)]
	pub nonce: U256,
	/// Unix timestamp in seconds after which the permit is no longer valid.
	#[serde(deserialize_with = "deserialize_u64")]
	pub deadline: u64,
}

impl Permit {
	/// Returns true if the deadline lies strictly before `now`.
	pub fn is_expired_at(&self, now: u64) -> bool {
		self.deadline < now
	}
}

/// Opaque serialized signature over a permit digest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PermitSignature(pub Bytes);

/// A signature decomposed for transports that need discrete fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SignatureParts {
	pub r: B256,
	pub s: B256,
	/// Recovery id in the 27/28 form.
	pub v: u8,
}

impl PermitSignature {
	/// Returns the raw signature bytes.
	pub fn as_bytes(&self) -> &[u8] {
		&self.0
	}

	/// Decomposes a 65-byte signature into r, s and a normalized recovery id.
	pub fn split(&self) -> Result<SignatureParts, SignatureError> {
		if self.0.len() != SIGNATURE_LENGTH {
			return Err(SignatureError::InvalidLength(self.0.len()));
		}
		let v = self.0[64];
		Ok(SignatureParts {
			r: B256::from_slice(&self.0[..32]),
			s: B256::from_slice(&self.0[32..64]),
			v: if v < 27 { v + 27 } else { v },
		})
	}
}

impl From<Vec<u8>> for PermitSignature {
	fn from(bytes: Vec<u8>) -> Self {
		Self(Bytes::from(bytes))
	}
}

impl FromStr for PermitSignature {
	type Err = SignatureError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let bytes = hex::decode(without_0x_prefix(s.trim())).map_err(|_| SignatureError::NotHex)?;
		if bytes.len() != SIGNATURE_LENGTH {
			return Err(SignatureError::InvalidLength(bytes.len()));
		}
		Ok(Self::from(bytes))
	}
}

impl fmt::Display for PermitSignature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", with_0x_prefix(&hex::encode(&self.0)))
	}
}

/// How a delegated transfer is authorized.
///
/// `Unauthenticated` skips cryptographic verification entirely and exists for
/// test and integration environments only; the verifier refuses it unless it
/// was explicitly built to allow it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorization {
	Authenticated { signature: PermitSignature },
	Unauthenticated,
}

impl Authorization {
	pub fn signature(&self) -> Option<&PermitSignature> {
		match self {
			Authorization::Authenticated { signature } => Some(signature),
			Authorization::Unauthenticated => None,
		}
	}
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
	Number(u64),
	String(String),
}

fn deserialize_u256<'de, D>(deserializer: D) -> Result<U256, D::Error>
where
	D: Deserializer<'de>,
{
	match NumberOrString::deserialize(deserializer)? {
		NumberOrString::Number(n) => Ok(U256::from(n)),
		NumberOrString::String(s) => U256::from_str(s.trim())
			.map_err(|e| serde::de::Error::custom(format!("Invalid integer '{}': {}", s, e))),
	}
}

fn deserialize_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
	D: Deserializer<'de>,
{
	match NumberOrString::deserialize(deserializer)? {
		NumberOrString::Number(n) => Ok(n),
		NumberOrString::String(s) => s
			.trim()
			.parse::<u64>()
			.map_err(|e| serde::de::Error::custom(format!("Invalid timestamp '{}': {}", s, e))),
	}
}

fn serialize_u256<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
where
	S: Serializer,
{
	serializer.serialize_str(&value.to_string())
}
