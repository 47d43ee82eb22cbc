//! Attestation records exchanged with the off-chain attestation service.

use crate::chain::TransactionHash;
use alloy_primitives::{Bytes, B256};
use serde::Serialize;

/// Identifies a source-chain message awaiting attestation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AttestationRequest {
	/// keccak256 of the emitted burn message.
	pub message_hash: B256,
	/// Raw burn message, carried through to the destination completion.
	pub message: Bytes,
	/// Source transaction that emitted the message.
	pub source_tx: TransactionHash,
}

/// A signed statement that a source-chain burn occurred.
///
/// Carries the raw burn message alongside the attestation because the
/// destination completion needs both.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attestation {
	pub message_hash: B256,
	pub message: Bytes,
	pub attestation: Bytes,
}

impl Attestation {
	/// Identifier reported to callers; the attested message hash.
	pub fn id(&self) -> String {
		format!("0x{:x}", self.message_hash)
	}

	pub fn is_empty(&self) -> bool {
		self.attestation.is_empty()
	}
}
