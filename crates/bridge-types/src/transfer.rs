//! Transfer request and result types.

use crate::permit::{Authorization, Permit};
use serde::Serialize;
use std::fmt;

/// A request to move tokens from the source ledger to the destination ledger.
///
/// Fields are kept close to what the caller typed; the orchestrator validates
/// and parses them before any chain interaction.
#[derive(Debug, Clone, Default)]
pub struct TransferRequest {
	/// Decimal token amount, e.g. "1.5".
	pub amount: String,
	/// Destination-ledger recipient. Defaults to the relayer's destination identity.
	pub destination: Option<String>,
	/// Token owner on the source ledger when the relayer acts on their behalf.
	pub source_address: Option<String>,
	pub authorization: Option<Authorization>,
	pub permit: Option<Permit>,
}

impl TransferRequest {
	/// A transfer debiting the relayer's own source account.
	pub fn direct(amount: impl Into<String>, destination: Option<String>) -> Self {
		Self {
			amount: amount.into(),
			destination,
			..Default::default()
		}
	}

	/// True when the debit is attributed to a user who authorized the relayer.
	pub fn is_delegated(&self) -> bool {
		self.source_address.is_some() && self.authorization.is_some()
	}
}

/// Phase of the transfer lifecycle, used to tell callers where a failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
	Validation,
	Authorization,
	SourceSubmission,
	Attestation,
	DestinationSubmission,
}

impl fmt::Display for TransferPhase {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let name = match self {
			TransferPhase::Validation => "validation",
			TransferPhase::Authorization => "authorization",
			TransferPhase::SourceSubmission => "source submission",
			TransferPhase::Attestation => "attestation",
			TransferPhase::DestinationSubmission => "destination submission",
		};
		write!(f, "{}", name)
	}
}

/// Terminal outcome of one transfer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferResult {
	pub success: bool,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub source_tx: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attestation_id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub destination_tx: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub error: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub failed_phase: Option<TransferPhase>,
	/// Source-side transactions confirmed before a failure. Their effects are
	/// final even though the transfer did not complete.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub completed_txs: Vec<String>,
	/// Set when a delegated debit skipped signature verification. Such a
	/// result must never be treated as a production transfer.
	#[serde(skip_serializing_if = "is_false")]
	pub unauthenticated: bool,
}

fn is_false(value: &bool) -> bool {
	!*value
}

impl TransferResult {
	pub fn succeeded(source_tx: String, attestation_id: String, destination_tx: String) -> Self {
		Self {
			success: true,
			source_tx: Some(source_tx),
			attestation_id: Some(attestation_id),
			destination_tx: Some(destination_tx),
			error: None,
			failed_phase: None,
			completed_txs: Vec::new(),
			unauthenticated: false,
		}
	}

	/// A failed result that still reports whatever progress was made, so the
	/// caller can reconcile an already-submitted source transaction.
	pub fn failed(
		phase: TransferPhase,
		error: String,
		source_tx: Option<String>,
		attestation_id: Option<String>,
	) -> Self {
		Self {
			success: false,
			source_tx,
			attestation_id,
			destination_tx: None,
			error: Some(error),
			failed_phase: Some(phase),
			completed_txs: Vec::new(),
			unauthenticated: false,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::permit::PermitSignature;

	#[test]
	fn test_delegated_requires_source_and_authorization() {
		let mut request = TransferRequest::direct("1.0", None);
		assert!(!request.is_delegated());

		request.source_address = Some("0x5fbdb2315678afecb367f032d93f642f64180aa3".into());
		assert!(!request.is_delegated());

		request.authorization = Some(Authorization::Authenticated {
			signature: PermitSignature::from(vec![0u8; 65]),
		});
		assert!(request.is_delegated());
	}

	#[test]
	fn test_result_json_shape() {
		let result = TransferResult::failed(
			TransferPhase::Attestation,
			"timed out".to_string(),
			Some("0xabc".to_string()),
			None,
		);
		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["success"], false);
		assert_eq!(json["sourceTx"], "0xabc");
		assert_eq!(json["failedPhase"], "attestation");
		assert!(json.get("destinationTx").is_none());
		assert!(json.get("completedTxs").is_none());
		assert!(json.get("unauthenticated").is_none());
	}

	#[test]
	fn test_flags_appear_only_when_set() {
		let mut result = TransferResult::failed(
			TransferPhase::SourceSubmission,
			"approve reverted".to_string(),
			None,
			None,
		);
		result.completed_txs = vec!["0x11".to_string()];
		result.unauthenticated = true;

		let json = serde_json::to_value(&result).unwrap();
		assert_eq!(json["completedTxs"][0], "0x11");
		assert_eq!(json["unauthenticated"], true);
	}
}
