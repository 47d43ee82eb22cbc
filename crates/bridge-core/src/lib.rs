//! Core transfer engine for the bridge relayer.
//!
//! This crate drives one burn/attest/mint transfer end to end: it validates the
//! request, authorizes delegated debits, burns on the source chain, waits for
//! the attestation and completes the mint on the destination chain. Every
//! outcome, including faults inside a collaborator, is reported as a
//! [`TransferResult`](bridge_types::TransferResult).

use bridge_permit::AuthorizationError;
use bridge_types::TransferPhase;
use thiserror::Error;

pub mod builder;
pub mod orchestrator;

pub use builder::BuilderError;
pub use orchestrator::{TransferOrchestrator, TransferSettings};

/// Errors that end a transfer.
#[derive(Debug, Error)]
pub enum TransferError {
	/// Malformed input, detected before any I/O.
	#[error("Validation failed: {0}")]
	Validation(String),
	/// The owner did not authorize this debit.
	#[error("Authorization failed: {0}")]
	Authorization(#[from] AuthorizationError),
	/// A chain adapter failed to submit or confirm a transaction.
	#[error("{phase} failed: {message}")]
	ChainSubmission {
		phase: TransferPhase,
		message: String,
	},
	/// The attestation did not arrive in time. The burn already happened.
	#[error(
		"Attestation not received within {elapsed_secs} seconds for source transaction {source_tx}; \
		 the burn is final and the mint must be completed manually"
	)]
	AttestationTimeout { elapsed_secs: u64, source_tx: String },
	/// The attestation service failed in a way that waiting will not fix.
	#[error("Attestation service failed for source transaction {source_tx}: {message}")]
	AttestationService { source_tx: String, message: String },
	/// A collaborator panicked.
	#[error("Internal error during {phase}: {message}")]
	Internal {
		phase: TransferPhase,
		message: String,
	},
}

impl TransferError {
	/// Phase the error belongs to.
	pub fn phase(&self) -> TransferPhase {
		match self {
			TransferError::Validation(_) => TransferPhase::Validation,
			TransferError::Authorization(_) => TransferPhase::Authorization,
			TransferError::ChainSubmission { phase, .. } => *phase,
			TransferError::AttestationTimeout { .. } | TransferError::AttestationService { .. } => {
				TransferPhase::Attestation
			},
			TransferError::Internal { phase, .. } => *phase,
		}
	}
}
