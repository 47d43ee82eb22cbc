//! Attestation module for the bridge relayer.
//!
//! After a burn lands on the source chain, an off-chain attestation service
//! signs the emitted message. This module defines the interface to that
//! service and the poller that waits for the signature with bounded
//! exponential backoff and an overall deadline.

use async_trait::async_trait;
use bridge_types::{Attestation, AttestationRequest};
use std::time::Duration;
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod iris;
}

mod poller;

pub use poller::{AttestationPoller, PollerConfig};

/// Errors that can occur while obtaining an attestation.
#[derive(Debug, Error)]
pub enum AttestationError {
	/// The overall polling deadline elapsed without an attestation.
	#[error("Attestation not received after {elapsed_secs} seconds")]
	Timeout { elapsed_secs: u64 },
	/// The service reported a failure that retrying will not fix.
	#[error("Attestation service error: {0}")]
	Service(String),
	/// The request could not reach the service.
	#[error("Network error: {0}")]
	Network(String),
	/// The service answered with a body that could not be interpreted.
	#[error("Invalid attestation response: {0}")]
	InvalidResponse(String),
}

/// Result of a single attestation query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttestationStatus {
	/// The message has been attested.
	Ready(Attestation),
	/// The service does not have an attestation yet.
	Pending,
}

/// Trait defining the interface to an attestation service.
///
/// Implementations perform exactly one lookup per call; retry and backoff
/// belong to [`AttestationPoller`]. A "not found" or "still confirming" answer
/// must be reported as [`AttestationStatus::Pending`] rather than an error so
/// the poller keeps waiting.
#[async_trait]
pub trait AttestationInterface: Send + Sync {
	/// Looks up the attestation for `request`.
	///
	/// `timeout` bounds the request; the poller also enforces it externally in
	/// case the implementation ignores it.
	async fn query(
		&self,
		request: &AttestationRequest,
		timeout: Duration,
	) -> Result<AttestationStatus, AttestationError>;
}
