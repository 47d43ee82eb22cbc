//! Delegated-authorization subsystem for the bridge relayer.
//!
//! A token owner authorizes the relayer off-chain by signing a Permit2
//! `PermitSingle` typed-data message. This crate builds those permits, computes
//! and signs the exact digest the Permit2 contract recomputes on-chain, and
//! verifies that a presented permit and signature match an expected transfer.

use bridge_types::SignatureError;
use thiserror::Error;

/// Permit construction with computed deadlines.
pub mod factory;
/// Permit2 typed-data hashing, signing and recovery.
pub mod signer;
/// Authorization checks for delegated transfers.
pub mod verifier;

pub use factory::{PermitFactory, DEFAULT_DEADLINE_OFFSET_SECS};
pub use signer::{clamp_to_uint160, clamp_to_uint48, TypedDataSigner};
pub use verifier::{AuthorizationError, AuthorizationVerifier, Verification, VerifierConfig};

/// Errors that can occur while signing or recovering permit signatures.
#[derive(Debug, Error)]
pub enum PermitError {
	/// The signing key failed to produce a signature.
	#[error("Signing failed: {0}")]
	Signing(String),
	/// The signature bytes are malformed.
	#[error(transparent)]
	Signature(#[from] SignatureError),
	/// No address could be recovered from the signature.
	#[error("Signature recovery failed: {0}")]
	Recovery(String),
}
