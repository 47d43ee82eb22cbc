//! Common types for the cross-chain bridge relayer.
//!
//! This crate defines the data model shared by every bridge component:
//! transfer requests and results, permits and their signatures, attestation
//! records and the chain-level identifiers that flow between the source and
//! destination ledgers. Keeping them in one place lets the permit, attestation,
//! delivery and orchestration crates agree on a single representation.

/// Token amount parsing and formatting at the decimal-string boundary.
pub mod amount;
/// Attestation requests and signed attestation payloads.
pub mod attestation;
/// Chain-level identifiers: transaction hashes and destination recipients.
pub mod chain;
/// Delegated-authorization types: permits, signatures and the bypass variant.
pub mod permit;
/// Secure string type for private keys.
pub mod secret_string;
/// Transfer requests, results and phases.
pub mod transfer;
/// Utility functions for hashing, formatting and timestamps.
pub mod utils;

pub use amount::{format_token_amount, parse_token_amount, AmountError, TOKEN_DECIMALS};
pub use attestation::{Attestation, AttestationRequest};
pub use chain::{Recipient, RecipientError, TransactionHash};
pub use permit::{Authorization, Permit, PermitSignature, SignatureError, SignatureParts};
pub use secret_string::SecretString;
pub use transfer::{TransferPhase, TransferRequest, TransferResult};
pub use utils::{current_timestamp, truncate_id, with_0x_prefix, without_0x_prefix};
