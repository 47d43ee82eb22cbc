//! Chain adapters for the bridge relayer.
//!
//! The orchestrator never talks to a chain SDK directly. It hands a
//! [`BurnRequest`] to a [`SourceChainInterface`] and an [`Attestation`] to a
//! [`DestinationChainInterface`]; signing, fee estimation, nonce management and
//! broadcasting all live behind those two traits.

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use bridge_types::{
	Attestation, AttestationRequest, Permit, PermitSignature, Recipient, TransactionHash,
};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod evm {
		pub mod alloy;
	}
}

/// Errors that can occur while submitting transactions.
#[derive(Debug, Error)]
pub enum DeliveryError {
	/// Error that occurs during network communication.
	#[error("Network error: {0}")]
	Network(String),
	/// The transaction was mined but reverted.
	#[error("Transaction failed: {0}")]
	TransactionFailed(String),
	/// The receipt lacks data the protocol requires.
	#[error("Invalid receipt: {0}")]
	InvalidReceipt(String),
	/// The adapter was configured with unusable parameters.
	#[error("Configuration error: {0}")]
	Configuration(String),
	/// A later step failed after earlier transactions were already confirmed.
	/// Those transactions are final and must be reconciled by the caller.
	#[error("{source}; already confirmed: {}", join_hashes(.completed))]
	PartiallyApplied {
		completed: Vec<TransactionHash>,
		source: Box<DeliveryError>,
	},
}

impl DeliveryError {
	/// Transactions confirmed on-chain before this error occurred.
	pub fn completed_transactions(&self) -> &[TransactionHash] {
		match self {
			DeliveryError::PartiallyApplied { completed, .. } => completed,
			_ => &[],
		}
	}

	/// Wraps `self` with the transactions already confirmed, if there are any.
	pub fn after(self, completed: &[TransactionHash]) -> Self {
		if completed.is_empty() {
			self
		} else {
			DeliveryError::PartiallyApplied {
				completed: completed.to_vec(),
				source: Box::new(self),
			}
		}
	}
}

fn join_hashes(hashes: &[TransactionHash]) -> String {
	hashes
		.iter()
		.map(ToString::to_string)
		.collect::<Vec<_>>()
		.join(", ")
}

/// A permit together with the owner's signature over it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedPermit {
	pub permit: Permit,
	pub signature: PermitSignature,
}

/// Everything the source adapter needs to burn tokens for one transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnRequest {
	/// Protocol domain of the source chain.
	pub source_domain: u32,
	/// Protocol domain the tokens are minted on.
	pub destination_domain: u32,
	/// Account whose tokens are burned. Equals the relayer in direct mode.
	pub debit_from: Address,
	/// Account credited on the destination ledger.
	pub mint_recipient: Recipient,
	/// Amount in the token's smallest unit.
	pub amount: U256,
	pub token: Address,
	/// Owner's signed permit when the relayer debits someone else.
	pub permit: Option<SignedPermit>,
}

impl BurnRequest {
	/// True when the debited account is not the submitting relayer.
	pub fn is_delegated(&self, relayer: Address) -> bool {
		self.debit_from != relayer
	}
}

/// Outcome of a successful burn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnReceipt {
	/// Hash of the transaction that emitted the burn message.
	pub tx_hash: TransactionHash,
	/// Raw message emitted by the burn.
	pub message: Bytes,
	/// keccak256 of `message`; the key the attestation service indexes by.
	pub message_hash: B256,
}

impl BurnReceipt {
	/// Builds the attestation lookup for this burn.
	pub fn attestation_request(&self) -> AttestationRequest {
		AttestationRequest {
			message_hash: self.message_hash,
			message: self.message.clone(),
			source_tx: self.tx_hash.clone(),
		}
	}
}

/// Source-side chain adapter.
///
/// Implementations sign and broadcast transactions with the relayer's key and
/// must wait for inclusion before returning, since the burn message is only
/// known once the transaction's logs are available.
#[async_trait]
pub trait SourceChainInterface: Send + Sync {
	/// The relayer's account on the source chain.
	fn address(&self) -> Address;

	/// EVM chain id; also the chain permits are redeemed on.
	fn chain_id(&self) -> u64;

	/// Next nonce for `address`, counting transactions still in the mempool.
	async fn pending_nonce(&self, address: Address) -> Result<u64, DeliveryError>;

	/// Burns tokens and returns the emitted message.
	///
	/// Burning may take several transactions. If a step fails after earlier
	/// ones were confirmed, the error is [`DeliveryError::PartiallyApplied`]
	/// listing them.
	async fn submit_burn(&self, request: &BurnRequest) -> Result<BurnReceipt, DeliveryError>;
}

/// Destination-side chain adapter.
#[async_trait]
pub trait DestinationChainInterface: Send + Sync {
	/// The relayer's identity on the destination ledger; default recipient.
	fn identity(&self) -> Recipient;

	/// Submits the attested message to complete the mint.
	async fn submit_completion(
		&self,
		attestation: &Attestation,
	) -> Result<TransactionHash, DeliveryError>;
}
