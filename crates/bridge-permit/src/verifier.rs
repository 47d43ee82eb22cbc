//! Authorization checks for delegated transfers.
//!
//! The verifier decides whether the relayer may debit `owner` for `amount`.
//! Checks on the permit contents (owner, spender, token, value, deadline) run
//! before the cryptographic check so the caller learns the most specific
//! reason. A permit that passes is later submitted on-chain as-is, so every
//! field that reaches Permit2 is checked here.

use crate::factory::PermitFactory;
use crate::signer::TypedDataSigner;
use alloy_primitives::{Address, U256};
use bridge_types::{current_timestamp, Authorization, Permit};
use thiserror::Error;
use tracing::warn;

/// Why a delegated transfer was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
	#[error("Unauthenticated transfers are disabled; a permit signature is required")]
	UnauthenticatedDisabled,
	#[error("Chain id is required to verify a permit signature")]
	MissingChainId,
	#[error("Permit owner {actual} does not match transfer owner {expected}")]
	OwnerMismatch { expected: Address, actual: Address },
	#[error("Permit spender {actual} is not the relayer {expected}")]
	SpenderMismatch { expected: Address, actual: Address },
	#[error("Permit token {actual} is not the bridged token {expected}")]
	TokenMismatch { expected: Address, actual: Address },
	#[error("Permit value {permitted} does not match transfer amount {requested}")]
	ValueMismatch { permitted: U256, requested: U256 },
	#[error("Permit expired at {deadline} (current time {now})")]
	Expired { deadline: u64, now: u64 },
	#[error("A signed transfer must include the permit that was signed")]
	MissingPermit,
	#[error("Permit signature was not produced by {owner}")]
	InvalidSignature { owner: Address },
}

/// How a successful authorization was reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
	/// The supplied permit and signature checked out.
	Verified,
	/// Verification was skipped. Test and integration use only.
	Bypassed,
	/// The signature matched a permit rebuilt with default nonce and deadline.
	/// The signed nonce and deadline are unknown, so this is weaker than
	/// `Verified`.
	Reconstructed,
}

/// Policy and context for an [`AuthorizationVerifier`].
#[derive(Debug, Clone)]
pub struct VerifierConfig {
	/// Spender the owner must have authorized; the relayer's source address.
	pub spender: Address,
	/// Token being bridged.
	pub token: Address,
	pub allow_unauthenticated: bool,
	pub require_explicit_permit: bool,
	/// Deadline offset assumed when rebuilding an omitted permit.
	pub reconstruction_deadline_offset: u64,
}

pub struct AuthorizationVerifier {
	signer: TypedDataSigner,
	config: VerifierConfig,
}

impl AuthorizationVerifier {
	pub fn new(signer: TypedDataSigner, config: VerifierConfig) -> Self {
		Self { signer, config }
	}

	/// Checks that `owner` authorized a transfer of `amount`.
	pub fn verify(
		&self,
		owner: Address,
		amount: U256,
		authorization: &Authorization,
		permit: Option<&Permit>,
		chain_id: Option<u64>,
	) -> Result<Verification, AuthorizationError> {
		self.verify_at(
			owner,
			amount,
			authorization,
			permit,
			chain_id,
			current_timestamp(),
		)
	}

	/// Same as [`verify`](Self::verify) with an explicit current time.
	pub fn verify_at(
		&self,
		owner: Address,
		amount: U256,
		authorization: &Authorization,
		permit: Option<&Permit>,
		chain_id: Option<u64>,
		now: u64,
	) -> Result<Verification, AuthorizationError> {
		let signature = match authorization {
			Authorization::Unauthenticated => {
				if !self.config.allow_unauthenticated {
					return Err(AuthorizationError::UnauthenticatedDisabled);
				}
				warn!(
					owner = %owner,
					"Accepting UNAUTHENTICATED delegated transfer; not for production use"
				);
				return Ok(Verification::Bypassed);
			},
			Authorization::Authenticated { signature } => signature,
		};

		let chain_id = chain_id.ok_or(AuthorizationError::MissingChainId)?;

		let (resolved, outcome) = match permit {
			Some(permit) => {
				if permit.owner != owner {
					return Err(AuthorizationError::OwnerMismatch {
						expected: owner,
						actual: permit.owner,
					});
				}
				if permit.spender != self.config.spender {
					return Err(AuthorizationError::SpenderMismatch {
						expected: self.config.spender,
						actual: permit.spender,
					});
				}
				if permit.token != self.config.token {
					return Err(AuthorizationError::TokenMismatch {
						expected: self.config.token,
						actual: permit.token,
					});
				}
				if permit.value != amount {
					return Err(AuthorizationError::ValueMismatch {
						permitted: permit.value,
						requested: amount,
					});
				}
				if permit.is_expired_at(now) {
					return Err(AuthorizationError::Expired {
						deadline: permit.deadline,
						now,
					});
				}
				(permit.clone(), Verification::Verified)
			},
			None => {
				if self.config.require_explicit_permit {
					return Err(AuthorizationError::MissingPermit);
				}
				warn!(
					owner = %owner,
					deadline_offset = self.config.reconstruction_deadline_offset,
					"No permit supplied; verifying against a reconstructed permit with nonce 0"
				);
				let rebuilt = PermitFactory::create_permit_at(
					owner,
					self.config.spender,
					self.config.token,
					amount,
					U256::ZERO,
					self.config.reconstruction_deadline_offset,
					now,
				);
				(rebuilt, Verification::Reconstructed)
			},
		};

		if !self.signer.verify(&resolved, signature, chain_id, owner) {
			return Err(AuthorizationError::InvalidSignature { owner });
		}

		Ok(outcome)
	}

	/// Boolean form of [`verify`](Self::verify).
	pub fn is_authorized(
		&self,
		owner: Address,
		amount: U256,
		authorization: &Authorization,
		permit: Option<&Permit>,
		chain_id: Option<u64>,
	) -> bool {
		self.verify(owner, amount, authorization, permit, chain_id)
			.is_ok()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::factory::DEFAULT_DEADLINE_OFFSET_SECS;
	use alloy_signer_local::PrivateKeySigner;
	use bridge_types::PermitSignature;

	const CHAIN_ID: u64 = 11155111;
	const NOW: u64 = 1_800_000_000;

	fn owner_signer() -> PrivateKeySigner {
		"0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80"
			.parse()
			.unwrap()
	}

	fn config() -> VerifierConfig {
		VerifierConfig {
			spender: Address::repeat_byte(0x22),
			token: Address::repeat_byte(0x33),
			allow_unauthenticated: false,
			require_explicit_permit: false,
			reconstruction_deadline_offset: DEFAULT_DEADLINE_OFFSET_SECS,
		}
	}

	fn verifier(config: VerifierConfig) -> AuthorizationVerifier {
		AuthorizationVerifier::new(TypedDataSigner::new(Address::repeat_byte(0x11)), config)
	}

	fn signed_permit(deadline: u64) -> (Permit, Authorization) {
		let signer = owner_signer();
		let permit = Permit {
			owner: signer.address(),
			spender: Address::repeat_byte(0x22),
			token: Address::repeat_byte(0x33),
			value: U256::from(1_000_000u64),
			nonce: U256::from(9u64),
			deadline,
		};
		let signature = TypedDataSigner::new(Address::repeat_byte(0x11))
			.sign(&signer, &permit, CHAIN_ID)
			.unwrap();
		(permit, Authorization::Authenticated { signature })
	}

	#[test]
	fn test_valid_permit_is_verified() {
		let (permit, auth) = signed_permit(NOW + 60);
		let result = verifier(config()).verify_at(
			permit.owner,
			permit.value,
			&auth,
			Some(&permit),
			Some(CHAIN_ID),
			NOW,
		);
		assert_eq!(result, Ok(Verification::Verified));
	}

	#[test]
	fn test_expired_permit_rejected_even_with_valid_signature() {
		let (permit, auth) = signed_permit(NOW - 1);
		let err = verifier(config())
			.verify_at(
				permit.owner,
				permit.value,
				&auth,
				Some(&permit),
				Some(CHAIN_ID),
				NOW,
			)
			.unwrap_err();
		assert_eq!(
			err,
			AuthorizationError::Expired {
				deadline: NOW - 1,
				now: NOW
			}
		);
		assert!(err.to_string().contains("expired"));
	}

	#[test]
	fn test_owner_and_value_mismatch() {
		let (permit, auth) = signed_permit(NOW + 60);
		let v = verifier(config());

		let err = v
			.verify_at(
				Address::repeat_byte(0x77),
				permit.value,
				&auth,
				Some(&permit),
				Some(CHAIN_ID),
				NOW,
			)
			.unwrap_err();
		assert!(matches!(err, AuthorizationError::OwnerMismatch { .. }));

		let err = v
			.verify_at(
				permit.owner,
				U256::from(5u8),
				&auth,
				Some(&permit),
				Some(CHAIN_ID),
				NOW,
			)
			.unwrap_err();
		assert!(matches!(err, AuthorizationError::ValueMismatch { .. }));
	}

	#[test]
	fn test_permit_for_other_spender_or_token() {
		let signer = owner_signer();
		let signing = TypedDataSigner::new(Address::repeat_byte(0x11));
		let v = verifier(config());

		let mut permit = signed_permit(NOW + 60).0;
		permit.spender = Address::repeat_byte(0x66);
		let auth = Authorization::Authenticated {
			signature: signing.sign(&signer, &permit, CHAIN_ID).unwrap(),
		};
		let err = v
			.verify_at(permit.owner, permit.value, &auth, Some(&permit), Some(CHAIN_ID), NOW)
			.unwrap_err();
		assert_eq!(
			err,
			AuthorizationError::SpenderMismatch {
				expected: Address::repeat_byte(0x22),
				actual: Address::repeat_byte(0x66),
			}
		);

		let mut permit = signed_permit(NOW + 60).0;
		permit.token = Address::repeat_byte(0x77);
		let auth = Authorization::Authenticated {
			signature: signing.sign(&signer, &permit, CHAIN_ID).unwrap(),
		};
		let err = v
			.verify_at(permit.owner, permit.value, &auth, Some(&permit), Some(CHAIN_ID), NOW)
			.unwrap_err();
		assert_eq!(
			err,
			AuthorizationError::TokenMismatch {
				expected: Address::repeat_byte(0x33),
				actual: Address::repeat_byte(0x77),
			}
		);
	}

	#[test]
	fn test_missing_chain_id() {
		let (permit, auth) = signed_permit(NOW + 60);
		let err = verifier(config())
			.verify_at(permit.owner, permit.value, &auth, Some(&permit), None, NOW)
			.unwrap_err();
		assert_eq!(err, AuthorizationError::MissingChainId);
	}

	#[test]
	fn test_signature_from_wrong_key() {
		let (permit, _) = signed_permit(NOW + 60);
		let forged = Authorization::Authenticated {
			signature: PermitSignature::from(vec![7u8; 65]),
		};
		let err = verifier(config())
			.verify_at(
				permit.owner,
				permit.value,
				&forged,
				Some(&permit),
				Some(CHAIN_ID),
				NOW,
			)
			.unwrap_err();
		assert!(matches!(err, AuthorizationError::InvalidSignature { .. }));
	}

	#[test]
	fn test_unauthenticated_respects_policy() {
		let owner = Address::repeat_byte(0x55);
		let amount = U256::from(1u8);

		let strict = verifier(config());
		assert_eq!(
			strict.verify(owner, amount, &Authorization::Unauthenticated, None, None),
			Err(AuthorizationError::UnauthenticatedDisabled)
		);

		let permissive = verifier(VerifierConfig {
			allow_unauthenticated: true,
			..config()
		});
		assert_eq!(
			permissive.verify(owner, amount, &Authorization::Unauthenticated, None, None),
			Ok(Verification::Bypassed)
		);
	}

	#[test]
	fn test_reconstructed_permit_path() {
		let signer = owner_signer();
		let owner = signer.address();
		let amount = U256::from(2_500_000u64);

		// Sign exactly what the verifier will rebuild
		let rebuilt = PermitFactory::create_permit_at(
			owner,
			Address::repeat_byte(0x22),
			Address::repeat_byte(0x33),
			amount,
			U256::ZERO,
			DEFAULT_DEADLINE_OFFSET_SECS,
			NOW,
		);
		let signature = TypedDataSigner::new(Address::repeat_byte(0x11))
			.sign(&signer, &rebuilt, CHAIN_ID)
			.unwrap();
		let auth = Authorization::Authenticated { signature };

		let lenient = verifier(config());
		assert_eq!(
			lenient.verify_at(owner, amount, &auth, None, Some(CHAIN_ID), NOW),
			Ok(Verification::Reconstructed)
		);

		let strict = verifier(VerifierConfig {
			require_explicit_permit: true,
			..config()
		});
		assert_eq!(
			strict.verify_at(owner, amount, &auth, None, Some(CHAIN_ID), NOW),
			Err(AuthorizationError::MissingPermit)
		);
	}

	#[test]
	fn test_is_authorized() {
		let (permit, auth) = signed_permit(u64::MAX);
		let v = verifier(config());
		assert!(v.is_authorized(
			permit.owner,
			permit.value,
			&auth,
			Some(&permit),
			Some(CHAIN_ID)
		));
		assert!(!v.is_authorized(permit.owner, permit.value, &auth, Some(&permit), None));
	}
}
