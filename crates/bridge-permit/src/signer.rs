//! Permit2 `PermitSingle` digest construction and signature handling.
//!
//! The digest must be bit-exact with what the Permit2 contract computes:
//!
//! ```text
//! keccak256(0x1901 || domainSeparator || hashStruct(PermitSingle))
//! ```
//!
//! `details.amount` is a uint160 and `details.expiration` / `details.nonce` are
//! uint48 on-chain, so those values are clamped to their field maximum before
//! encoding. `sigDeadline` is a uint256 and is encoded as given.

use crate::PermitError;
use alloy_primitives::{keccak256, Address, PrimitiveSignature, B256, U256};
use alloy_signer::SignerSync;
use alloy_signer_local::PrivateKeySigner;
use bridge_types::utils::{compute_domain_hash, compute_final_digest, Eip712AbiEncoder};
use bridge_types::{Permit, PermitSignature, SignatureParts};

pub const NAME_PERMIT2: &str = "Permit2";
pub const VERSION_PERMIT2: &str = "1";
pub const PERMIT_DETAILS_TYPE: &str =
	"PermitDetails(address token,uint160 amount,uint48 expiration,uint48 nonce)";
pub const PERMIT_SINGLE_TYPE: &str =
	"PermitSingle(PermitDetails details,address spender,uint256 sigDeadline)";

/// Saturates `value` at 2^160 - 1.
pub fn clamp_to_uint160(value: U256) -> U256 {
	value.min(U256::MAX >> 96)
}

/// Saturates `value` at 2^48 - 1.
pub fn clamp_to_uint48(value: U256) -> U256 {
	value.min(U256::MAX >> 208)
}

/// Computes, signs and verifies Permit2 digests for one verifying contract.
#[derive(Debug, Clone)]
pub struct TypedDataSigner {
	verifying_contract: Address,
}

impl TypedDataSigner {
	pub fn new(verifying_contract: Address) -> Self {
		Self { verifying_contract }
	}

	pub fn verifying_contract(&self) -> Address {
		self.verifying_contract
	}

	/// Domain separator for `chain_id`, the chain the permit is redeemed on.
	pub fn domain_separator(&self, chain_id: u64) -> B256 {
		compute_domain_hash(
			NAME_PERMIT2,
			VERSION_PERMIT2,
			chain_id,
			&self.verifying_contract,
		)
	}

	/// `hashStruct(PermitSingle)` with field-width clamping applied.
	pub fn struct_hash(&self, permit: &Permit) -> B256 {
		let details_type_hash = keccak256(PERMIT_DETAILS_TYPE.as_bytes());
		// Referenced struct types are appended to the primary type
		let single_type_hash =
			keccak256(format!("{}{}", PERMIT_SINGLE_TYPE, PERMIT_DETAILS_TYPE).as_bytes());

		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&details_type_hash);
		enc.push_address(&permit.token);
		enc.push_u256(clamp_to_uint160(permit.value));
		enc.push_u256(clamp_to_uint48(U256::from(permit.deadline)));
		enc.push_u256(clamp_to_uint48(permit.nonce));
		let details_hash = keccak256(enc.finish());

		let mut enc = Eip712AbiEncoder::new();
		enc.push_b256(&single_type_hash);
		enc.push_b256(&details_hash);
		enc.push_address(&permit.spender);
		enc.push_u256(U256::from(permit.deadline));
		keccak256(enc.finish())
	}

	/// Final EIP-712 digest signed by the owner.
	pub fn digest(&self, permit: &Permit, chain_id: u64) -> B256 {
		compute_final_digest(&self.domain_separator(chain_id), &self.struct_hash(permit))
	}

	/// Signs the permit digest with the owner's key.
	pub fn sign(
		&self,
		signer: &PrivateKeySigner,
		permit: &Permit,
		chain_id: u64,
	) -> Result<PermitSignature, PermitError> {
		let digest = self.digest(permit, chain_id);
		let signature = signer
			.sign_hash_sync(&digest)
			.map_err(|e| PermitError::Signing(e.to_string()))?;
		Ok(PermitSignature::from(signature.as_bytes().to_vec()))
	}

	/// Recovers the address that signed this permit's digest.
	pub fn recover(
		&self,
		permit: &Permit,
		signature: &PermitSignature,
		chain_id: u64,
	) -> Result<Address, PermitError> {
		let digest = self.digest(permit, chain_id);
		let signature = PrimitiveSignature::try_from(signature.as_bytes())
			.map_err(|e| PermitError::Recovery(e.to_string()))?;
		signature
			.recover_address_from_prehash(&digest)
			.map_err(|e| PermitError::Recovery(e.to_string()))
	}

	/// Returns true only if `signature` over this permit recovers to
	/// `expected_owner`. Malformed signatures verify as false.
	pub fn verify(
		&self,
		permit: &Permit,
		signature: &PermitSignature,
		chain_id: u64,
		expected_owner: Address,
	) -> bool {
		match self.recover(permit, signature, chain_id) {
			Ok(recovered) => recovered == expected_owner,
			Err(e) => {
				tracing::debug!(error = %e, "Permit signature recovery failed");
				false
			},
		}
	}

	/// Decomposes a signature into r, s and v.
	pub fn split(signature: &PermitSignature) -> Result<SignatureParts, PermitError> {
		Ok(signature.split()?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::aliases::{U160, U48};
	use alloy_sol_types::{eip712_domain, sol, SolStruct};

	sol! {
		struct PermitDetails {
			address token;
			uint160 amount;
			uint48 expiration;
			uint48 nonce;
		}

		struct PermitSingle {
			PermitDetails details;
			address spender;
			uint256 sigDeadline;
		}
	}

	const OWNER_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
	const CHAIN_ID: u64 = 11155111;

	fn permit2() -> Address {
		"0x000000000022D473030F116dDEE9F6B43aC78BA3"
			.parse()
			.unwrap()
	}

	fn owner_signer() -> PrivateKeySigner {
		OWNER_KEY.parse().unwrap()
	}

	fn sample_permit() -> Permit {
		Permit {
			owner: owner_signer().address(),
			spender: Address::repeat_byte(0x22),
			token: "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238"
				.parse()
				.unwrap(),
			value: U256::from(1_000_000u64),
			nonce: U256::from(3u64),
			deadline: 1_900_000_000,
		}
	}

	fn alloy_digest(
		token: Address,
		amount: U160,
		expiration: U48,
		nonce: U48,
		spender: Address,
		sig_deadline: U256,
	) -> B256 {
		let domain = eip712_domain! {
			name: "Permit2",
			version: "1",
			chain_id: CHAIN_ID,
			verifying_contract: permit2(),
		};
		let message = PermitSingle {
			details: PermitDetails {
				token,
				amount,
				expiration,
				nonce,
			},
			spender,
			sigDeadline: sig_deadline,
		};
		message.eip712_signing_hash(&domain)
	}

	#[test]
	fn test_digest_matches_alloy_typed_data() {
		let permit = sample_permit();
		let expected = alloy_digest(
			permit.token,
			U160::from(1_000_000u64),
			U48::from(1_900_000_000u64),
			U48::from(3u64),
			permit.spender,
			U256::from(1_900_000_000u64),
		);

		let signer = TypedDataSigner::new(permit2());
		assert_eq!(signer.digest(&permit, CHAIN_ID), expected);
	}

	#[test]
	fn test_clamped_digest_matches_alloy_at_field_maximum() {
		let mut permit = sample_permit();
		permit.value = U256::MAX;
		permit.nonce = U256::from(1u64) << 100;
		permit.deadline = u64::MAX;

		let expected = alloy_digest(
			permit.token,
			U160::MAX,
			U48::MAX,
			U48::MAX,
			permit.spender,
			U256::from(u64::MAX),
		);

		let signer = TypedDataSigner::new(permit2());
		assert_eq!(signer.digest(&permit, CHAIN_ID), expected);
		// Stored values are untouched
		assert_eq!(permit.value, U256::MAX);
	}

	#[test]
	fn test_clamping_only_affects_oversized_values() {
		let mut at_max = sample_permit();
		at_max.value = U256::MAX >> 96;
		let mut beyond_max = at_max.clone();
		beyond_max.value = U256::MAX;

		let signer = TypedDataSigner::new(permit2());
		assert_eq!(
			signer.digest(&at_max, CHAIN_ID),
			signer.digest(&beyond_max, CHAIN_ID)
		);
		assert_ne!(
			signer.digest(&sample_permit(), CHAIN_ID),
			signer.digest(&at_max, CHAIN_ID)
		);
	}

	#[test]
	fn test_sign_and_verify_round_trip() {
		let permit = sample_permit();
		let signer = TypedDataSigner::new(permit2());
		let signature = signer.sign(&owner_signer(), &permit, CHAIN_ID).unwrap();

		assert_eq!(signature.as_bytes().len(), 65);
		assert!(signer.verify(&permit, &signature, CHAIN_ID, permit.owner));
	}

	#[test]
	fn test_verify_rejects_other_owner_and_chain() {
		let permit = sample_permit();
		let signer = TypedDataSigner::new(permit2());
		let signature = signer.sign(&owner_signer(), &permit, CHAIN_ID).unwrap();

		assert!(!signer.verify(&permit, &signature, CHAIN_ID, Address::repeat_byte(0x99)));
		assert!(!signer.verify(&permit, &signature, 1, permit.owner));

		let other_contract = TypedDataSigner::new(Address::repeat_byte(0x01));
		assert!(!other_contract.verify(&permit, &signature, CHAIN_ID, permit.owner));
	}

	#[test]
	fn test_verify_rejects_mutated_fields() {
		let permit = sample_permit();
		let signer = TypedDataSigner::new(permit2());
		let signature = signer.sign(&owner_signer(), &permit, CHAIN_ID).unwrap();

		let mutations: Vec<Box<dyn Fn(&mut Permit)>> = vec![
			Box::new(|p| p.spender = Address::repeat_byte(0x33)),
			Box::new(|p| p.token = Address::repeat_byte(0x44)),
			Box::new(|p| p.value += U256::from(1u8)),
			Box::new(|p| p.nonce += U256::from(1u8)),
			Box::new(|p| p.deadline += 1),
		];
		for mutate in mutations {
			let mut mutated = permit.clone();
			mutate(&mut mutated);
			assert!(!signer.verify(&mutated, &signature, CHAIN_ID, permit.owner));
		}
	}

	#[test]
	fn test_malformed_signature_verifies_false() {
		let permit = sample_permit();
		let signer = TypedDataSigner::new(permit2());
		let garbage = PermitSignature::from(vec![0u8; 12]);
		assert!(!signer.verify(&permit, &garbage, CHAIN_ID, permit.owner));
	}

	#[test]
	fn test_split_signature() {
		let permit = sample_permit();
		let signer = TypedDataSigner::new(permit2());
		let signature = signer.sign(&owner_signer(), &permit, CHAIN_ID).unwrap();

		let parts = TypedDataSigner::split(&signature).unwrap();
		assert!(parts.v == 27 || parts.v == 28);
		assert_eq!(parts.r.as_slice(), &signature.as_bytes()[..32]);
		assert_eq!(parts.s.as_slice(), &signature.as_bytes()[32..64]);
	}

	#[test]
	fn test_clamp_helpers() {
		assert_eq!(clamp_to_uint48(U256::from(5u8)), U256::from(5u8));
		assert_eq!(
			clamp_to_uint48(U256::from(u64::MAX)),
			U256::from((1u64 << 48) - 1)
		);
		assert_eq!(
			clamp_to_uint160(U256::MAX),
			(U256::from(1u8) << 160) - U256::from(1u8)
		);
	}
}
