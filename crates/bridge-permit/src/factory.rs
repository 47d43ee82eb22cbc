use alloy_primitives::{Address, U256};
use bridge_types::{current_timestamp, Permit};

/// Lifetime given to permits when the caller does not choose one.
pub const DEFAULT_DEADLINE_OFFSET_SECS: u64 = 3600;

/// Builds deadline-bounded permits.
///
/// Values are stored exactly as given. Narrowing to the Permit2 field widths
/// happens only when the typed-data hash is computed, so a stored permit never
/// misstates what the owner intended to allow.
pub struct PermitFactory;

impl PermitFactory {
	/// Creates a permit expiring `deadline_offset` seconds from now.
	pub fn create_permit(
		owner: Address,
		spender: Address,
		token: Address,
		value: U256,
		nonce: U256,
		deadline_offset: u64,
	) -> Permit {
		Self::create_permit_at(
			owner,
			spender,
			token,
			value,
			nonce,
			deadline_offset,
			current_timestamp(),
		)
	}

	/// Creates a permit expiring `deadline_offset` seconds after `now`.
	pub fn create_permit_at(
		owner: Address,
		spender: Address,
		token: Address,
		value: U256,
		nonce: U256,
		deadline_offset: u64,
		now: u64,
	) -> Permit {
		Permit {
			owner,
			spender,
			token,
			value,
			nonce,
			deadline: now.saturating_add(deadline_offset),
		}
	}
}
