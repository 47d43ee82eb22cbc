//! Network mode and the per-mode contract defaults.

use alloy_primitives::{address, Address};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Canonical Permit2 deployment, identical on every EVM chain.
pub const PERMIT2_ADDRESS: Address = address!("000000000022d473030f116ddee9f6b43ac78ba3");

/// Which deployment of the transfer protocol the relayer talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkMode {
	Testnet,
	Mainnet,
}

/// Protocol contract addresses on one chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractAddresses {
	pub usdc: Address,
	pub token_messenger: Address,
	pub message_transmitter: Address,
	pub permit2: Address,
}

/// Protocol domain id of Ethereum (Sepolia on testnet).
pub const DOMAIN_ETHEREUM: u32 = 0;
/// Protocol domain id of Avalanche C-Chain (Fuji on testnet).
pub const DOMAIN_AVALANCHE: u32 = 1;

impl NetworkMode {
	/// Known deployments for `domain` in this mode.
	///
	/// Returns `None` for domains without built-in defaults; those need every
	/// address set explicitly in config.
	pub fn default_contracts(&self, domain: u32) -> Option<ContractAddresses> {
		let contracts = match (self, domain) {
			(NetworkMode::Testnet, DOMAIN_ETHEREUM) => ContractAddresses {
				usdc: address!("1c7d4b196cb0c7b01d743fbc6116a902379c7238"),
				token_messenger: address!("9f3b8679c73c2fef8b59b4f3444d4e156fb70aa5"),
				message_transmitter: address!("7865fafc2db2093669d92c0f33aeef291086befd"),
				permit2: PERMIT2_ADDRESS,
			},
			(NetworkMode::Testnet, DOMAIN_AVALANCHE) => ContractAddresses {
				usdc: address!("5425890298aed601595a70ab815c96711a31bc65"),
				token_messenger: address!("eb08f243e5d3fcff26a9e38ae5520a669f4019d0"),
				message_transmitter: address!("a9fb1b3009dcb79e2fe346c16a604b8fa8ae0a79"),
				permit2: PERMIT2_ADDRESS,
			},
			(NetworkMode::Mainnet, DOMAIN_ETHEREUM) => ContractAddresses {
				usdc: address!("a0b86991c6218b36c1d19d4a2e9eb0ce3606eb48"),
				token_messenger: address!("bd3fa81b58ba92a82136038b25adec7066af3155"),
				message_transmitter: address!("0a992d191deec32afe36203ad87d7d289a738f81"),
				permit2: PERMIT2_ADDRESS,
			},
			(NetworkMode::Mainnet, DOMAIN_AVALANCHE) => ContractAddresses {
				usdc: address!("b97ef9ef8734c71904d8002f8b6bc66dd9c48a6e"),
				token_messenger: address!("6b25532e1060ce10cc3b0a99e5683b91bfde6982"),
				message_transmitter: address!("8186359af5f57fbb40c6b14a588d2a59c0c29880"),
				permit2: PERMIT2_ADDRESS,
			},
			_ => return None,
		};
		Some(contracts)
	}

	/// Base URL of the attestation service for this mode.
	pub fn attestation_api_url(&self) -> &'static str {
		match self {
			NetworkMode::Testnet => "https://iris-api-sandbox.circle.com",
			NetworkMode::Mainnet => "https://iris-api.circle.com",
		}
	}
}

impl fmt::Display for NetworkMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			NetworkMode::Testnet => write!(f, "testnet"),
			NetworkMode::Mainnet => write!(f, "mainnet"),
		}
	}
}
