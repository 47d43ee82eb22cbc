//! Configuration module for the bridge relayer.
//!
//! Configuration is read once at startup from a TOML file, with `${VAR}` and
//! `${VAR:-default}` references resolved from the environment, validated, and
//! then passed by reference into the orchestrator. Nothing downstream reads
//! process state on its own.

mod network;

pub use network::{
	ContractAddresses, NetworkMode, DOMAIN_AVALANCHE, DOMAIN_ETHEREUM, PERMIT2_ADDRESS,
};

use alloy_primitives::Address;
use bridge_types::{SecretString, TOKEN_DECIMALS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
	/// Error that occurs during file I/O operations.
	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
	/// Error that occurs when parsing TOML configuration.
	#[error("Configuration error: {0}")]
	Parse(String),
	/// Error that occurs when configuration validation fails.
	#[error("Validation error: {0}")]
	Validation(String),
}

impl From<toml::de::Error> for ConfigError {
	fn from(err: toml::de::Error) -> Self {
		// Keep the message, drop the echoed input
		ConfigError::Parse(err.message().to_string())
	}
}

/// Main configuration structure for the relayer.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
	/// Protocol-wide settings.
	pub bridge: BridgeConfig,
	/// Source chain connection and signing key.
	pub source: SourceConfig,
	/// Destination chain connection and signing key.
	pub destination: DestinationConfig,
	/// Attestation service endpoint and polling schedule.
	#[serde(default)]
	pub attestation: AttestationConfig,
}

/// Protocol-wide settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BridgeConfig {
	/// Testnet or mainnet deployment.
	pub network: NetworkMode,
	/// Protocol domain id of the source chain.
	pub source_domain: u32,
	/// Protocol domain id of the destination chain.
	pub destination_domain: u32,
	/// Decimal scale of the bridged token. Fixed by the protocol; only the
	/// default is accepted.
	#[serde(default = "default_token_decimals")]
	pub token_decimals: u32,
	/// Accept `Authorization::Unauthenticated` for delegated transfers.
	/// Never allowed on mainnet.
	#[serde(default)]
	pub allow_unauthenticated: bool,
	/// Reject delegated transfers that carry a signature but no permit.
	#[serde(default)]
	pub require_explicit_permit: bool,
	/// Lifetime of permits built by the relayer, in seconds.
	#[serde(default = "default_permit_deadline_seconds")]
	pub permit_deadline_seconds: u64,
}

fn default_token_decimals() -> u32 {
	TOKEN_DECIMALS
}

fn default_permit_deadline_seconds() -> u64 {
	3600
}

/// Source chain settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceConfig {
	pub rpc_url: String,
	pub private_key: SecretString,
	/// EVM chain id; also the chain permits are redeemed on.
	pub chain_id: u64,
	pub usdc_address: Option<Address>,
	pub token_messenger_address: Option<Address>,
	/// Contract whose `MessageSent` event carries the burn message.
	pub message_transmitter_address: Option<Address>,
	pub permit2_address: Option<Address>,
}

/// Destination chain settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DestinationConfig {
	pub rpc_url: String,
	pub private_key: SecretString,
	pub chain_id: Option<u64>,
	pub message_transmitter_address: Option<Address>,
}

/// Attestation service endpoint and polling schedule.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AttestationConfig {
	/// Overrides the per-mode attestation API base URL.
	pub api_url: Option<String>,
	/// Overall polling deadline.
	#[serde(default = "default_attestation_timeout_seconds")]
	pub timeout_seconds: u64,
	/// First backoff interval.
	#[serde(default = "default_initial_interval_ms")]
	pub initial_interval_ms: u64,
	/// Upper bound for the backoff interval.
	#[serde(default = "default_max_interval_ms")]
	pub max_interval_ms: u64,
	/// Growth factor applied to the interval after each pending attempt.
	#[serde(default = "default_backoff_multiplier")]
	pub backoff_multiplier: f64,
	/// Timeout for a single attestation request.
	#[serde(default = "default_request_timeout_seconds")]
	pub request_timeout_seconds: u64,
}

impl Default for AttestationConfig {
	fn default() -> Self {
		Self {
			api_url: None,
			timeout_seconds: default_attestation_timeout_seconds(),
			initial_interval_ms: default_initial_interval_ms(),
			max_interval_ms: default_max_interval_ms(),
			backoff_multiplier: default_backoff_multiplier(),
			request_timeout_seconds: default_request_timeout_seconds(),
		}
	}
}

fn default_attestation_timeout_seconds() -> u64 {
	180
}

fn default_initial_interval_ms() -> u64 {
	2_000
}

fn default_max_interval_ms() -> u64 {
	30_000
}

fn default_backoff_multiplier() -> f64 {
	1.5
}

fn default_request_timeout_seconds() -> u64 {
	10
}

impl AttestationConfig {
	pub fn timeout(&self) -> Duration {
		Duration::from_secs(self.timeout_seconds)
	}

	pub fn initial_interval(&self) -> Duration {
		Duration::from_millis(self.initial_interval_ms)
	}

	pub fn max_interval(&self) -> Duration {
		Duration::from_millis(self.max_interval_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_seconds)
	}
}

/// Resolves environment variables in a string.
///
/// Replaces ${VAR_NAME} with the value of the environment variable VAR_NAME.
/// Supports default values with ${VAR_NAME:-default_value}.
///
/// Input strings are limited to 1MB to prevent ReDoS attacks.
pub(crate) fn resolve_env_vars(input: &str) -> Result<String, ConfigError> {
	const MAX_INPUT_SIZE: usize = 1024 * 1024;
	if input.len() > MAX_INPUT_SIZE {
		return Err(ConfigError::Validation(format!(
			"Configuration file too large: {} bytes (max: {} bytes)",
			input.len(),
			MAX_INPUT_SIZE
		)));
	}

	let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]{0,127})(?::-([^}]{0,256}))?\}")
		.map_err(|e| ConfigError::Parse(format!("Regex error: {}", e)))?;

	let mut result = input.to_string();
	let mut replacements = Vec::new();

	for cap in re.captures_iter(input) {
		let (Some(full_match), Some(var_name)) = (cap.get(0), cap.get(1)) else {
			continue;
		};
		let default_value = cap.get(2).map(|m| m.as_str());

		let value = match std::env::var(var_name.as_str()) {
			Ok(v) => v,
			Err(_) => match default_value {
				Some(default) => default.to_string(),
				None => {
					return Err(ConfigError::Validation(format!(
						"Environment variable '{}' not found",
						var_name.as_str()
					)));
				},
			},
		};

		replacements.push((full_match.start(), full_match.end(), value));
	}

	// Apply replacements in reverse order to maintain positions
	for (start, end, value) in replacements.iter().rev() {
		result.replace_range(start..end, value);
	}

	Ok(result)
}

impl Config {
	/// Loads configuration from a TOML file, resolving environment variables.
	pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let content = tokio::fs::read_to_string(path.as_ref()).await?;
		content.parse()
	}

	/// Source-side contract addresses with config overrides applied.
	///
	/// Fails when an address has neither an override nor a built-in default
	/// for the source domain.
	pub fn source_contracts(&self) -> Result<ContractAddresses, ConfigError> {
		let domain = self.bridge.source_domain;
		let defaults = self.bridge.network.default_contracts(domain);
		let pick = |value: Option<Address>, field: &str, default: Option<Address>| {
			value.or(default).ok_or_else(|| {
				ConfigError::Validation(format!(
					"source.{} is required: no {} default for domain {}",
					field, self.bridge.network, domain
				))
			})
		};

		Ok(ContractAddresses {
			usdc: pick(
				self.source.usdc_address,
				"usdc_address",
				defaults.map(|c| c.usdc),
			)?,
			token_messenger: pick(
				self.source.token_messenger_address,
				"token_messenger_address",
				defaults.map(|c| c.token_messenger),
			)?,
			message_transmitter: pick(
				self.source.message_transmitter_address,
				"message_transmitter_address",
				defaults.map(|c| c.message_transmitter),
			)?,
			permit2: self.source.permit2_address.unwrap_or(PERMIT2_ADDRESS),
		})
	}

	/// Destination message transmitter, resolved for the destination domain.
	pub fn destination_message_transmitter(&self) -> Result<Address, ConfigError> {
		let domain = self.bridge.destination_domain;
		self.destination
			.message_transmitter_address
			.or_else(|| {
				self.bridge
					.network
					.default_contracts(domain)
					.map(|c| c.message_transmitter)
			})
			.ok_or_else(|| {
				ConfigError::Validation(format!(
					"destination.message_transmitter_address is required: no {} default for domain {}",
					self.bridge.network, domain
				))
			})
	}

	/// Attestation API base URL with config override applied.
	pub fn attestation_api_url(&self) -> String {
		self.attestation
			.api_url
			.clone()
			.unwrap_or_else(|| self.bridge.network.attestation_api_url().to_string())
	}

	/// Validates the configuration to ensure all required fields are properly set.
	fn validate(&self) -> Result<(), ConfigError> {
		if self.source.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation(
				"source.rpc_url cannot be empty".into(),
			));
		}
		if self.destination.rpc_url.trim().is_empty() {
			return Err(ConfigError::Validation(
				"destination.rpc_url cannot be empty".into(),
			));
		}
		if self.source.private_key.is_empty() {
			return Err(ConfigError::Validation(
				"source.private_key cannot be empty".into(),
			));
		}
		if self.destination.private_key.is_empty() {
			return Err(ConfigError::Validation(
				"destination.private_key cannot be empty".into(),
			));
		}

		if self.bridge.source_domain == self.bridge.destination_domain {
			return Err(ConfigError::Validation(format!(
				"Source and destination domains must differ (both are {})",
				self.bridge.source_domain
			)));
		}
		let source = self.source_contracts()?;
		let destination_transmitter = self.destination_message_transmitter()?;
		for (name, address) in [
			("source.usdc_address", source.usdc),
			("source.token_messenger_address", source.token_messenger),
			("source.message_transmitter_address", source.message_transmitter),
			("source.permit2_address", source.permit2),
			("destination.message_transmitter_address", destination_transmitter),
		] {
			if address == Address::ZERO {
				return Err(ConfigError::Validation(format!("{} cannot be zero", name)));
			}
		}
		if destination_transmitter == source.message_transmitter {
			return Err(ConfigError::Validation(format!(
				"destination.message_transmitter_address {} is the source chain's transmitter",
				destination_transmitter
			)));
		}

		if self.bridge.token_decimals != TOKEN_DECIMALS {
			return Err(ConfigError::Validation(format!(
				"token_decimals must be {} for the bridged token, got {}",
				TOKEN_DECIMALS, self.bridge.token_decimals
			)));
		}
		if self.bridge.permit_deadline_seconds == 0 {
			return Err(ConfigError::Validation(
				"permit_deadline_seconds must be greater than 0".into(),
			));
		}
		if self.bridge.allow_unauthenticated && self.bridge.network == NetworkMode::Mainnet {
			return Err(ConfigError::Validation(
				"allow_unauthenticated cannot be enabled on mainnet".into(),
			));
		}

		let attestation = &self.attestation;
		if attestation.timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"attestation.timeout_seconds must be greater than 0".into(),
			));
		}
		if attestation.request_timeout_seconds == 0 {
			return Err(ConfigError::Validation(
				"attestation.request_timeout_seconds must be greater than 0".into(),
			));
		}
		if attestation.initial_interval_ms == 0 {
			return Err(ConfigError::Validation(
				"attestation.initial_interval_ms must be greater than 0".into(),
			));
		}
		if attestation.max_interval_ms < attestation.initial_interval_ms {
			return Err(ConfigError::Validation(format!(
				"attestation.max_interval_ms ({}) cannot be below initial_interval_ms ({})",
				attestation.max_interval_ms, attestation.initial_interval_ms
			)));
		}
		if !attestation.backoff_multiplier.is_finite() || attestation.backoff_multiplier < 1.0 {
			return Err(ConfigError::Validation(
				"attestation.backoff_multiplier must be at least 1.0".into(),
			));
		}

		Ok(())
	}
}

/// Parses configuration from a TOML string.
///
/// Environment variables are resolved first and the result is validated.
impl FromStr for Config {
	type Err = ConfigError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let resolved = resolve_env_vars(s)?;
		let config: Config = toml::from_str(&resolved)?;
		config.validate()?;
		Ok(config)
	}
}
