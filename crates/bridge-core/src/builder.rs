//! Construction of a [`TransferOrchestrator`] from configuration.
//!
//! Wires the alloy chain adapters and the HTTP attestation client selected by
//! the config into an orchestrator. Tests and embedders that bring their own
//! adapters use [`TransferOrchestrator::new`] directly.

use crate::orchestrator::{TransferOrchestrator, TransferSettings};
use bridge_attestation::implementations::iris::IrisAttestation;
use bridge_config::{Config, ConfigError};
use bridge_delivery::implementations::evm::alloy::{AlloyDestinationChain, AlloySourceChain};
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while building an orchestrator.
#[derive(Debug, Error)]
pub enum BuilderError {
	#[error("Configuration: {0}")]
	Config(#[from] ConfigError),
	#[error("Source adapter: {0}")]
	Source(String),
	#[error("Destination adapter: {0}")]
	Destination(String),
	#[error("Attestation client: {0}")]
	Attestation(String),
}

impl TransferOrchestrator {
	/// Builds an orchestrator with the adapters described by `config`.
	pub async fn from_config(config: &Config) -> Result<Self, BuilderError> {
		let settings = TransferSettings::from_config(config)?;
		let source = AlloySourceChain::from_config(config)
			.await
			.map_err(|e| BuilderError::Source(e.to_string()))?;
		let destination = AlloyDestinationChain::from_config(config)
			.await
			.map_err(|e| BuilderError::Destination(e.to_string()))?;
		let attestation = IrisAttestation::new(config.attestation_api_url())
			.map_err(|e| BuilderError::Attestation(e.to_string()))?;

		tracing::info!(
			network = %config.bridge.network,
			source_chain_id = config.source.chain_id,
			source_domain = config.bridge.source_domain,
			destination_domain = config.bridge.destination_domain,
			attestation_api = %config.attestation_api_url(),
			"Transfer orchestrator configured"
		);

		Ok(Self::new(
			Arc::new(source),
			Arc::new(destination),
			Arc::new(attestation),
			settings,
		))
	}
}
