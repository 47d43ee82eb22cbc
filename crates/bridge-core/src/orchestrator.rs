//! The transfer state machine.

use crate::TransferError;
use alloy_primitives::Address;
use bridge_attestation::{AttestationError, AttestationInterface, AttestationPoller, PollerConfig};
use bridge_config::{Config, ConfigError};
use bridge_delivery::{BurnRequest, DestinationChainInterface, SignedPermit, SourceChainInterface};
use bridge_permit::{AuthorizationVerifier, TypedDataSigner, Verification, VerifierConfig};
use bridge_types::{
	format_token_amount, parse_token_amount, truncate_id, Authorization, Recipient,
	TransferPhase, TransferRequest, TransferResult,
};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

/// Fixed parameters for every transfer an orchestrator runs.
#[derive(Debug, Clone)]
pub struct TransferSettings {
	pub source_domain: u32,
	pub destination_domain: u32,
	/// Token burned on the source chain.
	pub token: Address,
	pub token_decimals: u32,
	/// Permit2 deployment permits are signed against.
	pub permit2: Address,
	pub allow_unauthenticated: bool,
	pub require_explicit_permit: bool,
	/// Deadline offset assumed when a signed permit is omitted.
	pub permit_deadline_seconds: u64,
	pub poller: PollerConfig,
}

impl TransferSettings {
	pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
		let contracts = config.source_contracts()?;
		Ok(Self {
			source_domain: config.bridge.source_domain,
			destination_domain: config.bridge.destination_domain,
			token: contracts.usdc,
			token_decimals: config.bridge.token_decimals,
			permit2: contracts.permit2,
			allow_unauthenticated: config.bridge.allow_unauthenticated,
			require_explicit_permit: config.bridge.require_explicit_permit,
			permit_deadline_seconds: config.bridge.permit_deadline_seconds,
			poller: PollerConfig::from_config(&config.attestation),
		})
	}
}

/// What a transfer has achieved so far, kept so a failure can still report it.
#[derive(Debug)]
struct Progress {
	phase: TransferPhase,
	source_tx: Option<String>,
	attestation_id: Option<String>,
	completed_txs: Vec<String>,
	unauthenticated: bool,
}

impl Progress {
	fn new() -> Self {
		Self {
			phase: TransferPhase::Validation,
			source_tx: None,
			attestation_id: None,
			completed_txs: Vec::new(),
			unauthenticated: false,
		}
	}

	fn into_failure(self, error: TransferError) -> TransferResult {
		let mut message = error.to_string();
		if let Some(source_tx) = &self.source_tx {
			if !message.contains(source_tx.as_str()) {
				message.push_str(&format!(" (source transaction {})", source_tx));
			}
		}
		let mut result =
			TransferResult::failed(error.phase(), message, self.source_tx, self.attestation_id);
		result.completed_txs = self.completed_txs;
		result.unauthenticated = self.unauthenticated;
		result
	}
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
	if let Some(s) = payload.downcast_ref::<&str>() {
		s.to_string()
	} else if let Some(s) = payload.downcast_ref::<String>() {
		s.clone()
	} else {
		"unknown panic".to_string()
	}
}

/// Drives burn, attestation and mint for one transfer at a time.
///
/// Collaborators are shared and immutable, so one orchestrator can serve
/// concurrent transfers from separate tasks. Serializing transfers that debit
/// the same account is left to the caller.
pub struct TransferOrchestrator {
	source: Arc<dyn SourceChainInterface>,
	destination: Arc<dyn DestinationChainInterface>,
	poller: AttestationPoller,
	verifier: AuthorizationVerifier,
	settings: TransferSettings,
}

impl TransferOrchestrator {
	pub fn new(
		source: Arc<dyn SourceChainInterface>,
		destination: Arc<dyn DestinationChainInterface>,
		attestation: Arc<dyn AttestationInterface>,
		settings: TransferSettings,
	) -> Self {
		let verifier = AuthorizationVerifier::new(
			TypedDataSigner::new(settings.permit2),
			VerifierConfig {
				spender: source.address(),
				token: settings.token,
				allow_unauthenticated: settings.allow_unauthenticated,
				require_explicit_permit: settings.require_explicit_permit,
				reconstruction_deadline_offset: settings.permit_deadline_seconds,
			},
		);
		let poller = AttestationPoller::new(attestation, settings.poller.clone());

		Self {
			source,
			destination,
			poller,
			verifier,
			settings,
		}
	}

	pub fn settings(&self) -> &TransferSettings {
		&self.settings
	}

	/// Runs one transfer to completion.
	///
	/// Never fails and never panics: every error, including a panic inside a
	/// collaborator, becomes a failed result naming the phase and, once the
	/// burn was submitted, the source transaction.
	#[instrument(skip_all, fields(amount = %request.amount, delegated = request.is_delegated()))]
	pub async fn execute(&self, request: &TransferRequest) -> TransferResult {
		let mut progress = Progress::new();
		let outcome = AssertUnwindSafe(self.run(request, &mut progress))
			.catch_unwind()
			.await;

		let error = match outcome {
			Ok(Ok(mut result)) => {
				result.unauthenticated = progress.unauthenticated;
				return result;
			},
			Ok(Err(error)) => error,
			Err(payload) => TransferError::Internal {
				phase: progress.phase,
				message: panic_message(payload),
			},
		};

		error!(
			phase = %error.phase(),
			source_tx = progress.source_tx.as_deref().unwrap_or("none"),
			error = %error,
			"Transfer failed"
		);
		progress.into_failure(error)
	}

	async fn run(
		&self,
		request: &TransferRequest,
		progress: &mut Progress,
	) -> Result<TransferResult, TransferError> {
		// Validation
		progress.phase = TransferPhase::Validation;
		let amount = parse_token_amount(&request.amount, self.settings.token_decimals)
			.map_err(|e| TransferError::Validation(e.to_string()))?;

		let mint_recipient = match request.destination.as_deref() {
			Some(destination) => destination
				.parse::<Recipient>()
				.map_err(|e| TransferError::Validation(e.to_string()))?,
			None => self.destination.identity(),
		};

		let relayer = self.source.address();
		let delegation = match (&request.source_address, &request.authorization) {
			(Some(owner), Some(authorization)) => {
				let owner = owner.trim().parse::<Address>().map_err(|e| {
					TransferError::Validation(format!("Invalid source address '{}': {}", owner, e))
				})?;
				Some((owner, authorization))
			},
			_ => None,
		};

		// Authorization
		let mut signed_permit = None;
		let debit_from = match delegation {
			Some((owner, authorization)) => {
				progress.phase = TransferPhase::Authorization;
				let verification = self.verifier.verify(
					owner,
					amount,
					authorization,
					request.permit.as_ref(),
					Some(self.source.chain_id()),
				)?;

				match verification {
					Verification::Verified => {
						info!(owner = %owner, "Permit verified");
						if let (Authorization::Authenticated { signature }, Some(permit)) =
							(authorization, &request.permit)
						{
							signed_permit = Some(SignedPermit {
								permit: permit.clone(),
								signature: signature.clone(),
							});
						}
					},
					Verification::Reconstructed => {
						warn!(
							owner = %owner,
							"Signature matched a reconstructed permit; relying on an existing Permit2 allowance"
						);
					},
					Verification::Bypassed => {
						progress.unauthenticated = true;
						warn!(owner = %owner, "Authorization bypassed (UNAUTHENTICATED, non-production)");
					},
				}
				owner
			},
			None => relayer,
		};

		let burn = BurnRequest {
			source_domain: self.settings.source_domain,
			destination_domain: self.settings.destination_domain,
			debit_from,
			mint_recipient,
			amount,
			token: self.settings.token,
			permit: signed_permit,
		};

		// Source submission
		progress.phase = TransferPhase::SourceSubmission;
		match self.source.pending_nonce(relayer).await {
			Ok(nonce) => info!(relayer = %relayer, nonce, "Relayer pending nonce"),
			Err(e) => warn!(relayer = %relayer, error = %e, "Could not read relayer nonce"),
		}
		info!(
			amount = %format_token_amount(amount, self.settings.token_decimals),
			source_domain = burn.source_domain,
			destination_domain = burn.destination_domain,
			debit_from = %burn.debit_from,
			recipient = %burn.mint_recipient,
			"Submitting burn"
		);

		let receipt = match self.source.submit_burn(&burn).await {
			Ok(receipt) => receipt,
			Err(e) => {
				progress.completed_txs = e
					.completed_transactions()
					.iter()
					.map(ToString::to_string)
					.collect();
				if !progress.completed_txs.is_empty() {
					warn!(
						confirmed = ?progress.completed_txs,
						"Source submission failed after confirming transactions"
					);
				}
				return Err(TransferError::ChainSubmission {
					phase: TransferPhase::SourceSubmission,
					message: e.to_string(),
				});
			},
		};
		let source_tx = receipt.tx_hash.to_string();
		progress.source_tx = Some(source_tx.clone());
		let message_id = format!("0x{:x}", receipt.message_hash);
		info!(
			source_tx = %source_tx,
			message_hash = %truncate_id(&message_id),
			"Burn confirmed"
		);

		// Attestation
		progress.phase = TransferPhase::Attestation;
		let attestation = self
			.poller
			.poll(&receipt.attestation_request())
			.await
			.map_err(|e| match e {
				AttestationError::Timeout { elapsed_secs } => TransferError::AttestationTimeout {
					elapsed_secs,
					source_tx: source_tx.clone(),
				},
				other => TransferError::AttestationService {
					source_tx: source_tx.clone(),
					message: other.to_string(),
				},
			})?;
		let attestation_id = attestation.id();
		progress.attestation_id = Some(attestation_id.clone());

		// Destination submission
		progress.phase = TransferPhase::DestinationSubmission;
		let destination_tx = self
			.destination
			.submit_completion(&attestation)
			.await
			.map_err(|e| TransferError::ChainSubmission {
				phase: TransferPhase::DestinationSubmission,
				message: e.to_string(),
			})?;

		info!(
			source_tx = %source_tx,
			attestation_id = %truncate_id(&attestation_id),
			destination_tx = %destination_tx,
			"Transfer complete"
		);

		Ok(TransferResult::succeeded(
			source_tx,
			attestation_id,
			destination_tx.to_string(),
		))
	}
}
