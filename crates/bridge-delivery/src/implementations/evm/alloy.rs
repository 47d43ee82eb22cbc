//! Alloy-based EVM chain adapters.
//!
//! The source adapter burns through the TokenMessenger contract, pulling the
//! owner's tokens through Permit2 first when the relayer acts on someone
//! else's behalf. The destination adapter completes the mint by handing the
//! attested message to the MessageTransmitter.

use crate::{
	BurnReceipt, BurnRequest, DeliveryError, DestinationChainInterface, SignedPermit,
	SourceChainInterface,
};
use alloy_network::EthereumWallet;
use alloy_primitives::aliases::{U160, U48};
use alloy_primitives::{hex, keccak256, Address, Bytes, Log as PrimLog, U256};
use alloy_provider::{Provider, ProviderBuilder};
use alloy_rpc_types::{TransactionReceipt, TransactionRequest};
use alloy_signer::Signer;
use alloy_signer_local::PrivateKeySigner;
use alloy_sol_types::{sol, SolCall, SolEvent};
use alloy_transport_http::Http;
use async_trait::async_trait;
use bridge_config::{Config, ContractAddresses};
use bridge_permit::{clamp_to_uint160, clamp_to_uint48};
use bridge_types::{with_0x_prefix, Attestation, Recipient, SecretString, TransactionHash};
use std::sync::Arc;

// Contract interfaces used by the adapters.
sol! {
	interface IERC20 {
		function approve(address spender, uint256 amount) external returns (bool);
	}

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

	interface IPermit2 {
		function permit(address owner, PermitSingle memory permitSingle, bytes calldata signature) external;
		function transferFrom(address from, address to, uint160 amount, address token) external;
	}

	interface ITokenMessenger {
		function depositForBurn(
			uint256 amount,
			uint32 destinationDomain,
			bytes32 mintRecipient,
			address burnToken
		) external returns (uint64 nonce);
	}

	interface IMessageTransmitter {
		function receiveMessage(bytes calldata message, bytes calldata attestation) external returns (bool success);

		/// Emitted by the transmitter for every outbound message.
		event MessageSent(bytes message);
	}
}

type DynProvider = Arc<dyn Provider<Http<reqwest::Client>> + Send + Sync>;

fn parse_signer(key: &SecretString, side: &str) -> Result<PrivateKeySigner, DeliveryError> {
	key.with_exposed(|k| k.trim().parse::<PrivateKeySigner>())
		.map_err(|e| DeliveryError::Configuration(format!("Invalid {} private key: {}", side, e)))
}

fn build_provider(
	rpc_url: &str,
	signer: PrivateKeySigner,
	chain_id: u64,
) -> Result<DynProvider, DeliveryError> {
	let url = rpc_url
		.parse()
		.map_err(|e| DeliveryError::Configuration(format!("Invalid RPC URL {}: {}", rpc_url, e)))?;

	let wallet = EthereumWallet::from(signer.with_chain_id(Some(chain_id)));
	let provider = ProviderBuilder::new()
		.with_recommended_fillers()
		.wallet(wallet)
		.on_http(url);

	Ok(Arc::new(provider) as DynProvider)
}

/// Sends a transaction and waits for a successful receipt.
async fn send_and_confirm(
	provider: &DynProvider,
	to: Address,
	input: Vec<u8>,
	step: &str,
) -> Result<TransactionReceipt, DeliveryError> {
	let request = TransactionRequest::default().to(to).input(input.into());

	let pending = provider
		.send_transaction(request)
		.await
		.map_err(|e| DeliveryError::Network(format!("Failed to send {} transaction: {}", step, e)))?;

	let tx_hash = *pending.tx_hash();
	let hash_str = with_0x_prefix(&hex::encode(tx_hash.0));
	tracing::info!(tx_hash = %hash_str, step, "Submitted transaction");

	let receipt = pending.get_receipt().await.map_err(|e| {
		DeliveryError::Network(format!("Failed to get {} receipt for {}: {}", step, hash_str, e))
	})?;

	if !receipt.status() {
		return Err(DeliveryError::TransactionFailed(format!(
			"{} transaction {} reverted",
			step, hash_str
		)));
	}

	Ok(receipt)
}

/// Converts a permit into the Permit2 struct, applying field-width clamping.
fn permit_single(signed: &SignedPermit) -> PermitSingle {
	let permit = &signed.permit;
	PermitSingle {
		details: PermitDetails {
			token: permit.token,
			amount: to_uint160(permit.value),
			expiration: to_uint48(U256::from(permit.deadline)),
			nonce: to_uint48(permit.nonce),
		},
		spender: permit.spender,
		sigDeadline: U256::from(permit.deadline),
	}
}

fn to_uint160(value: U256) -> U160 {
	U160::from_be_slice(&clamp_to_uint160(value).to_be_bytes::<32>()[12..])
}

fn to_uint48(value: U256) -> U48 {
	U48::from_be_slice(&clamp_to_uint48(value).to_be_bytes::<32>()[26..])
}

/// Fails unless contract code is deployed at `address`.
///
/// A call to an address without code succeeds without doing anything, so a
/// misconfigured contract would otherwise look like a completed step.
async fn ensure_contract(
	provider: &DynProvider,
	address: Address,
	name: &str,
) -> Result<(), DeliveryError> {
	let code = provider.get_code_at(address).await.map_err(|e| {
		DeliveryError::Network(format!("Failed to read code of {} {}: {}", name, address, e))
	})?;
	if code.is_empty() {
		return Err(DeliveryError::Configuration(format!(
			"No contract deployed at {} address {}",
			name, address
		)));
	}
	Ok(())
}

/// Finds the `MessageSent` payload emitted by `transmitter`.
fn extract_message(logs: &[PrimLog], transmitter: Address) -> Result<Bytes, DeliveryError> {
	logs.iter()
		.filter(|log| log.address == transmitter)
		.find(|log| log.topics().first() == Some(&IMessageTransmitter::MessageSent::SIGNATURE_HASH))
		.ok_or_else(|| {
			DeliveryError::InvalidReceipt(format!(
				"No MessageSent event from {} in burn receipt",
				transmitter
			))
		})
		.and_then(|log| {
			IMessageTransmitter::MessageSent::decode_log(log, true)
				.map(|event| event.message.clone())
				.map_err(|e| {
					DeliveryError::InvalidReceipt(format!("Failed to decode MessageSent: {}", e))
				})
		})
}

/// Source chain adapter burning through the TokenMessenger.
pub struct AlloySourceChain {
	provider: DynProvider,
	address: Address,
	chain_id: u64,
	contracts: ContractAddresses,
}

impl AlloySourceChain {
	pub fn new(
		rpc_url: &str,
		signer: PrivateKeySigner,
		chain_id: u64,
		contracts: ContractAddresses,
	) -> Result<Self, DeliveryError> {
		let address = signer.address();
		let provider = build_provider(rpc_url, signer, chain_id)?;
		Ok(Self {
			provider,
			address,
			chain_id,
			contracts,
		})
	}

	/// Builds the adapter from the `[source]` section and checks that the
	/// protocol contracts exist on the source chain.
	pub async fn from_config(config: &Config) -> Result<Self, DeliveryError> {
		let signer = parse_signer(&config.source.private_key, "source")?;
		let contracts = config
			.source_contracts()
			.map_err(|e| DeliveryError::Configuration(e.to_string()))?;
		let chain = Self::new(&config.source.rpc_url, signer, config.source.chain_id, contracts)?;

		ensure_contract(&chain.provider, contracts.token_messenger, "token messenger").await?;
		ensure_contract(
			&chain.provider,
			contracts.message_transmitter,
			"source message transmitter",
		)
		.await?;
		ensure_contract(&chain.provider, contracts.permit2, "Permit2").await?;
		Ok(chain)
	}

	/// Moves the owner's tokens to the relayer through Permit2.
	///
	/// With a signed permit the allowance is registered first; without one the
	/// owner must already have granted the relayer a Permit2 allowance.
	async fn pull_from_owner(
		&self,
		request: &BurnRequest,
		completed: &mut Vec<TransactionHash>,
	) -> Result<(), DeliveryError> {
		let permit2 = self.contracts.permit2;

		if let Some(signed) = &request.permit {
			let call = IPermit2::permitCall {
				owner: signed.permit.owner,
				permitSingle: permit_single(signed),
				signature: signed.signature.0.clone(),
			};
			let receipt =
				send_and_confirm(&self.provider, permit2, call.abi_encode(), "permit2_permit").await?;
			completed.push(TransactionHash::from(receipt.transaction_hash));
		}

		let call = IPermit2::transferFromCall {
			from: request.debit_from,
			to: self.address,
			amount: to_uint160(request.amount),
			token: request.token,
		};
		let receipt = send_and_confirm(
			&self.provider,
			permit2,
			call.abi_encode(),
			"permit2_transfer_from",
		)
		.await?;
		completed.push(TransactionHash::from(receipt.transaction_hash));
		Ok(())
	}

	/// Runs every source-side step, recording each confirmed transaction in
	/// `completed` as it lands.
	async fn burn(
		&self,
		request: &BurnRequest,
		completed: &mut Vec<TransactionHash>,
	) -> Result<BurnReceipt, DeliveryError> {
		if request.is_delegated(self.address) {
			self.pull_from_owner(request, completed).await?;
		}

		let approve = IERC20::approveCall {
			spender: self.contracts.token_messenger,
			amount: request.amount,
		};
		let receipt = send_and_confirm(
			&self.provider,
			request.token,
			approve.abi_encode(),
			"approve",
		)
		.await?;
		completed.push(TransactionHash::from(receipt.transaction_hash));

		let burn = ITokenMessenger::depositForBurnCall {
			amount: request.amount,
			destinationDomain: request.destination_domain,
			mintRecipient: request.mint_recipient.0,
			burnToken: request.token,
		};
		let receipt = send_and_confirm(
			&self.provider,
			self.contracts.token_messenger,
			burn.abi_encode(),
			"deposit_for_burn",
		)
		.await?;
		let tx_hash = TransactionHash::from(receipt.transaction_hash);
		completed.push(tx_hash.clone());

		let logs: Vec<PrimLog> = receipt
			.inner
			.logs()
			.iter()
			.map(|log| log.inner.clone())
			.collect();
		let message = extract_message(&logs, self.contracts.message_transmitter)?;
		let message_hash = keccak256(&message);

		Ok(BurnReceipt {
			tx_hash,
			message,
			message_hash,
		})
	}
}

#[async_trait]
impl SourceChainInterface for AlloySourceChain {
	fn address(&self) -> Address {
		self.address
	}

	fn chain_id(&self) -> u64 {
		self.chain_id
	}

	async fn pending_nonce(&self, address: Address) -> Result<u64, DeliveryError> {
		self.provider
			.get_transaction_count(address)
			.pending()
			.await
			.map_err(|e| DeliveryError::Network(format!("Failed to get nonce: {}", e)))
	}

	async fn submit_burn(&self, request: &BurnRequest) -> Result<BurnReceipt, DeliveryError> {
		let mut completed = Vec::new();
		self.burn(request, &mut completed)
			.await
			.map_err(|e| e.after(&completed))
	}
}

/// Destination chain adapter completing mints through the MessageTransmitter.
pub struct AlloyDestinationChain {
	provider: DynProvider,
	address: Address,
	message_transmitter: Address,
}

impl AlloyDestinationChain {
	pub fn new(
		rpc_url: &str,
		signer: PrivateKeySigner,
		chain_id: u64,
		message_transmitter: Address,
	) -> Result<Self, DeliveryError> {
		let address = signer.address();
		let provider = build_provider(rpc_url, signer, chain_id)?;
		Ok(Self {
			provider,
			address,
			message_transmitter,
		})
	}

	/// Builds the adapter from the `[destination]` section, asking the node
	/// for its chain id when the config leaves it out, and checks that the
	/// message transmitter exists on the destination chain.
	pub async fn from_config(config: &Config) -> Result<Self, DeliveryError> {
		let signer = parse_signer(&config.destination.private_key, "destination")?;
		let rpc_url = &config.destination.rpc_url;

		let chain_id = match config.destination.chain_id {
			Some(id) => id,
			None => {
				let url = rpc_url.parse().map_err(|e| {
					DeliveryError::Configuration(format!("Invalid RPC URL {}: {}", rpc_url, e))
				})?;
				ProviderBuilder::new()
					.on_http(url)
					.get_chain_id()
					.await
					.map_err(|e| {
						DeliveryError::Network(format!("Failed to get destination chain id: {}", e))
					})?
			},
		};

		let message_transmitter = config
			.destination_message_transmitter()
			.map_err(|e| DeliveryError::Configuration(e.to_string()))?;
		let chain = Self::new(rpc_url, signer, chain_id, message_transmitter)?;
		ensure_contract(
			&chain.provider,
			message_transmitter,
			"destination message transmitter",
		)
		.await?;
		Ok(chain)
	}
}

#[async_trait]
impl DestinationChainInterface for AlloyDestinationChain {
	fn identity(&self) -> Recipient {
		Recipient::from_address(self.address)
	}

	async fn submit_completion(
		&self,
		attestation: &Attestation,
	) -> Result<TransactionHash, DeliveryError> {
		let call = IMessageTransmitter::receiveMessageCall {
			message: attestation.message.clone(),
			attestation: attestation.attestation.clone(),
		};
		let receipt = send_and_confirm(
			&self.provider,
			self.message_transmitter,
			call.abi_encode(),
			"receive_message",
		)
		.await?;

		Ok(TransactionHash::from(receipt.transaction_hash))
	}
}
