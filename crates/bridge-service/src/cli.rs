//! Command-line arguments and their mapping onto a transfer request.

use bridge_types::{Authorization, Permit, PermitSignature, TransferRequest};
use clap::Parser;
use std::path::PathBuf;
use thiserror::Error;

/// Literal `--sig` values that select the unauthenticated path.
const BYPASS_TOKENS: [&str; 2] = ["unauthenticated", "dummy"];

/// Command-line arguments for the bridge relayer.
#[derive(Parser, Debug)]
#[command(author, version, about = "Relay a token transfer across chains", long_about = None)]
pub struct Args {
	/// Path to configuration file
	#[arg(short, long, default_value = "config.toml")]
	pub config: PathBuf,

	/// Log level (trace, debug, info, warn, error)
	#[arg(short, long, default_value = "info")]
	pub log_level: String,

	/// Decimal token amount to transfer, e.g. 1.5
	#[arg(short, long)]
	pub amount: String,

	/// Recipient on the destination chain (20- or 32-byte hex)
	#[arg(long)]
	pub to: Option<String>,

	/// Token owner on the source chain, for delegated transfers
	#[arg(long)]
	pub from: Option<String>,

	/// Owner's permit signature, or "unauthenticated" for test environments
	#[arg(long)]
	pub sig: Option<String>,

	/// The signed permit as JSON
	#[arg(long)]
	pub permit_data: Option<String>,
}

/// Errors in user-supplied arguments.
#[derive(Debug, Error)]
pub enum CliError {
	#[error("Invalid --sig: {0}")]
	Signature(String),
	#[error("Invalid --permit-data: {0}")]
	PermitData(String),
}

/// Maps a `--sig` value onto an authorization.
pub fn parse_authorization(raw: &str) -> Result<Authorization, CliError> {
	let trimmed = raw.trim();
	if BYPASS_TOKENS
		.iter()
		.any(|token| trimmed.eq_ignore_ascii_case(token))
	{
		return Ok(Authorization::Unauthenticated);
	}
	let signature = trimmed
		.parse::<PermitSignature>()
		.map_err(|e| CliError::Signature(e.to_string()))?;
	Ok(Authorization::Authenticated { signature })
}

impl Args {
	/// Builds the transfer request described by the arguments.
	pub fn to_request(&self) -> Result<TransferRequest, CliError> {
		let authorization = self
			.sig
			.as_deref()
			.map(parse_authorization)
			.transpose()?;
		let permit = self
			.permit_data
			.as_deref()
			.map(|json| {
				serde_json::from_str::<Permit>(json).map_err(|e| CliError::PermitData(e.to_string()))
			})
			.transpose()?;

		Ok(TransferRequest {
			amount: self.amount.clone(),
			destination: self.to.clone(),
			source_address: self.from.clone(),
			authorization,
			permit,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(args: &[&str]) -> Args {
		Args::try_parse_from(std::iter::once("bridge").chain(args.iter().copied())).unwrap()
	}

	#[test]
	fn test_direct_transfer_args() {
		let args = parse(&["--amount", "1.5", "--to", "0x5fbdb2315678afecb367f032d93f642f64180aa3"]);
		let request = args.to_request().unwrap();

		assert_eq!(request.amount, "1.5");
		assert!(!request.is_delegated());
		assert_eq!(args.config, PathBuf::from("config.toml"));
		assert_eq!(args.log_level, "info");
	}

	#[test]
	fn test_bypass_tokens() {
		assert_eq!(
			parse_authorization("unauthenticated").unwrap(),
			Authorization::Unauthenticated
		);
		assert_eq!(
			parse_authorization("DUMMY").unwrap(),
			Authorization::Unauthenticated
		);
		assert!(parse_authorization("0x1234").is_err());
	}

	#[test]
	fn test_delegated_args_with_permit() {
		let signature = format!("0x{}1b", "11".repeat(64));
		let permit = r#"{
			"owner": "0x5fbdb2315678afecb367f032d93f642f64180aa3",
			"spender": "0xf39fd6e51aad88f6f4ce6ab8827279cfffb92266",
			"token": "0x1c7d4b196cb0c7b01d743fbc6116a902379c7238",
			"value": "2500000",
			"nonce": "0",
			"deadline": 1900000000
		}"#;
		let args = parse(&[
			"--amount",
			"2.5",
			"--from",
			"0x5fbdb2315678afecb367f032d93f642f64180aa3",
			"--sig",
			&signature,
			"--permit-data",
			permit,
		]);
		let request = args.to_request().unwrap();

		assert!(request.is_delegated());
		assert!(matches!(
			request.authorization,
			Some(Authorization::Authenticated { .. })
		));
		assert_eq!(request.permit.unwrap().deadline, 1_900_000_000);
	}

	#[test]
	fn test_bad_permit_json() {
		let args = parse(&["--amount", "1", "--permit-data", "{not json"]);
		assert!(matches!(args.to_request(), Err(CliError::PermitData(_))));
	}
}
