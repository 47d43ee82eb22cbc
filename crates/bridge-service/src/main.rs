//! Main entry point for the bridge relayer.
//!
//! Runs a single cross-chain transfer: burn on the source chain, wait for the
//! attestation, mint on the destination chain. The result is printed to stdout
//! as JSON; logs go to stderr.

use bridge_config::Config;
use bridge_core::TransferOrchestrator;
use bridge_types::Authorization;
use clap::Parser;
use std::process::ExitCode;

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
	let args = Args::parse();

	// Initialize tracing with env filter
	use tracing_subscriber::{fmt, EnvFilter};

	let env_filter =
		EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

	fmt()
		.with_env_filter(env_filter)
		.with_writer(std::io::stderr)
		.with_thread_ids(true)
		.with_target(true)
		.init();

	let request = args.to_request()?;

	let config = Config::from_file(&args.config).await?;
	tracing::info!(
		network = %config.bridge.network,
		config = %args.config.display(),
		"Loaded configuration"
	);

	if request.authorization.is_some() && request.source_address.is_none() {
		tracing::warn!("--sig given without --from; running a direct transfer from the relayer");
	} else if request.is_delegated()
		&& matches!(request.authorization, Some(Authorization::Unauthenticated))
	{
		tracing::warn!(
			"UNAUTHENTICATED delegated transfer requested; signature checks are skipped. \
			 Never use this in production."
		);
	}

	let orchestrator = TransferOrchestrator::from_config(&config).await?;
	let result = orchestrator.execute(&request).await;

	println!("{}", serde_json::to_string_pretty(&result)?);

	if result.success {
		Ok(ExitCode::SUCCESS)
	} else {
		Ok(ExitCode::FAILURE)
	}
}
