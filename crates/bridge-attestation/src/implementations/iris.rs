//! HTTP client for the Iris attestation API.
//!
//! Looks up attestations with `GET {base}/v1/attestations/{messageHash}`. The
//! service answers 404 until it has seen the burn, then reports
//! `pending_confirmations` until the source block is final, then `complete`
//! with the attestation bytes.

use crate::{AttestationError, AttestationInterface, AttestationStatus};
use alloy_primitives::{hex, Bytes};
use async_trait::async_trait;
use bridge_types::{without_0x_prefix, Attestation, AttestationRequest};
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

/// Body returned by the attestation endpoint.
#[derive(Debug, Deserialize)]
struct IrisResponse {
	#[serde(default)]
	attestation: Option<String>,
	#[serde(default)]
	status: Option<String>,
	#[serde(default)]
	error: Option<String>,
}

/// Attestation service client backed by `reqwest`.
pub struct IrisAttestation {
	client: reqwest::Client,
	base_url: String,
}

impl IrisAttestation {
	pub fn new(base_url: impl Into<String>) -> Result<Self, AttestationError> {
		let client = reqwest::Client::builder()
			.build()
			.map_err(|e| AttestationError::Network(format!("Failed to build HTTP client: {}", e)))?;
		Ok(Self::with_client(client, base_url))
	}

	pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		}
	}

	fn attestation_url(&self, request: &AttestationRequest) -> String {
		format!(
			"{}/v1/attestations/0x{:x}",
			self.base_url, request.message_hash
		)
	}
}

/// Maps an HTTP status and body to an attestation status.
fn interpret_response(
	status: StatusCode,
	body: &str,
	request: &AttestationRequest,
) -> Result<AttestationStatus, AttestationError> {
	if status == StatusCode::NOT_FOUND {
		return Ok(AttestationStatus::Pending);
	}

	if !status.is_success() {
		return Err(AttestationError::Service(format!(
			"HTTP {}: {}",
			status.as_u16(),
			body.trim()
		)));
	}

	let response: IrisResponse = serde_json::from_str(body)
		.map_err(|e| AttestationError::InvalidResponse(format!("{}: {}", e, body.trim())))?;

	if let Some(error) = response.error {
		return Err(AttestationError::Service(error));
	}

	match response.status.as_deref() {
		Some("complete") => {},
		Some("pending_confirmations") | Some("pending") | None => {
			return Ok(AttestationStatus::Pending);
		},
		Some(other) => {
			return Err(AttestationError::Service(format!(
				"Unexpected attestation status '{}'",
				other
			)));
		},
	}

	let raw = match response.attestation.as_deref() {
		Some(value) if !value.eq_ignore_ascii_case("PENDING") => value,
		_ => return Ok(AttestationStatus::Pending),
	};
	let attestation = hex::decode(without_0x_prefix(raw))
		.map_err(|e| AttestationError::InvalidResponse(format!("Attestation is not hex: {}", e)))?;

	Ok(AttestationStatus::Ready(Attestation {
		message_hash: request.message_hash,
		message: request.message.clone(),
		attestation: Bytes::from(attestation),
	}))
}

#[async_trait]
impl AttestationInterface for IrisAttestation {
	async fn query(
		&self,
		request: &AttestationRequest,
		timeout: Duration,
	) -> Result<AttestationStatus, AttestationError> {
		let url = self.attestation_url(request);
		tracing::debug!(url = %url, "Querying attestation service");

		let response = match self.client.get(&url).timeout(timeout).send().await {
			Ok(response) => response,
			Err(e) if e.is_timeout() => return Ok(timed_out(&url, timeout)),
			Err(e) => {
				return Err(AttestationError::Network(format!(
					"Request to {} failed: {}",
					url, e
				)))
			},
		};

		let status = response.status();
		let body = match response.text().await {
			Ok(body) => body,
			Err(e) if e.is_timeout() => return Ok(timed_out(&url, timeout)),
			Err(e) => {
				return Err(AttestationError::Network(format!(
					"Failed to read response: {}",
					e
				)))
			},
		};

		interpret_response(status, &body, request)
	}
}

/// A query that ran out of time has not produced an attestation yet.
fn timed_out(url: &str, timeout: Duration) -> AttestationStatus {
	tracing::debug!(
		url = %url,
		timeout_ms = timeout.as_millis() as u64,
		"Attestation request timed out"
	);
	AttestationStatus::Pending
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::B256;
	use bridge_types::TransactionHash;

	fn request() -> AttestationRequest {
		AttestationRequest {
			message_hash: B256::repeat_byte(0x0f),
			message: Bytes::from(vec![9, 9]),
			source_tx: TransactionHash(vec![1; 32]),
		}
	}

	#[test]
	fn test_url_uses_prefixed_hash() {
		let client = IrisAttestation::with_client(
			reqwest::Client::new(),
			"https://iris-api-sandbox.circle.com/",
		);
		assert_eq!(
			client.attestation_url(&request()),
			format!(
				"https://iris-api-sandbox.circle.com/v1/attestations/0x{}",
				"0f".repeat(32)
			)
		);
	}

	#[test]
	fn test_not_found_is_pending() {
		let status = interpret_response(
			StatusCode::NOT_FOUND,
			r#"{"error":"Message hash not found"}"#,
			&request(),
		)
		.unwrap();
		assert_eq!(status, AttestationStatus::Pending);
	}

	#[test]
	fn test_pending_confirmations() {
		let status = interpret_response(
			StatusCode::OK,
			r#"{"attestation":"PENDING","status":"pending_confirmations"}"#,
			&request(),
		)
		.unwrap();
		assert_eq!(status, AttestationStatus::Pending);
	}

	#[test]
	fn test_complete_attestation() {
		let status = interpret_response(
			StatusCode::OK,
			r#"{"attestation":"0xdeadbeef","status":"complete"}"#,
			&request(),
		)
		.unwrap();
		let AttestationStatus::Ready(attestation) = status else {
			panic!("expected ready attestation");
		};
		assert_eq!(attestation.attestation, Bytes::from(vec![0xde, 0xad, 0xbe, 0xef]));
		assert_eq!(attestation.message, Bytes::from(vec![9, 9]));
		assert_eq!(attestation.message_hash, B256::repeat_byte(0x0f));
	}

	#[test]
	fn test_server_error_is_not_pending() {
		let err =
			interpret_response(StatusCode::INTERNAL_SERVER_ERROR, "boom", &request()).unwrap_err();
		assert!(matches!(err, AttestationError::Service(_)));
		assert!(err.to_string().contains("500"));
	}

	/// Accepts connections and never answers.
	async fn silent_server() -> String {
		let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap();
		tokio::spawn(async move {
			let mut held = Vec::new();
			while let Ok((socket, _)) = listener.accept().await {
				held.push(socket);
			}
		});
		format!("http://{}", addr)
	}

	#[tokio::test]
	async fn test_unanswered_request_is_pending() {
		let client = IrisAttestation::new(silent_server().await).unwrap();
		let status = client
			.query(&request(), Duration::from_millis(200))
			.await
			.unwrap();
		assert_eq!(status, AttestationStatus::Pending);
	}

	#[tokio::test]
	async fn test_unanswered_service_polls_until_deadline() {
		let client = IrisAttestation::new(silent_server().await).unwrap();
		let poller = crate::AttestationPoller::new(
			std::sync::Arc::new(client),
			crate::PollerConfig {
				timeout: Duration::from_millis(1500),
				initial_interval: Duration::from_millis(100),
				max_interval: Duration::from_millis(200),
				backoff_multiplier: 1.5,
				request_timeout: Duration::from_millis(200),
			},
		);

		let started = std::time::Instant::now();
		let err = poller.poll(&request()).await.unwrap_err();
		assert!(matches!(err, AttestationError::Timeout { .. }));
		assert!(started.elapsed() >= Duration::from_millis(1400));
	}

	#[test]
	fn test_malformed_body() {
		let err = interpret_response(StatusCode::OK, "not json", &request()).unwrap_err();
		assert!(matches!(err, AttestationError::InvalidResponse(_)));
	}
}
