use crate::{AttestationError, AttestationInterface, AttestationStatus};
use bridge_config::AttestationConfig;
use bridge_types::{truncate_id, Attestation, AttestationRequest};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, info};

/// Timing parameters for attestation polling.
#[derive(Debug, Clone)]
pub struct PollerConfig {
	/// Overall deadline across all attempts.
	pub timeout: Duration,
	/// Sleep after the first pending attempt.
	pub initial_interval: Duration,
	/// Upper bound for any single sleep.
	pub max_interval: Duration,
	/// Growth factor applied after each pending attempt.
	pub backoff_multiplier: f64,
	/// Deadline for a single query.
	pub request_timeout: Duration,
}

impl Default for PollerConfig {
	fn default() -> Self {
		Self {
			timeout: Duration::from_secs(180),
			initial_interval: Duration::from_secs(2),
			max_interval: Duration::from_secs(30),
			backoff_multiplier: 1.5,
			request_timeout: Duration::from_secs(10),
		}
	}
}

impl PollerConfig {
	pub fn from_config(config: &AttestationConfig) -> Self {
		Self {
			timeout: config.timeout(),
			initial_interval: config.initial_interval(),
			max_interval: config.max_interval(),
			backoff_multiplier: config.backoff_multiplier,
			request_timeout: config.request_timeout(),
		}
	}

	/// Interval that follows `current`, capped at `max_interval`.
	pub fn next_interval(&self, current: Duration) -> Duration {
		current
			.mul_f64(self.backoff_multiplier)
			.min(self.max_interval)
	}

	/// Sleeps the poller would take if every attempt returned instantly as
	/// pending. The sum never exceeds `timeout`.
	pub fn backoff_schedule(&self) -> Vec<Duration> {
		let mut schedule = Vec::new();
		let mut interval = self.initial_interval;
		let mut elapsed = Duration::ZERO;

		while elapsed < self.timeout && !interval.is_zero() {
			let sleep = interval.min(self.timeout - elapsed);
			schedule.push(sleep);
			elapsed += sleep;
			interval = self.next_interval(interval);
		}
		schedule
	}
}

/// Waits for an attestation with bounded exponential backoff.
///
/// Each query is capped by `request_timeout`; an elapsed query counts as
/// pending. Service errors other than pending end polling immediately.
pub struct AttestationPoller {
	service: Arc<dyn AttestationInterface>,
	config: PollerConfig,
}

impl AttestationPoller {
	pub fn new(service: Arc<dyn AttestationInterface>, config: PollerConfig) -> Self {
		Self { service, config }
	}

	pub fn config(&self) -> &PollerConfig {
		&self.config
	}

	pub fn backoff_schedule(&self) -> Vec<Duration> {
		self.config.backoff_schedule()
	}

	/// Polls until an attestation is available or the overall deadline passes.
	pub async fn poll(&self, request: &AttestationRequest) -> Result<Attestation, AttestationError> {
		let start = Instant::now();
		let deadline = start + self.config.timeout;
		let message_id = format!("0x{:x}", request.message_hash);
		let mut interval = self.config.initial_interval;
		let mut attempt: u32 = 0;

		loop {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				break;
			}
			attempt += 1;

			let per_attempt = self.config.request_timeout.min(remaining);
			match tokio::time::timeout(per_attempt, self.service.query(request, per_attempt)).await
			{
				Ok(Ok(AttestationStatus::Ready(attestation))) if !attestation.is_empty() => {
					info!(
						message_hash = %truncate_id(&message_id),
						attempt,
						elapsed_secs = start.elapsed().as_secs(),
						"Attestation received"
					);
					return Ok(attestation);
				},
				Ok(Ok(_)) => {
					debug!(
						message_hash = %truncate_id(&message_id),
						attempt,
						"Attestation pending"
					);
				},
				Ok(Err(e)) => return Err(e),
				Err(_) => {
					debug!(
						message_hash = %truncate_id(&message_id),
						attempt,
						timeout_ms = per_attempt.as_millis() as u64,
						"Attestation query timed out"
					);
				},
			}

			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				break;
			}
			tokio::time::sleep(interval.min(remaining)).await;
			interval = self.config.next_interval(interval);
		}

		Err(AttestationError::Timeout {
			elapsed_secs: start.elapsed().as_secs(),
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use alloy_primitives::{Bytes, B256};
	use async_trait::async_trait;
	use bridge_types::TransactionHash;
	use std::sync::atomic::{AtomicU32, Ordering};
	use std::sync::Mutex;

	/// Answers pending until `ready_after` calls have been made.
	struct ScriptedService {
		calls: AtomicU32,
		ready_after: u32,
		call_times: Mutex<Vec<Instant>>,
	}

	impl ScriptedService {
		fn new(ready_after: u32) -> Self {
			Self {
				calls: AtomicU32::new(0),
				ready_after,
				call_times: Mutex::new(Vec::new()),
			}
		}
	}

	#[async_trait]
	impl AttestationInterface for ScriptedService {
		async fn query(
			&self,
			request: &AttestationRequest,
			_timeout: Duration,
		) -> Result<AttestationStatus, AttestationError> {
			self.call_times.lock().unwrap().push(Instant::now());
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
			if call >= self.ready_after {
				Ok(AttestationStatus::Ready(Attestation {
					message_hash: request.message_hash,
					message: request.message.clone(),
					attestation: Bytes::from(vec![0xaa; 65]),
				}))
			} else {
				Ok(AttestationStatus::Pending)
			}
		}
	}

	struct HangingService;

	#[async_trait]
	impl AttestationInterface for HangingService {
		async fn query(
			&self,
			_request: &AttestationRequest,
			_timeout: Duration,
		) -> Result<AttestationStatus, AttestationError> {
			std::future::pending().await
		}
	}

	struct FailingService {
		calls: AtomicU32,
	}

	#[async_trait]
	impl AttestationInterface for FailingService {
		async fn query(
			&self,
			_request: &AttestationRequest,
			_timeout: Duration,
		) -> Result<AttestationStatus, AttestationError> {
			self.calls.fetch_add(1, Ordering::SeqCst);
			Err(AttestationError::Service("HTTP 500: internal error".into()))
		}
	}

	fn request() -> AttestationRequest {
		AttestationRequest {
			message_hash: B256::repeat_byte(0x42),
			message: Bytes::from(vec![1, 2, 3]),
			source_tx: TransactionHash(vec![0xab; 32]),
		}
	}

	#[test]
	fn test_backoff_schedule_bounds() {
		let config = PollerConfig::default();
		let schedule = config.backoff_schedule();

		assert_eq!(schedule[0], Duration::from_millis(2000));
		assert_eq!(schedule[1], Duration::from_millis(3000));
		assert_eq!(schedule[2], Duration::from_millis(4500));
		assert!(schedule.iter().all(|d| *d <= Duration::from_millis(30_000)));
		let total: Duration = schedule.iter().sum();
		assert_eq!(total, Duration::from_secs(180));
	}

	#[test]
	fn test_schedule_is_non_decreasing_until_last_sleep() {
		let schedule = PollerConfig::default().backoff_schedule();
		let body = &schedule[..schedule.len() - 1];
		assert!(body.windows(2).all(|w| w[0] <= w[1]));
	}

	#[tokio::test(start_paused = true)]
	async fn test_returns_once_ready() {
		let service = Arc::new(ScriptedService::new(3));
		let poller = AttestationPoller::new(service.clone(), PollerConfig::default());

		let start = Instant::now();
		let attestation = poller.poll(&request()).await.unwrap();

		assert_eq!(attestation.message_hash, B256::repeat_byte(0x42));
		assert_eq!(attestation.message, Bytes::from(vec![1, 2, 3]));
		assert_eq!(service.calls.load(Ordering::SeqCst), 3);
		// Two sleeps: 2s then 3s
		assert_eq!(start.elapsed(), Duration::from_secs(5));

		let times = service.call_times.lock().unwrap();
		assert_eq!(times[1] - times[0], Duration::from_secs(2));
		assert_eq!(times[2] - times[1], Duration::from_secs(3));
	}

	#[tokio::test(start_paused = true)]
	async fn test_times_out_at_overall_deadline() {
		let service = Arc::new(ScriptedService::new(u32::MAX));
		let poller = AttestationPoller::new(service.clone(), PollerConfig::default());

		let start = Instant::now();
		let err = poller.poll(&request()).await.unwrap_err();

		assert!(matches!(err, AttestationError::Timeout { elapsed_secs: 180 }));
		assert!(err.to_string().contains("180"));
		assert!(start.elapsed() < Duration::from_secs(181));
		// One attempt per scheduled sleep
		assert_eq!(
			service.calls.load(Ordering::SeqCst) as usize,
			poller.backoff_schedule().len()
		);
	}

	#[tokio::test(start_paused = true)]
	async fn test_hanging_attempts_are_cut_off() {
		let poller = AttestationPoller::new(
			Arc::new(HangingService),
			PollerConfig {
				timeout: Duration::from_secs(60),
				..PollerConfig::default()
			},
		);

		let start = Instant::now();
		let err = poller.poll(&request()).await.unwrap_err();

		assert!(matches!(err, AttestationError::Timeout { elapsed_secs: 60 }));
		assert_eq!(start.elapsed(), Duration::from_secs(60));
	}

	#[tokio::test(start_paused = true)]
	async fn test_service_error_is_not_retried() {
		let service = Arc::new(FailingService {
			calls: AtomicU32::new(0),
		});
		let poller = AttestationPoller::new(service.clone(), PollerConfig::default());

		let start = Instant::now();
		let err = poller.poll(&request()).await.unwrap_err();

		assert!(matches!(err, AttestationError::Service(_)));
		assert_eq!(service.calls.load(Ordering::SeqCst), 1);
		assert_eq!(start.elapsed(), Duration::ZERO);
	}

	#[test]
	fn test_from_config() {
		let config = AttestationConfig {
			timeout_seconds: 30,
			initial_interval_ms: 500,
			..AttestationConfig::default()
		};
		let poller_config = PollerConfig::from_config(&config);
		assert_eq!(poller_config.timeout, Duration::from_secs(30));
		assert_eq!(poller_config.initial_interval, Duration::from_millis(500));
		assert_eq!(poller_config.max_interval, Duration::from_secs(30));
	}
}
