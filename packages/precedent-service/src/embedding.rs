use std::{sync::Arc, time::Duration};

use serde::Serialize;

use precedent_config::{Config, EmbeddingProviderConfig};
use precedent_providers::embedding::EmbeddingBatch;

use crate::{Cancellation, EmbeddingProvider, Error, RateLimiter, Result};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Embedding {
	pub text: String,
	pub vector: Vec<f32>,
	pub model: String,
	pub usage_tokens: u64,
}

/// Exponential backoff for throttled calls: the wait before retry `k` (zero-based) is
/// `base_delay * 2^k`, capped at `max_delay`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
	pub max_attempts: u32,
	pub base_delay: Duration,
	pub max_delay: Duration,
}
impl RetryPolicy {
	pub fn from_config(cfg: &precedent_config::Embedding) -> Self {
		Self {
			max_attempts: cfg.max_attempts.max(1),
			base_delay: Duration::from_millis(cfg.base_delay_ms),
			max_delay: Duration::from_millis(cfg.max_delay_ms),
		}
	}

	pub fn delay_for(&self, attempt: u32) -> Duration {
		let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);

		self.base_delay.saturating_mul(factor).min(self.max_delay)
	}
}

/// Turns text into vectors through the configured provider, behind the shared rate limiter.
///
/// Only provider throttling is retried. Any other provider failure surfaces immediately.
pub struct EmbeddingClient {
	provider: Arc<dyn EmbeddingProvider>,
	cfg: EmbeddingProviderConfig,
	limiter: Arc<RateLimiter>,
	retry: RetryPolicy,
	acquire_timeout: Duration,
}
impl EmbeddingClient {
	pub fn new(
		provider: Arc<dyn EmbeddingProvider>,
		cfg: EmbeddingProviderConfig,
		limiter: Arc<RateLimiter>,
		retry: RetryPolicy,
		acquire_timeout: Duration,
	) -> Self {
		Self { provider, cfg, limiter, retry, acquire_timeout }
	}

	pub fn from_config(
		cfg: &Config,
		provider: Arc<dyn EmbeddingProvider>,
		limiter: Arc<RateLimiter>,
	) -> Self {
		Self::new(
			provider,
			cfg.providers.embedding.clone(),
			limiter,
			RetryPolicy::from_config(&cfg.embedding),
			Duration::from_millis(cfg.rate_limit.acquire_timeout_ms),
		)
	}

	pub fn limiter(&self) -> &RateLimiter {
		&self.limiter
	}

	pub async fn embed(&self, text: &str, cancel: &Cancellation) -> Result<Embedding> {
		let mut embeddings = self.embed_batch(&[text.to_string()], cancel).await?;

		embeddings.pop().ok_or_else(|| Error::Provider {
			message: "Embedding provider returned no vectors.".to_string(),
		})
	}

	/// One provider call for all inputs. Usage tokens are split evenly across the results, with
	/// the remainder going to the earliest ones.
	pub async fn embed_batch(
		&self,
		texts: &[String],
		cancel: &Cancellation,
	) -> Result<Vec<Embedding>> {
		if texts.is_empty() {
			return Err(Error::validation("texts must be non-empty."));
		}
		if texts.iter().any(|text| text.trim().is_empty()) {
			return Err(Error::validation("text must be non-empty."));
		}

		let batch = self.call_with_retry(texts, cancel).await?;

		if batch.vectors.len() != texts.len() {
			return Err(Error::Provider {
				message: format!(
					"Embedding provider returned {} vectors for {} inputs.",
					batch.vectors.len(),
					texts.len()
				),
			});
		}

		Ok(split_batch(texts, batch))
	}

	async fn call_with_retry(
		&self,
		texts: &[String],
		cancel: &Cancellation,
	) -> Result<EmbeddingBatch> {
		let max_attempts = self.retry.max_attempts.max(1);
		let mut last_err = None;

		for attempt in 0..max_attempts {
			cancel.check()?;

			let admitted = tokio::select! {
				_ = cancel.cancelled() => return Err(Error::Cancelled),
				admitted = self.limiter.acquire(self.acquire_timeout) => admitted,
			};

			if !admitted {
				return Err(Error::RateLimitExceeded {
					message: "Local embedding rate limit exhausted.".to_string(),
					source: None,
				});
			}

			match self.provider.embed(&self.cfg, texts).await {
				Ok(batch) => return Ok(batch),
				Err(err) if err.is_throttled() => {
					tracing::warn!(
						error = %err,
						attempt = attempt + 1,
						max_attempts,
						"Embedding provider throttled the request."
					);

					last_err = Some(err);

					if attempt + 1 < max_attempts {
						let delay = self.retry.delay_for(attempt);

						tokio::select! {
							_ = cancel.cancelled() => return Err(Error::Cancelled),
							_ = tokio::time::sleep(delay) => {},
						}
					}
				},
				Err(err) => return Err(Error::Provider { message: err.to_string() }),
			}
		}

		Err(Error::RateLimitExceeded {
			message: format!("Embedding provider still throttled after {max_attempts} attempts."),
			source: last_err.map(Box::new),
		})
	}
}

fn split_batch(texts: &[String], batch: EmbeddingBatch) -> Vec<Embedding> {
	let count = texts.len() as u64;
	let share = batch.total_tokens / count;
	let remainder = batch.total_tokens % count;

	texts
		.iter()
		.zip(batch.vectors)
		.enumerate()
		.map(|(idx, (text, vector))| Embedding {
			text: text.clone(),
			vector,
			model: batch.model.clone(),
			usage_tokens: share + u64::from((idx as u64) < remainder),
		})
		.collect()
}
