mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Cache, Config, Embedding, EmbeddingProviderConfig, Postgres, Providers, Qdrant, RateLimit,
	Search, Service, Storage,
};

use std::{fs, path::Path};

/// Allowed drift of `vector + text` from 1.0, so fused scores stay within [0, 1].
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

pub fn weights_sum_to_one(vector: f64, text: f64) -> bool {
	((vector + text) - 1.0).abs() <= WEIGHT_SUM_TOLERANCE
}

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;

	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::validation("service.http_bind must be non-empty."));
	}
	if cfg.storage.postgres.pool_max_conns == 0 {
		return Err(Error::validation("storage.postgres.pool_max_conns must be greater than zero."));
	}
	if cfg.storage.qdrant.collection.is_empty() {
		return Err(Error::validation("storage.qdrant.collection must be non-empty."));
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::validation(
			"providers.embedding.dimensions must be greater than zero.",
		));
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::validation(
			"providers.embedding.dimensions must match storage.qdrant.vector_dim.",
		));
	}
	if cfg.providers.embedding.api_key.trim().is_empty() {
		return Err(Error::validation("Provider embedding api_key must be non-empty."));
	}
	if cfg.providers.embedding.timeout_ms == 0 {
		return Err(Error::validation(
			"providers.embedding.timeout_ms must be greater than zero.",
		));
	}
	if cfg.embedding.max_attempts == 0 {
		return Err(Error::validation("embedding.max_attempts must be greater than zero."));
	}
	if cfg.embedding.max_delay_ms < cfg.embedding.base_delay_ms {
		return Err(Error::validation(
			"embedding.max_delay_ms must be at least embedding.base_delay_ms.",
		));
	}
	if cfg.rate_limit.max_requests == 0 {
		return Err(Error::validation("rate_limit.max_requests must be greater than zero."));
	}
	if !cfg.rate_limit.window_seconds.is_finite() || cfg.rate_limit.window_seconds <= 0.0 {
		return Err(Error::validation(
			"rate_limit.window_seconds must be a finite number greater than zero.",
		));
	}
	if !(0.0..=1.0).contains(&cfg.cache.similarity_threshold) {
		return Err(Error::validation("cache.similarity_threshold must be in the range 0.0-1.0."));
	}
	if cfg.cache.ttl_seconds <= 0 {
		return Err(Error::validation("cache.ttl_seconds must be greater than zero."));
	}
	if cfg.cache.max_entries == 0 {
		return Err(Error::validation("cache.max_entries must be greater than zero."));
	}

	let weights = [
		("search.vector_weight", cfg.search.vector_weight),
		("search.text_weight", cfg.search.text_weight),
	];

	for (label, weight) in weights {
		if !weight.is_finite() {
			return Err(Error::validation(format!("{label} must be a finite number.")));
		}
		if weight < 0.0 {
			return Err(Error::validation(format!("{label} must be zero or greater.")));
		}
	}

	if !weights_sum_to_one(cfg.search.vector_weight, cfg.search.text_weight) {
		return Err(Error::validation(
			"search.vector_weight and search.text_weight must sum to 1.0.",
		));
	}
	if cfg.search.default_limit == 0 {
		return Err(Error::validation("search.default_limit must be greater than zero."));
	}
	if cfg.search.max_limit < cfg.search.default_limit {
		return Err(Error::validation(
			"search.max_limit must be at least search.default_limit.",
		));
	}
	if cfg.search.overfetch_factor == 0 {
		return Err(Error::validation("search.overfetch_factor must be greater than zero."));
	}
	if cfg.search.max_concurrent == 0 {
		return Err(Error::validation("search.max_concurrent must be greater than zero."));
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	cfg.storage.qdrant.collection = cfg.storage.qdrant.collection.trim().to_string();
	cfg.providers.embedding.api_base =
		cfg.providers.embedding.api_base.trim_end_matches('/').to_string();

	if cfg.service.log_level.trim().is_empty() {
		cfg.service.log_level = "info".to_string();
	}
}
