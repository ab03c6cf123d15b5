use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	#[serde(default)]
	pub embedding: Embedding,
	#[serde(default)]
	pub rate_limit: RateLimit,
	#[serde(default)]
	pub cache: Cache,
	#[serde(default)]
	pub search: Search,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
}

/// OpenAI-compatible embedding endpoint. The request goes to `api_base` + `path`.
#[derive(Clone, Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	#[serde(default)]
	pub default_headers: Map<String, Value>,
}

/// Retry policy for throttled embedding calls.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Embedding {
	/// Total attempts, including the first call.
	pub max_attempts: u32,
	pub base_delay_ms: u64,
	pub max_delay_ms: u64,
}
impl Default for Embedding {
	fn default() -> Self {
		Self { max_attempts: 3, base_delay_ms: 1_000, max_delay_ms: 30_000 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RateLimit {
	pub max_requests: u32,
	/// Fractional seconds are allowed.
	pub window_seconds: f64,
	pub acquire_timeout_ms: u64,
}
impl Default for RateLimit {
	fn default() -> Self {
		Self { max_requests: 60, window_seconds: 60.0, acquire_timeout_ms: 5_000 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Cache {
	pub enabled: bool,
	pub similarity_threshold: f64,
	pub ttl_seconds: i64,
	pub max_entries: usize,
}
impl Default for Cache {
	fn default() -> Self {
		Self { enabled: true, similarity_threshold: 0.9, ttl_seconds: 3_600, max_entries: 1_000 }
	}
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Search {
	pub vector_weight: f64,
	pub text_weight: f64,
	pub default_limit: u32,
	pub max_limit: u32,
	/// Candidates fetched per signal are `limit * overfetch_factor`.
	pub overfetch_factor: u32,
	pub max_concurrent: usize,
}
impl Default for Search {
	fn default() -> Self {
		Self {
			vector_weight: 0.7,
			text_weight: 0.3,
			default_limit: 10,
			max_limit: 100,
			overfetch_factor: 2,
			max_concurrent: 10,
		}
	}
}
