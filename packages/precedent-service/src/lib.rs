pub mod cache;
pub mod cancel;
pub mod embedding;
pub mod index;
pub mod rate_limit;
pub mod records;
pub mod search;

mod error;

pub use cache::{CacheStats, ResponseCache};
pub use cancel::Cancellation;
pub use embedding::{Embedding, EmbeddingClient, RetryPolicy};
pub use error::{Error, Result};
pub use index::{
	LexicalHit, LexicalQuery, SearchFilter, VectorHit, VectorPoint, VectorQuery,
	lexical::PgLexicalIndex, vector::QdrantVectorIndex,
};
pub use rate_limit::RateLimiter;
pub use records::{
	AddTagRequest, CreateRecordRequest, FindSimilarRequest, FindSimilarResponse, Record,
	SimilarRecord, UpdateTextRequest,
};
pub use search::{
	HybridOutcome, HybridQuery, HybridSearchEngine, SearchResult, SearchStatus, SearchWeights,
};

use std::{future::Future, pin::Pin, sync::Arc};

use tokio::sync::Semaphore;
use uuid::Uuid;

use precedent_config::{Config, EmbeddingProviderConfig};
use precedent_domain::TenantId;
use precedent_providers::embedding::{self as provider_embedding, EmbeddingBatch};
use precedent_storage::{db::Db, qdrant::QdrantStore};

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, precedent_providers::Result<EmbeddingBatch>>;
}

/// Dense nearest-neighbour index. Every query and mutation is scoped to one tenant.
pub trait VectorIndex
where
	Self: Send + Sync,
{
	fn upsert<'a>(&'a self, point: &'a VectorPoint) -> BoxFuture<'a, Result<()>>;

	fn search<'a>(&'a self, query: &'a VectorQuery) -> BoxFuture<'a, Result<Vec<VectorHit>>>;

	fn delete<'a>(&'a self, tenant: &'a TenantId, record_id: Uuid) -> BoxFuture<'a, Result<()>>;

	fn set_tags<'a>(
		&'a self,
		tenant: &'a TenantId,
		record_id: Uuid,
		tags: &'a [String],
	) -> BoxFuture<'a, Result<()>>;
}

/// Ranked full-text index. Scores are already normalized into 0.0-1.0.
pub trait LexicalIndex
where
	Self: Send + Sync,
{
	fn search<'a>(&'a self, query: &'a LexicalQuery) -> BoxFuture<'a, Result<Vec<LexicalHit>>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
}
impl Providers {
	pub fn new(embedding: Arc<dyn EmbeddingProvider>) -> Self {
		Self { embedding }
	}
}
impl Default for Providers {
	fn default() -> Self {
		Self { embedding: Arc::new(DefaultProviders) }
	}
}

#[derive(Clone)]
pub struct Indexes {
	pub vector: Arc<dyn VectorIndex>,
	pub lexical: Arc<dyn LexicalIndex>,
}
impl Indexes {
	pub fn new(vector: Arc<dyn VectorIndex>, lexical: Arc<dyn LexicalIndex>) -> Self {
		Self { vector, lexical }
	}

	/// Qdrant for vectors, the records table for full-text.
	pub fn backed_by(db: &Db, qdrant: QdrantStore) -> Self {
		Self {
			vector: Arc::new(QdrantVectorIndex::new(qdrant)),
			lexical: Arc::new(PgLexicalIndex::new(db.pool.clone())),
		}
	}
}

pub struct PrecedentService {
	pub cfg: Config,
	pub db: Db,
	pub embedder: Arc<EmbeddingClient>,
	pub vectors: Arc<dyn VectorIndex>,
	pub engine: HybridSearchEngine,
	search_slots: Semaphore,
}
impl PrecedentService {
	pub fn new(cfg: Config, db: Db, qdrant: QdrantStore) -> Self {
		let indexes = Indexes::backed_by(&db, qdrant);

		Self::with_parts(cfg, db, Providers::default(), indexes)
	}

	pub fn with_parts(cfg: Config, db: Db, providers: Providers, indexes: Indexes) -> Self {
		let limiter = Arc::new(RateLimiter::from_config(&cfg.rate_limit));
		let embedder = Arc::new(EmbeddingClient::from_config(&cfg, providers.embedding, limiter));
		let query_cache = cfg.cache.enabled.then(|| ResponseCache::from_config(&cfg.cache));
		let engine = HybridSearchEngine::new(
			embedder.clone(),
			indexes.vector.clone(),
			indexes.lexical,
			query_cache,
			cfg.search.clone(),
		);
		let search_slots = Semaphore::new(cfg.search.max_concurrent);

		Self { cfg, db, embedder, vectors: indexes.vector, engine, search_slots }
	}
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, precedent_providers::Result<EmbeddingBatch>> {
		Box::pin(provider_embedding::embed(cfg, texts))
	}
}

pub(crate) fn embedding_version(cfg: &Config) -> String {
	format!(
		"{}:{}:{}",
		cfg.providers.embedding.provider_id,
		cfg.providers.embedding.model,
		cfg.storage.qdrant.vector_dim
	)
}
