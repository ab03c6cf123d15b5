pub mod fusion;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use precedent_domain::TenantId;

use crate::{
	Cancellation, EmbeddingClient, Error, LexicalHit, LexicalIndex, LexicalQuery, ResponseCache,
	Result, SearchFilter, VectorHit, VectorIndex, VectorQuery,
};

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchWeights {
	pub vector: f64,
	pub text: f64,
}
impl SearchWeights {
	pub fn from_config(cfg: &precedent_config::Search) -> Self {
		Self { vector: cfg.vector_weight, text: cfg.text_weight }
	}

	fn validate(self) -> Result<Self> {
		for (label, weight) in [("weights.vector", self.vector), ("weights.text", self.text)] {
			if !weight.is_finite() {
				return Err(Error::validation(format!("{label} must be a finite number.")));
			}
			if weight < 0.0 {
				return Err(Error::validation(format!("{label} must be zero or greater.")));
			}
		}

		if !precedent_config::weights_sum_to_one(self.vector, self.text) {
			return Err(Error::validation("weights.vector and weights.text must sum to 1.0."));
		}

		Ok(self)
	}
}

/// Which signals contributed to a result set.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStatus {
	Complete,
	/// The embedding or vector leg failed.
	LexicalOnly,
	/// The lexical leg failed.
	VectorOnly,
	/// Neither leg produced a candidate, because both failed or the corpus is empty.
	NoSignal,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SearchResult {
	pub record_id: Uuid,
	pub score: f64,
	pub vector_score: f64,
	pub lexical_score: f64,
	pub snippets: Vec<String>,
}
impl SearchResult {
	pub(crate) fn empty(record_id: Uuid) -> Self {
		Self { record_id, score: 0.0, vector_score: 0.0, lexical_score: 0.0, snippets: Vec::new() }
	}
}

#[derive(Clone, Debug)]
pub struct HybridQuery {
	pub tenant: TenantId,
	pub text: String,
	pub limit: u32,
	/// Falls back to the configured weights.
	pub weights: Option<SearchWeights>,
	pub filter: SearchFilter,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HybridOutcome {
	pub status: SearchStatus,
	pub results: Vec<SearchResult>,
}
impl HybridOutcome {
	pub fn no_signal() -> Self {
		Self { status: SearchStatus::NoSignal, results: Vec::new() }
	}
}

/// Runs dense and lexical retrieval side by side and fuses them into one ranking.
///
/// A failing leg degrades the result instead of failing the query; only invalid input and
/// cancellation are reported as errors.
pub struct HybridSearchEngine {
	embedder: Arc<EmbeddingClient>,
	vectors: Arc<dyn VectorIndex>,
	lexical: Arc<dyn LexicalIndex>,
	query_cache: Option<ResponseCache<Vec<f32>>>,
	cfg: precedent_config::Search,
}
impl HybridSearchEngine {
	pub fn new(
		embedder: Arc<EmbeddingClient>,
		vectors: Arc<dyn VectorIndex>,
		lexical: Arc<dyn LexicalIndex>,
		query_cache: Option<ResponseCache<Vec<f32>>>,
		cfg: precedent_config::Search,
	) -> Self {
		Self { embedder, vectors, lexical, query_cache, cfg }
	}

	pub fn query_cache(&self) -> Option<&ResponseCache<Vec<f32>>> {
		self.query_cache.as_ref()
	}

	pub fn default_limit(&self) -> u32 {
		self.cfg.default_limit
	}

	pub async fn search(
		&self,
		query: &HybridQuery,
		cancel: &Cancellation,
	) -> Result<HybridOutcome> {
		let weights = self.validate(query)?;

		cancel.check()?;

		let candidate_k = query.limit.saturating_mul(self.cfg.overfetch_factor.max(1));
		let vector_leg = self.vector_candidates(query, candidate_k, cancel);
		let lexical_leg = self.lexical_candidates(query, candidate_k);
		let (vector, lexical) = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(Error::Cancelled),
			legs = async { tokio::join!(vector_leg, lexical_leg) } => legs,
		};

		cancel.check()?;

		let vector = match vector {
			Ok(hits) => Some(hits),
			Err(Error::Cancelled) => return Err(Error::Cancelled),
			Err(err) => {
				tracing::warn!(
					error = %err,
					tenant_id = %query.tenant,
					"Vector retrieval failed. Falling back to lexical results."
				);

				None
			},
		};
		let lexical = match lexical {
			Ok(hits) => Some(hits),
			Err(err) => {
				tracing::warn!(
					error = %err,
					tenant_id = %query.tenant,
					"Lexical retrieval failed. Falling back to vector results."
				);

				None
			},
		};
		let status = match (&vector, &lexical) {
			(Some(_), Some(_)) => SearchStatus::Complete,
			(None, Some(_)) => SearchStatus::LexicalOnly,
			(Some(_), None) => SearchStatus::VectorOnly,
			(None, None) => SearchStatus::NoSignal,
		};
		let fused = fusion::fuse(
			vector.as_deref().unwrap_or_default(),
			lexical.as_deref().unwrap_or_default(),
			weights,
		);

		if fused.is_empty() {
			tracing::info!(
				tenant_id = %query.tenant,
				?status,
				"Hybrid search found no candidates."
			);

			return Ok(HybridOutcome::no_signal());
		}

		let results = fusion::rerank(fused, query.limit as usize);

		tracing::debug!(
			tenant_id = %query.tenant,
			?status,
			candidate_k,
			returned = results.len(),
			"Hybrid search completed."
		);

		Ok(HybridOutcome { status, results })
	}

	fn validate(&self, query: &HybridQuery) -> Result<SearchWeights> {
		if query.text.trim().is_empty() {
			return Err(Error::validation("query must be non-empty."));
		}
		if query.limit == 0 {
			return Err(Error::validation("limit must be greater than zero."));
		}
		if query.limit > self.cfg.max_limit {
			return Err(Error::validation(format!(
				"limit must be at most {}.",
				self.cfg.max_limit
			)));
		}

		query.weights.unwrap_or_else(|| SearchWeights::from_config(&self.cfg)).validate()
	}

	async fn vector_candidates(
		&self,
		query: &HybridQuery,
		candidate_k: u32,
		cancel: &Cancellation,
	) -> Result<Vec<VectorHit>> {
		let vector = self.query_vector(&query.text, cancel).await?;
		let vector_query = VectorQuery {
			tenant: query.tenant.clone(),
			vector,
			limit: candidate_k,
			filter: query.filter.clone(),
		};

		self.vectors.search(&vector_query).await
	}

	async fn lexical_candidates(
		&self,
		query: &HybridQuery,
		candidate_k: u32,
	) -> Result<Vec<LexicalHit>> {
		let lexical_query = LexicalQuery {
			tenant: query.tenant.clone(),
			text: query.text.clone(),
			limit: candidate_k,
			filter: query.filter.clone(),
		};

		self.lexical.search(&lexical_query).await
	}

	async fn query_vector(&self, text: &str, cancel: &Cancellation) -> Result<Vec<f32>> {
		if let Some(cache) = &self.query_cache
			&& let Some(vector) = cache.get_exact(text)
		{
			tracing::debug!("Query embedding cache hit.");

			return Ok(vector);
		}

		let embedding = self.embedder.embed(text, cancel).await?;

		if let Some(cache) = &self.query_cache {
			cache.set(text, embedding.vector.clone());
		}

		Ok(embedding.vector)
	}
}
