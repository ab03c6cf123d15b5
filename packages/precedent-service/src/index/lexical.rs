use sqlx::PgPool;

use precedent_storage::records::{self, LexicalSearch};

use crate::{BoxFuture, Error, LexicalHit, LexicalIndex, LexicalQuery, Result};

/// Full-text search over the records table.
pub struct PgLexicalIndex {
	pool: PgPool,
}
impl PgLexicalIndex {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	async fn search_inner(&self, query: &LexicalQuery) -> Result<Vec<LexicalHit>> {
		let categories = query.filter.category_names();
		let search = LexicalSearch {
			tenant_id: query.tenant.as_str(),
			query: query.text.as_str(),
			categories: &categories,
			tags: &query.filter.tags,
			limit: query.limit,
		};
		let rows = records::search_records(&self.pool, &search)
			.await
			.map_err(|err| Error::IndexUnavailable { message: err.to_string() })?;

		Ok(rows
			.into_iter()
			.map(|row| LexicalHit {
				record_id: row.record_id,
				score: normalize_rank(row.rank),
				snippet: row.snippet,
			})
			.collect())
	}
}
impl LexicalIndex for PgLexicalIndex {
	fn search<'a>(&'a self, query: &'a LexicalQuery) -> BoxFuture<'a, Result<Vec<LexicalHit>>> {
		Box::pin(self.search_inner(query))
	}
}

/// `ts_rank_cd` is unbounded above; anything past 1.0 is treated as a full match.
// TODO: replace the clamp with per-query max normalization once result sets are large enough for
// the top rank to be a stable reference.
pub fn normalize_rank(raw: f32) -> f32 {
	if raw.is_nan() {
		return 0.0;
	}

	raw.clamp(0.0, 1.0)
}
