use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use precedent_domain::{Category, TenantId, record};
use precedent_storage::{models::RecordRow, records};

use crate::{
	Cancellation, Error, HybridQuery, PrecedentService, Result, SearchFilter, SearchResult,
	SearchStatus, SearchWeights, VectorPoint,
};

#[derive(Clone, Debug, Deserialize)]
pub struct CreateRecordRequest {
	pub tenant_id: String,
	pub title: String,
	pub body: String,
	pub category: Category,
	#[serde(default)]
	pub tags: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Record {
	pub record_id: Uuid,
	pub tenant_id: String,
	pub title: String,
	pub body: String,
	pub category: Category,
	pub tags: Vec<String>,
	/// `None` until a vector for the current text has been indexed.
	pub embedding_version: Option<String>,
	#[serde(with = "time::serde::rfc3339::option")]
	pub embedded_at: Option<OffsetDateTime>,
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
	#[serde(with = "time::serde::rfc3339")]
	pub updated_at: OffsetDateTime,
}
impl TryFrom<RecordRow> for Record {
	type Error = Error;

	fn try_from(row: RecordRow) -> Result<Self> {
		let category = row.category.parse::<Category>().map_err(|_| Error::Storage {
			message: format!("Record {} has unknown category {:?}.", row.record_id, row.category),
		})?;

		Ok(Self {
			record_id: row.record_id,
			tenant_id: row.tenant_id,
			title: row.title,
			body: row.body,
			category,
			tags: row.tags,
			embedding_version: row.embedding_version,
			embedded_at: row.embedded_at,
			created_at: row.created_at,
			updated_at: row.updated_at,
		})
	}
}

#[derive(Clone, Debug, Deserialize)]
pub struct FindSimilarRequest {
	pub tenant_id: String,
	pub query: String,
	pub limit: Option<u32>,
	#[serde(default)]
	pub filter: SearchFilter,
	pub weights: Option<SearchWeights>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct SimilarRecord {
	pub record: Record,
	pub score: f64,
	pub vector_score: f64,
	pub lexical_score: f64,
	pub snippets: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct FindSimilarResponse {
	pub status: SearchStatus,
	pub items: Vec<SimilarRecord>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddTagRequest {
	pub tenant_id: String,
	pub record_id: Uuid,
	pub tag: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateTextRequest {
	pub tenant_id: String,
	pub record_id: Uuid,
	pub title: Option<String>,
	pub body: Option<String>,
	#[serde(default)]
	pub reembed: bool,
}

impl PrecedentService {
	/// Persists the record, then indexes its vector.
	///
	/// Indexing failures are logged and leave the record without an embedding version; the
	/// metadata write is never rolled back.
	pub async fn create(&self, req: CreateRecordRequest) -> Result<Record> {
		let tenant = TenantId::parse(&req.tenant_id)?;

		record::validate_title(&req.title)?;
		record::validate_body(&req.body)?;

		let tags = record::normalize_tags(&req.tags)?;
		let now = OffsetDateTime::now_utc();
		let row = RecordRow {
			record_id: Uuid::new_v4(),
			tenant_id: tenant.as_str().to_string(),
			title: req.title.trim().to_string(),
			body: req.body.trim().to_string(),
			category: req.category.as_str().to_string(),
			tags,
			embedding_version: None,
			embedded_at: None,
			created_at: now,
			updated_at: now,
		};

		records::insert_record(&self.db.pool, &row).await?;

		let record = Record::try_from(row)?;

		Ok(self.index_or_warn(&tenant, record).await)
	}

	pub async fn get_by_id(&self, tenant_id: &str, record_id: Uuid) -> Result<Record> {
		let tenant = TenantId::parse(tenant_id)?;
		let row = records::get_record(&self.db.pool, tenant.as_str(), record_id)
			.await?
			.ok_or_else(|| not_found(record_id))?;

		Record::try_from(row)
	}

	/// Ranked similar records for a free-text query. Hits whose record has since disappeared are
	/// dropped silently.
	pub async fn find_similar(
		&self,
		req: FindSimilarRequest,
		cancel: &Cancellation,
	) -> Result<FindSimilarResponse> {
		let tenant = TenantId::parse(&req.tenant_id)?;
		let query = HybridQuery {
			tenant,
			text: req.query,
			limit: req.limit.unwrap_or_else(|| self.engine.default_limit()),
			weights: req.weights,
			filter: req.filter,
		};
		let _permit = tokio::select! {
			biased;
			_ = cancel.cancelled() => return Err(Error::Cancelled),
			permit = self.search_slots.acquire() => permit.map_err(|_| Error::Cancelled)?,
		};
		let outcome = self.engine.search(&query, cancel).await?;

		if outcome.results.is_empty() {
			return Ok(FindSimilarResponse { status: outcome.status, items: Vec::new() });
		}

		let ids = outcome.results.iter().map(|result| result.record_id).collect::<Vec<_>>();
		let rows = records::get_records(&self.db.pool, query.tenant.as_str(), &ids).await?;
		let items = hydrate(outcome.results, rows)?;

		Ok(similar_response(outcome.status, items))
	}

	/// Removes the vector point first so a failure leaves both stores untouched.
	pub async fn delete(&self, tenant_id: &str, record_id: Uuid) -> Result<()> {
		let tenant = TenantId::parse(tenant_id)?;

		records::get_record(&self.db.pool, tenant.as_str(), record_id)
			.await?
			.ok_or_else(|| not_found(record_id))?;

		self.vectors.delete(&tenant, record_id).await?;

		if !records::delete_record(&self.db.pool, tenant.as_str(), record_id).await? {
			return Err(not_found(record_id));
		}

		tracing::info!(tenant_id = %tenant, record_id = %record_id, "Record deleted.");

		Ok(())
	}

	/// Adds a failure-pattern tag and mirrors the tag list into the vector payload.
	pub async fn add_tag(&self, req: AddTagRequest) -> Result<Record> {
		let tenant = TenantId::parse(&req.tenant_id)?;
		let tag = record::normalize_tag(&req.tag)?;
		let current = records::get_record(&self.db.pool, tenant.as_str(), req.record_id)
			.await?
			.ok_or_else(|| not_found(req.record_id))?;

		if current.tags.len() >= record::MAX_TAGS && !current.tags.contains(&tag) {
			return Err(precedent_domain::RecordRejectCode::TooManyTags.into());
		}

		let row = records::add_record_tag(
			&self.db.pool,
			tenant.as_str(),
			req.record_id,
			&tag,
			OffsetDateTime::now_utc(),
		)
		.await?
		.ok_or_else(|| not_found(req.record_id))?;
		let record = Record::try_from(row)?;

		if record.embedding_version.is_some()
			&& let Err(err) = self.vectors.set_tags(&tenant, record.record_id, &record.tags).await
		{
			tracing::warn!(
				error = %err,
				record_id = %record.record_id,
				"Failed to sync tags to the vector index."
			);
		}

		Ok(record)
	}

	/// Updates title and/or body. The vector is refreshed only when `reembed` is set.
	pub async fn update_text(&self, req: UpdateTextRequest) -> Result<Record> {
		let tenant = TenantId::parse(&req.tenant_id)?;

		if req.title.is_none() && req.body.is_none() {
			return Err(Error::validation("title or body must be provided."));
		}

		let current = records::get_record(&self.db.pool, tenant.as_str(), req.record_id)
			.await?
			.ok_or_else(|| not_found(req.record_id))?;
		let title = req.title.as_deref().map(str::trim).unwrap_or(current.title.as_str());
		let body = req.body.as_deref().map(str::trim).unwrap_or(current.body.as_str());

		record::validate_title(title)?;
		record::validate_body(body)?;

		let row = records::update_record_text(
			&self.db.pool,
			tenant.as_str(),
			req.record_id,
			title,
			body,
			OffsetDateTime::now_utc(),
		)
		.await?
		.ok_or_else(|| not_found(req.record_id))?;
		let record = Record::try_from(row)?;

		if !req.reembed {
			return Ok(record);
		}

		Ok(self.index_or_warn(&tenant, record).await)
	}

	async fn index_or_warn(&self, tenant: &TenantId, mut record: Record) -> Record {
		match self.index_record(tenant, &record).await {
			Ok((version, embedded_at)) => {
				record.embedding_version = Some(version);
				record.embedded_at = Some(embedded_at);
			},
			Err(err) => {
				tracing::warn!(
					error = %err,
					record_id = %record.record_id,
					"Record stored without an embedding."
				);
			},
		}

		record
	}

	async fn index_record(
		&self,
		tenant: &TenantId,
		record: &Record,
	) -> Result<(String, OffsetDateTime)> {
		let text = record::embedding_text(&record.title, &record.body);
		let embedding = self.embedder.embed(&text, &Cancellation::new()).await?;
		let version = crate::embedding_version(&self.cfg);
		let point = VectorPoint {
			record_id: record.record_id,
			tenant: tenant.clone(),
			vector: embedding.vector,
			category: record.category,
			tags: record.tags.clone(),
			embedding_version: version.clone(),
		};

		self.vectors.upsert(&point).await?;

		let embedded_at = OffsetDateTime::now_utc();

		records::set_embedding_version(
			&self.db.pool,
			tenant.as_str(),
			record.record_id,
			Some(version.as_str()),
			Some(embedded_at),
		)
		.await?;

		Ok((version, embedded_at))
	}
}

/// Joins ranked hits with their rows, keeping rank order and dropping ids without a row.
fn hydrate(results: Vec<SearchResult>, rows: Vec<RecordRow>) -> Result<Vec<SimilarRecord>> {
	let mut by_id = rows.into_iter().map(|row| (row.record_id, row)).collect::<HashMap<_, _>>();
	let mut items = Vec::with_capacity(results.len());
	let mut dropped = 0_usize;

	for result in results {
		let Some(row) = by_id.remove(&result.record_id) else {
			dropped += 1;

			continue;
		};

		items.push(SimilarRecord {
			record: Record::try_from(row)?,
			score: result.score,
			vector_score: result.vector_score,
			lexical_score: result.lexical_score,
			snippets: result.snippets,
		});
	}

	if dropped > 0 {
		tracing::debug!(dropped, "Dropped search hits without a live record.");
	}

	Ok(items)
}

/// Every hit going stale means no live record backs the ranking, which reads as no signal.
fn similar_response(status: SearchStatus, items: Vec<SimilarRecord>) -> FindSimilarResponse {
	let status = if items.is_empty() { SearchStatus::NoSignal } else { status };

	FindSimilarResponse { status, items }
}

fn not_found(record_id: Uuid) -> Error {
	Error::NotFound { message: format!("Record {record_id} was not found.") }
}
