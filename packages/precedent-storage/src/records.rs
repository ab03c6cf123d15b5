use sqlx::PgExecutor;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result,
	models::{LexicalRow, RecordRow},
};

/// Full-text query scoped to one tenant. Empty facet lists mean "no constraint".
#[derive(Clone, Debug)]
pub struct LexicalSearch<'a> {
	pub tenant_id: &'a str,
	pub query: &'a str,
	pub categories: &'a [String],
	pub tags: &'a [String],
	pub limit: u32,
}

pub async fn insert_record<'e, E>(executor: E, record: &RecordRow) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
INSERT INTO records (
	record_id,
	tenant_id,
	title,
	body,
	category,
	tags,
	embedding_version,
	embedded_at,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
	)
	.bind(record.record_id)
	.bind(record.tenant_id.as_str())
	.bind(record.title.as_str())
	.bind(record.body.as_str())
	.bind(record.category.as_str())
	.bind(&record.tags)
	.bind(record.embedding_version.as_deref())
	.bind(record.embedded_at)
	.bind(record.created_at)
	.bind(record.updated_at)
	.execute(executor)
	.await?;

	Ok(())
}

pub async fn get_record<'e, E>(
	executor: E,
	tenant_id: &str,
	record_id: Uuid,
) -> Result<Option<RecordRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, RecordRow>(
		"\
SELECT
	record_id,
	tenant_id,
	title,
	body,
	category,
	tags,
	embedding_version,
	embedded_at,
	created_at,
	updated_at
FROM records
WHERE tenant_id = $1 AND record_id = $2",
	)
	.bind(tenant_id)
	.bind(record_id)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Rows come back in no particular order; ids without a live row are simply absent.
pub async fn get_records<'e, E>(
	executor: E,
	tenant_id: &str,
	record_ids: &[Uuid],
) -> Result<Vec<RecordRow>>
where
	E: PgExecutor<'e>,
{
	if record_ids.is_empty() {
		return Ok(Vec::new());
	}

	let rows = sqlx::query_as::<_, RecordRow>(
		"\
SELECT
	record_id,
	tenant_id,
	title,
	body,
	category,
	tags,
	embedding_version,
	embedded_at,
	created_at,
	updated_at
FROM records
WHERE tenant_id = $1 AND record_id = ANY($2)",
	)
	.bind(tenant_id)
	.bind(record_ids)
	.fetch_all(executor)
	.await?;

	Ok(rows)
}

pub async fn delete_record<'e, E>(executor: E, tenant_id: &str, record_id: Uuid) -> Result<bool>
where
	E: PgExecutor<'e>,
{
	let result = sqlx::query("DELETE FROM records WHERE tenant_id = $1 AND record_id = $2")
		.bind(tenant_id)
		.bind(record_id)
		.execute(executor)
		.await?;

	Ok(result.rows_affected() > 0)
}

pub async fn update_record_text<'e, E>(
	executor: E,
	tenant_id: &str,
	record_id: Uuid,
	title: &str,
	body: &str,
	now: OffsetDateTime,
) -> Result<Option<RecordRow>>
where
	E: PgExecutor<'e>,
{
	let row = sqlx::query_as::<_, RecordRow>(
		"\
UPDATE records
SET
	title = $3,
	body = $4,
	updated_at = $5
WHERE tenant_id = $1 AND record_id = $2
RETURNING
	record_id,
	tenant_id,
	title,
	body,
	category,
	tags,
	embedding_version,
	embedded_at,
	created_at,
	updated_at",
	)
	.bind(tenant_id)
	.bind(record_id)
	.bind(title)
	.bind(body)
	.bind(now)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Appends `tag` unless the record already carries it.
pub async fn add_record_tag<'e, E>(
	executor: E,
	tenant_id: &str,
	record_id: Uuid,
	tag: &str,
	now: OffsetDateTime,
) -> Result<Option<RecordRow>>
where
	E: PgExecutor<'e>,
{
	if tag.trim().is_empty() {
		return Err(Error::InvalidArgument("tag must be non-empty.".to_string()));
	}

	let row = sqlx::query_as::<_, RecordRow>(
		"\
UPDATE records
SET
	tags = CASE WHEN $3 = ANY(tags) THEN tags ELSE array_append(tags, $3) END,
	updated_at = $4
WHERE tenant_id = $1 AND record_id = $2
RETURNING
	record_id,
	tenant_id,
	title,
	body,
	category,
	tags,
	embedding_version,
	embedded_at,
	created_at,
	updated_at",
	)
	.bind(tenant_id)
	.bind(record_id)
	.bind(tag)
	.bind(now)
	.fetch_optional(executor)
	.await?;

	Ok(row)
}

/// Records which embedding version (if any) currently backs the record's vector point.
pub async fn set_embedding_version<'e, E>(
	executor: E,
	tenant_id: &str,
	record_id: Uuid,
	embedding_version: Option<&str>,
	embedded_at: Option<OffsetDateTime>,
) -> Result<()>
where
	E: PgExecutor<'e>,
{
	sqlx::query(
		"\
UPDATE records
SET
	embedding_version = $3,
	embedded_at = $4
WHERE tenant_id = $1 AND record_id = $2",
	)
	.bind(tenant_id)
	.bind(record_id)
	.bind(embedding_version)
	.bind(embedded_at)
	.execute(executor)
	.await?;

	Ok(())
}

/// Ranked full-text search over `title || ' ' || body` with the `simple` text configuration.
pub async fn search_records<'e, E>(
	executor: E,
	search: &LexicalSearch<'_>,
) -> Result<Vec<LexicalRow>>
where
	E: PgExecutor<'e>,
{
	if search.query.trim().is_empty() || search.limit == 0 {
		return Ok(Vec::new());
	}

	let categories = (!search.categories.is_empty()).then_some(search.categories);
	let tags = (!search.tags.is_empty()).then_some(search.tags);
	let rows = sqlx::query_as::<_, LexicalRow>(
		"\
SELECT
	r.record_id,
	ts_rank_cd(r.search_tsv, q.query) AS rank,
	ts_headline(
		'simple',
		r.title || ' ' || r.body,
		q.query,
		'MaxFragments=2, MaxWords=24, MinWords=8'
	) AS snippet
FROM records r
CROSS JOIN plainto_tsquery('simple', $2) AS q(query)
WHERE r.tenant_id = $1
	AND r.search_tsv @@ q.query
	AND ($3::text[] IS NULL OR r.category = ANY($3))
	AND ($4::text[] IS NULL OR r.tags && $4)
ORDER BY rank DESC, r.record_id ASC
LIMIT $5",
	)
	.bind(search.tenant_id)
	.bind(search.query)
	.bind(categories)
	.bind(tags)
	.bind(i64::from(search.limit))
	.fetch_all(executor)
	.await?;

	Ok(rows)
}
