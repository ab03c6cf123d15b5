use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Clone, Debug, sqlx::FromRow)]
pub struct RecordRow {
	pub record_id: Uuid,
	pub tenant_id: String,
	pub title: String,
	pub body: String,
	pub category: String,
	pub tags: Vec<String>,
	pub embedding_version: Option<String>,
	pub embedded_at: Option<OffsetDateTime>,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

/// One full-text match. `rank` is the raw `ts_rank_cd` value.
#[derive(Clone, Debug, sqlx::FromRow)]
pub struct LexicalRow {
	pub record_id: Uuid,
	pub rank: f32,
	pub snippet: String,
}
