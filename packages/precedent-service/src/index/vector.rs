use std::collections::HashMap;

use qdrant_client::{
	Payload,
	qdrant::{
		Condition, DeletePointsBuilder, Filter, PointId, PointStruct, Query, QueryPointsBuilder,
		SetPayloadPointsBuilder, UpsertPointsBuilder, Value, Vector, point_id::PointIdOptions,
		value::Kind,
	},
};
use uuid::Uuid;

use precedent_domain::TenantId;
use precedent_storage::qdrant::{DENSE_VECTOR_NAME, QdrantStore};

use crate::{
	BoxFuture, Error, Result, SearchFilter, VectorHit, VectorIndex, VectorPoint, VectorQuery,
};

pub struct QdrantVectorIndex {
	store: QdrantStore,
}
impl QdrantVectorIndex {
	pub fn new(store: QdrantStore) -> Self {
		Self { store }
	}

	async fn upsert_inner(&self, point: &VectorPoint) -> Result<()> {
		if point.vector.len() != self.store.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		let mut payload = Payload::new();

		payload.insert("record_id", point.record_id.to_string());
		payload.insert("tenant_id", point.tenant.as_str());
		payload.insert("category", point.category.as_str());
		payload.insert("tags", point.tags.clone());
		payload.insert("embedding_version", point.embedding_version.clone());

		let mut vectors = HashMap::new();

		vectors.insert(DENSE_VECTOR_NAME.to_string(), Vector::from(point.vector.clone()));

		let point = PointStruct::new(point.record_id.to_string(), vectors, payload);
		let upsert =
			UpsertPointsBuilder::new(self.store.collection.clone(), vec![point]).wait(true);

		self.store.client.upsert_points(upsert).await.map_err(index_unavailable)?;

		Ok(())
	}

	async fn search_inner(&self, query: &VectorQuery) -> Result<Vec<VectorHit>> {
		let search = QueryPointsBuilder::new(self.store.collection.clone())
			.query(Query::new_nearest(query.vector.clone()))
			.using(DENSE_VECTOR_NAME)
			.filter(build_filter(&query.tenant, &query.filter))
			.limit(u64::from(query.limit))
			.with_payload(true);
		let response = self.store.client.query(search).await.map_err(index_unavailable)?;
		let mut hits = Vec::with_capacity(response.result.len());

		for point in response.result {
			if payload_string(&point.payload, "tenant_id").as_deref() != Some(query.tenant.as_str())
			{
				tracing::warn!(
					collection = %self.store.collection,
					"Dropping vector hit from another tenant."
				);

				continue;
			}

			let record_id = point.id.as_ref().and_then(point_id_to_uuid).or_else(|| {
				payload_string(&point.payload, "record_id")
					.and_then(|raw| Uuid::parse_str(&raw).ok())
			});
			let Some(record_id) = record_id else {
				tracing::warn!(collection = %self.store.collection, "Vector hit has no record id.");

				continue;
			};

			hits.push(VectorHit { record_id, score: point.score });
		}

		Ok(hits)
	}

	async fn delete_inner(&self, tenant: &TenantId, record_id: Uuid) -> Result<()> {
		let delete = DeletePointsBuilder::new(self.store.collection.clone())
			.points(record_filter(tenant, record_id))
			.wait(true);

		self.store.client.delete_points(delete).await.map_err(index_unavailable)?;

		Ok(())
	}

	async fn set_tags_inner(
		&self,
		tenant: &TenantId,
		record_id: Uuid,
		tags: &[String],
	) -> Result<()> {
		let mut payload = Payload::new();

		payload.insert("tags", tags.to_vec());

		let update = SetPayloadPointsBuilder::new(self.store.collection.clone(), payload)
			.points_selector(record_filter(tenant, record_id))
			.wait(true);

		self.store.client.set_payload(update).await.map_err(index_unavailable)?;

		Ok(())
	}
}
impl VectorIndex for QdrantVectorIndex {
	fn upsert<'a>(&'a self, point: &'a VectorPoint) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.upsert_inner(point))
	}

	fn search<'a>(&'a self, query: &'a VectorQuery) -> BoxFuture<'a, Result<Vec<VectorHit>>> {
		Box::pin(self.search_inner(query))
	}

	fn delete<'a>(&'a self, tenant: &'a TenantId, record_id: Uuid) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.delete_inner(tenant, record_id))
	}

	fn set_tags<'a>(
		&'a self,
		tenant: &'a TenantId,
		record_id: Uuid,
		tags: &'a [String],
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(self.set_tags_inner(tenant, record_id, tags))
	}
}

/// The tenant condition is always first and always present.
pub fn build_filter(tenant: &TenantId, filter: &SearchFilter) -> Filter {
	let mut must = vec![Condition::matches("tenant_id", tenant.as_str().to_string())];

	if !filter.categories.is_empty() {
		must.push(Condition::matches("category", filter.category_names()));
	}
	if !filter.tags.is_empty() {
		must.push(Condition::matches("tags", filter.tags.clone()));
	}

	Filter::must(must)
}

fn record_filter(tenant: &TenantId, record_id: Uuid) -> Filter {
	Filter::must([
		Condition::matches("tenant_id", tenant.as_str().to_string()),
		Condition::matches("record_id", record_id.to_string()),
	])
}

fn index_unavailable(err: qdrant_client::QdrantError) -> Error {
	Error::IndexUnavailable { message: err.to_string() }
}

fn point_id_to_uuid(point_id: &PointId) -> Option<Uuid> {
	match &point_id.point_id_options {
		Some(PointIdOptions::Uuid(id)) => Uuid::parse_str(id).ok(),
		_ => None,
	}
}

fn payload_string(payload: &HashMap<String, Value>, key: &str) -> Option<String> {
	match &payload.get(key)?.kind {
		Some(Kind::StringValue(text)) => Some(text.to_string()),
		_ => None,
	}
}
