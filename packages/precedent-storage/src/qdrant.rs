use qdrant_client::qdrant::{
	CreateCollectionBuilder, CreateFieldIndexCollectionBuilder, Distance, FieldType,
	HnswConfigDiffBuilder, VectorParamsBuilder, VectorsConfigBuilder,
};

use crate::Result;

pub const DENSE_VECTOR_NAME: &str = "dense";
pub const HNSW_M: u64 = 16;
pub const HNSW_EF_CONSTRUCT: u64 = 100;
/// Payload fields indexed as keywords so tenant and facet filters stay cheap.
pub const KEYWORD_PAYLOAD_FIELDS: [&str; 4] = ["record_id", "tenant_id", "category", "tags"];

pub struct QdrantStore {
	pub client: qdrant_client::Qdrant,
	pub collection: String,
	pub vector_dim: u32,
}
impl QdrantStore {
	pub fn new(cfg: &precedent_config::Qdrant) -> Result<Self> {
		let client = qdrant_client::Qdrant::from_url(&cfg.url).build()?;

		Ok(Self { client, collection: cfg.collection.clone(), vector_dim: cfg.vector_dim })
	}

	/// Creates the collection and its payload indexes when missing. Existing collections are left
	/// as they are.
	pub async fn ensure_collection(&self) -> Result<()> {
		if self.client.collection_exists(self.collection.clone()).await? {
			return Ok(());
		}

		let mut vectors_config = VectorsConfigBuilder::default();

		vectors_config.add_named_vector_params(
			DENSE_VECTOR_NAME,
			VectorParamsBuilder::new(self.vector_dim.into(), Distance::Cosine),
		);

		let builder = CreateCollectionBuilder::new(self.collection.clone())
			.vectors_config(vectors_config)
			.hnsw_config(
				HnswConfigDiffBuilder::default().m(HNSW_M).ef_construct(HNSW_EF_CONSTRUCT),
			);

		self.client.create_collection(builder).await?;

		for field in KEYWORD_PAYLOAD_FIELDS {
			let index = CreateFieldIndexCollectionBuilder::new(
				self.collection.clone(),
				field,
				FieldType::Keyword,
			)
			.wait(true);

			self.client.create_field_index(index).await?;
		}

		Ok(())
	}
}
