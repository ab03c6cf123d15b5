use std::sync::Arc;

use precedent_service::PrecedentService;
use precedent_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<PrecedentService>,
}
impl AppState {
	/// Connects both stores and makes sure the schema and collection exist before serving.
	pub async fn new(config: precedent_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		tracing::info!(
			collection = %config.storage.qdrant.collection,
			vector_dim = config.storage.qdrant.vector_dim,
			"Storage bootstrapped."
		);

		Ok(Self::from_service(PrecedentService::new(config, db, qdrant)))
	}

	pub fn from_service(service: PrecedentService) -> Self {
		Self { service: Arc::new(service) }
	}
}
