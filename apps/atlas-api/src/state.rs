use std::sync::Arc;

use atlas_service::AtlasService;
use atlas_storage::{db::Db, qdrant::QdrantStore};

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<AtlasService>,
}
impl AppState {
	pub async fn new(config: atlas_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let qdrant = QdrantStore::new(&config.storage.qdrant)?;
		let service = AtlasService::new(config, db, qdrant);

		Ok(Self { service: Arc::new(service) })
	}
}
