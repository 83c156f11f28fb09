use std::sync::Arc;

use sift_config::Config;
use sift_service::SiftService;
use sift_storage::QdrantStore;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<SiftService>,
}
impl AppState {
	/// Connects to Qdrant, bootstraps the collection and loads the configured roles.
	pub async fn new(config: Config) -> color_eyre::Result<Self> {
		let qdrant = QdrantStore::new(&config.storage.qdrant)?;

		qdrant.ensure_collection().await?;

		let service = SiftService::new(config, qdrant)?;

		Ok(Self::from(service))
	}
}
impl From<SiftService> for AppState {
	fn from(service: SiftService) -> Self {
		Self { service: Arc::new(service) }
	}
}
