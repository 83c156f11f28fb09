//! In-memory collaborators for exercising the service without Qdrant or provider endpoints.

mod config;
mod index;
mod providers;

pub use config::{VECTOR_DIM, test_config};
pub use index::MemoryIndex;
pub use providers::{
	FailingRerank, HashEmbedding, ReverseRerank, StaticGeneration, hash_vector,
};

use std::sync::Arc;

use sift_access::{AccessContext, AccessControl, RoleRegistry};
use sift_config::Config;
use sift_domain::{ChunkPayload, Visibility};
use sift_service::{Providers, RerankProvider, SiftService, Sources};

pub const TEST_SPACE: &str = "s1";
pub const TEST_ANSWER: &str = "Grounded answer.";

/// A service wired to one shared in-memory index and spy providers.
pub struct TestHarness {
	pub service: SiftService,
	pub index: Arc<MemoryIndex>,
	pub embedding: Arc<HashEmbedding>,
	pub generation: Arc<StaticGeneration>,
}
impl TestHarness {
	pub fn new(cfg: Config) -> Self {
		Self::with_embedding(cfg, HashEmbedding::default())
	}

	pub fn with_embedding(cfg: Config, embedding: HashEmbedding) -> Self {
		Self::build(cfg, embedding, Arc::new(ReverseRerank), StaticGeneration::new(TEST_ANSWER))
	}

	pub fn with_rerank(cfg: Config, rerank: Arc<dyn RerankProvider>) -> Self {
		Self::build(cfg, HashEmbedding::default(), rerank, StaticGeneration::new(TEST_ANSWER))
	}

	pub fn with_generation(cfg: Config, generation: StaticGeneration) -> Self {
		Self::build(cfg, HashEmbedding::default(), Arc::new(ReverseRerank), generation)
	}

	fn build(
		cfg: Config,
		embedding: HashEmbedding,
		rerank: Arc<dyn RerankProvider>,
		generation: StaticGeneration,
	) -> Self {
		let index = Arc::new(MemoryIndex::default());
		let embedding = Arc::new(embedding);
		let generation = Arc::new(generation);
		let access = AccessControl::new(RoleRegistry::builtin(), cfg.access.admin_roles.clone());
		let sources = Sources::new(index.clone(), index.clone(), index.clone());
		let providers = Providers::new(embedding.clone(), rerank, generation.clone());
		let service = SiftService::with_parts(cfg, access, sources, providers);

		Self { service, index, embedding, generation }
	}

	pub fn user(&self, user_id: &str, role: &str) -> sift_access::Result<AccessContext> {
		AccessContext::for_user(&self.service.access.roles().snapshot(), user_id, role, TEST_SPACE)
	}

	pub fn agent(&self, agent_id: &str, role: &str) -> sift_access::Result<AccessContext> {
		AccessContext::for_agent(
			&self.service.access.roles().snapshot(),
			agent_id,
			role,
			TEST_SPACE,
		)
	}
}

/// A chunk in the test space, owned by `owner`, visible to everyone unless changed.
pub fn chunk(doc_id: &str, chunk_index: i64, doc_type: &str, text: &str) -> ChunkPayload {
	ChunkPayload {
		text: text.to_string(),
		doc_id: Some(doc_id.to_string()),
		chunk_index: Some(chunk_index),
		doc_type: doc_type.to_string(),
		space_id: Some(TEST_SPACE.to_string()),
		owner_id: Some("owner".to_string()),
		visibility: Visibility::Public,
		..Default::default()
	}
}
