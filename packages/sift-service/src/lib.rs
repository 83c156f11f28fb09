pub mod ask;
pub mod documents;
pub mod metrics;
pub mod search;

mod error;

use std::{future::Future, pin::Pin, sync::Arc};

pub use ask::{AskRequest, AskResponse, AskSource};
pub use documents::{IndexDocumentRequest, IndexDocumentResponse, UpdateAccessRequest};
pub use error::{Error, Result};
pub use metrics::{Metrics, MetricsSnapshot, OperationSnapshot};
pub use search::{
	SearchRequest, SearchResponse,
	cache::{Cached, CacheKey, ResultCache},
};

use sift_access::{AccessContext, AccessControl, AccessFilter, RoleRegistry};
use sift_config::{Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use sift_domain::{AccessUpdate, CandidateItem, ChunkPayload, IndexedChunk};
use sift_providers::{embedding, generation, rerank};
use sift_storage::QdrantStore;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait EmbeddingProvider
where
	Self: Send + Sync,
{
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Pairwise relevance scorer. Returns one score per document, in input order.
pub trait RerankProvider
where
	Self: Send + Sync,
{
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>>;
}

pub trait GenerationProvider
where
	Self: Send + Sync,
{
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>>;
}

/// Dense similarity search, best first.
pub trait VectorSource
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a AccessFilter,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateItem>>>;
}

/// Keyword relevance search, best first. Narrowed by space and doc types only.
pub trait LexicalSource
where
	Self: Send + Sync,
{
	fn search<'a>(
		&'a self,
		query: &'a str,
		space_id: &'a str,
		doc_types: Option<&'a [String]>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateItem>>>;

	fn index<'a>(&'a self, chunks: &'a [IndexedChunk]) -> BoxFuture<'a, Result<()>>;
}

/// Per-document reads and writes used by document management.
pub trait DocumentStore
where
	Self: Send + Sync,
{
	fn upsert_chunks<'a>(&'a self, chunks: &'a [IndexedChunk]) -> BoxFuture<'a, Result<()>>;

	fn doc_chunks<'a>(
		&'a self,
		space_id: &'a str,
		doc_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<ChunkPayload>>>;

	fn owned_chunks<'a>(
		&'a self,
		space_id: &'a str,
		owner_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<ChunkPayload>>>;

	fn delete_doc<'a>(&'a self, space_id: &'a str, doc_id: &'a str) -> BoxFuture<'a, Result<()>>;

	fn update_doc_access<'a>(
		&'a self,
		space_id: &'a str,
		doc_id: &'a str,
		update: &'a AccessUpdate,
	) -> BoxFuture<'a, Result<()>>;
}

#[derive(Clone)]
pub struct Providers {
	pub embedding: Arc<dyn EmbeddingProvider>,
	pub rerank: Arc<dyn RerankProvider>,
	pub generation: Arc<dyn GenerationProvider>,
}
impl Providers {
	pub fn new(
		embedding: Arc<dyn EmbeddingProvider>,
		rerank: Arc<dyn RerankProvider>,
		generation: Arc<dyn GenerationProvider>,
	) -> Self {
		Self { embedding, rerank, generation }
	}
}
impl Default for Providers {
	fn default() -> Self {
		let provider = Arc::new(DefaultProviders);

		Self { embedding: provider.clone(), rerank: provider.clone(), generation: provider }
	}
}

#[derive(Clone)]
pub struct Sources {
	pub vector: Arc<dyn VectorSource>,
	pub lexical: Arc<dyn LexicalSource>,
	pub documents: Arc<dyn DocumentStore>,
}
impl Sources {
	pub fn new(
		vector: Arc<dyn VectorSource>,
		lexical: Arc<dyn LexicalSource>,
		documents: Arc<dyn DocumentStore>,
	) -> Self {
		Self { vector, lexical, documents }
	}

	/// All three roles served by one Qdrant collection.
	pub fn qdrant(store: QdrantStore) -> Self {
		let store = Arc::new(store);

		Self { vector: store.clone(), lexical: store.clone(), documents: store }
	}
}

pub struct SiftService {
	pub cfg: Config,
	pub access: AccessControl,
	pub sources: Sources,
	pub providers: Providers,
	pub metrics: Metrics,
	pub(crate) search_cache: ResultCache<Cached<SearchResponse>>,
	pub(crate) ask_cache: ResultCache<Cached<AskResponse>>,
}
impl SiftService {
	/// Builds the service over Qdrant and the HTTP providers, loading roles from config.
	pub fn new(cfg: Config, qdrant: QdrantStore) -> Result<Self> {
		let registry = RoleRegistry::load(cfg.access.roles_path.as_deref())?;
		let access = AccessControl::new(registry, cfg.access.admin_roles.clone());

		Ok(Self::with_parts(cfg, access, Sources::qdrant(qdrant), Providers::default()))
	}

	pub fn with_parts(
		cfg: Config,
		access: AccessControl,
		sources: Sources,
		providers: Providers,
	) -> Self {
		let search_cache = ResultCache::new(cfg.cache.ttl_seconds, cfg.cache.max_items);
		let ask_cache = ResultCache::new(cfg.cache.ttl_seconds, cfg.cache.max_items);

		Self {
			cfg,
			access,
			sources,
			providers,
			metrics: Metrics::default(),
			search_cache,
			ask_cache,
		}
	}

	/// Drops every cached search and ask response.
	pub fn clear_caches(&self) {
		self.search_cache.clear();
		self.ask_cache.clear();
	}

	/// Reloads roles from the configured file and drops cached responses.
	pub fn reload_roles(&self) -> Result<usize> {
		let count = self.access.roles().reload(self.cfg.access.roles_path.as_deref())?;

		self.clear_caches();

		Ok(count)
	}
}

/// Every read and write is scoped to one space; a caller without one is rejected.
pub(crate) fn require_space(ctx: &AccessContext) -> Result<&str> {
	ctx.space()
		.ok_or_else(|| Error::InvalidRequest { message: "space_id is required.".to_string() })
}

struct DefaultProviders;
impl EmbeddingProvider for DefaultProviders {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		Box::pin(async move { Ok(embedding::embed(cfg, texts).await?) })
	}
}
impl RerankProvider for DefaultProviders {
	fn rerank<'a>(
		&'a self,
		cfg: &'a ProviderConfig,
		query: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move { Ok(rerank::rerank(cfg, query, docs).await?) })
	}
}
impl GenerationProvider for DefaultProviders {
	fn generate<'a>(
		&'a self,
		cfg: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		Box::pin(async move { Ok(generation::generate(cfg, prompt).await?) })
	}
}

impl VectorSource for QdrantStore {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a AccessFilter,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateItem>>> {
		Box::pin(async move { Ok(self.dense_search(vector, filter, limit).await?) })
	}
}
impl LexicalSource for QdrantStore {
	fn search<'a>(
		&'a self,
		query: &'a str,
		space_id: &'a str,
		doc_types: Option<&'a [String]>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateItem>>> {
		Box::pin(async move { Ok(self.bm25_search(query, space_id, doc_types, limit).await?) })
	}

	// The BM25 sparse vector is written with the dense vector in `upsert_chunks`.
	fn index<'a>(&'a self, _chunks: &'a [IndexedChunk]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}
}
impl DocumentStore for QdrantStore {
	fn upsert_chunks<'a>(&'a self, chunks: &'a [IndexedChunk]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::upsert_chunks(self, chunks).await?) })
	}

	fn doc_chunks<'a>(
		&'a self,
		space_id: &'a str,
		doc_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<ChunkPayload>>> {
		Box::pin(async move { Ok(QdrantStore::doc_chunks(self, space_id, doc_id).await?) })
	}

	fn owned_chunks<'a>(
		&'a self,
		space_id: &'a str,
		owner_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<ChunkPayload>>> {
		Box::pin(async move { Ok(QdrantStore::owned_chunks(self, space_id, owner_id).await?) })
	}

	fn delete_doc<'a>(&'a self, space_id: &'a str, doc_id: &'a str) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move { Ok(QdrantStore::delete_doc(self, space_id, doc_id).await?) })
	}

	fn update_doc_access<'a>(
		&'a self,
		space_id: &'a str,
		doc_id: &'a str,
		update: &'a AccessUpdate,
	) -> BoxFuture<'a, Result<()>> {
		Box::pin(async move {
			Ok(QdrantStore::update_doc_access(self, space_id, doc_id, update).await?)
		})
	}
}
