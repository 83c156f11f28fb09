use serde_json::Map;

use sift_config::{
	Access, Cache, Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig, Providers,
	Qdrant, Search, SearchDiversity, SearchFusion, SearchRerank, Service, Storage,
};

pub const VECTOR_DIM: u32 = 32;

/// A complete configuration with small, deterministic limits and no network endpoints.
pub fn test_config() -> Config {
	Config {
		service: Service {
			http_bind: "127.0.0.1:0".to_string(),
			admin_bind: "127.0.0.1:0".to_string(),
			log_level: "info".to_string(),
		},
		storage: Storage {
			qdrant: Qdrant {
				url: "http://127.0.0.1:6334".to_string(),
				collection: "sift_test".to_string(),
				vector_dim: VECTOR_DIM,
			},
		},
		providers: Providers {
			embedding: EmbeddingProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/embeddings".to_string(),
				model: "hash".to_string(),
				dimensions: VECTOR_DIM,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			rerank: ProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/rerank".to_string(),
				model: "test-rerank".to_string(),
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
			llm: LlmProviderConfig {
				provider_id: "test".to_string(),
				api_base: "http://127.0.0.1:1".to_string(),
				api_key: "test-key".to_string(),
				path: "/chat/completions".to_string(),
				model: "test-llm".to_string(),
				temperature: 0.0,
				max_tokens: 256,
				timeout_ms: 1_000,
				default_headers: Map::new(),
			},
		},
		search: Search {
			default_top_k: 6,
			min_top_k: 4,
			max_top_k: 8,
			max_context_chunks: 6,
			pool_multiplier: 3,
			one_chunk_per_doc: true,
			auto_doc_types: true,
			snippet_max_chars: 600,
			fusion: SearchFusion::default(),
			diversity: SearchDiversity::default(),
			rerank: SearchRerank::default(),
		},
		cache: Cache { enabled: true, ttl_seconds: 300, max_items: 64 },
		access: Access {
			roles_path: None,
			admin_roles: vec!["admin".to_string(), "agent_admin".to_string()],
			default_agent_roles: vec!["agent_analytics".to_string()],
		},
	}
}
