use std::path::PathBuf;

use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub providers: Providers,
	pub search: Search,
	pub cache: Cache,
	pub access: Access,
}

#[derive(Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub admin_bind: String,
	pub log_level: String,
}

#[derive(Debug, Deserialize)]
pub struct Storage {
	pub qdrant: Qdrant,
}

#[derive(Debug, Deserialize)]
pub struct Qdrant {
	pub url: String,
	pub collection: String,
	pub vector_dim: u32,
}

#[derive(Debug, Deserialize)]
pub struct Providers {
	pub embedding: EmbeddingProviderConfig,
	pub rerank: ProviderConfig,
	pub llm: LlmProviderConfig,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub dimensions: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct ProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct LlmProviderConfig {
	pub provider_id: String,
	pub api_base: String,
	pub api_key: String,
	pub path: String,
	pub model: String,
	pub temperature: f32,
	pub max_tokens: u32,
	pub timeout_ms: u64,
	pub default_headers: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub struct Search {
	#[serde(default = "default_top_k")]
	pub default_top_k: u32,
	#[serde(default = "default_min_top_k")]
	pub min_top_k: u32,
	#[serde(default = "default_max_top_k")]
	pub max_top_k: u32,
	/// Hard cap applied after the adaptive size policy.
	#[serde(default = "default_max_context_chunks")]
	pub max_context_chunks: u32,
	/// Source pool size is `k * pool_multiplier` while diversity is enabled.
	#[serde(default = "default_pool_multiplier")]
	pub pool_multiplier: u32,
	#[serde(default = "default_true")]
	pub one_chunk_per_doc: bool,
	/// Infer document types from query keywords when the request names none.
	#[serde(default = "default_true")]
	pub auto_doc_types: bool,
	#[serde(default = "default_snippet_max_chars")]
	pub snippet_max_chars: u32,
	#[serde(default)]
	pub fusion: SearchFusion,
	#[serde(default)]
	pub diversity: SearchDiversity,
	#[serde(default)]
	pub rerank: SearchRerank,
}

#[derive(Debug, Deserialize)]
pub struct SearchFusion {
	#[serde(default = "default_rrf_k")]
	pub rrf_k: u32,
}
impl Default for SearchFusion {
	fn default() -> Self {
		Self { rrf_k: default_rrf_k() }
	}
}

#[derive(Debug, Deserialize)]
pub struct SearchDiversity {
	#[serde(default = "default_true")]
	pub enabled: bool,
	#[serde(default = "default_mmr_lambda")]
	pub mmr_lambda: f32,
	#[serde(default = "default_embed_max_chars")]
	pub embed_max_chars: u32,
}
impl Default for SearchDiversity {
	fn default() -> Self {
		Self {
			enabled: true,
			mmr_lambda: default_mmr_lambda(),
			embed_max_chars: default_embed_max_chars(),
		}
	}
}

#[derive(Debug, Deserialize)]
pub struct SearchRerank {
	#[serde(default)]
	pub enabled: bool,
	#[serde(default = "default_rerank_max_candidates")]
	pub max_candidates: u32,
}
impl Default for SearchRerank {
	fn default() -> Self {
		Self { enabled: false, max_candidates: default_rerank_max_candidates() }
	}
}

#[derive(Debug, Deserialize)]
pub struct Cache {
	pub enabled: bool,
	pub ttl_seconds: u64,
	pub max_items: usize,
}

#[derive(Debug, Deserialize)]
pub struct Access {
	/// Optional. Roles file (`.toml` or `.json`); the built-in role set is used when absent.
	pub roles_path: Option<PathBuf>,
	#[serde(default = "default_admin_roles")]
	pub admin_roles: Vec<String>,
	/// Agent roles stamped on newly indexed chunks when the request names none.
	#[serde(default = "default_agent_roles")]
	pub default_agent_roles: Vec<String>,
}

fn default_true() -> bool {
	true
}

fn default_top_k() -> u32 {
	6
}

fn default_min_top_k() -> u32 {
	4
}

fn default_max_top_k() -> u32 {
	8
}

fn default_max_context_chunks() -> u32 {
	6
}

fn default_pool_multiplier() -> u32 {
	3
}

fn default_snippet_max_chars() -> u32 {
	600
}

fn default_rrf_k() -> u32 {
	60
}

fn default_mmr_lambda() -> f32 {
	0.7
}

fn default_embed_max_chars() -> u32 {
	1_000
}

fn default_rerank_max_candidates() -> u32 {
	32
}

fn default_admin_roles() -> Vec<String> {
	vec!["admin".to_string(), "agent_admin".to_string()]
}

fn default_agent_roles() -> Vec<String> {
	vec!["agent_analytics".to_string(), "agent_research".to_string()]
}
