mod error;
mod types;

pub use error::{Error, Result};
pub use types::{
	Access, Cache, Config, EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig, Providers,
	Qdrant, Search, SearchDiversity, SearchFusion, SearchRerank, Service, Storage,
};

use std::{fs, path::Path};

pub fn load(path: &Path) -> Result<Config> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadConfig { path: path.to_path_buf(), source: err })?;
	let mut cfg: Config = toml::from_str(&raw)
		.map_err(|err| Error::ParseConfig { path: path.to_path_buf(), source: err })?;

	normalize(&mut cfg);

	validate(&cfg)?;

	Ok(cfg)
}

pub fn validate(cfg: &Config) -> Result<()> {
	if cfg.service.http_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.http_bind must be non-empty.".to_string(),
		});
	}
	if cfg.service.admin_bind.trim().is_empty() {
		return Err(Error::Validation {
			message: "service.admin_bind must be non-empty.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions == 0 {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must be greater than zero.".to_string(),
		});
	}
	if cfg.providers.embedding.dimensions != cfg.storage.qdrant.vector_dim {
		return Err(Error::Validation {
			message: "providers.embedding.dimensions must match storage.qdrant.vector_dim."
				.to_string(),
		});
	}
	if cfg.providers.llm.max_tokens == 0 {
		return Err(Error::Validation {
			message: "providers.llm.max_tokens must be greater than zero.".to_string(),
		});
	}

	let search = &cfg.search;

	if search.min_top_k == 0 {
		return Err(Error::Validation {
			message: "search.min_top_k must be greater than zero.".to_string(),
		});
	}
	if search.min_top_k > search.max_top_k {
		return Err(Error::Validation {
			message: "search.min_top_k must be less than or equal to search.max_top_k."
				.to_string(),
		});
	}
	if search.default_top_k == 0 {
		return Err(Error::Validation {
			message: "search.default_top_k must be greater than zero.".to_string(),
		});
	}
	if search.max_context_chunks == 0 {
		return Err(Error::Validation {
			message: "search.max_context_chunks must be greater than zero.".to_string(),
		});
	}
	if search.pool_multiplier == 0 {
		return Err(Error::Validation {
			message: "search.pool_multiplier must be greater than zero.".to_string(),
		});
	}
	if search.snippet_max_chars == 0 {
		return Err(Error::Validation {
			message: "search.snippet_max_chars must be greater than zero.".to_string(),
		});
	}
	if search.fusion.rrf_k == 0 {
		return Err(Error::Validation {
			message: "search.fusion.rrf_k must be greater than zero.".to_string(),
		});
	}
	if !search.diversity.mmr_lambda.is_finite() {
		return Err(Error::Validation {
			message: "search.diversity.mmr_lambda must be a finite number.".to_string(),
		});
	}
	if !(0.0..=1.0).contains(&search.diversity.mmr_lambda) {
		return Err(Error::Validation {
			message: "search.diversity.mmr_lambda must be in the range 0.0-1.0.".to_string(),
		});
	}
	if search.diversity.embed_max_chars == 0 {
		return Err(Error::Validation {
			message: "search.diversity.embed_max_chars must be greater than zero.".to_string(),
		});
	}
	if search.rerank.enabled && search.rerank.max_candidates == 0 {
		return Err(Error::Validation {
			message: "search.rerank.max_candidates must be greater than zero when enabled."
				.to_string(),
		});
	}
	if cfg.cache.enabled {
		if cfg.cache.ttl_seconds == 0 {
			return Err(Error::Validation {
				message: "cache.ttl_seconds must be greater than zero when enabled.".to_string(),
			});
		}
		if cfg.cache.max_items == 0 {
			return Err(Error::Validation {
				message: "cache.max_items must be greater than zero when enabled.".to_string(),
			});
		}
	}
	if cfg.access.admin_roles.iter().all(|role| role.trim().is_empty()) {
		return Err(Error::Validation {
			message: "access.admin_roles must name at least one role.".to_string(),
		});
	}

	for (label, key) in [
		("embedding", &cfg.providers.embedding.api_key),
		("rerank", &cfg.providers.rerank.api_key),
		("llm", &cfg.providers.llm.api_key),
	] {
		if key.trim().is_empty() {
			return Err(Error::Validation {
				message: format!("Provider {label} api_key must be non-empty."),
			});
		}
	}

	Ok(())
}

fn normalize(cfg: &mut Config) {
	if cfg
		.access
		.roles_path
		.as_deref()
		.map(|path| path.as_os_str().to_string_lossy().trim().is_empty())
		.unwrap_or(false)
	{
		cfg.access.roles_path = None;
	}

	cfg.access.admin_roles.retain(|role| !role.trim().is_empty());
	cfg.access.default_agent_roles.retain(|role| !role.trim().is_empty());
}
