pub mod cache;
pub mod ranking;

use std::{collections::HashMap, time::Instant};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, SiftService, require_space};
use cache::{CacheKey, Cached};
use ranking::rerank;
use sift_access::{AccessContext, AccessSession};
use sift_domain::{CandidateItem, doc_type, text};

#[derive(Clone, Debug, Default, Deserialize)]
pub struct SearchRequest {
	pub query: String,
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub doc_types: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct SearchResponse {
	pub query: String,
	pub space_id: Option<String>,
	/// Doc types after normalization and inference. Empty means unfiltered.
	pub doc_types: Vec<String>,
	pub top_k: u32,
	pub results: Vec<CandidateItem>,
}

/// Request shape after normalization, shared by search and ask.
#[derive(Debug)]
pub(crate) struct QueryPlan {
	pub(crate) query: String,
	pub(crate) doc_types: Vec<String>,
	pub(crate) top_k: u32,
}

impl SiftService {
	pub async fn search(&self, ctx: &AccessContext, req: SearchRequest) -> Result<SearchResponse> {
		let started = Instant::now();
		let plan = self.plan_query(&req.query, req.top_k, &req.doc_types)?;

		require_space(ctx)?;

		let cache_key = self
			.cfg
			.cache
			.enabled
			.then(|| CacheKey::search(&plan.query, ctx, &plan.doc_types, plan.top_k, &self.cfg));

		if let Some(key) = cache_key.as_ref() {
			if let Some(cached) = self.search_cache.get(key) {
				tracing::debug!(operation = key.operation(), "Cache hit.");

				self.metrics.record_search(elapsed_ms(started), cached.context_tokens, true);

				return Ok(cached.response);
			}

			tracing::debug!(operation = key.operation(), "Cache miss.");
		}

		let session = self.access.session(ctx);
		let results = self.retrieve(&session, &plan).await?;
		let context_tokens = context_tokens(&results);
		let response = SearchResponse {
			query: plan.query,
			space_id: ctx.space_id.clone(),
			doc_types: plan.doc_types,
			top_k: plan.top_k,
			results,
		};

		self.metrics.record_search(elapsed_ms(started), context_tokens, false);

		if let Some(key) = cache_key {
			self.search_cache.set(
				key,
				Cached { response: response.clone(), context_tokens, answer_tokens: 0 },
			);
		}

		Ok(response)
	}

	pub(crate) fn plan_query(
		&self,
		query: &str,
		top_k: Option<u32>,
		doc_types: &[String],
	) -> Result<QueryPlan> {
		let query = query.trim();

		if query.is_empty() {
			return Err(Error::InvalidRequest { message: "query must be non-empty.".to_string() });
		}

		let mut normalized = doc_type::normalize_all(doc_types);

		if doc_types.is_empty() && self.cfg.search.auto_doc_types {
			normalized = doc_type::infer_from_query(query);
		}

		let top_k = ranking::effective_top_k(top_k, &normalized, query, &self.cfg.search);

		Ok(QueryPlan { query: query.to_string(), doc_types: normalized, top_k })
	}

	/// Runs the retrieval pipeline for one caller and returns only items they may see.
	pub(crate) async fn retrieve(
		&self,
		session: &AccessSession<'_>,
		plan: &QueryPlan,
	) -> Result<Vec<CandidateItem>> {
		let filter = session.build_filter(&plan.doc_types);

		let Some(space_id) = filter.space_id.as_deref() else { return Ok(Vec::new()) };

		if filter.matches_nothing() {
			return Ok(Vec::new());
		}

		let search_cfg = &self.cfg.search;
		let top_k = plan.top_k as usize;
		let pool_k = if search_cfg.diversity.enabled {
			plan.top_k.saturating_mul(search_cfg.pool_multiplier)
		} else {
			plan.top_k
		};
		let query_vec = self.embed_query(&plan.query).await?;
		let (semantic, lexical) = tokio::try_join!(
			self.sources.vector.search(&query_vec, &filter, pool_k),
			self.sources.lexical.search(
				&plan.query,
				space_id,
				filter.doc_types.as_deref(),
				pool_k,
			),
		)?;
		let mut pool = ranking::reciprocal_rank_fusion(
			semantic,
			lexical,
			search_cfg.fusion.rrf_k,
			pool_k as usize,
		);

		if search_cfg.rerank.enabled {
			pool = self.rerank_pool(&plan.query, pool).await;
		}

		let selected = if search_cfg.diversity.enabled {
			self.diversify(&query_vec, &pool, top_k).await
		} else {
			pool.iter().take(top_k).cloned().collect()
		};
		let mut results = if search_cfg.one_chunk_per_doc {
			ranking::one_chunk_per_document(selected, &pool, top_k)
		} else {
			selected
		};

		results.truncate(top_k);
		results.retain(|item| session.can_access(&item.payload));

		Ok(results)
	}

	async fn embed_query(&self, query: &str) -> Result<Vec<f32>> {
		let texts = [query.to_string()];
		let embeddings =
			self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await?;
		let Some(vector) = embeddings.into_iter().next() else {
			return Err(Error::Provider {
				message: "Embedding provider returned no vectors.".to_string(),
			});
		};

		if vector.len() != self.cfg.storage.qdrant.vector_dim as usize {
			return Err(Error::Provider {
				message: "Embedding vector dimension mismatch.".to_string(),
			});
		}

		Ok(vector)
	}

	async fn rerank_pool(&self, query: &str, pool: Vec<CandidateItem>) -> Vec<CandidateItem> {
		let cfg = &self.cfg.search;
		let Some(batch) = rerank::prepare(
			query,
			&pool,
			cfg.rerank.max_candidates as usize,
			cfg.snippet_max_chars as usize,
		) else {
			return pool;
		};
		let scored =
			self.providers.rerank.rerank(&self.cfg.providers.rerank, query, &batch.texts).await;
		let scores = match scored {
			Ok(scores) => scores,
			Err(err) => {
				tracing::warn!(error = %err, "Rerank failed. Keeping fused order.");

				return pool;
			},
		};

		match rerank::reorder(pool, &batch, &scores) {
			Ok(reordered) => reordered,
			Err(pool) => {
				tracing::warn!(
					expected = batch.positions.len(),
					got = scores.len(),
					"Rerank score count mismatch. Keeping fused order."
				);

				pool
			},
		}
	}

	async fn diversify(
		&self,
		query_vec: &[f32],
		pool: &[CandidateItem],
		top_k: usize,
	) -> Vec<CandidateItem> {
		let diversity = &self.cfg.search.diversity;
		let mut keys = Vec::new();
		let mut texts = Vec::new();

		for item in pool {
			let snippet = text::truncate_chars(item.text(), diversity.embed_max_chars as usize);

			if snippet.trim().is_empty() || keys.contains(&item.key) {
				continue;
			}

			keys.push(item.key.clone());
			texts.push(snippet.to_string());
		}

		let vectors: HashMap<String, Vec<f32>> = if texts.is_empty() {
			HashMap::new()
		} else {
			match self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await {
				Ok(vectors) if vectors.len() == texts.len() =>
					keys.into_iter().zip(vectors).collect(),
				Ok(vectors) => {
					tracing::warn!(
						expected = texts.len(),
						got = vectors.len(),
						"Diversity embedding count mismatch. Embedding candidates one by one."
					);

					self.embed_each(keys, texts).await
				},
				Err(err) => {
					tracing::warn!(
						error = %err,
						"Diversity embedding failed. Embedding candidates one by one."
					);

					self.embed_each(keys, texts).await
				},
			}
		};

		ranking::select_diverse(query_vec, pool, top_k, diversity.mmr_lambda, &vectors)
	}

	/// Embeds candidates individually. A candidate that cannot be embedded is left out.
	async fn embed_each(&self, keys: Vec<String>, texts: Vec<String>) -> HashMap<String, Vec<f32>> {
		let mut vectors = HashMap::new();

		for (key, text) in keys.into_iter().zip(texts) {
			let texts = [text];

			match self.providers.embedding.embed(&self.cfg.providers.embedding, &texts).await {
				Ok(mut embedded) if embedded.len() == 1 => {
					vectors.insert(key, embedded.remove(0));
				},
				Ok(embedded) => tracing::warn!(
					key = %key,
					got = embedded.len(),
					"Diversity candidate embedding count mismatch. Candidate excluded."
				),
				Err(err) => tracing::warn!(
					key = %key,
					error = %err,
					"Diversity candidate embedding failed. Candidate excluded."
				),
			}
		}

		vectors
	}
}

pub(crate) fn context_tokens(items: &[CandidateItem]) -> u64 {
	items.iter().map(|item| text::count_tokens(item.text())).sum()
}

pub(crate) fn elapsed_ms(started: Instant) -> f64 {
	started.elapsed().as_secs_f64() * 1_000.0
}
