use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::{
	Result, SiftService, require_space,
	search::{
		cache::{CacheKey, Cached},
		context_tokens, elapsed_ms,
	},
};
use sift_access::AccessContext;
use sift_domain::{CandidateItem, Visibility, text};

const PROMPT_PREAMBLE: &str = "Answer strictly from the CONTEXT below. \
	If the context is not enough, say so.";
const PROMPT_CLOSING: &str = "Answer briefly and to the point. \
	When listing deadlines, give the date and the source (doc_id/chunk).";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct AskRequest {
	pub query: String,
	#[serde(default)]
	pub top_k: Option<u32>,
	#[serde(default)]
	pub doc_types: Vec<String>,
}

#[derive(Clone, Debug, Serialize)]
pub struct AskResponse {
	pub answer: String,
	pub sources: Vec<AskSource>,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AskSource {
	pub doc_id: Option<String>,
	pub chunk_index: Option<i64>,
	pub doc_type: String,
	pub visibility: Visibility,
	pub owner_id: Option<String>,
}
impl From<&CandidateItem> for AskSource {
	fn from(item: &CandidateItem) -> Self {
		Self {
			doc_id: item.payload.doc_id.clone(),
			chunk_index: item.payload.chunk_index,
			doc_type: item.payload.doc_type.clone(),
			visibility: item.payload.visibility,
			owner_id: item.payload.owner_id.clone(),
		}
	}
}

impl SiftService {
	/// Answers `req.query` from the chunks the caller may see.
	///
	/// A generation failure fails the request and is never cached.
	pub async fn ask(&self, ctx: &AccessContext, req: AskRequest) -> Result<AskResponse> {
		let started = Instant::now();
		let plan = self.plan_query(&req.query, req.top_k, &req.doc_types)?;

		require_space(ctx)?;

		let cache_key = self
			.cfg
			.cache
			.enabled
			.then(|| CacheKey::ask(&plan.query, ctx, &plan.doc_types, plan.top_k, &self.cfg));

		if let Some(key) = cache_key.as_ref() {
			if let Some(cached) = self.ask_cache.get(key) {
				tracing::debug!(operation = key.operation(), "Cache hit.");

				self.metrics.record_ask(
					elapsed_ms(started),
					cached.context_tokens,
					cached.answer_tokens,
					true,
				);

				return Ok(cached.response);
			}

			tracing::debug!(operation = key.operation(), "Cache miss.");
		}

		let session = self.access.session(ctx);
		let items = self.retrieve(&session, &plan).await?;
		let prompt = build_prompt(&items, &plan.query, self.cfg.search.snippet_max_chars as usize);
		let answer = self.providers.generation.generate(&self.cfg.providers.llm, &prompt).await?;
		let context_tokens = context_tokens(&items);
		let answer_tokens = text::count_tokens(&answer);
		let response =
			AskResponse { answer, sources: items.iter().map(AskSource::from).collect() };

		self.metrics.record_ask(elapsed_ms(started), context_tokens, answer_tokens, false);

		if let Some(key) = cache_key {
			self.ask_cache
				.set(key, Cached { response: response.clone(), context_tokens, answer_tokens });
		}

		Ok(response)
	}
}

/// Numbered context blocks followed by the question.
pub fn build_prompt(items: &[CandidateItem], question: &str, snippet_max_chars: usize) -> String {
	let context = items
		.iter()
		.enumerate()
		.map(|(idx, item)| {
			let snippet = text::compress_text(item.text(), question, snippet_max_chars);
			let chunk = item.payload.chunk_index.map(|idx| idx.to_string());

			format!(
				"[{}] doc_id={} chunk={} type={}\n\"{}\"",
				idx + 1,
				item.payload.doc_id.as_deref().unwrap_or("-"),
				chunk.as_deref().unwrap_or("-"),
				item.payload.doc_type,
				snippet,
			)
		})
		.collect::<Vec<_>>()
		.join("\n\n");

	format!("{PROMPT_PREAMBLE}\n\nCONTEXT:\n{context}\n\nQUESTION:\n{question}\n\n{PROMPT_CLOSING}")
}
