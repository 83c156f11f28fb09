//! In-process TTL + LRU cache for pipeline responses.

use std::{
	num::NonZeroUsize,
	sync::{Mutex, MutexGuard},
	time::{Duration, Instant},
};

use lru::LruCache;

use sift_access::AccessContext;
use sift_config::Config;

const ALL_SENTINEL: &str = "__all__";

/// Identity of a cached response. Two requests with equal keys get the same response.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CacheKey {
	operation: &'static str,
	query: String,
	space: String,
	doc_types: Vec<String>,
	top_k: u32,
	settings: String,
	access: String,
}
impl CacheKey {
	pub fn search(
		query: &str,
		ctx: &AccessContext,
		doc_types: &[String],
		top_k: u32,
		cfg: &Config,
	) -> Self {
		let diversity = &cfg.search.diversity;
		let settings = format!(
			"diversity={};lambda={:.3};pool={}",
			diversity.enabled, diversity.mmr_lambda, cfg.search.pool_multiplier
		);

		Self::build("search", query, ctx, doc_types, top_k, settings)
	}

	pub fn ask(
		query: &str,
		ctx: &AccessContext,
		doc_types: &[String],
		top_k: u32,
		cfg: &Config,
	) -> Self {
		let llm = &cfg.providers.llm;
		let settings = format!("model={};max_tokens={}", llm.model, llm.max_tokens);

		Self::build("ask", query, ctx, doc_types, top_k, settings)
	}

	fn build(
		operation: &'static str,
		query: &str,
		ctx: &AccessContext,
		doc_types: &[String],
		top_k: u32,
		settings: String,
	) -> Self {
		let mut doc_types: Vec<String> =
			doc_types.iter().filter(|doc_type| !doc_type.is_empty()).cloned().collect();

		doc_types.sort();
		doc_types.dedup();

		if doc_types.is_empty() {
			doc_types.push(ALL_SENTINEL.to_string());
		}

		Self {
			operation,
			query: query.trim().to_string(),
			space: ctx.space().unwrap_or_default().to_string(),
			doc_types,
			top_k,
			settings,
			access: access_fingerprint(ctx),
		}
	}

	pub fn operation(&self) -> &'static str {
		self.operation
	}
}

/// Everything about the caller that can change which items survive authorization.
fn access_fingerprint(ctx: &AccessContext) -> String {
	let kind = if ctx.is_agent() { "agent" } else { "human" };
	let mut teams = ctx.team_ids().to_vec();

	teams.sort();
	teams.dedup();

	format!(
		"{kind}:{}|role={}|channel={}|teams={}|department={}",
		ctx.principal_id(),
		ctx.role_name.as_deref().unwrap_or_default(),
		ctx.channel_id.as_deref().unwrap_or_default(),
		teams.join(","),
		ctx.department.as_deref().unwrap_or_default(),
	)
}

/// A cached response with the token counts recorded when it was produced.
#[derive(Clone, Debug)]
pub struct Cached<T> {
	pub response: T,
	pub context_tokens: u64,
	pub answer_tokens: u64,
}

struct Entry<V> {
	value: V,
	inserted_at: Instant,
}

/// TTL + LRU keyed store. Every operation holds one exclusive lock.
///
/// TTL runs from insertion. Reads promote recency without extending lifetime.
pub struct ResultCache<V> {
	ttl: Duration,
	entries: Mutex<LruCache<CacheKey, Entry<V>>>,
}
impl<V> ResultCache<V>
where
	V: Clone,
{
	pub fn new(ttl_seconds: u64, max_items: usize) -> Self {
		let capacity = NonZeroUsize::new(max_items).unwrap_or(NonZeroUsize::MIN);

		Self { ttl: Duration::from_secs(ttl_seconds), entries: Mutex::new(LruCache::new(capacity)) }
	}

	pub fn get(&self, key: &CacheKey) -> Option<V> {
		self.get_at(key, Instant::now())
	}

	pub fn set(&self, key: CacheKey, value: V) {
		self.set_at(key, value, Instant::now());
	}

	pub fn clear(&self) {
		self.lock().clear();
	}

	pub fn len(&self) -> usize {
		self.lock().len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	fn get_at(&self, key: &CacheKey, now: Instant) -> Option<V> {
		let mut entries = self.lock();

		purge_expired(&mut entries, now, self.ttl);

		entries.get(key).map(|entry| entry.value.clone())
	}

	fn set_at(&self, key: CacheKey, value: V, now: Instant) {
		let mut entries = self.lock();

		purge_expired(&mut entries, now, self.ttl);
		entries.pop(&key);

		while entries.len() >= entries.cap().get() {
			if entries.pop_lru().is_none() {
				break;
			}
		}

		entries.put(key, Entry { value, inserted_at: now });
	}

	fn lock(&self) -> MutexGuard<'_, LruCache<CacheKey, Entry<V>>> {
		match self.entries.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}
}

fn purge_expired<V>(entries: &mut LruCache<CacheKey, Entry<V>>, now: Instant, ttl: Duration) {
	let expired: Vec<CacheKey> = entries
		.iter()
		.filter(|(_, entry)| now.saturating_duration_since(entry.inserted_at) > ttl)
		.map(|(key, _)| key.clone())
		.collect();

	for key in expired {
		entries.pop(&key);
	}
}
