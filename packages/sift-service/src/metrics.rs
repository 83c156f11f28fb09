//! Request counters for search and ask.

use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

#[derive(Debug, Default)]
struct Counters {
	requests: u64,
	latency_ms: f64,
	context_tokens: u64,
	answer_tokens: u64,
	cache_hits: u64,
}
impl Counters {
	fn record(
		&mut self,
		latency_ms: f64,
		context_tokens: u64,
		answer_tokens: u64,
		cache_hit: bool,
	) {
		self.requests += 1;
		self.latency_ms += latency_ms;
		self.context_tokens += context_tokens;
		self.answer_tokens += answer_tokens;

		if cache_hit {
			self.cache_hits += 1;
		}
	}

	fn snapshot(&self, with_answers: bool) -> OperationSnapshot {
		let per_request = |total: f64| {
			if self.requests == 0 { 0.0 } else { total / self.requests as f64 }
		};

		OperationSnapshot {
			requests: self.requests,
			cache_hits: self.cache_hits,
			avg_latency_ms: round_to(per_request(self.latency_ms), 2),
			avg_context_tokens: round_to(per_request(self.context_tokens as f64), 2),
			avg_answer_tokens: with_answers
				.then(|| round_to(per_request(self.answer_tokens as f64), 2)),
			cache_hit_rate: round_to(per_request(self.cache_hits as f64), 3),
		}
	}
}

#[derive(Debug, Default)]
struct State {
	search: Counters,
	ask: Counters,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct OperationSnapshot {
	pub requests: u64,
	pub cache_hits: u64,
	pub avg_latency_ms: f64,
	pub avg_context_tokens: f64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub avg_answer_tokens: Option<f64>,
	pub cache_hit_rate: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MetricsSnapshot {
	/// Unix seconds.
	pub timestamp: i64,
	pub search: OperationSnapshot,
	pub ask: OperationSnapshot,
}

#[derive(Debug, Default)]
pub struct Metrics {
	state: Mutex<State>,
}
impl Metrics {
	pub fn record_search(&self, latency_ms: f64, context_tokens: u64, cache_hit: bool) {
		self.lock().search.record(latency_ms, context_tokens, 0, cache_hit);
	}

	pub fn record_ask(
		&self,
		latency_ms: f64,
		context_tokens: u64,
		answer_tokens: u64,
		cache_hit: bool,
	) {
		self.lock().ask.record(latency_ms, context_tokens, answer_tokens, cache_hit);
	}

	pub fn snapshot(&self) -> MetricsSnapshot {
		let state = self.lock();

		MetricsSnapshot {
			timestamp: time::OffsetDateTime::now_utc().unix_timestamp(),
			search: state.search.snapshot(false),
			ask: state.ask.snapshot(true),
		}
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		match self.state.lock() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}
}

fn round_to(value: f64, places: i32) -> f64 {
	let factor = 10_f64.powi(places);

	(value * factor).round() / factor
}
