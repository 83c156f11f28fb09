use std::sync::{
	Mutex,
	atomic::{AtomicUsize, Ordering},
};

use sift_config::{EmbeddingProviderConfig, LlmProviderConfig, ProviderConfig};
use sift_domain::text;
use sift_service::{
	BoxFuture, EmbeddingProvider, Error, GenerationProvider, RerankProvider, Result,
};

/// Bag-of-words vector: every query keyword lands on a blake3-chosen axis with a blake3-chosen
/// sign, then the vector is normalized. Texts sharing words end up close.
pub fn hash_vector(text: &str, dim: u32) -> Vec<f32> {
	let dim = dim.max(1) as usize;
	let mut values = vec![0.0_f32; dim];

	for word in text::query_keywords(text) {
		let hash = blake3::hash(word.as_bytes());
		let bytes = hash.as_bytes();
		let mut slot = [0_u8; 8];

		slot.copy_from_slice(&bytes[..8]);

		let axis = (u64::from_le_bytes(slot) % dim as u64) as usize;
		let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

		values[axis] += sign;
	}

	let norm = values.iter().map(|value| value * value).sum::<f32>().sqrt();

	if norm > 0.0 {
		values.iter_mut().for_each(|value| *value /= norm);
	}

	values
}

#[derive(Default)]
pub struct HashEmbedding {
	calls: AtomicUsize,
	rejected_word: Option<String>,
}
impl HashEmbedding {
	/// Fails every call whose batch contains a text mentioning `word`.
	pub fn rejecting(word: impl Into<String>) -> Self {
		Self { calls: AtomicUsize::new(0), rejected_word: Some(word.into()) }
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}
}
impl EmbeddingProvider for HashEmbedding {
	fn embed<'a>(
		&'a self,
		cfg: &'a EmbeddingProviderConfig,
		texts: &'a [String],
	) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
		self.calls.fetch_add(1, Ordering::SeqCst);

		if let Some(word) = self.rejected_word.as_deref()
			&& texts.iter().any(|text| text.contains(word))
		{
			return Box::pin(async move {
				Err(Error::Provider { message: "Embedding input rejected.".to_string() })
			});
		}

		let vectors = texts.iter().map(|text| hash_vector(text, cfg.dimensions)).collect();

		Box::pin(async move { Ok(vectors) })
	}
}

/// Scores documents in reverse input order, so a successful rerank flips the pool head.
pub struct ReverseRerank;
impl RerankProvider for ReverseRerank {
	fn rerank<'a>(
		&'a self,
		_: &'a ProviderConfig,
		_: &'a str,
		docs: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		let scores = (0..docs.len()).map(|idx| idx as f32).collect();

		Box::pin(async move { Ok(scores) })
	}
}

pub struct FailingRerank;
impl RerankProvider for FailingRerank {
	fn rerank<'a>(
		&'a self,
		_: &'a ProviderConfig,
		_: &'a str,
		_: &'a [String],
	) -> BoxFuture<'a, Result<Vec<f32>>> {
		Box::pin(async move {
			Err(Error::Provider { message: "Rerank endpoint unavailable.".to_string() })
		})
	}
}

/// Returns a fixed answer and records every prompt. The first `fail_first` calls fail.
pub struct StaticGeneration {
	answer: String,
	fail_first: usize,
	calls: AtomicUsize,
	prompts: Mutex<Vec<String>>,
}
impl StaticGeneration {
	pub fn new(answer: impl Into<String>) -> Self {
		Self {
			answer: answer.into(),
			fail_first: 0,
			calls: AtomicUsize::new(0),
			prompts: Mutex::new(Vec::new()),
		}
	}

	pub fn failing_first(mut self, count: usize) -> Self {
		self.fail_first = count;

		self
	}

	pub fn calls(&self) -> usize {
		self.calls.load(Ordering::SeqCst)
	}

	pub fn last_prompt(&self) -> Option<String> {
		let prompts = self.prompts.lock().unwrap_or_else(|err| err.into_inner());

		prompts.last().cloned()
	}
}
impl GenerationProvider for StaticGeneration {
	fn generate<'a>(
		&'a self,
		_: &'a LlmProviderConfig,
		prompt: &'a str,
	) -> BoxFuture<'a, Result<String>> {
		let call = self.calls.fetch_add(1, Ordering::SeqCst);

		self.prompts.lock().unwrap_or_else(|err| err.into_inner()).push(prompt.to_string());

		let result = if call < self.fail_first {
			Err(Error::Provider { message: "Generation endpoint unavailable.".to_string() })
		} else {
			Ok(self.answer.clone())
		};

		Box::pin(async move { result })
	}
}
