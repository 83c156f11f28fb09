use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use sift_access::AccessFilter;
use sift_domain::{AccessUpdate, CandidateItem, ChunkPayload, IndexedChunk, chunk_key, text};
use sift_service::{BoxFuture, DocumentStore, LexicalSource, Result, VectorSource};

use crate::{VECTOR_DIM, providers};

/// In-memory chunk store serving dense, keyword and document reads from one list.
#[derive(Default)]
pub struct MemoryIndex {
	chunks: RwLock<Vec<IndexedChunk>>,
}
impl MemoryIndex {
	/// Stores payloads with hash vectors, keyed by `doc_id:chunk_index` where available.
	pub fn seed<I>(&self, payloads: I)
	where
		I: IntoIterator<Item = ChunkPayload>,
	{
		let mut chunks = self.write();

		for (idx, payload) in payloads.into_iter().enumerate() {
			let key = match (payload.doc_id.as_deref(), payload.chunk_index) {
				(Some(doc_id), Some(chunk_index)) => chunk_key(doc_id, chunk_index),
				_ => format!("loose-{idx}"),
			};
			let vector = providers::hash_vector(&payload.text, VECTOR_DIM);

			chunks.retain(|chunk| chunk.key != key);
			chunks.push(IndexedChunk { key, vector, payload });
		}
	}

	pub fn len(&self) -> usize {
		self.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.read().is_empty()
	}

	pub fn payloads(&self) -> Vec<ChunkPayload> {
		self.read().iter().map(|chunk| chunk.payload.clone()).collect()
	}

	fn read(&self) -> RwLockReadGuard<'_, Vec<IndexedChunk>> {
		match self.chunks.read() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	fn write(&self) -> RwLockWriteGuard<'_, Vec<IndexedChunk>> {
		match self.chunks.write() {
			Ok(guard) => guard,
			Err(poisoned) => poisoned.into_inner(),
		}
	}

	fn in_document(chunk: &IndexedChunk, space_id: &str, doc_id: &str) -> bool {
		chunk.payload.space_id.as_deref() == Some(space_id)
			&& chunk.payload.doc_id.as_deref() == Some(doc_id)
	}
}
impl VectorSource for MemoryIndex {
	fn search<'a>(
		&'a self,
		vector: &'a [f32],
		filter: &'a AccessFilter,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateItem>>> {
		let results = if filter.matches_nothing() {
			Vec::new()
		} else {
			let chunks = self.read();
			let mut scored: Vec<CandidateItem> = chunks
				.iter()
				.filter(|chunk| filter.matches(&chunk.payload))
				.map(|chunk| {
					let score = chunk.vector.iter().zip(vector).map(|(lhs, rhs)| lhs * rhs).sum();

					CandidateItem::new(chunk.key.clone(), score, chunk.payload.clone())
				})
				.collect();

			scored.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score));
			scored.truncate(limit as usize);

			scored
		};

		Box::pin(async move { Ok(results) })
	}
}
impl LexicalSource for MemoryIndex {
	fn search<'a>(
		&'a self,
		query: &'a str,
		space_id: &'a str,
		doc_types: Option<&'a [String]>,
		limit: u32,
	) -> BoxFuture<'a, Result<Vec<CandidateItem>>> {
		let keywords = text::query_keywords(query);
		let chunks = self.read();
		let mut scored: Vec<CandidateItem> = chunks
			.iter()
			.filter(|chunk| chunk.payload.space_id.as_deref() == Some(space_id))
			.filter(|chunk| {
				doc_types.is_none_or(|types| types.iter().any(|ty| ty == &chunk.payload.doc_type))
			})
			.filter_map(|chunk| {
				let overlap = text::query_keywords(&chunk.payload.text)
					.iter()
					.filter(|word| keywords.contains(*word))
					.count();

				(overlap > 0).then(|| {
					CandidateItem::new(chunk.key.clone(), overlap as f32, chunk.payload.clone())
				})
			})
			.collect();

		drop(chunks);
		scored.sort_by(|lhs, rhs| rhs.score.total_cmp(&lhs.score));
		scored.truncate(limit as usize);

		Box::pin(async move { Ok(scored) })
	}

	// Keyword scores are computed from the stored chunks on every search.
	fn index<'a>(&'a self, _chunks: &'a [IndexedChunk]) -> BoxFuture<'a, Result<()>> {
		Box::pin(async { Ok(()) })
	}
}
impl DocumentStore for MemoryIndex {
	fn upsert_chunks<'a>(&'a self, chunks: &'a [IndexedChunk]) -> BoxFuture<'a, Result<()>> {
		let mut stored = self.write();

		for chunk in chunks {
			stored.retain(|existing| existing.key != chunk.key);
			stored.push(chunk.clone());
		}

		drop(stored);

		Box::pin(async { Ok(()) })
	}

	fn doc_chunks<'a>(
		&'a self,
		space_id: &'a str,
		doc_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<ChunkPayload>>> {
		let mut chunks: Vec<ChunkPayload> = self
			.read()
			.iter()
			.filter(|chunk| Self::in_document(chunk, space_id, doc_id))
			.map(|chunk| chunk.payload.clone())
			.collect();

		chunks.sort_by_key(|payload| payload.chunk_index);

		Box::pin(async move { Ok(chunks) })
	}

	fn owned_chunks<'a>(
		&'a self,
		space_id: &'a str,
		owner_id: &'a str,
	) -> BoxFuture<'a, Result<Vec<ChunkPayload>>> {
		let chunks = self
			.read()
			.iter()
			.filter(|chunk| chunk.payload.space_id.as_deref() == Some(space_id))
			.filter(|chunk| chunk.payload.owner_id.as_deref() == Some(owner_id))
			.map(|chunk| chunk.payload.clone())
			.collect();

		Box::pin(async move { Ok(chunks) })
	}

	fn delete_doc<'a>(&'a self, space_id: &'a str, doc_id: &'a str) -> BoxFuture<'a, Result<()>> {
		self.write().retain(|chunk| !Self::in_document(chunk, space_id, doc_id));

		Box::pin(async { Ok(()) })
	}

	fn update_doc_access<'a>(
		&'a self,
		space_id: &'a str,
		doc_id: &'a str,
		update: &'a AccessUpdate,
	) -> BoxFuture<'a, Result<()>> {
		self.write()
			.iter_mut()
			.filter(|chunk| Self::in_document(chunk, space_id, doc_id))
			.for_each(|chunk| update.apply(&mut chunk.payload));

		Box::pin(async { Ok(()) })
	}
}
