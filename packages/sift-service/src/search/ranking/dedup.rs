use std::collections::{HashMap, HashSet};

use sift_domain::CandidateItem;

/// Keeps one chunk per document, backfilling from the pool when that leaves fewer than `top_k`.
///
/// Backfill first takes unseen documents from `pool` in order, then chunks of already-kept
/// documents (closest `chunk_index` to the kept chunk first), then chunks without a document.
pub fn one_chunk_per_document(
	selected: Vec<CandidateItem>,
	pool: &[CandidateItem],
	top_k: usize,
) -> Vec<CandidateItem> {
	let mut kept_index: HashMap<String, i64> = HashMap::new();
	let mut unique: Vec<CandidateItem> = Vec::new();
	let mut duplicates: Vec<(String, Vec<CandidateItem>)> = Vec::new();
	let mut orphans: Vec<CandidateItem> = Vec::new();

	for item in selected {
		let Some(doc_id) = item.doc_id().map(str::to_string) else {
			orphans.push(item);

			continue;
		};

		if kept_index.contains_key(&doc_id) {
			match duplicates.iter_mut().find(|(id, _)| *id == doc_id) {
				Some((_, bucket)) => bucket.push(item),
				None => duplicates.push((doc_id, vec![item])),
			}
		} else {
			kept_index.insert(doc_id, item.payload.chunk_index.unwrap_or(0));
			unique.push(item);
		}
	}

	if unique.len() >= top_k {
		unique.truncate(top_k);

		return unique;
	}

	for item in pool {
		if unique.len() >= top_k {
			break;
		}

		let Some(doc_id) = item.doc_id() else { continue };

		if !kept_index.contains_key(doc_id) {
			kept_index.insert(doc_id.to_string(), item.payload.chunk_index.unwrap_or(0));
			unique.push(item.clone());
		}
	}

	if unique.len() >= top_k {
		unique.truncate(top_k);

		return unique;
	}

	let mut neighbors: Vec<CandidateItem> = Vec::new();

	for (doc_id, mut bucket) in duplicates {
		if let Some(primary) = kept_index.get(&doc_id).copied() {
			bucket.sort_by_key(|item| (item.payload.chunk_index.unwrap_or(0) - primary).abs());
		}

		neighbors.extend(bucket);
	}

	let mut taken: HashSet<String> = unique.iter().map(|item| item.key.clone()).collect();
	let mut queued: HashSet<String> = neighbors.iter().map(|item| item.key.clone()).collect();

	for item in pool {
		let Some(doc_id) = item.doc_id() else { continue };

		if kept_index.contains_key(doc_id)
			&& !taken.contains(&item.key)
			&& queued.insert(item.key.clone())
		{
			neighbors.push(item.clone());
		}
	}

	for item in neighbors.into_iter().chain(orphans) {
		if unique.len() >= top_k {
			break;
		}
		if taken.insert(item.key.clone()) {
			unique.push(item);
		}
	}

	unique.truncate(top_k);

	unique
}
