use std::collections::{HashMap, HashSet};

use sift_domain::CandidateItem;

#[derive(Clone, Copy)]
struct Pick {
	position: usize,
	mmr_score: f32,
	relevance: f32,
}
impl Pick {
	// Equal MMR scores fall back to query relevance, then to earlier position.
	fn better_than(self, other: &Self) -> bool {
		self.mmr_score > other.mmr_score
			|| (self.mmr_score == other.mmr_score && self.relevance > other.relevance)
	}
}

pub fn cosine_similarity(lhs: &[f32], rhs: &[f32]) -> Option<f32> {
	if lhs.is_empty() || lhs.len() != rhs.len() {
		return None;
	}

	let mut dot = 0.0_f32;
	let mut lhs_norm = 0.0_f32;
	let mut rhs_norm = 0.0_f32;

	for (l, r) in lhs.iter().zip(rhs.iter()) {
		dot += l * r;
		lhs_norm += l * l;
		rhs_norm += r * r;
	}

	if lhs_norm <= f32::EPSILON || rhs_norm <= f32::EPSILON {
		return None;
	}

	Some((dot / (lhs_norm.sqrt() * rhs_norm.sqrt())).clamp(-1.0, 1.0))
}

/// Greedy maximal marginal relevance selection.
///
/// `vectors` maps candidate keys to their embeddings. Candidates without one are never picked
/// by the greedy loop and never used as a comparand. When the loop ends short of `top_k`, the
/// remaining slots are filled from `candidates` in original order.
pub fn select_diverse(
	query_vec: &[f32],
	candidates: &[CandidateItem],
	top_k: usize,
	lambda: f32,
	vectors: &HashMap<String, Vec<f32>>,
) -> Vec<CandidateItem> {
	let mut seen = HashSet::new();
	let unique: Vec<&CandidateItem> =
		candidates.iter().filter(|item| seen.insert(item.key.as_str())).collect();
	let mut remaining: Vec<usize> = (0..unique.len())
		.filter(|idx| vectors.get(&unique[*idx].key).is_some_and(|vec| !vec.is_empty()))
		.collect();
	let relevance: HashMap<usize, f32> = remaining
		.iter()
		.map(|idx| {
			let score = vectors
				.get(&unique[*idx].key)
				.and_then(|vec| cosine_similarity(query_vec, vec))
				.unwrap_or(0.0);

			(*idx, score)
		})
		.collect();
	let mut selected: Vec<usize> = Vec::new();

	while selected.len() < top_k && !remaining.is_empty() {
		let mut best: Option<Pick> = None;

		for (position, idx) in remaining.iter().copied().enumerate() {
			let relevance = relevance.get(&idx).copied().unwrap_or(0.0);
			let redundancy = max_similarity(&unique[idx].key, &selected, &unique, vectors);
			let pick = Pick {
				position,
				mmr_score: lambda * relevance - (1.0 - lambda) * redundancy,
				relevance,
			};

			if best.as_ref().map(|current| pick.better_than(current)).unwrap_or(true) {
				best = Some(pick);
			}
		}

		let Some(best) = best else { break };

		selected.push(remaining.remove(best.position));
	}

	let mut out: Vec<CandidateItem> = selected.iter().map(|idx| unique[*idx].clone()).collect();

	if out.len() < top_k {
		let picked: HashSet<usize> = selected.into_iter().collect();

		out.extend(
			(0..unique.len())
				.filter(|idx| !picked.contains(idx))
				.take(top_k - out.len())
				.map(|idx| unique[idx].clone()),
		);
	}

	out
}

fn max_similarity(
	key: &str,
	selected: &[usize],
	unique: &[&CandidateItem],
	vectors: &HashMap<String, Vec<f32>>,
) -> f32 {
	let Some(vec) = vectors.get(key) else { return 0.0 };

	selected
		.iter()
		.filter_map(|idx| vectors.get(&unique[*idx].key))
		.filter_map(|other| cosine_similarity(vec, other))
		.fold(None, |acc: Option<f32>, sim| Some(acc.map_or(sim, |best| best.max(sim))))
		.unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
	use sift_domain::ChunkPayload;

	use super::*;

	fn item(key: &str) -> CandidateItem {
		CandidateItem::new(key, 0.0, ChunkPayload { text: key.to_string(), ..Default::default() })
	}

	fn keys(items: &[CandidateItem]) -> Vec<&str> {
		items.iter().map(|item| item.key.as_str()).collect()
	}

	fn fixture() -> (Vec<CandidateItem>, HashMap<String, Vec<f32>>) {
		// "near" sits right next to "top"; "far" is orthogonal to it.
		let vectors = HashMap::from([
			("top".to_string(), vec![1.0, 0.0, 0.0]),
			("near".to_string(), vec![0.99, 0.1, 0.0]),
			("mid".to_string(), vec![0.6, 0.0, 0.8]),
			("far".to_string(), vec![0.0, 1.0, 0.0]),
		]);

		(vec![item("far"), item("mid"), item("near"), item("top")], vectors)
	}

	#[test]
	fn lambda_one_orders_by_query_similarity() {
		let (candidates, vectors) = fixture();
		let selected = select_diverse(&[1.0, 0.0, 0.0], &candidates, 4, 1.0, &vectors);

		assert_eq!(keys(&selected), vec!["top", "near", "mid", "far"]);
	}

	#[test]
	fn lambda_zero_still_opens_with_most_relevant() {
		let (candidates, vectors) = fixture();
		let selected = select_diverse(&[1.0, 0.0, 0.0], &candidates, 2, 0.0, &vectors);

		assert_eq!(selected[0].key, "top");
		assert_ne!(selected[1].key, "near");
		assert_eq!(selected[1].key, "far");
	}

	#[test]
	fn missing_embeddings_are_backfilled_in_order() {
		let (candidates, mut vectors) = fixture();

		vectors.remove("far");
		vectors.remove("mid");

		let selected = select_diverse(&[1.0, 0.0, 0.0], &candidates, 3, 0.7, &vectors);

		assert_eq!(keys(&selected), vec!["top", "near", "far"]);
	}

	#[test]
	fn duplicate_keys_are_considered_once() {
		let (mut candidates, vectors) = fixture();

		candidates.push(item("top"));

		let selected = select_diverse(&[1.0, 0.0, 0.0], &candidates, 10, 0.5, &vectors);

		assert_eq!(selected.len(), 4);
	}
}
