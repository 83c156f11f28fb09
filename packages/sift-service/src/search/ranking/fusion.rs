use std::collections::HashMap;

use sift_domain::CandidateItem;

/// Reciprocal rank fusion of two best-first lists.
///
/// Each occurrence adds `1 / (k + rank)` with 1-based ranks. The semantic list is enumerated
/// before the lexical list and the final sort is stable, so equal scores keep first-encounter
/// order. The payload comes from the lexical list when the key appears there.
pub fn reciprocal_rank_fusion(
	semantic: Vec<CandidateItem>,
	lexical: Vec<CandidateItem>,
	k: u32,
	limit: usize,
) -> Vec<CandidateItem> {
	let mut fused: Vec<(f64, CandidateItem)> = Vec::with_capacity(semantic.len() + lexical.len());
	let mut index_by_key: HashMap<String, usize> = HashMap::new();

	for (from_lexical, list) in [(false, semantic), (true, lexical)] {
		for (rank, item) in list.into_iter().enumerate() {
			let contribution = 1.0 / (f64::from(k) + rank as f64 + 1.0);

			match index_by_key.get(&item.key) {
				Some(&idx) => {
					let (score, existing) = &mut fused[idx];

					*score += contribution;

					if from_lexical {
						existing.payload = item.payload;
					}
				},
				None => {
					index_by_key.insert(item.key.clone(), fused.len());
					fused.push((contribution, item));
				},
			}
		}
	}

	fused.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

	fused
		.into_iter()
		.take(limit)
		.map(|(score, mut item)| {
			item.score = score as f32;

			item
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use sift_domain::ChunkPayload;

	use super::*;

	fn item(key: &str, text: &str) -> CandidateItem {
		CandidateItem::new(key, 0.5, ChunkPayload { text: text.to_string(), ..Default::default() })
	}

	#[test]
	fn shared_top_rank_beats_single_list_second_rank() {
		let fused = reciprocal_rank_fusion(
			vec![item("a", "dense")],
			vec![item("a", "lexical"), item("b", "lexical")],
			60,
			10,
		);

		assert_eq!(fused.len(), 2);
		assert_eq!(fused[0].key, "a");
		assert!((fused[0].score - (2.0 / 61.0) as f32).abs() < 1e-6);
		assert!((fused[1].score - (1.0 / 62.0) as f32).abs() < 1e-6);
		assert!((fused[0].score - 0.03279).abs() < 1e-5);
		assert!((fused[1].score - 0.01613).abs() < 1e-5);
	}

	#[test]
	fn lexical_payload_wins_and_ties_keep_semantic_first() {
		let fused = reciprocal_rank_fusion(
			vec![item("s", "semantic"), item("x", "semantic copy")],
			vec![item("l", "lexical"), item("x", "lexical copy")],
			60,
			10,
		);
		let keys: Vec<&str> = fused.iter().map(|item| item.key.as_str()).collect();

		assert_eq!(keys, vec!["x", "s", "l"]);
		assert_eq!(fused[0].text(), "lexical copy");
	}

	#[test]
	fn output_is_truncated_to_limit() {
		let fused = reciprocal_rank_fusion(
			vec![item("a", ""), item("b", ""), item("c", "")],
			Vec::new(),
			60,
			2,
		);

		assert_eq!(fused.len(), 2);
		assert!(reciprocal_rank_fusion(Vec::new(), Vec::new(), 60, 5).is_empty());
	}
}
