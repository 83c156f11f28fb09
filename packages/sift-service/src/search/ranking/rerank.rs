use std::collections::HashSet;

use sift_domain::{CandidateItem, text};

use crate::search::ranking::cmp_f32_desc;

/// The bounded prefix of candidates sent to the pairwise scorer.
#[derive(Debug)]
pub struct RerankBatch {
	/// Positions in the candidate list, in original order.
	pub positions: Vec<usize>,
	pub texts: Vec<String>,
}

/// Picks up to `max_candidates` candidates with text and compresses their text for scoring.
pub fn prepare(
	query: &str,
	candidates: &[CandidateItem],
	max_candidates: usize,
	snippet_max_chars: usize,
) -> Option<RerankBatch> {
	let positions: Vec<usize> = candidates
		.iter()
		.enumerate()
		.filter(|(_, item)| !item.text().trim().is_empty())
		.map(|(idx, _)| idx)
		.take(max_candidates)
		.collect();

	if positions.is_empty() {
		return None;
	}

	let texts = positions
		.iter()
		.map(|idx| text::compress_text(candidates[*idx].text(), query, snippet_max_chars))
		.collect();

	Some(RerankBatch { positions, texts })
}

/// Orders the scored prefix by descending score, then appends every other candidate in its
/// original order. A score count that does not match the batch hands the candidates back
/// untouched as the error.
pub fn reorder(
	candidates: Vec<CandidateItem>,
	batch: &RerankBatch,
	scores: &[f32],
) -> Result<Vec<CandidateItem>, Vec<CandidateItem>> {
	if scores.len() != batch.positions.len() {
		return Err(candidates);
	}

	let mut scored: Vec<(usize, f32)> =
		batch.positions.iter().copied().zip(scores.iter().copied()).collect();

	scored.sort_by(|a, b| cmp_f32_desc(a.1, b.1));

	let mut seen = HashSet::new();
	let mut slots: Vec<Option<CandidateItem>> = candidates.into_iter().map(Some).collect();
	let mut out = Vec::with_capacity(slots.len());

	for (idx, _) in &scored {
		if let Some(item) = slots[*idx].take()
			&& seen.insert(item.key.clone())
		{
			out.push(item);
		}
	}
	for item in slots.into_iter().flatten() {
		if seen.insert(item.key.clone()) {
			out.push(item);
		}
	}

	Ok(out)
}
