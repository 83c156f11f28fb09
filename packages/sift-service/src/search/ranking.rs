pub mod dedup;
pub mod diversity;
pub mod fusion;
pub mod rerank;
pub mod size;

use std::cmp::Ordering;

pub use dedup::one_chunk_per_document;
pub use diversity::{cosine_similarity, select_diverse};
pub use fusion::reciprocal_rank_fusion;
pub use size::effective_top_k;

/// Descending order for scores, with NaN sorted last.
pub fn cmp_f32_desc(a: f32, b: f32) -> Ordering {
	match (a.is_nan(), b.is_nan()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => b.partial_cmp(&a).unwrap_or(Ordering::Equal),
	}
}
