use sift_config::Search;

/// Adapts the requested result size to how specific the request looks.
///
/// A single doc type with a short query shrinks toward `min_top_k`. No doc type filter or a
/// long query grows toward `max_top_k`. The result is clamped to
/// `[min_top_k, max_context_chunks]` and is at least one.
pub fn effective_top_k(
	requested: Option<u32>,
	doc_types: &[String],
	query: &str,
	cfg: &Search,
) -> u32 {
	let mut target = requested.filter(|value| *value > 0).unwrap_or(cfg.default_top_k);
	let tokens = query.split_whitespace().count();

	if doc_types.len() == 1 && tokens <= 5 {
		target = target.min(cfg.min_top_k);
	} else if doc_types.is_empty() || tokens >= 10 {
		target = target.max(cfg.max_top_k);
	}

	target.max(cfg.min_top_k).min(cfg.max_context_chunks).max(1)
}
