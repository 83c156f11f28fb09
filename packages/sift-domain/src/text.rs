use std::{collections::HashSet, sync::OnceLock};

use regex::Regex;
use unicode_segmentation::UnicodeSegmentation;

const MIN_KEYWORD_CHARS: usize = 3;

fn sentence_boundary() -> Option<&'static Regex> {
	static RE: OnceLock<Option<Regex>> = OnceLock::new();

	RE.get_or_init(|| Regex::new(r"[.!?]\s+|\n{2,}").ok()).as_ref()
}

pub fn split_sentences(text: &str) -> Vec<&str> {
	let Some(boundary) = sentence_boundary() else { return vec![text.trim()] };
	let mut out = Vec::new();
	let mut start = 0;

	for found in boundary.find_iter(text) {
		let ends_with_mark = matches!(text.as_bytes()[found.start()], b'.' | b'!' | b'?');
		let end = if ends_with_mark { found.start() + 1 } else { found.start() };
		let sentence = text[start..end].trim();

		if !sentence.is_empty() {
			out.push(sentence);
		}

		start = found.end();
	}

	let tail = text[start..].trim();

	if !tail.is_empty() {
		out.push(tail);
	}

	out
}

/// Lower-cased query words of at least three characters.
pub fn query_keywords(query: &str) -> HashSet<String> {
	query
		.unicode_words()
		.filter(|word| word.chars().count() >= MIN_KEYWORD_CHARS)
		.map(str::to_lowercase)
		.collect()
}

/// Shrinks `text` to the sentences most relevant to `query`, bounded by `max_chars`.
///
/// Sentences mentioning a query keyword are kept in document order. When none match, the
/// first two sentences stand in. Remaining budget is filled with further sentences while
/// they fit, and an over-long selection is cut at a word boundary with an ellipsis.
pub fn compress_text(text: &str, query: &str, max_chars: usize) -> String {
	let text = text.trim();

	if text.is_empty() {
		return String::new();
	}

	let sentences = split_sentences(text);

	if sentences.is_empty() {
		return text.chars().take(max_chars).collect();
	}

	let keywords = query_keywords(query);
	let mut selected: Vec<usize> = if keywords.is_empty() {
		Vec::new()
	} else {
		sentences
			.iter()
			.enumerate()
			.filter(|(_, sentence)| {
				let lowered = sentence.to_lowercase();

				keywords.iter().any(|keyword| lowered.contains(keyword.as_str()))
			})
			.map(|(idx, _)| idx)
			.collect()
	};

	if selected.is_empty() {
		selected = (0..sentences.len().min(2)).collect();
	}

	let mut snippet =
		selected.iter().map(|idx| sentences[*idx]).collect::<Vec<_>>().join(" ");
	let snippet_chars = snippet.chars().count();

	if snippet_chars >= max_chars {
		return truncate_at_word(&snippet, max_chars);
	}

	let mut remaining = max_chars - snippet_chars;

	for (idx, sentence) in sentences.iter().enumerate() {
		if selected.contains(&idx) {
			continue;
		}

		let needed = sentence.chars().count() + 1;

		if needed > remaining {
			break;
		}

		snippet.push(' ');
		snippet.push_str(sentence);

		remaining -= needed;

		if remaining == 0 {
			break;
		}
	}

	snippet
}

/// Whitespace word count used for token accounting.
pub fn count_tokens(text: &str) -> u64 {
	text.split_whitespace().count() as u64
}

pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
	match text.char_indices().nth(max_chars) {
		Some((idx, _)) => &text[..idx],
		None => text,
	}
}

fn truncate_at_word(text: &str, max_chars: usize) -> String {
	let head = truncate_chars(text, max_chars);
	let cut = match head.rfind(' ') {
		Some(idx) => &head[..idx],
		None => head,
	};

	format!("{}…", cut.trim_end())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn splits_on_terminal_punctuation_and_blank_lines() {
		let sentences = split_sentences("First one. Second one!\n\nThird part? Tail");

		assert_eq!(sentences, vec!["First one.", "Second one!", "Third part?", "Tail"]);
	}

	#[test]
	fn keeps_matching_sentences_then_pads() {
		let text = "Alpha is here. Budget grew by ten percent. Gamma closes.";
		let out = compress_text(text, "budget", 600);

		assert_eq!(out, "Budget grew by ten percent. Alpha is here. Gamma closes.");
	}

	#[test]
	fn falls_back_to_first_two_sentences() {
		let text = "One. Two. Three.";
		let out = compress_text(text, "zz", 12);

		assert_eq!(out, "One. Two.");
	}

	#[test]
	fn truncates_at_word_boundary_with_ellipsis() {
		let text = "Budget planning covers many departments and quarters";
		let out = compress_text(text, "budget", 20);

		assert_eq!(out, "Budget planning…");
	}

	#[test]
	fn short_keywords_are_ignored() {
		let keywords = query_keywords("Is Q3 on the API roadmap?");

		assert!(keywords.contains("api"));
		assert!(keywords.contains("roadmap"));
		assert!(!keywords.contains("q3"));
		assert!(!keywords.contains("is"));
	}

	#[test]
	fn counts_whitespace_tokens() {
		assert_eq!(count_tokens("  one two\nthree "), 3);
	}
}
