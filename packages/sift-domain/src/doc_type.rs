pub const EMAIL: &str = "email_correspondence";
pub const MESSENGER: &str = "messenger_correspondence";
pub const PRESENTATIONS: &str = "presentations";
pub const PROTOCOLS: &str = "protocols";
pub const TECHNICAL: &str = "technical_docs";
pub const WORK_PLANS: &str = "work_plans";
pub const UNSTRUCTURED: &str = "unstructured";

pub const ALL: [&str; 7] =
	[EMAIL, MESSENGER, PRESENTATIONS, PROTOCOLS, TECHNICAL, WORK_PLANS, UNSTRUCTURED];

const ALIASES: &[(&str, &str)] = &[
	("email", EMAIL),
	("emails", EMAIL),
	("mail", EMAIL),
	("messenger", MESSENGER),
	("chat", MESSENGER),
	("chats", MESSENGER),
	("slides", PRESENTATIONS),
	("minutes", PROTOCOLS),
	("tech", TECHNICAL),
	("specs", TECHNICAL),
	("specifications", TECHNICAL),
	("plans", WORK_PLANS),
	("roadmaps", WORK_PLANS),
];

const QUERY_HINTS: &[(&str, &[&str])] = &[
	(EMAIL, &["email", "e-mail", "inbox", "mailbox"]),
	(MESSENGER, &["messenger", "chat", "telegram", "whatsapp", "slack"]),
	(PRESENTATIONS, &["presentation", "slides", "slide", "deck"]),
	(PROTOCOLS, &["protocol", "minutes", "committee"]),
	(TECHNICAL, &["technical", "spec", "api", "architecture", "documentation"]),
	(WORK_PLANS, &["plan", "roadmap", "schedule", "milestone"]),
];

/// Maps a canonical name or alias to its canonical doc type.
pub fn normalize(value: &str) -> Option<&'static str> {
	let value = value.trim().to_lowercase();

	if value.is_empty() {
		return None;
	}
	if let Some(canonical) = ALL.iter().find(|name| **name == value) {
		return Some(canonical);
	}

	ALIASES.iter().find(|(alias, _)| *alias == value).map(|(_, canonical)| *canonical)
}

/// Normalizes a requested type list, dropping unknown values and duplicates while keeping
/// first-occurrence order.
pub fn normalize_all<S>(values: &[S]) -> Vec<String>
where
	S: AsRef<str>,
{
	let mut out: Vec<String> = Vec::new();

	for value in values {
		let Some(canonical) = normalize(value.as_ref()) else { continue };

		if !out.iter().any(|existing| existing == canonical) {
			out.push(canonical.to_string());
		}
	}

	out
}

/// Infers doc types from keyword hints in free-form query text.
pub fn infer_from_query(query: &str) -> Vec<String> {
	let lowered = query.to_lowercase();

	if lowered.trim().is_empty() {
		return Vec::new();
	}

	QUERY_HINTS
		.iter()
		.filter(|(_, hints)| hints.iter().any(|hint| lowered.contains(hint)))
		.map(|(doc_type, _)| doc_type.to_string())
		.collect()
}
