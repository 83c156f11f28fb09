use sift_domain::{ChunkPayload, Visibility};

/// One alternative of the visibility any-of clause.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum VisibilityClause {
	Visibility(Visibility),
	Owner(String),
	AccessListContains(String),
	AgentRole(String),
}
impl VisibilityClause {
	fn matches(&self, payload: &ChunkPayload) -> bool {
		match self {
			Self::Visibility(visibility) => payload.visibility == *visibility,
			Self::Owner(owner_id) => payload.owner_id.as_deref() == Some(owner_id.as_str()),
			Self::AccessListContains(id) => payload.access_list.iter().any(|entry| entry == id),
			Self::AgentRole(role) => payload.agent_roles.iter().any(|entry| entry == role),
		}
	}
}

/// Source-level narrowing built from an access context.
///
/// Advisory only: every item a source returns is still checked individually.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AccessFilter {
	pub space_id: Option<String>,
	pub channel_id: Option<String>,
	/// At least one must match when non-empty.
	pub any_of: Vec<VisibilityClause>,
	/// `None` is unrestricted. An empty list matches nothing.
	pub doc_types: Option<Vec<String>>,
	/// Matches chunks in this department or with no department.
	pub department: Option<String>,
}
impl AccessFilter {
	/// A filter no chunk can satisfy.
	pub fn nothing() -> Self {
		Self { doc_types: Some(Vec::new()), ..Default::default() }
	}

	pub fn matches_nothing(&self) -> bool {
		self.doc_types.as_ref().is_some_and(Vec::is_empty)
	}

	pub fn matches(&self, payload: &ChunkPayload) -> bool {
		if let Some(space_id) = &self.space_id
			&& payload.space_id.as_deref() != Some(space_id.as_str())
		{
			return false;
		}
		if let Some(channel_id) = &self.channel_id
			&& payload.channel_id.as_deref() != Some(channel_id.as_str())
		{
			return false;
		}
		if let Some(doc_types) = &self.doc_types
			&& !doc_types.iter().any(|doc_type| doc_type == &payload.doc_type)
		{
			return false;
		}
		if let Some(department) = &self.department
			&& !payload.department.is_empty()
			&& &payload.department != department
		{
			return false;
		}

		self.any_of.is_empty() || self.any_of.iter().any(|clause| clause.matches(payload))
	}
}
