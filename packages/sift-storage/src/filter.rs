//! Translation of [`AccessFilter`] into Qdrant payload filters.

use qdrant_client::qdrant::{Condition, Filter, MinShould};

use sift_access::{AccessFilter, VisibilityClause};

pub fn access_filter(filter: &AccessFilter) -> Filter {
	let mut must = Vec::new();

	if let Some(space_id) = &filter.space_id {
		must.push(Condition::matches("space_id", space_id.clone()));
	}
	if let Some(channel_id) = &filter.channel_id {
		must.push(Condition::matches("channel_id", channel_id.clone()));
	}
	if let Some(doc_types) = &filter.doc_types {
		must.push(Condition::matches("doc_type", doc_types.clone()));
	}
	if let Some(department) = &filter.department {
		// A chunk without a department is global to the space.
		must.push(Condition::from(Filter::should([
			Condition::matches("department", department.clone()),
			Condition::matches("department", String::new()),
		])));
	}

	let min_should = if filter.any_of.is_empty() {
		None
	} else {
		Some(MinShould {
			min_count: 1,
			conditions: filter.any_of.iter().map(visibility_condition).collect(),
		})
	};

	Filter { must, should: Vec::new(), must_not: Vec::new(), min_should }
}

/// Scope-only filter used by the lexical source.
pub fn scope_filter(space_id: &str, doc_types: Option<&[String]>) -> Filter {
	let mut must = vec![Condition::matches("space_id", space_id.to_string())];

	if let Some(doc_types) = doc_types {
		must.push(Condition::matches("doc_type", doc_types.to_vec()));
	}

	Filter::must(must)
}

pub fn document_filter(space_id: &str, doc_id: &str) -> Filter {
	Filter::must([
		Condition::matches("space_id", space_id.to_string()),
		Condition::matches("doc_id", doc_id.to_string()),
	])
}

pub fn owner_filter(space_id: &str, owner_id: &str) -> Filter {
	Filter::must([
		Condition::matches("space_id", space_id.to_string()),
		Condition::matches("owner_id", owner_id.to_string()),
	])
}

fn visibility_condition(clause: &VisibilityClause) -> Condition {
	match clause {
		VisibilityClause::Visibility(visibility) =>
			Condition::matches("visibility", visibility.as_str().to_string()),
		VisibilityClause::Owner(owner_id) => Condition::matches("owner_id", owner_id.clone()),
		VisibilityClause::AccessListContains(id) => Condition::matches("access_list", id.clone()),
		VisibilityClause::AgentRole(role) => Condition::matches("agent_roles", role.clone()),
	}
}
