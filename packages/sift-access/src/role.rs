use std::{
	collections::{BTreeMap, BTreeSet},
	fmt,
};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use sift_domain::{Visibility, doc_type};

pub const MAX_SECURITY_LEVEL: u8 = 5;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
	#[default]
	Human,
	Agent,
}
impl EntityType {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Human => "human",
			Self::Agent => "agent",
		}
	}
}
impl fmt::Display for EntityType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Permission profile of a named role.
///
/// `None` for `allowed_doc_types` or `allowed_departments` means unrestricted. Instances are
/// never mutated once a registry has been built from them.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct RolePermissions {
	pub role_name: String,
	#[serde(default)]
	pub entity_type: EntityType,
	#[serde(default)]
	pub description: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub allowed_doc_types: Option<BTreeSet<String>>,
	#[serde(default = "default_visibility")]
	pub allowed_visibility: BTreeSet<Visibility>,
	#[serde(default)]
	pub max_security_level: u8,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub allowed_departments: Option<BTreeSet<String>>,
	#[serde(default)]
	pub can_create: bool,
	#[serde(default)]
	pub can_edit_own: bool,
	#[serde(default)]
	pub can_edit_others: bool,
	#[serde(default)]
	pub can_delete_own: bool,
	#[serde(default)]
	pub can_delete_others: bool,
	#[serde(default)]
	pub can_manage_access: bool,
	#[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
	pub metadata: BTreeMap<String, Value>,
}
impl RolePermissions {
	pub fn new(role_name: impl Into<String>, entity_type: EntityType) -> Self {
		Self {
			role_name: role_name.into(),
			entity_type,
			description: String::new(),
			allowed_doc_types: None,
			allowed_visibility: default_visibility(),
			max_security_level: 0,
			allowed_departments: None,
			can_create: false,
			can_edit_own: false,
			can_edit_others: false,
			can_delete_own: false,
			can_delete_others: false,
			can_manage_access: false,
			metadata: BTreeMap::new(),
		}
	}

	pub fn can_access_visibility(&self, visibility: Visibility) -> bool {
		self.allowed_visibility.contains(&visibility)
	}

	pub fn can_access_doc_type(&self, doc_type: &str) -> bool {
		match &self.allowed_doc_types {
			Some(allowed) => allowed.contains(doc_type),
			None => true,
		}
	}

	pub fn can_access_security_level(&self, security_level: u8) -> bool {
		security_level <= self.max_security_level
	}

	/// Empty department means global and always passes.
	pub fn can_access_department(&self, department: &str) -> bool {
		if department.is_empty() {
			return true;
		}

		match &self.allowed_departments {
			Some(allowed) => allowed.contains(department),
			None => true,
		}
	}
}

fn default_visibility() -> BTreeSet<Visibility> {
	BTreeSet::from([Visibility::Public])
}

/// Merges an inherited role into `base`.
///
/// Restriction sets are unioned, and an unrestricted side makes the merged field
/// unrestricted. Capability flags are OR-ed and the higher security level wins. Identity
/// fields and colliding metadata keys come from `base`.
pub fn merge(base: &RolePermissions, inherited: &RolePermissions) -> RolePermissions {
	let mut metadata = inherited.metadata.clone();

	metadata.extend(base.metadata.iter().map(|(key, value)| (key.clone(), value.clone())));

	RolePermissions {
		role_name: base.role_name.clone(),
		entity_type: base.entity_type,
		description: base.description.clone(),
		allowed_doc_types: union_restriction(&base.allowed_doc_types, &inherited.allowed_doc_types),
		allowed_visibility: base
			.allowed_visibility
			.union(&inherited.allowed_visibility)
			.copied()
			.collect(),
		max_security_level: base.max_security_level.max(inherited.max_security_level),
		allowed_departments: union_restriction(
			&base.allowed_departments,
			&inherited.allowed_departments,
		),
		can_create: base.can_create || inherited.can_create,
		can_edit_own: base.can_edit_own || inherited.can_edit_own,
		can_edit_others: base.can_edit_others || inherited.can_edit_others,
		can_delete_own: base.can_delete_own || inherited.can_delete_own,
		can_delete_others: base.can_delete_others || inherited.can_delete_others,
		can_manage_access: base.can_manage_access || inherited.can_manage_access,
		metadata,
	}
}

fn union_restriction(
	left: &Option<BTreeSet<String>>,
	right: &Option<BTreeSet<String>>,
) -> Option<BTreeSet<String>> {
	match (left, right) {
		(Some(left), Some(right)) => Some(left.union(right).cloned().collect()),
		_ => None,
	}
}

fn names(values: &[&str]) -> Option<BTreeSet<String>> {
	Some(values.iter().map(|value| value.to_string()).collect())
}

fn visibility(values: &[Visibility]) -> BTreeSet<Visibility> {
	values.iter().copied().collect()
}

/// Role set used when no roles file is configured.
pub fn builtin_roles() -> Vec<RolePermissions> {
	use Visibility::{Channel, Private, Public, Team};

	vec![
		RolePermissions {
			description: "Guest with minimal access.".to_string(),
			..RolePermissions::new("guest", EntityType::Human)
		},
		RolePermissions {
			description: "Developer with access to technical material.".to_string(),
			allowed_doc_types: names(&[
				doc_type::TECHNICAL,
				doc_type::WORK_PLANS,
				doc_type::PROTOCOLS,
				doc_type::UNSTRUCTURED,
			]),
			allowed_visibility: visibility(&[Public, Team, Channel]),
			max_security_level: 3,
			allowed_departments: names(&["engineering", "product"]),
			can_create: true,
			can_edit_own: true,
			can_delete_own: true,
			..RolePermissions::new("developer", EntityType::Human)
		},
		RolePermissions {
			description: "Business analyst with access to plans and analytics.".to_string(),
			allowed_doc_types: names(&[
				doc_type::WORK_PLANS,
				doc_type::PRESENTATIONS,
				doc_type::EMAIL,
				doc_type::TECHNICAL,
				doc_type::PROTOCOLS,
			]),
			allowed_visibility: visibility(&[Public, Team, Channel]),
			max_security_level: 3,
			allowed_departments: names(&["product", "business", "engineering"]),
			can_create: true,
			can_edit_own: true,
			can_delete_own: true,
			..RolePermissions::new("business_analyst", EntityType::Human)
		},
		RolePermissions {
			description: "Technical writer maintaining documentation.".to_string(),
			allowed_doc_types: names(&[
				doc_type::TECHNICAL,
				doc_type::PROTOCOLS,
				doc_type::PRESENTATIONS,
				doc_type::UNSTRUCTURED,
			]),
			allowed_visibility: visibility(&[Public, Team, Channel]),
			max_security_level: 2,
			allowed_departments: names(&["documentation", "engineering", "product"]),
			can_create: true,
			can_edit_own: true,
			can_edit_others: true,
			can_delete_own: true,
			..RolePermissions::new("technical_writer", EntityType::Human)
		},
		RolePermissions {
			description: "Project manager with broad access.".to_string(),
			allowed_visibility: visibility(&[Public, Team, Channel]),
			max_security_level: 4,
			can_create: true,
			can_edit_own: true,
			can_delete_own: true,
			can_manage_access: true,
			..RolePermissions::new("project_manager", EntityType::Human)
		},
		RolePermissions {
			description: "Administrator with full access.".to_string(),
			allowed_visibility: visibility(&[Public, Team, Channel, Private]),
			max_security_level: MAX_SECURITY_LEVEL,
			can_create: true,
			can_edit_own: true,
			can_edit_others: true,
			can_delete_own: true,
			can_delete_others: true,
			can_manage_access: true,
			..RolePermissions::new("admin", EntityType::Human)
		},
		RolePermissions {
			description: "Research agent for technical lookups.".to_string(),
			allowed_doc_types: names(&[
				doc_type::TECHNICAL,
				doc_type::WORK_PLANS,
				doc_type::PRESENTATIONS,
				doc_type::PROTOCOLS,
				doc_type::UNSTRUCTURED,
			]),
			allowed_visibility: visibility(&[Public, Team, Channel]),
			max_security_level: 2,
			..RolePermissions::new("agent_research", EntityType::Agent)
		},
		RolePermissions {
			description: "Support agent answering questions.".to_string(),
			allowed_doc_types: names(&[doc_type::PROTOCOLS, doc_type::TECHNICAL, doc_type::EMAIL]),
			allowed_visibility: visibility(&[Public, Channel]),
			max_security_level: 1,
			..RolePermissions::new("agent_support", EntityType::Agent)
		},
		RolePermissions {
			description: "Analytics agent with broad read access.".to_string(),
			allowed_visibility: visibility(&[Public, Team, Channel]),
			max_security_level: 3,
			..RolePermissions::new("agent_analytics", EntityType::Agent)
		},
		RolePermissions {
			description: "Summarizer agent for correspondence.".to_string(),
			allowed_doc_types: names(&[doc_type::EMAIL, doc_type::MESSENGER]),
			allowed_visibility: visibility(&[Public, Team, Channel]),
			max_security_level: 1,
			..RolePermissions::new("agent_summarizer", EntityType::Agent)
		},
		RolePermissions {
			description: "Administrative agent with full read access.".to_string(),
			allowed_visibility: visibility(&[Public, Team, Channel, Private]),
			max_security_level: MAX_SECURITY_LEVEL,
			..RolePermissions::new("agent_admin", EntityType::Agent)
		},
	]
}

#[cfg(test)]
mod tests {
	use super::*;

	fn restricted(name: &str, doc_types: &[&str], level: u8) -> RolePermissions {
		RolePermissions {
			allowed_doc_types: names(doc_types),
			max_security_level: level,
			..RolePermissions::new(name, EntityType::Human)
		}
	}

	#[test]
	fn merge_unions_restricted_sets() {
		let base = restricted("base", &["protocols"], 1);
		let inherited = RolePermissions {
			allowed_visibility: BTreeSet::from([Visibility::Team]),
			can_create: true,
			..restricted("parent", &["work_plans"], 3)
		};
		let merged = merge(&base, &inherited);

		assert_eq!(merged.role_name, "base");
		assert_eq!(merged.allowed_doc_types, names(&["protocols", "work_plans"]));
		assert_eq!(
			merged.allowed_visibility,
			BTreeSet::from([Visibility::Team, Visibility::Public])
		);
		assert_eq!(merged.max_security_level, 3);
		assert!(merged.can_create);
	}

	#[test]
	fn merge_with_unrestricted_side_is_unrestricted() {
		let base = restricted("base", &["protocols"], 0);
		let inherited = RolePermissions::new("open", EntityType::Human);

		assert_eq!(merge(&base, &inherited).allowed_doc_types, None);
		assert_eq!(merge(&inherited, &base).allowed_doc_types, None);
	}

	#[test]
	fn empty_department_always_passes() {
		let role = RolePermissions {
			allowed_departments: names(&["engineering"]),
			..RolePermissions::new("dev", EntityType::Human)
		};

		assert!(role.can_access_department(""));
		assert!(role.can_access_department("engineering"));
		assert!(!role.can_access_department("finance"));
	}

	#[test]
	fn builtin_set_has_eleven_roles() {
		let roles = builtin_roles();

		assert_eq!(roles.len(), 11);
		assert_eq!(roles.iter().filter(|role| role.entity_type == EntityType::Agent).count(), 5);
	}
}
