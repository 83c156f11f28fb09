use std::{
	collections::{BTreeMap, HashMap},
	path::Path,
	sync::{Arc, RwLock},
};

use crate::{
	Error, Result, file,
	role::{self, EntityType, MAX_SECURITY_LEVEL, RolePermissions},
};

/// Immutable role set with inheritance resolved at construction.
#[derive(Debug)]
pub struct RoleRegistry {
	roles: BTreeMap<String, RolePermissions>,
	inheritance: BTreeMap<String, Vec<String>>,
	effective: HashMap<String, Arc<RolePermissions>>,
}
impl RoleRegistry {
	/// Builds a registry, resolving inheritance transitively.
	///
	/// Inherited names that do not resolve to a role are skipped with a warning. Cycles are
	/// rejected.
	pub fn new(
		roles: Vec<RolePermissions>,
		inheritance: BTreeMap<String, Vec<String>>,
	) -> Result<Self> {
		let mut by_name = BTreeMap::new();

		for role in roles {
			if role.role_name.trim().is_empty() {
				return Err(Error::Validation {
					message: "role_name must be non-empty.".to_string(),
				});
			}
			if role.max_security_level > MAX_SECURITY_LEVEL {
				return Err(Error::Validation {
					message: format!(
						"Role {:?} max_security_level must be in the range 0-{MAX_SECURITY_LEVEL}.",
						role.role_name
					),
				});
			}

			by_name.insert(role.role_name.clone(), role);
		}

		for (role_name, parents) in &inheritance {
			if !by_name.contains_key(role_name) {
				tracing::warn!(role = %role_name, "Inheritance declared for an unknown role.");
			}

			for parent in parents {
				if !by_name.contains_key(parent) {
					tracing::warn!(
						role = %role_name,
						inherited = %parent,
						"Inherited role is unknown. Skipping."
					);
				}
			}
		}

		let mut resolver =
			Resolver { roles: &by_name, inheritance: &inheritance, done: HashMap::new() };

		for role_name in by_name.keys() {
			resolver.resolve(role_name, &mut Vec::new())?;
		}

		let effective =
			resolver.done.into_iter().map(|(name, role)| (name, Arc::new(role))).collect();

		Ok(Self { roles: by_name, inheritance, effective })
	}

	pub fn builtin() -> Self {
		let roles = role::builtin_roles();
		let effective = roles
			.iter()
			.map(|role| (role.role_name.clone(), Arc::new(role.clone())))
			.collect();
		let roles = roles.into_iter().map(|role| (role.role_name.clone(), role)).collect();

		Self { roles, inheritance: BTreeMap::new(), effective }
	}

	/// Loads a roles file, or the built-in set when `path` is `None`.
	pub fn load(path: Option<&Path>) -> Result<Self> {
		match path {
			Some(path) => file::load(path),
			None => Ok(Self::builtin()),
		}
	}

	/// The role as declared, without inheritance.
	pub fn get(&self, role_name: &str) -> Option<&RolePermissions> {
		self.roles.get(role_name)
	}

	pub fn effective_permissions(&self, role_name: &str) -> Option<Arc<RolePermissions>> {
		self.effective.get(role_name).cloned()
	}

	pub fn contains(&self, role_name: &str) -> bool {
		self.roles.contains_key(role_name)
	}

	pub fn list(&self, entity_type: Option<EntityType>) -> Vec<&RolePermissions> {
		self.roles
			.values()
			.filter(|role| entity_type.is_none_or(|kind| role.entity_type == kind))
			.collect()
	}

	pub fn inheritance(&self) -> &BTreeMap<String, Vec<String>> {
		&self.inheritance
	}

	pub fn len(&self) -> usize {
		self.roles.len()
	}

	pub fn is_empty(&self) -> bool {
		self.roles.is_empty()
	}
}

struct Resolver<'a> {
	roles: &'a BTreeMap<String, RolePermissions>,
	inheritance: &'a BTreeMap<String, Vec<String>>,
	done: HashMap<String, RolePermissions>,
}
impl Resolver<'_> {
	fn resolve(
		&mut self,
		role_name: &str,
		path: &mut Vec<String>,
	) -> Result<Option<RolePermissions>> {
		if let Some(done) = self.done.get(role_name) {
			return Ok(Some(done.clone()));
		}

		let Some(base) = self.roles.get(role_name) else { return Ok(None) };

		if path.iter().any(|seen| seen == role_name) {
			return Err(Error::InheritanceCycle { role_name: role_name.to_string() });
		}

		path.push(role_name.to_string());

		let mut merged = base.clone();

		let inheritance = self.inheritance;

		if let Some(parents) = inheritance.get(role_name) {
			for parent in parents {
				if let Some(inherited) = self.resolve(parent, path)? {
					merged = role::merge(&merged, &inherited);
				}
			}
		}

		path.pop();
		self.done.insert(role_name.to_string(), merged.clone());

		Ok(Some(merged))
	}
}

/// Holds the active registry and swaps it atomically on reload.
///
/// Readers take an `Arc` snapshot and keep it for the rest of their request.
#[derive(Debug)]
pub struct RoleStore {
	current: RwLock<Arc<RoleRegistry>>,
}
impl RoleStore {
	pub fn new(registry: RoleRegistry) -> Self {
		Self { current: RwLock::new(Arc::new(registry)) }
	}

	pub fn snapshot(&self) -> Arc<RoleRegistry> {
		match self.current.read() {
			Ok(guard) => guard.clone(),
			Err(poisoned) => poisoned.into_inner().clone(),
		}
	}

	pub fn replace(&self, registry: RoleRegistry) {
		let registry = Arc::new(registry);

		match self.current.write() {
			Ok(mut guard) => *guard = registry,
			Err(poisoned) => *poisoned.into_inner() = registry,
		}
	}

	/// Loads a fresh registry and swaps it in. The active registry is kept on error.
	pub fn reload(&self, path: Option<&Path>) -> Result<usize> {
		let registry = RoleRegistry::load(path)?;
		let count = registry.len();

		self.replace(registry);

		tracing::info!(roles = count, path = ?path, "Role registry reloaded.");

		Ok(count)
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use super::*;

	fn role(name: &str, level: u8) -> RolePermissions {
		RolePermissions {
			max_security_level: level,
			..RolePermissions::new(name, EntityType::Human)
		}
	}

	#[test]
	fn inheritance_resolves_transitively() {
		let registry = RoleRegistry::new(
			vec![
				role("lead", 1),
				RolePermissions { can_manage_access: true, ..role("manager", 2) },
				role("director", 4),
			],
			BTreeMap::from([
				("lead".to_string(), vec!["manager".to_string()]),
				("manager".to_string(), vec!["director".to_string()]),
			]),
		)
		.expect("Failed to build registry.");
		let lead = registry.effective_permissions("lead").expect("Missing lead.");

		assert_eq!(lead.max_security_level, 4);
		assert!(lead.can_manage_access);
		assert_eq!(registry.get("lead").map(|role| role.max_security_level), Some(1));
	}

	#[test]
	fn unknown_parent_is_skipped() {
		let registry = RoleRegistry::new(
			vec![role("solo", 2)],
			BTreeMap::from([("solo".to_string(), vec!["ghost".to_string()])]),
		)
		.expect("Failed to build registry.");

		assert_eq!(
			registry.effective_permissions("solo").map(|role| role.max_security_level),
			Some(2)
		);
	}

	#[test]
	fn cycles_are_rejected() {
		let err = RoleRegistry::new(
			vec![role("a", 0), role("b", 0)],
			BTreeMap::from([
				("a".to_string(), vec!["b".to_string()]),
				("b".to_string(), vec!["a".to_string()]),
			]),
		)
		.expect_err("Expected a cycle error.");

		assert!(matches!(err, Error::InheritanceCycle { .. }));
	}

	#[test]
	fn security_level_above_five_is_rejected() {
		let err = RoleRegistry::new(vec![role("root", 6)], BTreeMap::new())
			.expect_err("Expected a validation error.");

		assert!(err.to_string().contains("max_security_level must be in the range 0-5."));
	}

	#[test]
	fn store_swaps_whole_registry() {
		let store = RoleStore::new(RoleRegistry::builtin());
		let before = store.snapshot();

		store.replace(
			RoleRegistry::new(vec![role("only", 0)], BTreeMap::new())
				.expect("Failed to build registry."),
		);

		let after = store.snapshot();

		assert!(before.contains("admin"));
		assert!(!after.contains("admin"));
		assert_eq!(
			after.list(None).iter().map(|role| role.role_name.as_str()).collect::<BTreeSet<_>>(),
			BTreeSet::from(["only"])
		);
	}
}
