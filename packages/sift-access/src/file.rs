//! Roles file I/O. The format follows the extension: `.json` is JSON, anything else is TOML.

use std::{collections::BTreeMap, fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::{Error, Result, RolePermissions, registry::RoleRegistry};

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RolesFile {
	#[serde(default)]
	pub roles: Vec<RolePermissions>,
	#[serde(default)]
	pub role_inheritance: BTreeMap<String, Vec<String>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
	Json,
	Toml,
}

fn format_for(path: &Path) -> Format {
	match path.extension().and_then(|ext| ext.to_str()) {
		Some(ext) if ext.eq_ignore_ascii_case("json") => Format::Json,
		_ => Format::Toml,
	}
}

pub fn parse(path: &Path, raw: &str) -> Result<RolesFile> {
	let parsed = match format_for(path) {
		Format::Json => serde_json::from_str(raw).map_err(|err| err.to_string()),
		Format::Toml => toml::from_str(raw).map_err(|err| err.to_string()),
	};

	parsed.map_err(|message| Error::ParseRoles { path: path.to_path_buf(), message })
}

pub fn load(path: &Path) -> Result<RoleRegistry> {
	let raw = fs::read_to_string(path)
		.map_err(|err| Error::ReadRoles { path: path.to_path_buf(), source: err })?;
	let file = parse(path, &raw)?;

	RoleRegistry::new(file.roles, file.role_inheritance)
}

pub fn render(registry: &RoleRegistry, path: &Path) -> Result<String> {
	let file = RolesFile {
		roles: registry.list(None).into_iter().cloned().collect(),
		role_inheritance: registry.inheritance().clone(),
	};

	match format_for(path) {
		Format::Json => serde_json::to_string_pretty(&file)
			.map_err(|err| Error::SerializeRoles { message: err.to_string() }),
		Format::Toml => toml::to_string(&file)
			.map_err(|err| Error::SerializeRoles { message: err.to_string() }),
	}
}

/// Writes the declared roles and inheritance table back to `path`.
pub fn export(registry: &RoleRegistry, path: &Path) -> Result<()> {
	let rendered = render(registry, path)?;

	fs::write(path, rendered)
		.map_err(|err| Error::WriteRoles { path: path.to_path_buf(), source: err })
}
