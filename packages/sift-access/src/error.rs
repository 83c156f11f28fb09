use std::path::PathBuf;

use crate::role::EntityType;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Role {role_name:?} is not registered.")]
	UnknownRole { role_name: String },
	#[error("Role {role_name:?} is not a {expected} role.")]
	EntityTypeMismatch { role_name: String, expected: EntityType },
	#[error("Role inheritance cycle detected at {role_name:?}.")]
	InheritanceCycle { role_name: String },
	#[error("Failed to read roles file at {path:?}.")]
	ReadRoles { path: PathBuf, source: std::io::Error },
	#[error("Failed to write roles file at {path:?}.")]
	WriteRoles { path: PathBuf, source: std::io::Error },
	#[error("Failed to parse roles file at {path:?}: {message}")]
	ParseRoles { path: PathBuf, message: String },
	#[error("Failed to serialize roles: {message}")]
	SerializeRoles { message: String },
	#[error("{message}")]
	Validation { message: String },
}
