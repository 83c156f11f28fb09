//! Role-based access control for chunk retrieval.
//!
//! Roles live in an immutable [`RoleRegistry`] whose effective permissions are resolved once,
//! inheritance included. [`RoleStore`] swaps whole registries on reload. [`AccessControl`] turns
//! an [`AccessContext`] into a source-level [`AccessFilter`] and re-checks every returned chunk.

pub mod context;
pub mod engine;
pub mod file;
pub mod filter;
pub mod registry;
pub mod role;

mod error;

pub use context::{AccessContext, Identity};
pub use engine::{AccessControl, AccessSession, Denial, Mutation};
pub use error::{Error, Result};
pub use filter::{AccessFilter, VisibilityClause};
pub use registry::{RoleRegistry, RoleStore};
pub use role::{EntityType, RolePermissions, merge};
