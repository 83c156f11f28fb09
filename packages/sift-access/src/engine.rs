use std::{collections::BTreeSet, fmt, sync::Arc};

use sift_domain::{ChunkPayload, Visibility};

use crate::{
	AccessContext, AccessFilter, RolePermissions, RoleRegistry, RoleStore, VisibilityClause,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
	Create,
	Edit,
	Delete,
	ManageAccess,
}
impl Mutation {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Create => "create",
			Self::Edit => "edit",
			Self::Delete => "delete",
			Self::ManageAccess => "manage_access",
		}
	}
}

/// Why an access or mutation check failed. Named after the check that failed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Denial {
	SpaceMismatch,
	ChannelMismatch,
	UnknownRole,
	VisibilityNotAllowed,
	PrivateNotGranted,
	NotTeamMember,
	AgentRoleNotAllowed,
	DocTypeNotAllowed,
	SecurityLevelTooHigh,
	DepartmentNotAllowed,
	MissingCapability(Mutation),
}
impl Denial {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::SpaceMismatch => "space_mismatch",
			Self::ChannelMismatch => "channel_mismatch",
			Self::UnknownRole => "unknown_role",
			Self::VisibilityNotAllowed => "visibility_not_allowed",
			Self::PrivateNotGranted => "private_not_granted",
			Self::NotTeamMember => "not_team_member",
			Self::AgentRoleNotAllowed => "agent_role_not_allowed",
			Self::DocTypeNotAllowed => "doc_type_not_allowed",
			Self::SecurityLevelTooHigh => "security_level_too_high",
			Self::DepartmentNotAllowed => "department_not_allowed",
			Self::MissingCapability(_) => "missing_capability",
		}
	}
}
impl fmt::Display for Denial {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::MissingCapability(mutation) => {
				write!(f, "Role lacks the {} capability.", mutation.as_str())
			},
			other => write!(f, "Access denied by {} check.", other.as_str()),
		}
	}
}

/// Role-based access decisions over a hot-reloadable registry.
#[derive(Debug)]
pub struct AccessControl {
	roles: RoleStore,
	admin_roles: BTreeSet<String>,
}
impl AccessControl {
	pub fn new<I, S>(registry: RoleRegistry, admin_roles: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		Self {
			roles: RoleStore::new(registry),
			admin_roles: admin_roles.into_iter().map(Into::into).collect(),
		}
	}

	pub fn roles(&self) -> &RoleStore {
		&self.roles
	}

	/// Pins the current registry snapshot and resolves the caller's role once.
	pub fn session<'a>(&'a self, ctx: &'a AccessContext) -> AccessSession<'a> {
		let registry = self.roles.snapshot();
		let role = ctx.role_name.as_deref().and_then(|name| registry.effective_permissions(name));

		AccessSession { ctx, role, admin_roles: &self.admin_roles }
	}

	pub fn build_access_filter(&self, ctx: &AccessContext, doc_types: &[String]) -> AccessFilter {
		self.session(ctx).build_filter(doc_types)
	}

	pub fn check_access(&self, ctx: &AccessContext, payload: &ChunkPayload) -> Result<(), Denial> {
		self.session(ctx).check(payload)
	}

	pub fn can_access(&self, ctx: &AccessContext, payload: &ChunkPayload) -> bool {
		self.check_access(ctx, payload).is_ok()
	}

	pub fn authorize_mutation(
		&self,
		ctx: &AccessContext,
		mutation: Mutation,
		owner_id: Option<&str>,
	) -> Result<(), Denial> {
		self.session(ctx).authorize(mutation, owner_id)
	}
}

/// Access decisions for one request against one registry snapshot.
pub struct AccessSession<'a> {
	ctx: &'a AccessContext,
	role: Option<Arc<RolePermissions>>,
	admin_roles: &'a BTreeSet<String>,
}
impl AccessSession<'_> {
	pub fn role(&self) -> Option<&RolePermissions> {
		self.role.as_deref()
	}

	/// Builds the source-level filter for this caller.
	///
	/// Requested doc types are intersected with the role's allowed set. A caller without a
	/// resolvable role or without a space gets a filter that matches nothing.
	pub fn build_filter(&self, doc_types: &[String]) -> AccessFilter {
		let Some(role) = self.role.as_deref() else { return AccessFilter::nothing() };
		let ctx = self.ctx;
		let Some(space_id) = ctx.space() else { return AccessFilter::nothing() };
		let mut any_of = vec![VisibilityClause::Visibility(Visibility::Public)];

		if let Some(user_id) = ctx.user_id() {
			any_of.push(VisibilityClause::Owner(user_id.to_string()));
			any_of.push(VisibilityClause::AccessListContains(user_id.to_string()));

			if !ctx.team_ids().is_empty() {
				any_of.push(VisibilityClause::Visibility(Visibility::Team));
			}
			if ctx.channel_id.is_some() {
				any_of.push(VisibilityClause::Visibility(Visibility::Channel));
			}
		}
		if ctx.is_agent()
			&& let Some(role_name) = ctx.role_name.as_ref()
		{
			any_of.push(VisibilityClause::AgentRole(role_name.clone()));
		}

		let doc_types = match (&role.allowed_doc_types, doc_types.is_empty()) {
			(None, true) => None,
			(None, false) => Some(doc_types.to_vec()),
			(Some(allowed), true) => Some(allowed.iter().cloned().collect()),
			(Some(allowed), false) => Some(
				doc_types.iter().filter(|doc_type| allowed.contains(*doc_type)).cloned().collect(),
			),
		};

		AccessFilter {
			space_id: Some(space_id.to_string()),
			channel_id: ctx.channel_id.clone(),
			any_of,
			doc_types,
			department: ctx.department.clone().filter(|department| !department.is_empty()),
		}
	}

	/// Per-item authorization. Checks run in a fixed order and the first failure wins.
	pub fn check(&self, payload: &ChunkPayload) -> Result<(), Denial> {
		let result = self.evaluate(payload);

		if let Err(denial) = result {
			tracing::debug!(
				check = denial.as_str(),
				role = ?self.ctx.role_name,
				doc_id = ?payload.doc_id,
				"Access denied."
			);
		}

		result
	}

	pub fn can_access(&self, payload: &ChunkPayload) -> bool {
		self.check(payload).is_ok()
	}

	/// Checks a document mutation. `owner_id` is the current owner of the target document.
	pub fn authorize(&self, mutation: Mutation, owner_id: Option<&str>) -> Result<(), Denial> {
		let Some(role) = self.role.as_deref() else { return Err(Denial::UnknownRole) };
		let own = owner_id.is_some_and(|owner| owner == self.ctx.principal_id());
		let allowed = match mutation {
			Mutation::Create => role.can_create,
			Mutation::Edit => if own { role.can_edit_own } else { role.can_edit_others },
			Mutation::Delete => if own { role.can_delete_own } else { role.can_delete_others },
			Mutation::ManageAccess => role.can_manage_access || (own && role.can_edit_own),
		};

		if allowed {
			return Ok(());
		}

		tracing::debug!(
			mutation = mutation.as_str(),
			role = %role.role_name,
			own,
			"Mutation denied."
		);

		Err(Denial::MissingCapability(mutation))
	}

	fn evaluate(&self, payload: &ChunkPayload) -> Result<(), Denial> {
		let ctx = self.ctx;

		// A caller without a space sees nothing.
		let Some(space_id) = ctx.space() else { return Err(Denial::SpaceMismatch) };

		if payload.space_id.as_deref() != Some(space_id) {
			return Err(Denial::SpaceMismatch);
		}
		if let Some(channel_id) = &ctx.channel_id
			&& payload.channel_id.as_deref() != Some(channel_id.as_str())
		{
			return Err(Denial::ChannelMismatch);
		}

		let Some(role) = self.role.as_deref() else { return Err(Denial::UnknownRole) };

		// The visibility set is consulted before the private-document override.
		if !role.can_access_visibility(payload.visibility) {
			return Err(Denial::VisibilityNotAllowed);
		}

		match payload.visibility {
			Visibility::Private => {
				let user_id = ctx.user_id();
				let is_owner = user_id.is_some() && payload.owner_id.as_deref() == user_id;
				let is_listed = user_id
					.is_some_and(|user_id| payload.access_list.iter().any(|id| id == user_id));

				if !(is_owner || is_listed || self.admin_roles.contains(&role.role_name)) {
					return Err(Denial::PrivateNotGranted);
				}
			},
			Visibility::Team => {
				let in_team = payload
					.team_id
					.as_ref()
					.is_some_and(|team_id| ctx.team_ids().iter().any(|id| id == team_id));

				if !in_team {
					return Err(Denial::NotTeamMember);
				}
			},
			Visibility::Channel | Visibility::Public => {},
		}

		if ctx.is_agent() && !payload.agent_roles.iter().any(|name| name == &role.role_name) {
			return Err(Denial::AgentRoleNotAllowed);
		}
		if !role.can_access_doc_type(&payload.doc_type) {
			return Err(Denial::DocTypeNotAllowed);
		}
		if !role.can_access_security_level(payload.security_level) {
			return Err(Denial::SecurityLevelTooHigh);
		}
		if !role.can_access_department(&payload.department) {
			return Err(Denial::DepartmentNotAllowed);
		}

		Ok(())
	}
}
