use crate::{EntityType, Error, Result, RoleRegistry};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Identity {
	Human { user_id: String, team_ids: Vec<String> },
	Agent { agent_id: String },
}

/// Caller identity and scope for one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccessContext {
	pub identity: Identity,
	/// Unset means no role, which fails closed.
	pub role_name: Option<String>,
	pub space_id: Option<String>,
	pub channel_id: Option<String>,
	pub department: Option<String>,
}
impl AccessContext {
	/// Context for a human caller. The role must exist and be a human role.
	pub fn for_user(
		registry: &RoleRegistry,
		user_id: impl Into<String>,
		role_name: &str,
		space_id: impl Into<String>,
	) -> Result<Self> {
		ensure_entity_type(registry, role_name, EntityType::Human)?;

		Ok(Self {
			identity: Identity::Human { user_id: user_id.into(), team_ids: Vec::new() },
			role_name: Some(role_name.to_string()),
			space_id: Some(space_id.into()),
			channel_id: None,
			department: None,
		})
	}

	/// Context for an agent caller. The role must exist and be an agent role.
	pub fn for_agent(
		registry: &RoleRegistry,
		agent_id: impl Into<String>,
		role_name: &str,
		space_id: impl Into<String>,
	) -> Result<Self> {
		ensure_entity_type(registry, role_name, EntityType::Agent)?;

		Ok(Self {
			identity: Identity::Agent { agent_id: agent_id.into() },
			role_name: Some(role_name.to_string()),
			space_id: Some(space_id.into()),
			channel_id: None,
			department: None,
		})
	}

	pub fn with_channel(mut self, channel_id: impl Into<String>) -> Self {
		self.channel_id = Some(channel_id.into());

		self
	}

	/// Ignored for agents.
	pub fn with_teams<I, S>(mut self, teams: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		if let Identity::Human { team_ids, .. } = &mut self.identity {
			team_ids.extend(teams.into_iter().map(Into::into));
		}

		self
	}

	pub fn with_department(mut self, department: impl Into<String>) -> Self {
		self.department = Some(department.into());

		self
	}

	/// The space this caller is scoped to. Blank counts as unset.
	pub fn space(&self) -> Option<&str> {
		self.space_id.as_deref().filter(|space_id| !space_id.is_empty())
	}

	pub fn user_id(&self) -> Option<&str> {
		match &self.identity {
			Identity::Human { user_id, .. } => Some(user_id),
			Identity::Agent { .. } => None,
		}
	}

	pub fn agent_id(&self) -> Option<&str> {
		match &self.identity {
			Identity::Agent { agent_id } => Some(agent_id),
			Identity::Human { .. } => None,
		}
	}

	/// The id recorded as owner on documents this caller creates.
	pub fn principal_id(&self) -> &str {
		match &self.identity {
			Identity::Human { user_id, .. } => user_id,
			Identity::Agent { agent_id } => agent_id,
		}
	}

	pub fn team_ids(&self) -> &[String] {
		match &self.identity {
			Identity::Human { team_ids, .. } => team_ids,
			Identity::Agent { .. } => &[],
		}
	}

	pub fn is_agent(&self) -> bool {
		matches!(self.identity, Identity::Agent { .. })
	}

	pub fn entity_type(&self) -> EntityType {
		if self.is_agent() { EntityType::Agent } else { EntityType::Human }
	}
}

fn ensure_entity_type(
	registry: &RoleRegistry,
	role_name: &str,
	expected: EntityType,
) -> Result<()> {
	let Some(role) = registry.get(role_name) else {
		return Err(Error::UnknownRole { role_name: role_name.to_string() });
	};

	if role.entity_type != expected {
		return Err(Error::EntityTypeMismatch { role_name: role_name.to_string(), expected });
	}

	Ok(())
}
