use std::{
	collections::{BTreeMap, BTreeSet},
	env, fs,
	path::PathBuf,
	time::{SystemTime, UNIX_EPOCH},
};

use sift_access::{
	AccessContext, AccessControl, Denial, EntityType, Mutation, RolePermissions,
	RoleRegistry, VisibilityClause,
};
use sift_domain::{ChunkPayload, Visibility};

fn engine() -> AccessControl {
	AccessControl::new(RoleRegistry::builtin(), ["admin", "agent_admin"])
}

fn payload(visibility: Visibility) -> ChunkPayload {
	ChunkPayload {
		text: "Quarterly plan".to_string(),
		doc_id: Some("d1".to_string()),
		chunk_index: Some(0),
		doc_type: "work_plans".to_string(),
		space_id: Some("s1".to_string()),
		owner_id: Some("owner".to_string()),
		visibility,
		team_id: Some("t1".to_string()),
		..Default::default()
	}
}

fn user(engine: &AccessControl, user_id: &str, role: &str) -> AccessContext {
	AccessContext::for_user(&engine.roles().snapshot(), user_id, role, "s1")
		.expect("Failed to build user context.")
}

fn agent(engine: &AccessControl, role: &str) -> AccessContext {
	AccessContext::for_agent(&engine.roles().snapshot(), "bot-1", role, "s1")
		.expect("Failed to build agent context.")
}

fn temp_path(name: &str) -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let mut path = env::temp_dir();

	path.push(format!("sift_access_{nanos}_{}_{name}", std::process::id()));

	path
}

#[test]
fn public_only_role_is_denied_team_documents() {
	let mut registry_roles = vec![RolePermissions {
		allowed_doc_types: None,
		max_security_level: 5,
		..RolePermissions::new("viewer", EntityType::Human)
	}];

	registry_roles.extend(sift_access::role::builtin_roles());

	let engine = AccessControl::new(
		RoleRegistry::new(registry_roles, BTreeMap::new()).expect("Failed to build registry."),
		["admin"],
	);
	let ctx = user(&engine, "u1", "viewer").with_teams(["t1"]);

	assert_eq!(
		engine.check_access(&ctx, &payload(Visibility::Team)),
		Err(Denial::VisibilityNotAllowed)
	);
	assert!(engine.can_access(&ctx, &payload(Visibility::Public)));
}

#[test]
fn space_and_channel_are_checked_first() {
	let engine = engine();
	let ctx = user(&engine, "u1", "admin").with_channel("c1");
	let mut chunk = payload(Visibility::Public);

	chunk.space_id = Some("s2".to_string());

	assert_eq!(engine.check_access(&ctx, &chunk), Err(Denial::SpaceMismatch));

	chunk.space_id = Some("s1".to_string());

	assert_eq!(engine.check_access(&ctx, &chunk), Err(Denial::ChannelMismatch));

	chunk.channel_id = Some("c1".to_string());

	assert_eq!(engine.check_access(&ctx, &chunk), Ok(()));
}

#[test]
fn caller_without_a_space_sees_nothing() {
	let engine = engine();
	let mut ctx = user(&engine, "u1", "admin");

	ctx.space_id = None;

	assert_eq!(
		engine.check_access(&ctx, &payload(Visibility::Public)),
		Err(Denial::SpaceMismatch)
	);
	assert!(engine.build_access_filter(&ctx, &[]).matches_nothing());

	ctx.space_id = Some(String::new());

	assert!(!engine.can_access(&ctx, &payload(Visibility::Public)));
}

#[test]
fn unset_or_unknown_role_fails_closed() {
	let engine = engine();
	let mut ctx = user(&engine, "u1", "admin");

	ctx.role_name = None;

	assert_eq!(
		engine.check_access(&ctx, &payload(Visibility::Public)),
		Err(Denial::UnknownRole)
	);

	ctx.role_name = Some("removed".to_string());

	assert_eq!(
		engine.check_access(&ctx, &payload(Visibility::Public)),
		Err(Denial::UnknownRole)
	);
	assert!(engine.build_access_filter(&ctx, &[]).matches_nothing());
}

#[test]
fn private_documents_need_owner_grant_or_admin() {
	let engine = engine();
	let chunk = payload(Visibility::Private);

	assert_eq!(engine.check_access(&user(&engine, "owner", "admin"), &chunk), Ok(()));
	assert_eq!(engine.check_access(&user(&engine, "other", "admin"), &chunk), Ok(()));

	// project_manager does not list private visibility, so even the owner is refused.
	assert_eq!(
		engine.check_access(&user(&engine, "owner", "project_manager"), &chunk),
		Err(Denial::VisibilityNotAllowed)
	);

	let custom = RolePermissions {
		allowed_visibility: BTreeSet::from([Visibility::Private, Visibility::Public]),
		max_security_level: 5,
		..RolePermissions::new("private_reader", EntityType::Human)
	};
	let engine = AccessControl::new(
		RoleRegistry::new(vec![custom], BTreeMap::new()).expect("Failed to build registry."),
		["admin"],
	);
	let mut listed = chunk.clone();

	listed.access_list = vec!["friend".to_string()];

	assert_eq!(
		engine.check_access(&user(&engine, "stranger", "private_reader"), &listed),
		Err(Denial::PrivateNotGranted)
	);
	assert_eq!(engine.check_access(&user(&engine, "friend", "private_reader"), &listed), Ok(()));
	assert_eq!(engine.check_access(&user(&engine, "owner", "private_reader"), &listed), Ok(()));
}

#[test]
fn team_documents_need_matching_membership() {
	let engine = engine();
	let chunk = payload(Visibility::Team);

	assert_eq!(
		engine.check_access(&user(&engine, "u1", "project_manager").with_teams(["t9"]), &chunk),
		Err(Denial::NotTeamMember)
	);
	assert_eq!(
		engine.check_access(&user(&engine, "u1", "project_manager").with_teams(["t1"]), &chunk),
		Ok(())
	);
}

#[test]
fn agents_need_their_role_on_the_document() {
	let engine = engine();
	let ctx = agent(&engine, "agent_analytics");
	let mut chunk = payload(Visibility::Public);

	assert_eq!(engine.check_access(&ctx, &chunk), Err(Denial::AgentRoleNotAllowed));

	chunk.agent_roles = vec!["agent_analytics".to_string()];

	assert_eq!(engine.check_access(&ctx, &chunk), Ok(()));
}

#[test]
fn doc_type_security_and_department_follow_visibility() {
	let engine = engine();
	let ctx = user(&engine, "u1", "developer");
	let mut chunk = payload(Visibility::Public);

	chunk.doc_type = "presentations".to_string();

	assert_eq!(engine.check_access(&ctx, &chunk), Err(Denial::DocTypeNotAllowed));

	chunk.doc_type = "technical_docs".to_string();
	chunk.security_level = 4;

	assert_eq!(engine.check_access(&ctx, &chunk), Err(Denial::SecurityLevelTooHigh));

	chunk.security_level = 3;
	chunk.department = "finance".to_string();

	assert_eq!(engine.check_access(&ctx, &chunk), Err(Denial::DepartmentNotAllowed));

	chunk.department = String::new();

	assert_eq!(engine.check_access(&ctx, &chunk), Ok(()));
}

#[test]
fn human_filter_lists_personal_clauses() {
	let engine = engine();
	let ctx = user(&engine, "u1", "developer")
		.with_teams(["t1"])
		.with_channel("c1")
		.with_department("engineering");
	let filter = engine.build_access_filter(&ctx, &[
		"technical_docs".to_string(),
		"presentations".to_string(),
	]);

	assert_eq!(filter.space_id.as_deref(), Some("s1"));
	assert_eq!(filter.channel_id.as_deref(), Some("c1"));
	assert_eq!(filter.any_of, vec![
		VisibilityClause::Visibility(Visibility::Public),
		VisibilityClause::Owner("u1".to_string()),
		VisibilityClause::AccessListContains("u1".to_string()),
		VisibilityClause::Visibility(Visibility::Team),
		VisibilityClause::Visibility(Visibility::Channel),
	]);
	assert_eq!(filter.doc_types, Some(vec!["technical_docs".to_string()]));
	assert_eq!(filter.department.as_deref(), Some("engineering"));
}

#[test]
fn agent_filter_uses_role_clause_and_role_doc_types() {
	let engine = engine();
	let filter = engine.build_access_filter(&agent(&engine, "agent_summarizer"), &[]);

	assert_eq!(filter.any_of, vec![
		VisibilityClause::Visibility(Visibility::Public),
		VisibilityClause::AgentRole("agent_summarizer".to_string()),
	]);
	assert_eq!(
		filter.doc_types,
		Some(vec!["email_correspondence".to_string(), "messenger_correspondence".to_string()])
	);

	let disjoint = engine
		.build_access_filter(&agent(&engine, "agent_summarizer"), &["protocols".to_string()]);

	assert!(disjoint.matches_nothing());
}

#[test]
fn mutations_follow_ownership_and_capabilities() {
	let engine = engine();
	let developer = user(&engine, "u1", "developer");
	let writer = user(&engine, "u2", "technical_writer");
	let manager = user(&engine, "u3", "project_manager");
	let guest = user(&engine, "u4", "guest");

	assert_eq!(engine.authorize_mutation(&developer, Mutation::Create, None), Ok(()));
	assert_eq!(
		engine.authorize_mutation(&guest, Mutation::Create, None),
		Err(Denial::MissingCapability(Mutation::Create))
	);
	assert_eq!(engine.authorize_mutation(&developer, Mutation::Delete, Some("u1")), Ok(()));
	assert_eq!(
		engine.authorize_mutation(&developer, Mutation::Delete, Some("u9")),
		Err(Denial::MissingCapability(Mutation::Delete))
	);
	assert_eq!(engine.authorize_mutation(&writer, Mutation::Edit, Some("u9")), Ok(()));
	assert_eq!(engine.authorize_mutation(&developer, Mutation::ManageAccess, Some("u1")), Ok(()));
	assert_eq!(
		engine.authorize_mutation(&developer, Mutation::ManageAccess, Some("u9")),
		Err(Denial::MissingCapability(Mutation::ManageAccess))
	);
	assert_eq!(engine.authorize_mutation(&manager, Mutation::ManageAccess, Some("u9")), Ok(()));
}

#[test]
fn reload_from_file_swaps_roles_for_new_sessions() {
	let engine = engine();
	let ctx = user(&engine, "u1", "guest");
	let pinned = engine.session(&ctx);
	let path = temp_path("roles.toml");

	fs::write(
		&path,
		r#"
[[roles]]
role_name = "guest"
allowed_visibility = ["public", "team"]
max_security_level = 1

[[roles]]
role_name = "auditor"
max_security_level = 4

[role_inheritance]
guest = ["auditor"]
"#,
	)
	.expect("Failed to write roles file.");

	let count = engine.roles().reload(Some(&path)).expect("Failed to reload roles.");

	fs::remove_file(&path).expect("Failed to remove roles file.");

	assert_eq!(count, 2);
	assert_eq!(pinned.role().map(|role| role.max_security_level), Some(0));

	let fresh = engine.session(&ctx);

	assert_eq!(fresh.role().map(|role| role.max_security_level), Some(4));
}

#[test]
fn export_writes_a_loadable_file() {
	let registry = RoleRegistry::builtin();
	let path = temp_path("roles.toml");

	sift_access::file::export(&registry, &path).expect("Failed to export roles.");

	let loaded = RoleRegistry::load(Some(&path));

	fs::remove_file(&path).expect("Failed to remove roles file.");

	let loaded = loaded.expect("Failed to load exported roles.");

	assert_eq!(loaded.len(), 11);
	assert_eq!(loaded.get("developer"), registry.get("developer"));
}
