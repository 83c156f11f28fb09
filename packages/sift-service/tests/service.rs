use std::sync::Arc;

use sift_domain::{AccessUpdate, ChunkPayload, Visibility};
use sift_service::{
	AskRequest, CacheKey, Error, IndexDocumentRequest, SearchRequest, UpdateAccessRequest,
};
use sift_testkit::{
	FailingRerank, HashEmbedding, ReverseRerank, StaticGeneration, TEST_ANSWER, TestHarness, chunk,
	test_config,
};

fn budget_chunks() -> Vec<ChunkPayload> {
	vec![
		chunk("a", 0, "work_plans", "Budget review for the first quarter."),
		chunk("b", 0, "work_plans", "Budget approval notes from finance."),
		chunk("c", 0, "work_plans", "Budget travel costs for the offsite."),
	]
}

fn search_request(query: &str) -> SearchRequest {
	SearchRequest { query: query.to_string(), ..Default::default() }
}

fn keys(results: &[sift_domain::CandidateItem]) -> Vec<String> {
	results.iter().map(|item| item.key.clone()).collect()
}

fn index_request(doc_id: &str, text: &str) -> IndexDocumentRequest {
	IndexDocumentRequest {
		doc_id: doc_id.to_string(),
		doc_type: Some("plans".to_string()),
		chunks: vec![text.to_string()],
		visibility: Some(Visibility::Public),
		access_list: Vec::new(),
		agent_roles: None,
		security_level: 0,
		department: String::new(),
		team_id: None,
	}
}

#[tokio::test]
async fn repeated_search_is_served_from_cache() {
	let harness = TestHarness::new(test_config());

	harness.index.seed(budget_chunks());

	let ctx = harness.user("u1", "admin").expect("Failed to build context.");
	let first =
		harness.service.search(&ctx, search_request("budget")).await.expect("Search failed.");
	let embed_calls = harness.embedding.calls();
	let second =
		harness.service.search(&ctx, search_request("  budget ")).await.expect("Search failed.");

	assert!(!first.results.is_empty());
	assert_eq!(
		serde_json::to_string(&first).expect("Failed to serialize response."),
		serde_json::to_string(&second).expect("Failed to serialize response.")
	);
	assert_eq!(harness.embedding.calls(), embed_calls);

	let snapshot = harness.service.metrics.snapshot();

	assert_eq!(snapshot.search.requests, 2);
	assert_eq!(snapshot.search.cache_hits, 1);
	assert_eq!(snapshot.search.cache_hit_rate, 0.5);
}

#[tokio::test]
async fn results_only_contain_chunks_the_caller_may_see() {
	let harness = TestHarness::new(test_config());
	let mut private = chunk("private", 0, "work_plans", "Budget salaries for the board.");
	let mut team = chunk("team", 0, "work_plans", "Budget of the red team.");

	private.visibility = Visibility::Private;
	team.visibility = Visibility::Team;
	team.team_id = Some("t-red".to_string());

	harness.index.seed([
		private,
		team,
		chunk("public", 0, "work_plans", "Budget summary for everyone."),
	]);

	let developer =
		harness.user("u1", "developer").expect("Failed to build context.").with_teams(["t-blue"]);
	let response =
		harness.service.search(&developer, search_request("budget")).await.expect("Search failed.");

	assert_eq!(keys(&response.results), vec!["public:0".to_string()]);

	let agent = harness.agent("bot-1", "agent_analytics").expect("Failed to build context.");
	let response =
		harness.service.search(&agent, search_request("budget")).await.expect("Search failed.");

	assert!(response.results.is_empty());

	let mut ghost = harness.user("u2", "admin").expect("Failed to build context.");

	ghost.role_name = Some("ghost".to_string());

	let response =
		harness.service.search(&ghost, search_request("budget")).await.expect("Search failed.");

	assert!(response.results.is_empty());
}

#[tokio::test]
async fn empty_query_is_rejected() {
	let harness = TestHarness::new(test_config());
	let ctx = harness.user("u1", "admin").expect("Failed to build context.");
	let err = harness
		.service
		.search(&ctx, search_request("   "))
		.await
		.expect_err("Expected an empty query to fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
}

#[tokio::test]
async fn searches_stay_inside_the_caller_space() {
	let harness = TestHarness::new(test_config());
	let mut foreign = chunk("foreign", 0, "work_plans", "Budget forecast of another tenant.");

	foreign.space_id = Some("other_space".to_string());

	harness.index.seed([chunk("a", 0, "work_plans", "Budget review for the quarter."), foreign]);

	let ctx = harness.user("u1", "admin").expect("Failed to build context.");
	let response =
		harness.service.search(&ctx, search_request("budget")).await.expect("Search failed.");

	assert_eq!(keys(&response.results), vec!["a:0".to_string()]);

	let mut unscoped = ctx.clone();

	unscoped.space_id = None;

	let err = harness
		.service
		.search(&unscoped, search_request("budget"))
		.await
		.expect_err("Expected a search without a space to fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let err = harness
		.service
		.ask(&unscoped, AskRequest { query: "budget".to_string(), ..Default::default() })
		.await
		.expect_err("Expected an ask without a space to fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));
	assert_eq!(harness.generation.calls(), 0);
}

#[tokio::test]
async fn rerank_failure_keeps_fused_order() {
	let mut cfg = test_config();

	cfg.search.diversity.enabled = false;

	let baseline = TestHarness::new(cfg);

	baseline.index.seed(budget_chunks());

	let ctx = baseline.user("u1", "admin").expect("Failed to build context.");
	let expected = keys(
		&baseline
			.service
			.search(&ctx, search_request("budget"))
			.await
			.expect("Search failed.")
			.results,
	);

	assert_eq!(expected.len(), 3);

	let mut cfg = test_config();

	cfg.search.diversity.enabled = false;
	cfg.search.rerank.enabled = true;

	let failing = TestHarness::with_rerank(cfg, Arc::new(FailingRerank));

	failing.index.seed(budget_chunks());

	let fallback = keys(
		&failing
			.service
			.search(&ctx, search_request("budget"))
			.await
			.expect("Search failed.")
			.results,
	);

	assert_eq!(fallback, expected);

	let mut cfg = test_config();

	cfg.search.diversity.enabled = false;
	cfg.search.rerank.enabled = true;

	let reversing = TestHarness::with_rerank(cfg, Arc::new(ReverseRerank));

	reversing.index.seed(budget_chunks());

	let reranked = keys(
		&reversing
			.service
			.search(&ctx, search_request("budget"))
			.await
			.expect("Search failed.")
			.results,
	);
	let mut reversed = expected.clone();

	reversed.reverse();

	assert_eq!(reranked, reversed);
}

#[tokio::test]
async fn unembeddable_candidate_is_embedded_alone_and_left_out() {
	let harness = TestHarness::with_embedding(test_config(), HashEmbedding::rejecting("poison"));

	harness.index.seed([
		chunk("a", 0, "work_plans", "Budget review for the first quarter."),
		chunk("b", 0, "work_plans", "Budget poison pill clause."),
		chunk("c", 0, "work_plans", "Budget travel costs for the offsite."),
	]);

	let ctx = harness.user("u1", "admin").expect("Failed to build context.");
	let response =
		harness.service.search(&ctx, search_request("budget")).await.expect("Search failed.");
	let mut found = keys(&response.results);

	found.sort();

	assert_eq!(found, vec!["a:0".to_string(), "b:0".to_string(), "c:0".to_string()]);
	// Query, the rejected batch, then one call per candidate.
	assert_eq!(harness.embedding.calls(), 5);
}

#[tokio::test]
async fn failed_generation_is_not_cached() {
	let generation = StaticGeneration::new(TEST_ANSWER).failing_first(1);
	let harness = TestHarness::with_generation(test_config(), generation);

	harness.index.seed(budget_chunks());

	let ctx = harness.user("u1", "admin").expect("Failed to build context.");
	let request = || AskRequest { query: "budget".to_string(), ..Default::default() };
	let err = harness.service.ask(&ctx, request()).await.expect_err("Expected generation to fail.");

	assert!(matches!(err, Error::Provider { .. }));

	let answer = harness.service.ask(&ctx, request()).await.expect("Ask failed.");

	assert_eq!(answer.answer, TEST_ANSWER);
	assert!(!answer.sources.is_empty());
	assert_eq!(harness.generation.calls(), 2);

	let prompt = harness.generation.last_prompt().expect("Expected a recorded prompt.");

	assert!(prompt.contains("doc_id="));
	assert!(prompt.contains("QUESTION:\nbudget"));

	let cached = harness.service.ask(&ctx, request()).await.expect("Ask failed.");

	assert_eq!(cached.answer, TEST_ANSWER);
	assert_eq!(harness.generation.calls(), 2);

	let snapshot = harness.service.metrics.snapshot();

	assert_eq!(snapshot.ask.requests, 2);
	assert_eq!(snapshot.ask.cache_hits, 1);
}

#[tokio::test]
async fn indexing_a_document_invalidates_cached_searches() {
	let harness = TestHarness::new(test_config());
	let ctx = harness.user("u1", "developer").expect("Failed to build context.");
	let before = harness
		.service
		.search(&ctx, search_request("roadmap milestones"))
		.await
		.expect("Search failed.");

	assert!(before.results.is_empty());

	let indexed = harness
		.service
		.index_document(
			&ctx,
			index_request("plan-1", "The roadmap milestones for the beta release."),
		)
		.await
		.expect("Indexing failed.");

	assert_eq!(indexed.doc_type, "work_plans");
	assert_eq!(indexed.chunks_indexed, 1);

	let after = harness
		.service
		.search(&ctx, search_request("roadmap milestones"))
		.await
		.expect("Search failed.");

	assert_eq!(keys(&after.results), vec!["plan-1:0".to_string()]);
	assert_eq!(harness.service.metrics.snapshot().search.cache_hits, 0);

	let stored = harness.index.payloads();

	assert_eq!(stored[0].owner_id.as_deref(), Some("u1"));
	assert_eq!(stored[0].agent_roles, vec!["agent_analytics".to_string()]);
}

#[tokio::test]
async fn document_mutations_check_capabilities_and_existence() {
	let harness = TestHarness::new(test_config());
	let owner = harness.user("u1", "developer").expect("Failed to build context.");
	let peer = harness.user("u2", "developer").expect("Failed to build context.");
	let guest = harness.user("u3", "guest").expect("Failed to build context.");
	let admin = harness.user("u4", "admin").expect("Failed to build context.");

	let err = harness
		.service
		.index_document(&guest, index_request("plan-1", "Guest roadmap."))
		.await
		.expect_err("Expected guest indexing to be refused.");

	assert!(matches!(err, Error::Forbidden { .. }));

	harness
		.service
		.index_document(&owner, index_request("plan-1", "Roadmap for the beta release."))
		.await
		.expect("Indexing failed.");

	let err = harness
		.service
		.index_document(&peer, index_request("plan-1", "Overwritten roadmap."))
		.await
		.expect_err("Expected re-indexing by a peer to be refused.");

	assert!(matches!(err, Error::Forbidden { .. }));

	let err = harness
		.service
		.delete_document(&peer, "plan-1")
		.await
		.expect_err("Expected deletion by a peer to be refused.");

	assert!(matches!(err, Error::Forbidden { .. }));

	let err = harness
		.service
		.delete_document(&owner, "missing")
		.await
		.expect_err("Expected a missing document.");

	assert!(matches!(err, Error::NotFound { .. }));

	let listed = harness.service.my_documents(&owner).await.expect("Listing failed.");

	assert_eq!(listed.len(), 1);
	assert_eq!(listed[0].doc_id, "plan-1");
	assert_eq!(listed[0].visibility, Visibility::Public);

	let err = harness
		.service
		.update_document_access(&owner, UpdateAccessRequest {
			doc_id: "plan-1".to_string(),
			update: AccessUpdate::default(),
		})
		.await
		.expect_err("Expected an empty update to fail.");

	assert!(matches!(err, Error::InvalidRequest { .. }));

	let changed = harness
		.service
		.update_document_access(&owner, UpdateAccessRequest {
			doc_id: "plan-1".to_string(),
			update: AccessUpdate { visibility: Some(Visibility::Private), ..Default::default() },
		})
		.await
		.expect("Access update failed.");

	assert_eq!(changed, 1);
	assert_eq!(harness.index.payloads()[0].visibility, Visibility::Private);

	let removed = harness.service.delete_document(&admin, "plan-1").await.expect("Delete failed.");

	assert_eq!(removed, 1);
	assert!(harness.index.is_empty());
}

#[test]
fn cache_key_ignores_doc_type_order_but_not_caller() {
	let cfg = test_config();
	let harness = TestHarness::new(test_config());
	let ctx = harness.user("u1", "admin").expect("Failed to build context.");
	let other = harness.user("u2", "admin").expect("Failed to build context.");
	let forward = ["protocols".to_string(), "work_plans".to_string()];
	let backward = ["work_plans".to_string(), "protocols".to_string()];

	assert_eq!(
		CacheKey::search("budget", &ctx, &forward, 4, &cfg),
		CacheKey::search(" budget ", &ctx, &backward, 4, &cfg)
	);
	assert_ne!(
		CacheKey::search("budget", &ctx, &forward, 4, &cfg),
		CacheKey::search("budget", &other, &forward, 4, &cfg)
	);
	assert_ne!(
		CacheKey::search("budget", &ctx, &forward, 4, &cfg),
		CacheKey::ask("budget", &ctx, &forward, 4, &cfg)
	);
}

#[test]
fn reloading_without_a_roles_file_restores_builtin_roles() {
	let harness = TestHarness::new(test_config());
	let count = harness.service.reload_roles().expect("Failed to reload roles.");

	assert_eq!(count, 11);
}
