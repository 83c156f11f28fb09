use std::{
	env, fs,
	path::PathBuf,
	sync::atomic::{AtomicU64, Ordering},
	time::{SystemTime, UNIX_EPOCH},
};

use toml::{Table, Value};

use sift_config::Config;

const SAMPLE_CONFIG_TEMPLATE_TOML: &str = include_str!("fixtures/sample_config.template.toml");

fn sample_with(edit: impl FnOnce(&mut Table)) -> String {
	let mut value: Value =
		toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse template config.");
	let root = value.as_table_mut().expect("Template config must be a table.");

	edit(root);

	toml::to_string(&value).expect("Failed to render template config.")
}

fn table<'a>(root: &'a mut Table, path: &[&str]) -> &'a mut Table {
	let mut current = root;

	for key in path {
		current = current
			.get_mut(*key)
			.and_then(Value::as_table_mut)
			.unwrap_or_else(|| panic!("Template config must include [{key}]."));
	}

	current
}

fn write_temp_config(payload: String) -> PathBuf {
	static COUNTER: AtomicU64 = AtomicU64::new(0);

	let nanos = SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.expect("System time must be valid.")
		.as_nanos();
	let ordinal = COUNTER.fetch_add(1, Ordering::SeqCst);
	let pid = std::process::id();
	let mut path = env::temp_dir();

	path.push(format!("sift_config_test_{nanos}_{pid}_{ordinal}.toml"));

	fs::write(&path, payload).expect("Failed to write test config.");

	path
}

fn load_payload(payload: String) -> sift_config::Result<Config> {
	let path = write_temp_config(payload);
	let result = sift_config::load(&path);

	fs::remove_file(&path).expect("Failed to remove test config.");

	result
}

fn expect_validation_error(payload: String, needle: &str) {
	let err = load_payload(payload).expect_err("Expected validation error.");
	let message = err.to_string();

	assert!(message.contains(needle), "Unexpected error message: {message}");
}

#[test]
fn sample_config_loads() {
	let cfg = load_payload(sample_with(|_| {})).expect("Sample config must load.");

	assert_eq!(cfg.search.default_top_k, 6);
	assert_eq!(cfg.search.fusion.rrf_k, 60);
	assert_eq!(cfg.cache.max_items, 256);
	assert!(cfg.access.roles_path.is_none(), "Blank roles_path must normalize to None.");
}

#[test]
fn search_subsections_fall_back_to_defaults() {
	let payload = sample_with(|root| {
		let search = table(root, &["search"]);

		search.remove("fusion");
		search.remove("diversity");
		search.remove("rerank");
		search.remove("pool_multiplier");
	});
	let cfg = load_payload(payload).expect("Config without optional sections must load.");

	assert_eq!(cfg.search.fusion.rrf_k, 60);
	assert!(cfg.search.diversity.enabled);
	assert!((cfg.search.diversity.mmr_lambda - 0.7).abs() < f32::EPSILON);
	assert!(!cfg.search.rerank.enabled);
	assert_eq!(cfg.search.rerank.max_candidates, 32);
	assert_eq!(cfg.search.pool_multiplier, 3);
}

#[test]
fn min_top_k_above_max_is_rejected() {
	let payload = sample_with(|root| {
		table(root, &["search"]).insert("min_top_k".to_string(), Value::Integer(9));
	});

	expect_validation_error(payload, "search.min_top_k must be less than or equal to");
}

#[test]
fn mmr_lambda_outside_unit_range_is_rejected() {
	let payload = sample_with(|root| {
		table(root, &["search", "diversity"]).insert("mmr_lambda".to_string(), Value::Float(1.5));
	});

	expect_validation_error(payload, "search.diversity.mmr_lambda must be in the range 0.0-1.0.");
}

#[test]
fn embedding_dimensions_must_match_vector_dim() {
	let payload = sample_with(|root| {
		table(root, &["storage", "qdrant"]).insert("vector_dim".to_string(), Value::Integer(768));
	});

	expect_validation_error(
		payload,
		"providers.embedding.dimensions must match storage.qdrant.vector_dim.",
	);
}

#[test]
fn zero_cache_ttl_is_rejected_only_when_enabled() {
	let enabled = sample_with(|root| {
		table(root, &["cache"]).insert("ttl_seconds".to_string(), Value::Integer(0));
	});

	expect_validation_error(enabled, "cache.ttl_seconds must be greater than zero when enabled.");

	let disabled = sample_with(|root| {
		let cache = table(root, &["cache"]);

		cache.insert("ttl_seconds".to_string(), Value::Integer(0));
		cache.insert("enabled".to_string(), Value::Boolean(false));
	});

	load_payload(disabled).expect("Disabled cache must accept a zero TTL.");
}

#[test]
fn blank_api_key_is_rejected() {
	let payload = sample_with(|root| {
		table(root, &["providers", "rerank"])
			.insert("api_key".to_string(), Value::String("  ".to_string()));
	});

	expect_validation_error(payload, "Provider rerank api_key must be non-empty.");
}

#[test]
fn admin_roles_must_not_be_blank() {
	let payload = sample_with(|root| {
		table(root, &["access"]).insert(
			"admin_roles".to_string(),
			Value::Array(vec![Value::String(" ".to_string())]),
		);
	});

	expect_validation_error(payload, "access.admin_roles must name at least one role.");
}

#[test]
fn validate_accepts_parsed_sample() {
	let cfg: Config = toml::from_str(SAMPLE_CONFIG_TEMPLATE_TOML).expect("Failed to parse sample.");

	sift_config::validate(&cfg).expect("Sample config must validate.");
}
