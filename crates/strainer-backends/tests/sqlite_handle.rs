//! Live checks against an in-memory SQLite database

use rstest::rstest;
use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use strainer_backends::{
	Adapter, ApplyOptions, BackendHandle, CapabilityCache, ProbeError, SqliteAdapter, SqliteHandle,
	detect,
};
use strainer_core::{
	AdapterId, Feature, FieldDescriptor, Operand, OperatorTag, Queryable, SemanticType, Value,
};

async fn memory_pool() -> SqlitePool {
	SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap()
}

async fn seeded_pool() -> SqlitePool {
	let pool = memory_pool().await;
	sqlx::query("CREATE TABLE users (id INTEGER PRIMARY KEY, age INTEGER, name TEXT)")
		.execute(&pool)
		.await
		.unwrap();
	for (age, name) in [(17, "Alice"), (18, "alina"), (42, "Bob"), (65, "Malik")] {
		sqlx::query("INSERT INTO users (age, name) VALUES (?, ?)")
			.bind(age)
			.bind(name)
			.execute(&pool)
			.await
			.unwrap();
	}
	pool
}

// ============================================================================
// Handle probes
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_detects_sqlite_capabilities() {
	let handle = SqliteHandle::new(memory_pool().await, "sqlite::memory:");

	let raw = handle.server_version().await.unwrap();
	assert!(raw.starts_with('3'));

	let capability = detect(&handle).await;
	assert_eq!(capability.adapter_id, AdapterId::Sqlite);
	assert!(capability.version.is_some());
	assert!(capability.supports(Feature::Json));
	// No REGEXP function is registered on a plain connection
	assert!(!capability.supports(Feature::Regex));
	assert!(!capability.supports(Feature::Spatial));
}

#[rstest]
#[tokio::test]
async fn test_explain_is_unsupported() {
	let handle = SqliteHandle::new(memory_pool().await, "sqlite::memory:");
	let queryable = Queryable::new("User", "users", AdapterId::Sqlite);
	let rendered = SqliteAdapter::new().new_query(&queryable).render();

	let err = handle.explain(&rendered).await.unwrap_err();
	assert!(matches!(err, ProbeError::Unsupported { .. }));
}

#[rstest]
#[tokio::test]
async fn test_load_metrics_within_bounds() {
	let handle = SqliteHandle::new(memory_pool().await, "sqlite::memory:");
	let load = handle.load_metrics().await.unwrap();
	assert!((0.0..=1.0).contains(&load.load_factor));
}

#[rstest]
#[tokio::test]
async fn test_capability_cache_reuses_detection() {
	let cache = CapabilityCache::new();
	let handle = SqliteHandle::new(memory_pool().await, "sqlite::memory:");

	let first = cache.get_or_detect(&handle).await;
	let second = cache.get_or_detect(&handle).await;
	assert_eq!(first, second);
	assert_eq!(cache.len(), 1);
}

// ============================================================================
// Compiled SQL runs
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_compiled_filter_executes() {
	let pool = seeded_pool().await;
	let adapter = SqliteAdapter::new();
	let queryable = Queryable::new("User", "users", AdapterId::Sqlite);
	let age = FieldDescriptor::scalar("age", SemanticType::Integer);
	let name = FieldDescriptor::scalar("name", SemanticType::String);

	let query = adapter
		.apply_operator(
			adapter.new_query(&queryable),
			&age,
			OperatorTag::Gte,
			&Operand::Scalar(Value::Int(18)),
			&ApplyOptions::default(),
		)
		.into_query();
	let query = adapter
		.apply_operator(
			query,
			&name,
			OperatorTag::Includes,
			&Operand::Pattern("li".into()),
			&ApplyOptions::default(),
		)
		.into_query();

	let rendered = query.render();
	let sql = rendered.text.replacen(r#""users".*"#, r#""users"."name""#, 1);
	let mut statement = sqlx::query_scalar::<_, String>(&sql);
	for param in &rendered.params {
		statement = match param {
			Value::Int(i) => statement.bind(*i),
			Value::String(s) => statement.bind(s.clone()),
			other => panic!("unexpected parameter {:?}", other),
		};
	}
	let mut names = statement.fetch_all(&pool).await.unwrap();
	names.sort();

	// GLOB is case-sensitive: "Alice" is too young and "Malik" matches
	assert_eq!(names, vec!["Malik".to_string(), "alina".to_string()]);
}
