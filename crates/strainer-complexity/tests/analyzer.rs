//! Admission checks through fake and live backend handles

use async_trait::async_trait;
use parking_lot::Mutex;
use rstest::rstest;
use serde_json::{Value as Json, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use strainer_backends::{
	BackendHandle, CompiledQuery, LoadMetrics, ProbeError, ProbeResult, RenderedQuery, SqliteHandle,
};
use strainer_complexity::{
	AnalysisCache, AnalysisMethod, CacheError, CacheResult, ComplexityAnalysis, ComplexityAnalyzer,
	ComplexityCheck, MemoryAnalysisCache, MetricsSink, Verdict,
};
use strainer_core::order::{Direction, NullsOrder};
use strainer_core::{AdapterId, ComplexitySettings, Queryable};

// ============================================================================
// Test doubles
// ============================================================================

#[derive(Debug)]
struct FakeHandle {
	adapter: AdapterId,
	plan: Option<Json>,
	load: Option<LoadMetrics>,
	explains: AtomicUsize,
}

impl FakeHandle {
	fn new(adapter: AdapterId) -> Self {
		Self {
			adapter,
			plan: None,
			load: Some(LoadMetrics::idle()),
			explains: AtomicUsize::new(0),
		}
	}

	fn with_plan(mut self, plan: Json) -> Self {
		self.plan = Some(plan);
		self
	}

	fn without_load(mut self) -> Self {
		self.load = None;
		self
	}

	fn explains(&self) -> usize {
		self.explains.load(Ordering::SeqCst)
	}
}

#[async_trait]
impl BackendHandle for FakeHandle {
	fn adapter(&self) -> AdapterId {
		self.adapter
	}

	fn connection_key(&self) -> String {
		format!("fake://{}", self.adapter)
	}

	async fn server_version(&self) -> ProbeResult<String> {
		Ok("16.2".to_string())
	}

	async fn explain(&self, _query: &RenderedQuery) -> ProbeResult<Json> {
		self.explains.fetch_add(1, Ordering::SeqCst);
		self.plan
			.clone()
			.ok_or_else(|| ProbeError::Parse("planner timed out".to_string()))
	}

	async fn load_metrics(&self) -> ProbeResult<LoadMetrics> {
		self.load
			.ok_or_else(|| ProbeError::Parse("stats view unavailable".to_string()))
	}
}

struct FailingCache;

#[async_trait]
impl AnalysisCache for FailingCache {
	async fn get(&self, _key: &str) -> CacheResult<Option<ComplexityAnalysis>> {
		Err(CacheError::Backend("connection refused".to_string()))
	}

	async fn put(&self, _key: &str, _analysis: &ComplexityAnalysis) -> CacheResult<()> {
		Err(CacheError::Backend("connection refused".to_string()))
	}

	async fn clear(&self) -> CacheResult<()> {
		Err(CacheError::Backend("connection refused".to_string()))
	}
}

#[derive(Debug, Default)]
struct RecordingSink {
	verdicts: Mutex<Vec<Verdict>>,
}

impl MetricsSink for RecordingSink {
	fn record(&self, check: &ComplexityCheck) {
		self.verdicts.lock().push(check.verdict);
	}
}

// ============================================================================
// Queries
// ============================================================================

fn users(adapter: AdapterId) -> Queryable {
	Queryable::new("User", "users", adapter)
		.column("age", "integer")
		.belongs_to("organization", "Organization", "organization_id")
		.belongs_to("team", "Team", "team_id")
		.belongs_to("manager", "User", "manager_id")
		.belongs_to("region", "Region", "region_id")
}

/// Four to-one joins, ordered, no limit
fn wide_query(adapter: AdapterId) -> CompiledQuery {
	let users = users(adapter);
	let mut query = CompiledQuery::for_queryable(&users);
	let root = query.root_binding();
	for association in &users.associations {
		let related = Queryable::new(association.link.target.clone(), association.name.clone(), adapter);
		query.bind_to_one(&root, &association.name, &association.link, &related);
	}
	query.push_order(&root, "age", Direction::Asc, NullsOrder::Default);
	query
}

fn small_query(adapter: AdapterId) -> CompiledQuery {
	let mut query = CompiledQuery::for_queryable(&users(adapter));
	query.set_limit(Some(10));
	query
}

fn postgres_plan(total_cost: f64) -> Json {
	json!([{ "Plan": { "Node Type": "Index Scan", "Total Cost": total_cost, "Plan Rows": 10 } }])
}

// ============================================================================
// Heuristic scoring
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_four_joins_unlimited_order_scores_at_least_eighty() {
	let query = wide_query(AdapterId::Sqlite);
	assert_eq!(query.join_count(), 4);

	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).without_cache();
	let analysis = analyzer.analyze(&query, None).await;
	assert_eq!(analysis.method, AnalysisMethod::Heuristic);
	assert!(analysis.cost >= 80.0);
	assert!(analysis.complexity_score >= 80.0);

	let check = analyzer
		.check_under_load(&query, LoadMetrics::idle(), None)
		.await;
	assert_eq!(check.verdict, Verdict::Reject);
	assert_eq!(check.code(), Some("too_complex"));
}

#[rstest]
#[tokio::test]
async fn test_load_shrinks_the_limit() {
	let queryable = users(AdapterId::Sqlite);
	let mut query = CompiledQuery::for_queryable(&queryable);
	query.set_limit(Some(10));
	let root = query.root_binding();
	for association in queryable.associations.iter().take(3) {
		let related = Queryable::new(association.link.target.clone(), association.name.clone(), AdapterId::Sqlite);
		query.bind_to_one(&root, &association.name, &association.link, &related);
	}

	// 30 points: accepted when idle, rejected when saturated
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).without_cache();
	let idle = analyzer.check_under_load(&query, LoadMetrics::idle(), None).await;
	assert_eq!(idle.verdict, Verdict::Accept);

	let saturated = analyzer
		.check_under_load(&query, LoadMetrics::new(100, 100), None)
		.await;
	assert_eq!(saturated.verdict, Verdict::Reject);
	assert!(saturated.limit < idle.limit);
}

// ============================================================================
// Planner analysis and fallbacks
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_planner_analysis_for_postgres() {
	let handle = FakeHandle::new(AdapterId::Postgres).with_plan(postgres_plan(800.0));
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).without_cache();

	let analysis = analyzer.analyze(&small_query(AdapterId::Postgres), Some(&handle)).await;
	assert_eq!(analysis.method, AnalysisMethod::Explain);
	assert_eq!(analysis.cost, 800.0);
	assert_eq!(handle.explains(), 1);
}

#[rstest]
#[tokio::test]
async fn test_explain_failure_falls_back_to_heuristic() {
	let handle = FakeHandle::new(AdapterId::Postgres);
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).without_cache();

	let analysis = analyzer.analyze(&wide_query(AdapterId::Postgres), Some(&handle)).await;
	assert_eq!(handle.explains(), 1);
	assert_eq!(analysis.method, AnalysisMethod::Heuristic);
	assert!(analysis.complexity_score >= 80.0);
}

#[rstest]
#[tokio::test]
async fn test_malformed_plan_falls_back_to_heuristic() {
	let handle = FakeHandle::new(AdapterId::MySql).with_plan(json!({ "unexpected": true }));
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).without_cache();

	let analysis = analyzer.analyze(&small_query(AdapterId::MySql), Some(&handle)).await;
	assert_eq!(analysis.method, AnalysisMethod::Heuristic);
}

#[rstest]
#[tokio::test]
async fn test_backends_without_planner_are_not_explained() {
	let handle = FakeHandle::new(AdapterId::Sqlite).with_plan(postgres_plan(1.0));
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).without_cache();

	let analysis = analyzer.analyze(&small_query(AdapterId::Sqlite), Some(&handle)).await;
	assert_eq!(analysis.method, AnalysisMethod::Heuristic);
	assert_eq!(handle.explains(), 0);
}

#[rstest]
#[tokio::test]
async fn test_missing_load_metrics_assume_idle() {
	let handle = FakeHandle::new(AdapterId::Postgres)
		.with_plan(postgres_plan(100.0))
		.without_load();
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).without_cache();

	let check = analyzer.check_complexity(&small_query(AdapterId::Postgres), &handle).await;
	assert_eq!(check.load, LoadMetrics::idle());
	assert_eq!(check.limit, 75.0);
	assert!(check.is_accepted());
}

// ============================================================================
// Caching
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_cached_analysis_is_reused_within_ttl() {
	let cache = Arc::new(MemoryAnalysisCache::new(Duration::from_secs(300), 100));
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).with_cache(cache.clone());
	let handle = FakeHandle::new(AdapterId::Postgres).with_plan(postgres_plan(450.0));
	let query = small_query(AdapterId::Postgres);

	let first = analyzer.analyze(&query, Some(&handle)).await;
	let second = analyzer.analyze(&query, Some(&handle)).await;
	assert_eq!(first, second);
	assert_eq!(handle.explains(), 1);

	let stats = cache.stats();
	assert_eq!(stats.entries, 1);
	assert_eq!(stats.hits, 1);
}

#[rstest]
#[tokio::test]
async fn test_expired_analysis_is_recomputed_and_replaced() {
	let cache = Arc::new(MemoryAnalysisCache::new(Duration::ZERO, 100));
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).with_cache(cache.clone());
	let handle = FakeHandle::new(AdapterId::Postgres).with_plan(postgres_plan(450.0));
	let query = small_query(AdapterId::Postgres);

	analyzer.analyze(&query, Some(&handle)).await;
	analyzer.analyze(&query, Some(&handle)).await;
	assert_eq!(handle.explains(), 2);

	let stats = cache.stats();
	assert_eq!(stats.entries, 1);
	assert_eq!(stats.hits, 0);
}

#[rstest]
#[tokio::test]
async fn test_cache_failure_falls_back_to_uncached_analysis() {
	let analyzer =
		ComplexityAnalyzer::new(ComplexitySettings::default()).with_cache(Arc::new(FailingCache));
	let handle = FakeHandle::new(AdapterId::Postgres).with_plan(postgres_plan(450.0));

	let analysis = analyzer.analyze(&small_query(AdapterId::Postgres), Some(&handle)).await;
	assert_eq!(analysis.method, AnalysisMethod::Explain);
	assert_eq!(analysis.cost, 450.0);
}

#[rstest]
#[tokio::test]
async fn test_distinct_parameters_are_cached_separately() {
	let cache = Arc::new(MemoryAnalysisCache::new(Duration::from_secs(300), 100));
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default()).with_cache(cache.clone());

	let mut first = small_query(AdapterId::Sqlite);
	first.set_offset(Some(10));
	let mut second = small_query(AdapterId::Sqlite);
	second.set_offset(Some(20));
	analyzer.analyze(&first, None).await;
	analyzer.analyze(&second, None).await;
	assert_eq!(cache.stats().entries, 2);
}

// ============================================================================
// Events
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_every_check_is_recorded() {
	let sink = Arc::new(RecordingSink::default());
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default())
		.without_cache()
		.with_sink(sink.clone());

	analyzer
		.check_under_load(&small_query(AdapterId::Sqlite), LoadMetrics::idle(), None)
		.await;
	analyzer
		.check_under_load(&wide_query(AdapterId::Sqlite), LoadMetrics::idle(), None)
		.await;
	assert_eq!(*sink.verdicts.lock(), vec![Verdict::Accept, Verdict::Reject]);
}

#[rstest]
#[tokio::test]
async fn test_disabled_analyzer_accepts_without_events() {
	let sink = Arc::new(RecordingSink::default());
	let settings = ComplexitySettings {
		enabled: false,
		..ComplexitySettings::default()
	};
	let analyzer = ComplexityAnalyzer::new(settings).with_sink(sink.clone());
	let handle = FakeHandle::new(AdapterId::Sqlite);

	let check = analyzer.check_complexity(&wide_query(AdapterId::Sqlite), &handle).await;
	assert_eq!(check.verdict, Verdict::Accept);
	assert!(sink.verdicts.lock().is_empty());
}

// ============================================================================
// Live SQLite
// ============================================================================

#[rstest]
#[tokio::test]
async fn test_sqlite_handle_uses_heuristic() {
	let pool = sqlx::sqlite::SqlitePoolOptions::new()
		.max_connections(1)
		.connect("sqlite::memory:")
		.await
		.unwrap();
	let handle = SqliteHandle::new(pool, "sqlite::memory:");
	let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default());

	let check = analyzer.check_complexity(&small_query(AdapterId::Sqlite), &handle).await;
	assert_eq!(check.analysis.method, AnalysisMethod::Heuristic);
	assert_eq!(check.verdict, Verdict::Accept);
	assert!((0.0..=1.0).contains(&check.load.load_factor));
}
