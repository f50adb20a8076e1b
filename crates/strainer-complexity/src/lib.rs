//! # strainer-complexity
//!
//! Query complexity analysis and load-adaptive admission control.
//!
//! - [`plan`]: explain-plan parsing and planner-based scoring
//! - [`heuristic`]: structural scoring for backends without a planner
//! - [`cache`]: the analysis cache
//! - [`analyzer`]: the accept / warn / reject decision
//! - [`metrics`]: events emitted for every decision
//!
//! ## Example
//!
//! ```
//! use strainer_complexity::{ComplexityAnalyzer, Verdict};
//! use strainer_backends::{CompiledQuery, LoadMetrics};
//! use strainer_core::{AdapterId, ComplexitySettings, Queryable};
//!
//! # tokio_test::block_on(async {
//! let users = Queryable::new("User", "users", AdapterId::Sqlite);
//! let mut query = CompiledQuery::for_queryable(&users);
//! query.set_limit(Some(20));
//!
//! let analyzer = ComplexityAnalyzer::new(ComplexitySettings::default());
//! let check = analyzer.check_under_load(&query, LoadMetrics::idle(), None).await;
//! assert_eq!(check.verdict, Verdict::Accept);
//! # });
//! ```

pub mod analysis;
pub mod analyzer;
pub mod cache;
pub mod heuristic;
pub mod metrics;
pub mod plan;

pub use analysis::{AnalysisMethod, ComplexityAnalysis, ComplexityCheck, MAX_SCORE, Verdict};
pub use analyzer::ComplexityAnalyzer;
pub use cache::{AnalysisCache, CacheError, CacheResult, CacheStats, MemoryAnalysisCache, cache_key};
pub use heuristic::QueryShape;
pub use metrics::{MetricsSink, NoopMetricsSink, TracingMetricsSink};
pub use plan::PlanSummary;
