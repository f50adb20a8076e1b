//! Load-adaptive admission control
//!
//! [`ComplexityAnalyzer::analyze`] prefers the backend planner and falls
//! back to the structural heuristic; [`ComplexityAnalyzer::check_complexity`]
//! compares the score against a limit that shrinks as the backend gets
//! busier. Probe and cache failures degrade to the fallback path and are
//! only logged.

use crate::analysis::{ComplexityAnalysis, ComplexityCheck, Verdict};
use crate::cache::{AnalysisCache, MemoryAnalysisCache, cache_key};
use crate::heuristic;
use crate::metrics::{MetricsSink, TracingMetricsSink};
use crate::plan::PlanSummary;
use std::fmt;
use std::sync::Arc;
use strainer_backends::error::ProbeResult;
use strainer_backends::handle::{BackendHandle, LoadMetrics};
use strainer_backends::query::{CompiledQuery, RenderedQuery};
use strainer_core::settings::ComplexitySettings;
use strainer_core::types::AdapterId;

pub struct ComplexityAnalyzer {
	settings: ComplexitySettings,
	cache: Option<Arc<dyn AnalysisCache>>,
	sink: Arc<dyn MetricsSink>,
}

impl fmt::Debug for ComplexityAnalyzer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComplexityAnalyzer")
			.field("settings", &self.settings)
			.field("cached", &self.cache.is_some())
			.field("sink", &self.sink)
			.finish()
	}
}

impl ComplexityAnalyzer {
	/// Analyzer with an in-memory cache when `settings.cache_enabled`
	pub fn new(settings: ComplexitySettings) -> Self {
		let cache = settings.cache_enabled.then(|| {
			Arc::new(MemoryAnalysisCache::from_settings(&settings)) as Arc<dyn AnalysisCache>
		});
		Self {
			settings,
			cache,
			sink: Arc::new(TracingMetricsSink),
		}
	}

	pub fn with_cache(mut self, cache: Arc<dyn AnalysisCache>) -> Self {
		self.cache = Some(cache);
		self
	}

	pub fn without_cache(mut self) -> Self {
		self.cache = None;
		self
	}

	pub fn with_sink(mut self, sink: Arc<dyn MetricsSink>) -> Self {
		self.sink = sink;
		self
	}

	pub fn settings(&self) -> &ComplexitySettings {
		&self.settings
	}

	pub fn cache(&self) -> Option<&Arc<dyn AnalysisCache>> {
		self.cache.as_ref()
	}

	/// Analysis of `query`, from the cache when a fresh entry exists.
	///
	/// With a `handle` for a planner-capable backend the plan is explained;
	/// otherwise, or when explaining fails, the heuristic is used.
	pub async fn analyze(
		&self,
		query: &CompiledQuery,
		handle: Option<&dyn BackendHandle>,
	) -> ComplexityAnalysis {
		let rendered = query.render();
		let key = match &self.cache {
			Some(_) => match cache_key(query.adapter(), &rendered) {
				Ok(key) => Some(key),
				Err(error) => {
					tracing::warn!(%error, "cannot key complexity cache, analyzing uncached");
					None
				}
			},
			None => None,
		};

		if let (Some(cache), Some(key)) = (&self.cache, &key) {
			match cache.get(key).await {
				Ok(Some(analysis)) => {
					tracing::debug!(key = %key, "complexity cache hit");
					return analysis;
				}
				Ok(None) => {}
				Err(error) => {
					tracing::warn!(%error, "complexity cache lookup failed, analyzing uncached");
				}
			}
		}

		let analysis = self.compute(query, &rendered, handle).await;

		if let (Some(cache), Some(key)) = (&self.cache, &key)
			&& let Err(error) = cache.put(key, &analysis).await
		{
			tracing::warn!(%error, "complexity cache store failed");
		}
		analysis
	}

	async fn compute(
		&self,
		query: &CompiledQuery,
		rendered: &RenderedQuery,
		handle: Option<&dyn BackendHandle>,
	) -> ComplexityAnalysis {
		let adapter = query.adapter();
		if let Some(handle) = handle
			&& has_planner(adapter)
			&& handle.adapter() == adapter
		{
			match self.explain(handle, adapter, rendered).await {
				Ok(analysis) => return analysis,
				Err(error) => {
					tracing::warn!(
						%adapter,
						%error,
						"explain failed, using heuristic analysis"
					);
				}
			}
		}
		heuristic::analyze(query, &self.settings)
	}

	async fn explain(
		&self,
		handle: &dyn BackendHandle,
		adapter: AdapterId,
		rendered: &RenderedQuery,
	) -> ProbeResult<ComplexityAnalysis> {
		let plan = handle.explain(rendered).await?;
		let summary = PlanSummary::parse(adapter, &plan)?;
		tracing::debug!(
			%adapter,
			cost = summary.cost,
			rows = summary.rows,
			nodes = summary.node_count,
			"parsed query plan"
		);
		Ok(summary.analysis(&self.settings))
	}

	/// `base_limit × (1 − load_factor × load_weight)`
	pub fn adaptive_limit(&self, load: &LoadMetrics) -> f64 {
		let load_factor = load.load_factor.clamp(0.0, 1.0);
		(self.settings.base_limit * (1.0 - load_factor * self.settings.load_weight)).max(0.0)
	}

	/// Compare `analysis` against the limit for `load`
	pub fn decide(&self, analysis: ComplexityAnalysis, load: LoadMetrics) -> ComplexityCheck {
		let limit = self.adaptive_limit(&load);
		let score = analysis.complexity_score;
		let verdict = if score > limit {
			Verdict::Reject
		} else if score > self.settings.warn_ratio * limit {
			Verdict::Warn
		} else {
			Verdict::Accept
		};
		ComplexityCheck {
			verdict,
			analysis,
			limit,
			load,
		}
	}

	/// Admission check against live load read from `handle`.
	///
	/// Unavailable load metrics count as an idle backend.
	pub async fn check_complexity(
		&self,
		query: &CompiledQuery,
		handle: &dyn BackendHandle,
	) -> ComplexityCheck {
		if !self.settings.enabled {
			return self.disabled(query);
		}
		let load = match handle.load_metrics().await {
			Ok(load) => load,
			Err(error) => {
				tracing::warn!(
					adapter = %handle.adapter(),
					%error,
					"load metrics unavailable, assuming idle backend"
				);
				LoadMetrics::idle()
			}
		};
		self.check_under_load(query, load, Some(handle)).await
	}

	/// Admission check against a load snapshot the caller already has
	pub async fn check_under_load(
		&self,
		query: &CompiledQuery,
		load: LoadMetrics,
		handle: Option<&dyn BackendHandle>,
	) -> ComplexityCheck {
		if !self.settings.enabled {
			return self.disabled(query);
		}
		let analysis = self.analyze(query, handle).await;
		let check = self.decide(analysis, load);
		self.sink.record(&check);
		check
	}

	fn disabled(&self, query: &CompiledQuery) -> ComplexityCheck {
		ComplexityCheck {
			verdict: Verdict::Accept,
			analysis: heuristic::analyze(query, &self.settings),
			limit: self.settings.base_limit,
			load: LoadMetrics::idle(),
		}
	}
}

/// Backends whose explain output is parsed
fn has_planner(adapter: AdapterId) -> bool {
	matches!(adapter, AdapterId::Postgres | AdapterId::MySql)
}
