//! Complexity events

use crate::analysis::{ComplexityCheck, Verdict};
use std::fmt::Debug;

/// Receives one event per admission check
pub trait MetricsSink: Debug + Send + Sync {
	fn record(&self, check: &ComplexityCheck);
}

/// Emits checks as `tracing` events under the `strainer::complexity` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingMetricsSink;

impl MetricsSink for TracingMetricsSink {
	fn record(&self, check: &ComplexityCheck) {
		let score = check.analysis.complexity_score;
		let method = check.analysis.method;
		let load_factor = check.load.load_factor;
		match check.verdict {
			Verdict::Reject => tracing::warn!(
				target: "strainer::complexity",
				score,
				limit = check.limit,
				%method,
				load_factor,
				suggestions = ?check.analysis.suggestions,
				"query rejected as too complex"
			),
			Verdict::Warn => tracing::info!(
				target: "strainer::complexity",
				score,
				limit = check.limit,
				%method,
				load_factor,
				"query close to complexity limit"
			),
			Verdict::Accept => tracing::debug!(
				target: "strainer::complexity",
				score,
				limit = check.limit,
				%method,
				load_factor,
				"query accepted"
			),
		}
	}
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetricsSink;

impl MetricsSink for NoopMetricsSink {
	fn record(&self, _check: &ComplexityCheck) {}
}
