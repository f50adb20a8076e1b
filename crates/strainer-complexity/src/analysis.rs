//! Analysis records and admission decisions

use serde::{Deserialize, Serialize};
use std::fmt;
use strainer_backends::handle::LoadMetrics;

/// Upper bound of every complexity score
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisMethod {
	/// Derived from the backend's query plan
	Explain,
	/// Derived from the shape of the compiled query
	Heuristic,
}

impl fmt::Display for AnalysisMethod {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AnalysisMethod::Explain => write!(f, "explain"),
			AnalysisMethod::Heuristic => write!(f, "heuristic"),
		}
	}
}

/// Estimated expense of one compiled query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityAnalysis {
	/// Planner cost units, or raw heuristic points
	pub cost: f64,
	/// Planner row estimate; zero for heuristic analyses
	pub estimated_rows: f64,
	/// 0 to 100
	pub complexity_score: f64,
	pub method: AnalysisMethod,
	pub suggestions: Vec<String>,
}

impl ComplexityAnalysis {
	pub fn new(cost: f64, estimated_rows: f64, score: f64, method: AnalysisMethod) -> Self {
		Self {
			cost,
			estimated_rows,
			complexity_score: score.clamp(0.0, MAX_SCORE),
			method,
			suggestions: Vec::new(),
		}
	}

	pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
		self.suggestions.push(suggestion.into());
		self
	}
}

/// Outcome of an admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
	Accept,
	/// Accepted, but close to the limit
	Warn,
	/// Over the limit; surfaced to callers as `too_complex`
	Reject,
}

impl fmt::Display for Verdict {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Verdict::Accept => write!(f, "accept"),
			Verdict::Warn => write!(f, "warn"),
			Verdict::Reject => write!(f, "reject"),
		}
	}
}

/// Result of [`crate::ComplexityAnalyzer::check_complexity`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityCheck {
	pub verdict: Verdict,
	pub analysis: ComplexityAnalysis,
	/// Adaptive limit the score was compared against
	pub limit: f64,
	/// Load snapshot the limit was derived from
	pub load: LoadMetrics,
}

impl ComplexityCheck {
	/// Whether the query may run, with or without a warning
	pub fn is_accepted(&self) -> bool {
		self.verdict != Verdict::Reject
	}

	pub fn is_rejected(&self) -> bool {
		self.verdict == Verdict::Reject
	}

	/// Caller-facing code of a rejection
	pub fn code(&self) -> Option<&'static str> {
		self.is_rejected().then_some("too_complex")
	}
}
