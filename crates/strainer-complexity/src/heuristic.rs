//! Structural scoring for backends without a usable planner

use crate::analysis::{AnalysisMethod, ComplexityAnalysis};
use strainer_backends::query::CompiledQuery;
use strainer_core::settings::ComplexitySettings;

const PREDICATE_POINTS: f64 = 2.0;
const JOIN_POINTS: f64 = 10.0;
const NO_LIMIT_POINTS: f64 = 20.0;
const UNLIMITED_ORDER_POINTS: f64 = 20.0;
const LARGE_OFFSET_POINTS: f64 = 30.0;

/// Joins beyond this count get a suggestion
const JOIN_SUGGESTION_THRESHOLD: usize = 3;

/// Shape of a compiled query as seen by the heuristic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryShape {
	pub predicates: usize,
	pub joins: usize,
	pub limit: Option<u64>,
	pub offset: Option<u64>,
	pub ordered: bool,
}

impl QueryShape {
	pub fn of(query: &CompiledQuery) -> Self {
		Self {
			predicates: query.predicate_count(),
			joins: query.join_count(),
			limit: query.limit(),
			offset: query.offset(),
			ordered: query.has_order(),
		}
	}

	/// Raw points before the score is capped
	pub fn points(&self, settings: &ComplexitySettings) -> f64 {
		let mut points = self.predicates as f64 * PREDICATE_POINTS + self.joins as f64 * JOIN_POINTS;
		if self.limit.is_none() {
			points += NO_LIMIT_POINTS;
			if self.ordered {
				points += UNLIMITED_ORDER_POINTS;
			}
			if self.large_offset(settings) {
				points += LARGE_OFFSET_POINTS;
			}
		}
		points
	}

	fn large_offset(&self, settings: &ComplexitySettings) -> bool {
		self.offset
			.is_some_and(|offset| offset >= settings.large_offset_threshold)
	}

	pub fn analysis(&self, settings: &ComplexitySettings) -> ComplexityAnalysis {
		let points = self.points(settings);
		let mut analysis = ComplexityAnalysis::new(points, 0.0, points, AnalysisMethod::Heuristic);
		if self.limit.is_none() {
			analysis = analysis.with_suggestion(if self.ordered {
				"ordered query without a limit: add a limit"
			} else {
				"add a limit"
			});
		}
		if self.large_offset(settings) {
			analysis = analysis.with_suggestion("large offset: prefer keyset pagination");
		}
		if self.joins > JOIN_SUGGESTION_THRESHOLD {
			analysis = analysis.with_suggestion(format!(
				"{} joins or subqueries: filter on fewer associations",
				self.joins
			));
		}
		analysis
	}
}

/// Heuristic analysis of `query`
pub fn analyze(query: &CompiledQuery, settings: &ComplexitySettings) -> ComplexityAnalysis {
	QueryShape::of(query).analysis(settings)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn shape(joins: usize, limit: Option<u64>, offset: Option<u64>, ordered: bool) -> QueryShape {
		QueryShape {
			predicates: 0,
			joins,
			limit,
			offset,
			ordered,
		}
	}

	#[rstest]
	#[case(shape(0, Some(10), None, false), 0.0)]
	#[case(shape(0, None, None, false), 20.0)]
	#[case(shape(2, None, None, true), 60.0)]
	#[case(shape(0, None, Some(5000), false), 50.0)]
	#[case(shape(0, None, Some(10), false), 20.0)]
	#[case(shape(1, Some(10), Some(5000), true), 10.0)]
	fn test_points(#[case] shape: QueryShape, #[case] expected: f64) {
		assert_eq!(shape.points(&ComplexitySettings::default()), expected);
	}

	#[rstest]
	fn test_predicates_add_points() {
		let shape = QueryShape {
			predicates: 3,
			..shape(0, Some(1), None, false)
		};
		assert_eq!(shape.points(&ComplexitySettings::default()), 6.0);
	}

	#[rstest]
	fn test_many_joins_are_capped_and_flagged() {
		let analysis = shape(12, None, None, true).analysis(&ComplexitySettings::default());
		assert_eq!(analysis.cost, 160.0);
		assert_eq!(analysis.complexity_score, 100.0);
		assert_eq!(analysis.method, AnalysisMethod::Heuristic);
		assert!(analysis.suggestions.iter().any(|s| s.contains("12 joins")));
	}
}
