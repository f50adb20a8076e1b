//! Explain-plan parsing and planner-based scoring
//!
//! Postgres returns `EXPLAIN (FORMAT JSON)` as a list holding one object
//! with a recursive `Plan` node. MySQL's `EXPLAIN FORMAT=JSON` nests
//! `table` objects under `query_block`, `nested_loop` and the various
//! `*_operation` wrappers. Both are reduced to a [`PlanSummary`].

use crate::analysis::{AnalysisMethod, ComplexityAnalysis, MAX_SCORE};
use serde_json::Value as Json;
use strainer_backends::error::{ProbeError, ProbeResult};
use strainer_core::settings::ComplexitySettings;
use strainer_core::types::AdapterId;

const COST_POINTS: f64 = 100.0;
const ROW_POINTS: f64 = 50.0;
const SEQ_SCAN_POINTS: f64 = 15.0;
const NODE_POINTS: f64 = 2.0;

/// What the score is computed from
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanSummary {
	pub cost: f64,
	pub rows: f64,
	pub sequential_scans: usize,
	pub index_scans: usize,
	pub node_count: usize,
	/// Tables read by a sequential scan, in plan order
	pub scanned_tables: Vec<String>,
}

impl PlanSummary {
	/// Parse the explain output of `adapter`
	pub fn parse(adapter: AdapterId, plan: &Json) -> ProbeResult<Self> {
		match adapter {
			AdapterId::Postgres => Self::from_postgres(plan),
			AdapterId::MySql => Self::from_mysql(plan),
			other => Err(ProbeError::unsupported(other, "explain plan parsing")),
		}
	}

	pub fn from_postgres(plan: &Json) -> ProbeResult<Self> {
		let root = match plan {
			Json::Array(items) => items.first(),
			other => Some(other),
		}
		.and_then(|item| item.get("Plan"))
		.ok_or_else(|| ProbeError::Parse("explain output has no Plan node".to_string()))?;

		let mut summary = PlanSummary {
			cost: number(root.get("Total Cost")).unwrap_or(0.0),
			rows: number(root.get("Plan Rows")).unwrap_or(0.0),
			..PlanSummary::default()
		};
		summary.walk_postgres(root);
		Ok(summary)
	}

	fn walk_postgres(&mut self, node: &Json) {
		self.node_count += 1;
		let node_type = node.get("Node Type").and_then(Json::as_str).unwrap_or_default();
		if node_type == "Seq Scan" {
			self.sequential_scans += 1;
			if let Some(table) = node.get("Relation Name").and_then(Json::as_str) {
				self.scanned_tables.push(table.to_string());
			}
		} else if node_type.contains("Index") {
			self.index_scans += 1;
		}
		if let Some(children) = node.get("Plans").and_then(Json::as_array) {
			for child in children {
				self.walk_postgres(child);
			}
		}
	}

	pub fn from_mysql(plan: &Json) -> ProbeResult<Self> {
		let block = plan
			.get("query_block")
			.ok_or_else(|| ProbeError::Parse("explain output has no query_block".to_string()))?;
		let mut summary = PlanSummary {
			cost: block
				.get("cost_info")
				.and_then(|info| number(info.get("query_cost")))
				.unwrap_or(0.0),
			..PlanSummary::default()
		};
		summary.walk_mysql(block);
		Ok(summary)
	}

	fn walk_mysql(&mut self, node: &Json) {
		match node {
			Json::Object(map) => {
				if let Some(table) = map.get("table").filter(|t| t.is_object()) {
					self.mysql_table(table);
				}
				for (key, value) in map {
					if key != "table" {
						self.walk_mysql(value);
					}
				}
			}
			Json::Array(items) => {
				for item in items {
					self.walk_mysql(item);
				}
			}
			_ => {}
		}
	}

	fn mysql_table(&mut self, table: &Json) {
		self.node_count += 1;
		match table.get("access_type").and_then(Json::as_str) {
			Some("ALL") => {
				self.sequential_scans += 1;
				if let Some(name) = table.get("table_name").and_then(Json::as_str) {
					self.scanned_tables.push(name.to_string());
				}
			}
			Some("index" | "range" | "ref" | "eq_ref" | "const" | "ref_or_null" | "index_merge") => {
				self.index_scans += 1;
			}
			_ => {}
		}
		if let Some(rows) = number(table.get("rows_examined_per_scan")) {
			self.rows = self.rows.max(rows);
		}
		// Subqueries attached to the table carry their own tables
		for key in ["attached_subqueries", "materialized_from_subquery"] {
			if let Some(nested) = table.get(key) {
				self.walk_mysql(nested);
			}
		}
	}

	/// Weighted, bounded score
	pub fn score(&self, settings: &ComplexitySettings) -> f64 {
		let cost = (self.cost / settings.cost_divisor.max(f64::EPSILON)).min(COST_POINTS);
		let rows = (self.rows / settings.rows_divisor.max(f64::EPSILON)).min(ROW_POINTS);
		let scans = self.sequential_scans as f64 * SEQ_SCAN_POINTS;
		let nodes = self.node_count as f64 * NODE_POINTS;
		(cost + rows + scans + nodes).clamp(0.0, MAX_SCORE)
	}

	pub fn analysis(&self, settings: &ComplexitySettings) -> ComplexityAnalysis {
		let mut analysis = ComplexityAnalysis::new(
			self.cost,
			self.rows,
			self.score(settings),
			AnalysisMethod::Explain,
		);
		for table in &self.scanned_tables {
			analysis = analysis.with_suggestion(format!(
				"sequential scan on '{}': index the filtered columns",
				table
			));
		}
		if self.rows >= settings.rows_divisor * ROW_POINTS {
			analysis = analysis.with_suggestion("large row estimate: narrow the filter or add a limit");
		}
		analysis
	}
}

/// A JSON number, or a string holding one (MySQL quotes its costs)
fn number(value: Option<&Json>) -> Option<f64> {
	match value? {
		Json::Number(n) => n.as_f64(),
		Json::String(s) => s.parse().ok(),
		_ => None,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	fn postgres_plan() -> Json {
		json!([{
			"Plan": {
				"Node Type": "Hash Join",
				"Total Cost": 2500.0,
				"Plan Rows": 12000,
				"Plans": [
					{ "Node Type": "Seq Scan", "Relation Name": "users", "Total Cost": 1200.0, "Plan Rows": 12000 },
					{
						"Node Type": "Hash",
						"Plans": [
							{ "Node Type": "Index Scan", "Relation Name": "organizations", "Total Cost": 8.3 }
						]
					}
				]
			}
		}])
	}

	#[rstest]
	fn test_postgres_summary() {
		let summary = PlanSummary::parse(AdapterId::Postgres, &postgres_plan()).unwrap();
		assert_eq!(summary.cost, 2500.0);
		assert_eq!(summary.rows, 12000.0);
		assert_eq!(summary.node_count, 4);
		assert_eq!(summary.sequential_scans, 1);
		assert_eq!(summary.index_scans, 1);
		assert_eq!(summary.scanned_tables, vec!["users"]);
	}

	#[rstest]
	fn test_postgres_score() {
		let summary = PlanSummary::from_postgres(&postgres_plan()).unwrap();
		// 25 (cost) + 12 (rows) + 15 (one seq scan) + 8 (four nodes)
		assert_eq!(summary.score(&ComplexitySettings::default()), 60.0);
	}

	#[rstest]
	fn test_score_caps_each_part() {
		let summary = PlanSummary {
			cost: 1e9,
			rows: 1e9,
			..PlanSummary::default()
		};
		assert_eq!(summary.score(&ComplexitySettings::default()), 100.0);
	}

	#[rstest]
	fn test_mysql_summary() {
		let plan = json!({
			"query_block": {
				"select_id": 1,
				"cost_info": { "query_cost": "1320.50" },
				"nested_loop": [
					{ "table": { "table_name": "users", "access_type": "ALL", "rows_examined_per_scan": 9800 } },
					{ "table": { "table_name": "organizations", "access_type": "eq_ref", "rows_examined_per_scan": 1 } }
				]
			}
		});
		let summary = PlanSummary::parse(AdapterId::MySql, &plan).unwrap();
		assert_eq!(summary.cost, 1320.5);
		assert_eq!(summary.rows, 9800.0);
		assert_eq!(summary.node_count, 2);
		assert_eq!(summary.sequential_scans, 1);
		assert_eq!(summary.index_scans, 1);
	}

	#[rstest]
	fn test_mysql_single_table() {
		let plan = json!({
			"query_block": {
				"cost_info": { "query_cost": "0.35" },
				"table": { "table_name": "users", "access_type": "const", "rows_examined_per_scan": 1 }
			}
		});
		let summary = PlanSummary::from_mysql(&plan).unwrap();
		assert_eq!(summary.node_count, 1);
		assert_eq!(summary.sequential_scans, 0);
	}

	#[rstest]
	#[case(AdapterId::Postgres, json!({"rows": []}))]
	#[case(AdapterId::MySql, json!([1, 2]))]
	#[case(AdapterId::Sqlite, json!({}))]
	fn test_unparseable_plans(#[case] adapter: AdapterId, #[case] plan: Json) {
		assert!(PlanSummary::parse(adapter, &plan).is_err());
	}

	#[rstest]
	#[case(AdapterId::CockroachDb)]
	#[case(AdapterId::MsSql)]
	#[case(AdapterId::Search)]
	fn test_adapters_without_planner_are_not_parsed(#[case] adapter: AdapterId) {
		let err = PlanSummary::parse(adapter, &postgres_plan()).unwrap_err();
		assert!(matches!(err, ProbeError::Unsupported { .. }), "{:?}", err);
	}

	#[rstest]
	fn test_analysis_suggests_indexes() {
		let analysis = PlanSummary::from_postgres(&postgres_plan())
			.unwrap()
			.analysis(&ComplexitySettings::default());
		assert_eq!(analysis.method, AnalysisMethod::Explain);
		assert_eq!(analysis.suggestions.len(), 1);
		assert!(analysis.suggestions[0].contains("'users'"));
	}
}
