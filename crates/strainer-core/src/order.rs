//! Order terms and order payload parsing
//!
//! Payload is a list of single-key objects, e.g.
//! `[{"organization": {"name": "asc"}}, {"created_at": "desc_nulls_last"}]`.

use crate::error::{FilterError, FilterResult};
use crate::filter::json_kind;
use crate::types::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
	#[default]
	Asc,
	Desc,
}

impl Direction {
	pub fn as_sql(&self) -> &'static str {
		match self {
			Direction::Asc => "ASC",
			Direction::Desc => "DESC",
		}
	}
}

/// Where NULLs sort relative to other values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NullsOrder {
	First,
	Last,
	/// Whatever the backend does natively
	#[default]
	Default,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderTerm {
	pub path: FieldPath,
	pub direction: Direction,
	pub nulls: NullsOrder,
}

impl OrderTerm {
	pub fn asc(path: impl Into<FieldPath>) -> Self {
		Self {
			path: path.into(),
			direction: Direction::Asc,
			nulls: NullsOrder::Default,
		}
	}

	pub fn desc(path: impl Into<FieldPath>) -> Self {
		Self {
			path: path.into(),
			direction: Direction::Desc,
			nulls: NullsOrder::Default,
		}
	}

	pub fn nulls(mut self, nulls: NullsOrder) -> Self {
		self.nulls = nulls;
		self
	}

	/// Parse an order payload: a list of terms, a single term object, or null
	pub fn parse_list(payload: &Json) -> FilterResult<Vec<OrderTerm>> {
		match payload {
			Json::Null => Ok(Vec::new()),
			Json::Array(items) => {
				let mut terms = Vec::new();
				for item in items {
					match item {
						Json::Object(map) => parse_object(map, &FieldPath::new(Vec::new()), &mut terms)?,
						other => {
							return Err(FilterError::MalformedFilter(format!(
								"order term must be an object, got {}",
								json_kind(other)
							)));
						}
					}
				}
				Ok(terms)
			}
			Json::Object(map) => {
				let mut terms = Vec::new();
				parse_object(map, &FieldPath::new(Vec::new()), &mut terms)?;
				Ok(terms)
			}
			other => Err(FilterError::MalformedFilter(format!(
				"order must be a list, got {}",
				json_kind(other)
			))),
		}
	}
}

fn parse_object(
	map: &Map<String, Json>,
	prefix: &FieldPath,
	out: &mut Vec<OrderTerm>,
) -> FilterResult<()> {
	for (key, value) in map {
		let path = prefix.child(key);
		match value {
			Json::String(token) => {
				let (direction, nulls) = parse_direction(token).ok_or_else(|| {
					FilterError::MalformedFilter(format!(
						"invalid order direction '{}' for {}",
						token, path
					))
				})?;
				out.push(OrderTerm {
					path,
					direction,
					nulls,
				});
			}
			Json::Object(inner) => parse_object(inner, &path, out)?,
			other => {
				return Err(FilterError::MalformedFilter(format!(
					"order for {} must be a direction or a nested object, got {}",
					path,
					json_kind(other)
				)));
			}
		}
	}
	Ok(())
}

/// Parse `asc`, `desc`, `asc_nulls_first`, `:desc_nulls_last`, ...
pub fn parse_direction(token: &str) -> Option<(Direction, NullsOrder)> {
	let normalized = token.trim().trim_start_matches(':').to_ascii_lowercase();
	let parsed = match normalized.as_str() {
		"asc" => (Direction::Asc, NullsOrder::Default),
		"desc" => (Direction::Desc, NullsOrder::Default),
		"asc_nulls_first" => (Direction::Asc, NullsOrder::First),
		"asc_nulls_last" => (Direction::Asc, NullsOrder::Last),
		"desc_nulls_first" => (Direction::Desc, NullsOrder::First),
		"desc_nulls_last" => (Direction::Desc, NullsOrder::Last),
		_ => return None,
	};
	Some(parsed)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use serde_json::json;

	#[rstest]
	#[case("asc", Direction::Asc, NullsOrder::Default)]
	#[case(":asc", Direction::Asc, NullsOrder::Default)]
	#[case("DESC", Direction::Desc, NullsOrder::Default)]
	#[case("desc_nulls_last", Direction::Desc, NullsOrder::Last)]
	#[case(":asc_nulls_first", Direction::Asc, NullsOrder::First)]
	fn test_parse_direction(
		#[case] token: &str,
		#[case] direction: Direction,
		#[case] nulls: NullsOrder,
	) {
		assert_eq!(parse_direction(token), Some((direction, nulls)));
	}

	#[rstest]
	fn test_parse_nested_order() {
		let terms = OrderTerm::parse_list(&json!([
			{"organization": {"name": ":asc"}},
			{"created_at": "desc_nulls_last"}
		]))
		.unwrap();
		assert_eq!(
			terms,
			vec![
				OrderTerm::asc("organization.name"),
				OrderTerm::desc("created_at").nulls(NullsOrder::Last),
			]
		);
	}

	#[rstest]
	fn test_parse_single_object_and_null() {
		assert_eq!(
			OrderTerm::parse_list(&json!({"age": "asc"})).unwrap(),
			vec![OrderTerm::asc("age")]
		);
		assert!(OrderTerm::parse_list(&Json::Null).unwrap().is_empty());
	}

	#[rstest]
	#[case(json!([{"age": "sideways"}]))]
	#[case(json!([{"age": 1}]))]
	#[case(json!(["age"]))]
	#[case(json!("age"))]
	fn test_malformed_order(#[case] payload: Json) {
		assert_eq!(
			OrderTerm::parse_list(&payload).unwrap_err().code(),
			"malformed_filter"
		);
	}
}
