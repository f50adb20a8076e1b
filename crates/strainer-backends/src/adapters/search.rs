//! Search-engine adapter
//!
//! Compiles filters into Elasticsearch/OpenSearch query DSL. Object fields
//! are addressed by dotted path; to-many associations map to `nested`
//! fields. Every field may hold several values, so array types only expose
//! membership-style operators.

use super::sql::{bounds, keys, near_meters, pattern};
use crate::adapter::{Adapter, ApplyOptions};
use crate::query::{Predicate, search_field};
use crate::search::SearchClause;
use serde_json::{Map, Value as Json, json};
use strainer_core::operand::Operand;
use strainer_core::operators::{OperatorTag, candidates};
use strainer_core::types::{AdapterId, FieldDescriptor, SemanticType};
use strainer_core::value::Value;

#[derive(Debug, Clone, Default)]
pub struct SearchAdapter;

impl SearchAdapter {
	pub fn new() -> Self {
		Self
	}
}

impl Adapter for SearchAdapter {
	fn id(&self) -> AdapterId {
		AdapterId::Search
	}

	fn semantic_type(&self, native_type: &str) -> Option<SemanticType> {
		let native = native_type.trim().to_ascii_lowercase();
		if let Some(element) = native.strip_suffix("[]") {
			return super::sql::array_of(scalar_type(element));
		}
		scalar_type(&native)
	}

	fn implements(&self, ty: SemanticType, operator: OperatorTag) -> bool {
		if !candidates(ty).contains(&operator) {
			return false;
		}
		match ty {
			SemanticType::String => operator != OperatorTag::Similar,
			SemanticType::Json => matches!(
				operator,
				OperatorTag::IsNull
					| OperatorTag::HasKey
					| OperatorTag::HasKeysAny
					| OperatorTag::HasKeysAll
			),
			SemanticType::Array(_) => matches!(
				operator,
				OperatorTag::IsNull | OperatorTag::Contains | OperatorTag::Overlaps
			),
			_ => true,
		}
	}

	fn compile_leaf(
		&self,
		field: &FieldDescriptor,
		_ty: SemanticType,
		operator: OperatorTag,
		operand: &Operand,
		options: &ApplyOptions,
	) -> Option<Predicate> {
		let name = search_field(options.binding(), &field.column);
		clause(&name, operator, operand, options).map(Predicate::Search)
	}
}

fn scalar_type(native: &str) -> Option<SemanticType> {
	let ty = match native {
		"text" | "keyword" | "match_only_text" | "wildcard" | "constant_keyword" | "search_as_you_type" => {
			SemanticType::String
		}
		"long" | "integer" | "short" | "byte" | "unsigned_long" => SemanticType::Integer,
		"double" | "float" | "half_float" | "scaled_float" => SemanticType::Float,
		"boolean" => SemanticType::Boolean,
		"date" | "date_nanos" => SemanticType::DateTime,
		"object" | "flattened" | "flat_object" => SemanticType::Json,
		"geo_point" => SemanticType::Coordinates,
		_ => return None,
	};
	Some(ty)
}

fn clause(field: &str, operator: OperatorTag, operand: &Operand, options: &ApplyOptions) -> Option<SearchClause> {
	let term = |value: &Value| SearchClause::field_query("term", field, value.to_json());
	let range = |bound: &str, value: &Value| {
		let mut spec = Map::new();
		spec.insert(bound.to_string(), value.to_json());
		SearchClause::field_query("range", field, Json::Object(spec))
	};
	let terms = |values: &[Value]| {
		SearchClause::field_query(
			"terms",
			field,
			Json::Array(values.iter().map(Value::to_json).collect()),
		)
	};
	let wildcard = |value: String, case_insensitive: bool| {
		SearchClause::field_query(
			"wildcard",
			field,
			json!({ "value": value, "case_insensitive": case_insensitive }),
		)
	};

	let clause = match (operator, operand) {
		(OperatorTag::Eq, Operand::Scalar(Value::Null)) => SearchClause::exists(field).negate(),
		(OperatorTag::Neq, Operand::Scalar(Value::Null)) => SearchClause::exists(field),
		(OperatorTag::Eq, Operand::Scalar(value)) => term(value),
		(OperatorTag::Neq, Operand::Scalar(value)) => term(value).negate(),
		(OperatorTag::Gt, Operand::Scalar(value)) => range("gt", value),
		(OperatorTag::Gte, Operand::Scalar(value)) => range("gte", value),
		(OperatorTag::Lt, Operand::Scalar(value)) => range("lt", value),
		(OperatorTag::Lte, Operand::Scalar(value)) => range("lte", value),
		(OperatorTag::In, Operand::List(values)) if values.is_empty() => SearchClause::Constant(false),
		(OperatorTag::Nin, Operand::List(values)) if values.is_empty() => SearchClause::Constant(true),
		(OperatorTag::In, Operand::List(values)) => terms(values),
		(OperatorTag::Nin, Operand::List(values)) => terms(values).negate(),
		(OperatorTag::IsNull, Operand::Flag(true)) => SearchClause::exists(field).negate(),
		(OperatorTag::IsNull, Operand::Flag(false)) => SearchClause::exists(field),
		(OperatorTag::Like, _) => wildcard(like_to_wildcard(pattern(operand)?), false),
		(OperatorTag::Nlike, _) => wildcard(like_to_wildcard(pattern(operand)?), false).negate(),
		(OperatorTag::Ilike, _) => wildcard(like_to_wildcard(pattern(operand)?), true),
		(OperatorTag::Nilike, _) => wildcard(like_to_wildcard(pattern(operand)?), true).negate(),
		(OperatorTag::StartsWith, _) => {
			SearchClause::field_query("prefix", field, json!({ "value": pattern(operand)? }))
		}
		(OperatorTag::EndsWith, _) => {
			wildcard(format!("*{}", wildcard_escape(pattern(operand)?)), false)
		}
		(OperatorTag::Includes, _) => {
			wildcard(format!("*{}*", wildcard_escape(pattern(operand)?)), false)
		}
		(OperatorTag::Regex, _) => {
			SearchClause::field_query("regexp", field, json!({ "value": pattern(operand)? }))
		}
		(OperatorTag::Iregex, _) => SearchClause::field_query(
			"regexp",
			field,
			json!({ "value": pattern(operand)?, "case_insensitive": true }),
		),
		(OperatorTag::Search, _) => {
			SearchClause::field_query("match", field, json!({ "query": pattern(operand)? }))
		}
		(OperatorTag::HasKey, _) => SearchClause::exists(&format!("{}.{}", field, keys(operand)?.first()?)),
		(OperatorTag::HasKeysAny, _) => SearchClause::any(
			keys(operand)?
				.iter()
				.map(|k| SearchClause::exists(&format!("{}.{}", field, k)))
				.collect(),
		),
		(OperatorTag::HasKeysAll, _) => SearchClause::all(
			keys(operand)?
				.iter()
				.map(|k| SearchClause::exists(&format!("{}.{}", field, k)))
				.collect(),
		),
		// Every listed value must be present
		(OperatorTag::Contains, Operand::List(values)) => {
			SearchClause::all(values.iter().map(term).collect())
		}
		(OperatorTag::Overlaps, Operand::List(values)) if values.is_empty() => {
			SearchClause::Constant(false)
		}
		(OperatorTag::Overlaps, Operand::List(values)) => terms(values),
		(OperatorTag::Near, _) => {
			let (center, meters) = near_meters(operand, options)?;
			let mut spec = Map::new();
			spec.insert("distance".into(), json!(format!("{}m", meters)));
			spec.insert(field.to_string(), json!({ "lat": center.lat, "lon": center.lng }));
			SearchClause::leaf("geo_distance", Json::Object(spec))
		}
		(OperatorTag::WithinBox, _) => {
			let (south_west, north_east) = bounds(operand)?;
			SearchClause::field_query(
				"geo_bounding_box",
				field,
				json!({
					"top_left": { "lat": north_east.lat, "lon": south_west.lng },
					"bottom_right": { "lat": south_west.lat, "lon": north_east.lng }
				}),
			)
		}
		_ => return None,
	};
	Some(clause)
}

/// Escape wildcard-query metacharacters
fn wildcard_escape(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	for c in raw.chars() {
		if matches!(c, '\\' | '*' | '?') {
			out.push('\\');
		}
		out.push(c);
	}
	out
}

fn like_to_wildcard(pattern: &str) -> String {
	let mut out = String::with_capacity(pattern.len());
	for c in pattern.chars() {
		match c {
			'%' => out.push('*'),
			'_' => out.push('?'),
			other => out.push_str(&wildcard_escape(&other.to_string())),
		}
	}
	out
}
