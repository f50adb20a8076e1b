//! MySQL adapter
//!
//! Arrays are stored in `JSON` columns, so array operators go through the
//! JSON functions. `REGEXP_LIKE` needs 8.0, `JSON_OVERLAPS` needs 8.0.17;
//! both are capability-gated. Case sensitivity of `_like` follows the
//! column collation.

use super::sql::{self, LikeStyle};
use crate::adapter::{Adapter, ApplyOptions};
use crate::query::Predicate;
use crate::sql::Expr;
use strainer_core::capability::Feature;
use strainer_core::operand::Operand;
use strainer_core::operators::{OperatorTag, candidates};
use strainer_core::types::{AdapterId, FieldDescriptor, SemanticType};
use strainer_core::value::Value;

#[derive(Debug, Clone, Default)]
pub struct MySqlAdapter;

impl MySqlAdapter {
	pub fn new() -> Self {
		Self
	}
}

impl Adapter for MySqlAdapter {
	fn id(&self) -> AdapterId {
		AdapterId::MySql
	}

	fn semantic_type(&self, native_type: &str) -> Option<SemanticType> {
		let lowered = native_type.trim().to_ascii_lowercase();
		if lowered == "tinyint(1)" || lowered == "bit(1)" {
			return Some(SemanticType::Boolean);
		}
		if lowered.starts_with("enum(") || lowered.starts_with("set(") {
			return Some(SemanticType::Enum);
		}
		let base = sql::base_type(&lowered);
		let base = base.trim_end_matches(" unsigned");
		if let Some(element) = sql::array_element(base) {
			return sql::array_of(scalar_type(element));
		}
		scalar_type(base)
	}

	fn enum_members(&self, native_type: &str) -> Option<Vec<String>> {
		let open = native_type.find('(')?;
		let close = native_type.rfind(')')?;
		let members = quoted_members(native_type.get(open + 1..close)?);
		(!members.is_empty()).then_some(members)
	}

	fn implements(&self, ty: SemanticType, operator: OperatorTag) -> bool {
		candidates(ty).contains(&operator) && operator != OperatorTag::Similar
	}

	fn required_feature(&self, ty: SemanticType, operator: OperatorTag) -> Option<Feature> {
		match (ty, operator) {
			(_, OperatorTag::IsNull) => None,
			(SemanticType::String, OperatorTag::Regex | OperatorTag::Iregex) => Some(Feature::Regex),
			(SemanticType::String, OperatorTag::Search) => Some(Feature::FullText),
			(SemanticType::Json, _) => Some(Feature::Json),
			(SemanticType::Array(_), OperatorTag::Overlaps) => Some(Feature::JsonArrayOverlap),
			(SemanticType::Array(_), _) => Some(Feature::Json),
			(SemanticType::Coordinates, _) => Some(Feature::Spatial),
			_ => None,
		}
	}

	fn compile_leaf(
		&self,
		field: &FieldDescriptor,
		ty: SemanticType,
		operator: OperatorTag,
		operand: &Operand,
		options: &ApplyOptions,
	) -> Option<Predicate> {
		let col = sql::column(field, options);
		let expr = match ty {
			SemanticType::String => text_leaf(col, operator, operand),
			SemanticType::Json => json_leaf(col, operator, operand),
			SemanticType::Array(_) => array_leaf(col, operator, operand),
			SemanticType::Coordinates => geo_leaf(col, operator, operand, options),
			_ => sql::comparison(col, operator, operand, Expr::Value),
		};
		expr.map(Predicate::Sql)
	}
}

fn scalar_type(base: &str) -> Option<SemanticType> {
	let ty = match base {
		"varchar" | "char" | "text" | "tinytext" | "mediumtext" | "longtext" => SemanticType::String,
		"tinyint" | "smallint" | "mediumint" | "int" | "integer" | "bigint" => SemanticType::Integer,
		"float" | "double" | "real" | "double precision" => SemanticType::Float,
		"decimal" | "numeric" | "dec" => SemanticType::Decimal,
		"bool" | "boolean" => SemanticType::Boolean,
		"date" => SemanticType::Date,
		"datetime" | "timestamp" => SemanticType::DateTime,
		"time" => SemanticType::Time,
		"uuid" => SemanticType::Uuid,
		"json" => SemanticType::Json,
		"point" | "geometry" => SemanticType::Coordinates,
		_ => return None,
	};
	Some(ty)
}

/// Members of `'a','b'`, with `''` unescaped
fn quoted_members(list: &str) -> Vec<String> {
	let mut members = Vec::new();
	let mut chars = list.chars().peekable();
	while let Some(c) = chars.next() {
		if c != '\'' {
			continue;
		}
		let mut member = String::new();
		while let Some(c) = chars.next() {
			if c == '\'' {
				if chars.peek() == Some(&'\'') {
					chars.next();
					member.push('\'');
				} else {
					break;
				}
			} else {
				member.push(c);
			}
		}
		members.push(member);
	}
	members
}

fn json_param(value: Value) -> Expr {
	Expr::template("CAST({} AS JSON)", vec![Expr::Value(Value::Json(value.to_json()))])
}

fn text_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	let regexp = |flags: &str, p: &str| {
		Expr::template(
			format!("REGEXP_LIKE({{}}, {{}}, '{}')", flags),
			vec![col.clone(), Expr::value(p)],
		)
	};
	match operator {
		OperatorTag::Regex => Some(regexp("c", sql::pattern(operand)?)),
		OperatorTag::Iregex => Some(regexp("i", sql::pattern(operand)?)),
		OperatorTag::Search => Some(Expr::template(
			"MATCH({}) AGAINST ({} IN NATURAL LANGUAGE MODE)",
			vec![col, Expr::value(sql::pattern(operand)?)],
		)),
		OperatorTag::Like
		| OperatorTag::Nlike
		| OperatorTag::Ilike
		| OperatorTag::Nilike
		| OperatorTag::StartsWith
		| OperatorTag::EndsWith
		| OperatorTag::Includes => sql::text_match(
			col,
			operator,
			sql::pattern(operand)?,
			LikeStyle::Lower {
				escape_clause: false,
			},
		),
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}

fn json_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	match (operator, operand) {
		(OperatorTag::Contains, Operand::Document(doc)) => Some(Expr::template(
			"JSON_CONTAINS({}, {})",
			vec![col, json_param(Value::Json(doc.clone()))],
		)),
		(OperatorTag::ContainedIn, Operand::Document(doc)) => Some(Expr::template(
			"JSON_CONTAINS({}, {})",
			vec![json_param(Value::Json(doc.clone())), col],
		)),
		(OperatorTag::HasKey | OperatorTag::HasKeysAny | OperatorTag::HasKeysAll, _) => {
			let keys = sql::keys(operand)?;
			let mode = if operator == OperatorTag::HasKeysAll { "all" } else { "one" };
			let markers = vec!["{}"; keys.len()].join(", ");
			let mut args = vec![col];
			args.extend(keys.iter().map(|k| Expr::value(sql::json_path(k))));
			Some(Expr::template(
				format!("JSON_CONTAINS_PATH({{}}, '{}', {})", mode, markers),
				args,
			))
		}
		_ => sql::comparison(col, operator, operand, json_param),
	}
}

fn array_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	let candidate = || operand.as_list().map(|values| json_param(sql::json_array(values)));
	match operator {
		OperatorTag::Contains => Some(Expr::template("JSON_CONTAINS({}, {})", vec![col, candidate()?])),
		OperatorTag::ContainedIn => Some(Expr::template("JSON_CONTAINS({}, {})", vec![candidate()?, col])),
		OperatorTag::Overlaps => Some(Expr::template("JSON_OVERLAPS({}, {})", vec![col, candidate()?])),
		_ => sql::comparison(col, operator, operand, json_param),
	}
}

fn geo_leaf(col: Expr, operator: OperatorTag, operand: &Operand, options: &ApplyOptions) -> Option<Expr> {
	match operator {
		OperatorTag::Near => {
			let (center, meters) = sql::near_meters(operand, options)?;
			Some(Expr::template(
				"ST_Distance_Sphere({}, ST_GeomFromText({}, 4326, 'axis-order=long-lat')) <= {}",
				vec![col, Expr::value(center.to_wkt()), Expr::value(meters)],
			))
		}
		OperatorTag::WithinBox => {
			let (south_west, north_east) = sql::bounds(operand)?;
			Some(Expr::template(
				"MBRContains(ST_GeomFromText({}, 4326, 'axis-order=long-lat'), {})",
				vec![Expr::value(sql::bbox_wkt(south_west, north_east)), col],
			))
		}
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}
