//! PostgreSQL adapter
//!
//! Implements the full operator vocabulary: `jsonb` containment and key
//! operators, native arrays, POSIX regular expressions, `SIMILAR TO`,
//! `tsvector` full-text search and PostGIS geography.

use super::sql::{self, LikeStyle};
use crate::adapter::{Adapter, ApplyOptions};
use crate::query::Predicate;
use crate::sql::{BinOp, Expr};
use strainer_core::capability::Feature;
use strainer_core::operand::Operand;
use strainer_core::operators::{OperatorTag, candidates};
use strainer_core::types::{AdapterId, ElementType, FieldDescriptor, SemanticType};
use strainer_core::value::Value;

#[derive(Debug, Clone, Default)]
pub struct PostgresAdapter;

impl PostgresAdapter {
	pub fn new() -> Self {
		Self
	}
}

impl Adapter for PostgresAdapter {
	fn id(&self) -> AdapterId {
		AdapterId::Postgres
	}

	fn semantic_type(&self, native_type: &str) -> Option<SemanticType> {
		semantic_type(native_type)
	}

	fn implements(&self, ty: SemanticType, operator: OperatorTag) -> bool {
		candidates(ty).contains(&operator)
	}

	fn required_feature(&self, ty: SemanticType, operator: OperatorTag) -> Option<Feature> {
		geo_requirement(ty, operator)
	}

	fn compile_leaf(
		&self,
		field: &FieldDescriptor,
		ty: SemanticType,
		operator: OperatorTag,
		operand: &Operand,
		options: &ApplyOptions,
	) -> Option<Predicate> {
		leaf(field, ty, operator, operand, options).map(Predicate::Sql)
	}
}

pub(crate) fn geo_requirement(ty: SemanticType, operator: OperatorTag) -> Option<Feature> {
	(ty == SemanticType::Coordinates && matches!(operator, OperatorTag::Near | OperatorTag::WithinBox))
		.then_some(Feature::Spatial)
}

/// Native type mapping shared with CockroachDB
pub(crate) fn semantic_type(native_type: &str) -> Option<SemanticType> {
	let base = sql::base_type(native_type);
	if let Some(element) = sql::array_element(&base) {
		return sql::array_of(scalar_type(element));
	}
	// Internal array names: `_int4`, `_text`, ...
	if let Some(element) = base.strip_prefix('_') {
		return sql::array_of(scalar_type(element));
	}
	scalar_type(&base)
}

fn scalar_type(base: &str) -> Option<SemanticType> {
	let ty = match base {
		"text" | "varchar" | "character varying" | "char" | "character" | "bpchar" | "citext"
		| "name" | "string" => SemanticType::String,
		"int2" | "int4" | "int8" | "smallint" | "integer" | "bigint" | "int" | "serial"
		| "bigserial" | "smallserial" => SemanticType::Integer,
		"float4" | "float8" | "real" | "double precision" | "float" => SemanticType::Float,
		"numeric" | "decimal" | "money" => SemanticType::Decimal,
		"bool" | "boolean" => SemanticType::Boolean,
		"date" => SemanticType::Date,
		"timestamp" | "timestamptz" | "timestamp with time zone"
		| "timestamp without time zone" => SemanticType::DateTime,
		"time" | "timetz" | "time with time zone" | "time without time zone" => SemanticType::Time,
		"uuid" => SemanticType::Uuid,
		"json" | "jsonb" => SemanticType::Json,
		"geography" | "geometry" | "point" => SemanticType::Coordinates,
		_ => return None,
	};
	Some(ty)
}

/// Predicate for one operator, shared with CockroachDB
pub(crate) fn leaf(
	field: &FieldDescriptor,
	ty: SemanticType,
	operator: OperatorTag,
	operand: &Operand,
	options: &ApplyOptions,
) -> Option<Expr> {
	let col = sql::column(field, options);
	match ty {
		SemanticType::Json => json_leaf(col, operator, operand),
		SemanticType::Coordinates => geo_leaf(col, operator, operand, options),
		SemanticType::Array(element) => array_leaf(col, field, element, operator, operand),
		SemanticType::String => text_leaf(col, operator, operand),
		SemanticType::Enum => {
			// Enum overrides on text columns compare as text
			let cast = field
				.native_type
				.as_deref()
				.filter(|native| semantic_type(native) != Some(SemanticType::String))
				.and_then(cast_target);
			sql::comparison(col, operator, operand, |v| cast_param(v, cast))
		}
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}

fn text_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	let custom = |op: &'static str, p: &str| Expr::binary(col.clone(), BinOp::Custom(op), Expr::value(p));
	match operator {
		OperatorTag::Like
		| OperatorTag::Nlike
		| OperatorTag::Ilike
		| OperatorTag::Nilike
		| OperatorTag::StartsWith
		| OperatorTag::EndsWith
		| OperatorTag::Includes => sql::text_match(col, operator, sql::pattern(operand)?, LikeStyle::Native),
		OperatorTag::Regex => Some(custom("~", sql::pattern(operand)?)),
		OperatorTag::Iregex => Some(custom("~*", sql::pattern(operand)?)),
		OperatorTag::Similar => Some(custom("SIMILAR TO", sql::pattern(operand)?)),
		OperatorTag::Search => Some(Expr::template(
			"to_tsvector({}) @@ plainto_tsquery({})",
			vec![col, Expr::value(sql::pattern(operand)?)],
		)),
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}

fn json_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	match (operator, operand) {
		(OperatorTag::Contains, Operand::Document(doc)) => Some(Expr::binary(
			col,
			BinOp::Custom("@>"),
			cast_param(Value::Json(doc.clone()), Some("jsonb")),
		)),
		(OperatorTag::ContainedIn, Operand::Document(doc)) => Some(Expr::binary(
			col,
			BinOp::Custom("<@"),
			cast_param(Value::Json(doc.clone()), Some("jsonb")),
		)),
		(OperatorTag::HasKey, _) => {
			let key = sql::keys(operand)?.first()?;
			Some(Expr::binary(col, BinOp::Custom("?"), Expr::value(key.as_str())))
		}
		(OperatorTag::HasKeysAny | OperatorTag::HasKeysAll, _) => {
			let keys = sql::keys(operand)?
				.iter()
				.map(|k| Value::String(k.clone()))
				.collect();
			let op = if operator == OperatorTag::HasKeysAny { "?|" } else { "?&" };
			Some(Expr::binary(
				col,
				BinOp::Custom(op),
				cast_param(Value::Array(keys), Some("text[]")),
			))
		}
		_ => sql::comparison(col, operator, operand, |v| cast_param(v, Some("jsonb"))),
	}
}

fn array_leaf(
	col: Expr,
	field: &FieldDescriptor,
	element: ElementType,
	operator: OperatorTag,
	operand: &Operand,
) -> Option<Expr> {
	let cast = field
		.native_type
		.as_deref()
		.and_then(cast_target)
		.unwrap_or(array_type(element));
	let op = match operator {
		OperatorTag::Contains => "@>",
		OperatorTag::ContainedIn => "<@",
		OperatorTag::Overlaps => "&&",
		_ => return sql::comparison(col, operator, operand, |v| cast_param(v, Some(cast))),
	};
	let values = operand.as_list()?.to_vec();
	Some(Expr::binary(
		col,
		BinOp::Custom(op),
		cast_param(Value::Array(values), Some(cast)),
	))
}

fn geo_leaf(
	col: Expr,
	operator: OperatorTag,
	operand: &Operand,
	options: &ApplyOptions,
) -> Option<Expr> {
	match operator {
		OperatorTag::Near => {
			let (center, meters) = sql::near_meters(operand, options)?;
			Some(Expr::template(
				"ST_DWithin({}::geography, ST_SetSRID(ST_MakePoint({}, {}), 4326)::geography, {})",
				vec![
					col,
					Expr::value(center.lng),
					Expr::value(center.lat),
					Expr::value(meters),
				],
			))
		}
		OperatorTag::WithinBox => {
			let (south_west, north_east) = sql::bounds(operand)?;
			Some(Expr::template(
				"ST_Intersects({}::geometry, ST_MakeEnvelope({}, {}, {}, {}, 4326))",
				vec![
					col,
					Expr::value(south_west.lng),
					Expr::value(south_west.lat),
					Expr::value(north_east.lng),
					Expr::value(north_east.lat),
				],
			))
		}
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}

/// A parameter with an explicit `::type` cast
fn cast_param(value: Value, cast: Option<&str>) -> Expr {
	match cast {
		Some(ty) => Expr::template(format!("{{}}::{}", ty), vec![Expr::Value(value)]),
		None => Expr::Value(value),
	}
}

/// A native type name that is safe to splice into a cast
fn cast_target(native: &str) -> Option<&str> {
	let native = native.trim();
	let safe = !native.is_empty()
		&& native
			.chars()
			.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | ' ' | '[' | ']'));
	safe.then_some(native)
}

fn array_type(element: ElementType) -> &'static str {
	match element {
		ElementType::String | ElementType::Enum => "text[]",
		ElementType::Integer => "int8[]",
		ElementType::Float => "float8[]",
		ElementType::Decimal => "numeric[]",
		ElementType::Boolean => "bool[]",
		ElementType::Date => "date[]",
		ElementType::DateTime => "timestamptz[]",
		ElementType::Uuid => "uuid[]",
	}
}
