//! SQL Server adapter
//!
//! No regular expressions and no array columns. Full-text search needs a
//! full-text index, JSON key checks need 2016 or later, and geo operators
//! work on `geography` columns.

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
pub struct MsSqlAdapter;

impl MsSqlAdapter {
	pub fn new() -> Self {
		Self
	}
}

impl Adapter for MsSqlAdapter {
	fn id(&self) -> AdapterId {
		AdapterId::MsSql
	}

	fn semantic_type(&self, native_type: &str) -> Option<SemanticType> {
		let ty = match sql::base_type(native_type).as_str() {
			"nvarchar" | "varchar" | "nchar" | "char" | "ntext" | "text" | "sysname" => {
				SemanticType::String
			}
			"bit" => SemanticType::Boolean,
			"tinyint" | "smallint" | "int" | "bigint" => SemanticType::Integer,
			"float" | "real" => SemanticType::Float,
			"decimal" | "numeric" | "money" | "smallmoney" => SemanticType::Decimal,
			"date" => SemanticType::Date,
			"datetime" | "datetime2" | "datetimeoffset" | "smalldatetime" => SemanticType::DateTime,
			"time" => SemanticType::Time,
			"uniqueidentifier" => SemanticType::Uuid,
			"json" => SemanticType::Json,
			"geography" | "geometry" => SemanticType::Coordinates,
			_ => return None,
		};
		Some(ty)
	}

	fn implements(&self, ty: SemanticType, operator: OperatorTag) -> bool {
		if !candidates(ty).contains(&operator) {
			return false;
		}
		match ty {
			SemanticType::String => !matches!(
				operator,
				OperatorTag::Regex | OperatorTag::Iregex | OperatorTag::Similar
			),
			SemanticType::Json => !matches!(operator, OperatorTag::Contains | OperatorTag::ContainedIn),
			SemanticType::Array(_) => operator == OperatorTag::IsNull,
			_ => true,
		}
	}

	fn required_feature(&self, ty: SemanticType, operator: OperatorTag) -> Option<Feature> {
		match (ty, operator) {
			(_, OperatorTag::IsNull) => None,
			(SemanticType::String, OperatorTag::Search) => Some(Feature::FullText),
			(SemanticType::Json, _) => Some(Feature::Json),
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
			SemanticType::Coordinates => geo_leaf(col, operator, operand, options),
			_ => sql::comparison(col, operator, operand, Expr::Value),
		};
		expr.map(Predicate::Sql)
	}
}

fn text_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	match operator {
		OperatorTag::Search => Some(Expr::template(
			"CONTAINS({}, {})",
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
				escape_clause: true,
			},
		),
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}

fn json_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	let has_key = |key: &String| {
		Expr::template(
			"JSON_PATH_EXISTS({}, {}) = 1",
			vec![col.clone(), Expr::value(sql::json_path(key))],
		)
	};
	match operator {
		OperatorTag::HasKey => Some(has_key(sql::keys(operand)?.first()?)),
		OperatorTag::HasKeysAny => Some(Expr::any(sql::keys(operand)?.iter().map(has_key).collect())),
		OperatorTag::HasKeysAll => Some(Expr::all(sql::keys(operand)?.iter().map(has_key).collect())),
		// JSON lives in text columns: compare the serialized document
		_ => sql::comparison(col, operator, operand, |v| {
			Expr::Value(Value::String(v.to_json().to_string()))
		}),
	}
}

fn geo_leaf(col: Expr, operator: OperatorTag, operand: &Operand, options: &ApplyOptions) -> Option<Expr> {
	match operator {
		OperatorTag::Near => {
			let (center, meters) = sql::near_meters(operand, options)?;
			Some(Expr::template(
				"{}.STDistance(geography::Point({}, {}, 4326)) <= {}",
				vec![
					col,
					Expr::value(center.lat),
					Expr::value(center.lng),
					Expr::value(meters),
				],
			))
		}
		OperatorTag::WithinBox => {
			let (south_west, north_east) = sql::bounds(operand)?;
			Some(Expr::template(
				"{}.STIntersects(geography::STGeomFromText({}, 4326)) = 1",
				vec![col, Expr::value(sql::bbox_wkt(south_west, north_east))],
			))
		}
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use strainer_core::queryable::Queryable;
	use strainer_core::value::GeoPoint;

	fn render(field: FieldDescriptor, operator: OperatorTag, operand: Operand) -> String {
		let adapter = MsSqlAdapter::new();
		let query = adapter.new_query(&Queryable::new("Store", "stores", AdapterId::MsSql));
		let dispatch = adapter.apply_operator(query, &field, operator, &operand, &ApplyOptions::default());
		assert!(dispatch.is_applied());
		dispatch
			.into_query()
			.render()
			.text
			.trim_start_matches("SELECT [stores].* FROM [stores] WHERE ")
			.to_string()
	}

	#[rstest]
	fn test_includes_uses_escape_clause() {
		let field = FieldDescriptor::scalar("name", SemanticType::String);
		assert_eq!(
			render(field, OperatorTag::Includes, Operand::Pattern("a_b".into())),
			r"[stores].[name] LIKE @P1 ESCAPE '\'"
		);
	}

	#[rstest]
	fn test_near_uses_geography_point() {
		let field = FieldDescriptor::scalar("location", SemanticType::Coordinates);
		let sql = render(
			field,
			OperatorTag::Near,
			Operand::Near {
				center: GeoPoint::new(40.7, -74.0),
				distance: 500.0,
				unit: None,
			},
		);
		assert_eq!(
			sql,
			"[stores].[location].STDistance(geography::Point(@P1, @P2, 4326)) <= @P3"
		);
	}

	#[rstest]
	#[case("uniqueidentifier", Some(SemanticType::Uuid))]
	#[case("nvarchar(max)", Some(SemanticType::String))]
	#[case("bit", Some(SemanticType::Boolean))]
	#[case("varbinary(16)", None)]
	fn test_semantic_type(#[case] native: &str, #[case] expected: Option<SemanticType>) {
		assert_eq!(MsSqlAdapter::new().semantic_type(native), expected);
	}

	#[rstest]
	fn test_no_regex_operators() {
		let operators = MsSqlAdapter::new().operators_for_type(SemanticType::String);
		assert!(!operators.contains(&OperatorTag::Regex));
		assert!(operators.contains(&OperatorTag::Search));
	}
}
