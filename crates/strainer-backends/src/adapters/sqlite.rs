//! SQLite adapter
//!
//! JSON and array operators rely on the JSON1 functions, regular
//! expressions on a `REGEXP` function registered with the connection.
//! `GLOB` provides case-sensitive matching since `LIKE` ignores ASCII case.

use super::sql::{self, LikeStyle};
use crate::adapter::{Adapter, ApplyOptions};
use crate::query::Predicate;
use crate::sql::{BinOp, Expr};
use strainer_core::capability::Feature;
use strainer_core::operand::Operand;
use strainer_core::operators::{OperatorTag, candidates};
use strainer_core::types::{AdapterId, FieldDescriptor, SemanticType};
use strainer_core::value::Value;

#[derive(Debug, Clone, Default)]
pub struct SqliteAdapter;

impl SqliteAdapter {
	pub fn new() -> Self {
		Self
	}
}

impl Adapter for SqliteAdapter {
	fn id(&self) -> AdapterId {
		AdapterId::Sqlite
	}

	fn semantic_type(&self, native_type: &str) -> Option<SemanticType> {
		let base = sql::base_type(native_type);
		if let Some(element) = sql::array_element(&base) {
			return sql::array_of(scalar_type(element));
		}
		scalar_type(&base)
	}

	fn implements(&self, ty: SemanticType, operator: OperatorTag) -> bool {
		if !candidates(ty).contains(&operator) {
			return false;
		}
		match ty {
			SemanticType::String => !matches!(operator, OperatorTag::Similar | OperatorTag::Search),
			SemanticType::Json => !matches!(operator, OperatorTag::Contains | OperatorTag::ContainedIn),
			SemanticType::Coordinates => operator == OperatorTag::IsNull,
			_ => true,
		}
	}

	fn required_feature(&self, ty: SemanticType, operator: OperatorTag) -> Option<Feature> {
		match (ty, operator) {
			(_, OperatorTag::IsNull) => None,
			(SemanticType::String, OperatorTag::Regex | OperatorTag::Iregex) => Some(Feature::Regex),
			(SemanticType::Json | SemanticType::Array(_), _) => Some(Feature::Json),
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
			_ => sql::comparison(col, operator, operand, Expr::Value),
		};
		expr.map(Predicate::Sql)
	}
}

fn scalar_type(base: &str) -> Option<SemanticType> {
	let ty = match base {
		"text" | "varchar" | "char" | "clob" | "nvarchar" | "nchar" | "string" => SemanticType::String,
		"integer" | "int" | "bigint" | "smallint" | "tinyint" => SemanticType::Integer,
		"real" | "float" | "double" | "double precision" => SemanticType::Float,
		"numeric" | "decimal" => SemanticType::Decimal,
		"boolean" | "bool" => SemanticType::Boolean,
		"date" => SemanticType::Date,
		"datetime" | "timestamp" => SemanticType::DateTime,
		"time" => SemanticType::Time,
		"uuid" => SemanticType::Uuid,
		"json" | "jsonb" => SemanticType::Json,
		_ => return None,
	};
	Some(ty)
}

fn json_value(value: Value) -> Expr {
	Expr::func("json", vec![Expr::Value(Value::Json(value.to_json()))])
}

fn text_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	match operator {
		OperatorTag::Regex => Some(Expr::binary(
			col,
			BinOp::Custom("REGEXP"),
			Expr::value(sql::pattern(operand)?),
		)),
		OperatorTag::Iregex => Some(Expr::binary(
			col,
			BinOp::Custom("REGEXP"),
			Expr::value(format!("(?i){}", sql::pattern(operand)?)),
		)),
		OperatorTag::Like
		| OperatorTag::Nlike
		| OperatorTag::Ilike
		| OperatorTag::Nilike
		| OperatorTag::StartsWith
		| OperatorTag::EndsWith
		| OperatorTag::Includes => {
			sql::text_match(col, operator, sql::pattern(operand)?, LikeStyle::Glob)
		}
		_ => sql::comparison(col, operator, operand, Expr::Value),
	}
}

fn json_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	let has_key = |key: &String| {
		Expr::template(
			"json_type({}, {}) IS NOT NULL",
			vec![col.clone(), Expr::value(sql::json_path(key))],
		)
	};
	match operator {
		OperatorTag::HasKey => Some(has_key(sql::keys(operand)?.first()?)),
		OperatorTag::HasKeysAny => Some(Expr::any(sql::keys(operand)?.iter().map(has_key).collect())),
		OperatorTag::HasKeysAll => Some(Expr::all(sql::keys(operand)?.iter().map(has_key).collect())),
		OperatorTag::IsNull => sql::comparison(col, operator, operand, Expr::Value),
		_ => sql::comparison(Expr::func("json", vec![col]), operator, operand, json_value),
	}
}

fn array_leaf(col: Expr, operator: OperatorTag, operand: &Operand) -> Option<Expr> {
	let every = "NOT EXISTS (SELECT 1 FROM json_each({}) AS c WHERE c.value NOT IN (SELECT value FROM json_each({})))";
	let candidate = || operand.as_list().map(|values| Expr::Value(sql::json_array(values)));
	match operator {
		// every candidate element is present in the column
		OperatorTag::Contains => Some(Expr::template(every, vec![candidate()?, col])),
		OperatorTag::ContainedIn => Some(Expr::template(every, vec![col, candidate()?])),
		OperatorTag::Overlaps => Some(Expr::template(
			"EXISTS (SELECT 1 FROM json_each({}) AS c WHERE c.value IN (SELECT value FROM json_each({})))",
			vec![col, candidate()?],
		)),
		OperatorTag::IsNull => sql::comparison(col, operator, operand, Expr::Value),
		_ => sql::comparison(Expr::func("json", vec![col]), operator, operand, json_value),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use strainer_core::queryable::Queryable;
	use strainer_core::types::ElementType;

	fn render(field: FieldDescriptor, operator: OperatorTag, operand: Operand) -> (String, Vec<Value>) {
		let adapter = SqliteAdapter::new();
		let query = adapter.new_query(&Queryable::new("Note", "notes", AdapterId::Sqlite));
		let dispatch = adapter.apply_operator(query, &field, operator, &operand, &ApplyOptions::default());
		assert!(dispatch.is_applied());
		let rendered = dispatch.into_query().render();
		(
			rendered
				.text
				.trim_start_matches(r#"SELECT "notes".* FROM "notes" WHERE "#)
				.to_string(),
			rendered.params,
		)
	}

	#[rstest]
	fn test_like_is_case_sensitive_glob() {
		let field = FieldDescriptor::scalar("title", SemanticType::String);
		let (sql, params) = render(field, OperatorTag::Like, Operand::Pattern("A%".into()));
		assert_eq!(sql, r#""notes"."title" GLOB ?"#);
		assert_eq!(params, vec![Value::from("A*")]);
	}

	#[rstest]
	fn test_ends_with_escapes_glob() {
		let field = FieldDescriptor::scalar("title", SemanticType::String);
		let (_, params) = render(field, OperatorTag::EndsWith, Operand::Pattern("?!".into()));
		assert_eq!(params, vec![Value::from("*[?]!")]);
	}

	#[rstest]
	fn test_iregex_prefixes_flag() {
		let field = FieldDescriptor::scalar("title", SemanticType::String);
		let (sql, params) = render(field, OperatorTag::Iregex, Operand::Pattern("^a".into()));
		assert_eq!(sql, r#""notes"."title" REGEXP ?"#);
		assert_eq!(params, vec![Value::from("(?i)^a")]);
	}

	#[rstest]
	fn test_has_keys_any_is_disjunction() {
		let field = FieldDescriptor::scalar("meta", SemanticType::Json);
		let (sql, _) = render(
			field,
			OperatorTag::HasKeysAny,
			Operand::Keys(vec!["a".into(), "b".into()]),
		);
		assert_eq!(
			sql,
			r#"json_type("notes"."meta", ?) IS NOT NULL OR json_type("notes"."meta", ?) IS NOT NULL"#
		);
	}

	#[rstest]
	fn test_unsupported_types_are_hidden() {
		let adapter = SqliteAdapter::new();
		assert_eq!(
			adapter.operators_for_type(SemanticType::Coordinates),
			vec![OperatorTag::IsNull]
		);
		assert!(!adapter.implements(SemanticType::String, OperatorTag::Search));
		assert!(adapter.implements(SemanticType::Array(ElementType::Integer), OperatorTag::Overlaps));
	}
}
