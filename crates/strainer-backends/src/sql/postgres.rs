//! PostgreSQL dialect
//!
//! - Identifiers: double quotes (`"table_name"`)
//! - Placeholders: numbered (`$1`, `$2`, ...)
//! - Native `NULLS FIRST` / `NULLS LAST`

use super::SqlDialect;
use strainer_core::types::AdapterId;

#[derive(Debug, Clone, Default)]
pub struct PostgresDialect;

impl PostgresDialect {
	pub fn new() -> Self {
		Self
	}
}

/// Double-quote an identifier, doubling embedded quotes
pub(crate) fn quote_double(ident: &str) -> String {
	format!("\"{}\"", ident.replace('"', "\"\""))
}

impl SqlDialect for PostgresDialect {
	fn adapter(&self) -> AdapterId {
		AdapterId::Postgres
	}

	fn escape_iden(&self, ident: &str) -> String {
		quote_double(ident)
	}

	fn placeholder(&self, index: usize) -> String {
		format!("${}", index)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::{OrderExpr, SelectQuery, build_select};
	use crate::sql::Expr;
	use rstest::rstest;
	use strainer_core::order::{Direction, NullsOrder};

	#[rstest]
	fn test_escape_identifier_with_quotes() {
		assert_eq!(PostgresDialect::new().escape_iden("us\"er"), "\"us\"\"er\"");
	}

	#[rstest]
	fn test_native_nulls_ordering_and_pagination() {
		let mut query = SelectQuery::new("users").limit(10).offset(20);
		query.order_by(OrderExpr {
			expr: Expr::column(Some("users"), "age"),
			direction: Direction::Desc,
			nulls: NullsOrder::Last,
		});
		let (sql, values) = build_select(&PostgresDialect::new(), &query);
		assert_eq!(
			sql,
			r#"SELECT "users".* FROM "users" ORDER BY "users"."age" DESC NULLS LAST LIMIT $1 OFFSET $2"#
		);
		assert_eq!(values.len(), 2);
	}
}
