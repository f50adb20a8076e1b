//! SQLite dialect
//!
//! Double-quoted identifiers and `?` placeholders. NULL placement is
//! emulated so that pre-3.30 libraries work too.

use super::SelectQuery;
use super::SqlDialect;
use super::dialect::to_int;
use super::postgres::quote_double;
use super::writer::SqlWriter;
use strainer_core::types::AdapterId;

#[derive(Debug, Clone, Default)]
pub struct SqliteDialect;

impl SqliteDialect {
	pub fn new() -> Self {
		Self
	}
}

impl SqlDialect for SqliteDialect {
	fn adapter(&self) -> AdapterId {
		AdapterId::Sqlite
	}

	fn escape_iden(&self, ident: &str) -> String {
		quote_double(ident)
	}

	fn placeholder(&self, _index: usize) -> String {
		"?".to_string()
	}

	fn supports_nulls_ordering(&self) -> bool {
		false
	}

	fn write_pagination(&self, writer: &mut SqlWriter, query: &SelectQuery) {
		if query.limit.is_none() && query.offset.is_none() {
			return;
		}
		writer.push_keyword("LIMIT");
		writer.push_space();
		match query.limit {
			Some(limit) => {
				writer.push_value(to_int(limit), |i| self.placeholder(i));
			}
			None => writer.push("-1"),
		}
		if let Some(offset) = query.offset {
			writer.push_keyword("OFFSET");
			writer.push_space();
			writer.push_value(to_int(offset), |i| self.placeholder(i));
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::{Expr, OrderExpr, build_select};
	use rstest::rstest;
	use strainer_core::order::{Direction, NullsOrder};

	#[rstest]
	fn test_pagination_variants() {
		let dialect = SqliteDialect::new();
		let (sql, _) = build_select(&dialect, &SelectQuery::new("t").offset(3));
		assert_eq!(sql, r#"SELECT "t".* FROM "t" LIMIT -1 OFFSET ?"#);
		let (sql, _) = build_select(&dialect, &SelectQuery::new("t").limit(3));
		assert_eq!(sql, r#"SELECT "t".* FROM "t" LIMIT ?"#);
	}

	#[rstest]
	fn test_nulls_last_is_emulated() {
		let mut query = SelectQuery::new("t");
		query.order_by(OrderExpr {
			expr: Expr::column(Some("t"), "x"),
			direction: Direction::Desc,
			nulls: NullsOrder::Last,
		});
		let (sql, _) = build_select(&SqliteDialect::new(), &query);
		assert!(sql.ends_with(r#"ORDER BY CASE WHEN "t"."x" IS NULL THEN 1 ELSE 0 END, "t"."x" DESC"#));
	}
}
