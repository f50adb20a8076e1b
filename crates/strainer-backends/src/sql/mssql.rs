//! SQL Server dialect
//!
//! - Identifiers: brackets (`[table]`)
//! - Placeholders: `@P1`, `@P2`, ...
//! - Pagination through `OFFSET .. ROWS FETCH NEXT .. ROWS ONLY`, which
//!   needs an ORDER BY
//! - No `NULLS FIRST` / `NULLS LAST`

use super::SelectQuery;
use super::SqlDialect;
use super::dialect::to_int;
use super::writer::SqlWriter;
use strainer_core::types::AdapterId;

#[derive(Debug, Clone, Default)]
pub struct MsSqlDialect;

impl MsSqlDialect {
	pub fn new() -> Self {
		Self
	}
}

impl SqlDialect for MsSqlDialect {
	fn adapter(&self) -> AdapterId {
		AdapterId::MsSql
	}

	fn escape_iden(&self, ident: &str) -> String {
		format!("[{}]", ident.replace(']', "]]"))
	}

	fn placeholder(&self, index: usize) -> String {
		format!("@P{}", index)
	}

	fn supports_nulls_ordering(&self) -> bool {
		false
	}

	fn supports_is_true(&self) -> bool {
		false
	}

	fn write_pagination(&self, writer: &mut SqlWriter, query: &SelectQuery) {
		if query.limit.is_none() && query.offset.is_none() {
			return;
		}
		if query.orders.is_empty() {
			writer.push_keyword("ORDER BY (SELECT NULL)");
		}
		writer.push_keyword("OFFSET");
		writer.push_space();
		writer.push_value(to_int(query.offset.unwrap_or(0)), |i| self.placeholder(i));
		writer.push_keyword("ROWS");
		if let Some(limit) = query.limit {
			writer.push_keyword("FETCH NEXT");
			writer.push_space();
			writer.push_value(to_int(limit), |i| self.placeholder(i));
			writer.push_keyword("ROWS ONLY");
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::{BinOp, Expr, build_select};
	use rstest::rstest;

	#[rstest]
	fn test_brackets_and_numbered_parameters() {
		let mut query = SelectQuery::new("users");
		query.and_where(Expr::binary(
			Expr::column(Some("users"), "name"),
			BinOp::Eq,
			Expr::value("a"),
		));
		let (sql, _) = build_select(&MsSqlDialect::new(), &query.limit(10));
		assert_eq!(
			sql,
			"SELECT [users].* FROM [users] WHERE [users].[name] = @P1 ORDER BY (SELECT NULL) OFFSET @P2 ROWS FETCH NEXT @P3 ROWS ONLY"
		);
	}

	#[rstest]
	fn test_escape_closing_bracket() {
		assert_eq!(MsSqlDialect::new().escape_iden("a]b"), "[a]]b]");
	}
}
