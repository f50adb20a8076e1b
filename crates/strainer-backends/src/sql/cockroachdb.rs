//! CockroachDB dialect
//!
//! CockroachDB speaks the PostgreSQL wire protocol and SQL syntax, so the
//! rendering is the PostgreSQL one under its own adapter identity.

use super::SqlDialect;
use super::postgres::quote_double;
use strainer_core::types::AdapterId;

#[derive(Debug, Clone, Default)]
pub struct CockroachDbDialect;

impl CockroachDbDialect {
	pub fn new() -> Self {
		Self
	}
}

impl SqlDialect for CockroachDbDialect {
	fn adapter(&self) -> AdapterId {
		AdapterId::CockroachDb
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
	use crate::sql::{BinOp, Expr, SelectQuery, build_select};
	use rstest::rstest;

	#[rstest]
	fn test_renders_like_postgres() {
		let mut query = SelectQuery::new("accounts");
		query.and_where(Expr::binary(
			Expr::column(Some("accounts"), "id"),
			BinOp::Eq,
			Expr::value(7),
		));
		let (sql, _) = build_select(&CockroachDbDialect::new(), &query);
		assert_eq!(
			sql,
			r#"SELECT "accounts".* FROM "accounts" WHERE "accounts"."id" = $1"#
		);
	}
}
