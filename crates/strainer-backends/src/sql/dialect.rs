//! Dialect-independent SELECT rendering
//!
//! Each dialect supplies identifier quoting, placeholder style, NULL
//! ordering support and pagination; everything else is shared.

use super::writer::SqlWriter;
use super::{CockroachDbDialect, MsSqlDialect, MySqlDialect, PostgresDialect, SqliteDialect};
use super::{Expr, JoinKind, OrderExpr, SelectQuery};
use std::fmt::Debug;
use strainer_core::order::NullsOrder;
use strainer_core::types::AdapterId;
use strainer_core::value::Value;

pub trait SqlDialect: Debug + Send + Sync {
	fn adapter(&self) -> AdapterId;

	fn escape_iden(&self, ident: &str) -> String;

	fn placeholder(&self, index: usize) -> String;

	/// Whether `NULLS FIRST` / `NULLS LAST` is understood natively
	fn supports_nulls_ordering(&self) -> bool {
		true
	}

	/// Whether `IS [NOT] TRUE` is understood natively
	fn supports_is_true(&self) -> bool {
		true
	}

	/// Write LIMIT / OFFSET
	fn write_pagination(&self, writer: &mut SqlWriter, query: &SelectQuery) {
		if let Some(limit) = query.limit {
			writer.push_keyword("LIMIT");
			writer.push_space();
			writer.push_value(to_int(limit), |i| self.placeholder(i));
		}
		if let Some(offset) = query.offset {
			writer.push_keyword("OFFSET");
			writer.push_space();
			writer.push_value(to_int(offset), |i| self.placeholder(i));
		}
	}
}

pub(crate) fn to_int(n: u64) -> Value {
	Value::Int(i64::try_from(n).unwrap_or(i64::MAX))
}

static POSTGRES: PostgresDialect = PostgresDialect;
static COCKROACHDB: CockroachDbDialect = CockroachDbDialect;
static MYSQL: MySqlDialect = MySqlDialect;
static SQLITE: SqliteDialect = SqliteDialect;
static MSSQL: MsSqlDialect = MsSqlDialect;

/// Dialect for a SQL adapter, `None` for the search engine
pub fn dialect_for(adapter: AdapterId) -> Option<&'static dyn SqlDialect> {
	match adapter {
		AdapterId::Postgres => Some(&POSTGRES),
		AdapterId::CockroachDb => Some(&COCKROACHDB),
		AdapterId::MySql => Some(&MYSQL),
		AdapterId::Sqlite => Some(&SQLITE),
		AdapterId::MsSql => Some(&MSSQL),
		AdapterId::Search => None,
	}
}

/// Render a SELECT into SQL text plus bound parameters
pub fn build_select(dialect: &dyn SqlDialect, query: &SelectQuery) -> (String, Vec<Value>) {
	let mut writer = SqlWriter::new();
	write_select(dialect, &mut writer, query);
	writer.finish()
}

pub(crate) fn write_select(dialect: &dyn SqlDialect, w: &mut SqlWriter, query: &SelectQuery) {
	w.push("SELECT");
	w.push_space();
	if query.columns.is_empty() {
		w.push_identifier(&query.alias, |s| dialect.escape_iden(s));
		w.push(".*");
	} else {
		w.push_list(&query.columns, ", ", |w, expr| write_expr(dialect, w, expr));
	}

	w.push_keyword("FROM");
	w.push_space();
	w.push_identifier(&query.table, |s| dialect.escape_iden(s));
	if query.alias != query.table {
		w.push_keyword("AS");
		w.push_space();
		w.push_identifier(&query.alias, |s| dialect.escape_iden(s));
	}

	for join in &query.joins {
		w.push_keyword(match join.kind {
			JoinKind::Inner => "INNER JOIN",
			JoinKind::Left => "LEFT JOIN",
		});
		w.push_space();
		w.push_identifier(&join.table, |s| dialect.escape_iden(s));
		w.push_keyword("AS");
		w.push_space();
		w.push_identifier(&join.alias, |s| dialect.escape_iden(s));
		w.push_keyword("ON");
		w.push_space();
		write_expr(dialect, w, &join.on);
	}

	if !query.conditions.is_empty() {
		w.push_keyword("WHERE");
		w.push_space();
		let many = query.conditions.len() > 1;
		w.push_list(&query.conditions, " AND ", |w, expr| {
			write_grouped(dialect, w, expr, many && matches!(expr, Expr::Or(_)));
		});
	}

	if !query.orders.is_empty() {
		w.push_keyword("ORDER BY");
		w.push_space();
		w.push_list(&query.orders, ", ", |w, order| write_order(dialect, w, order));
	}

	dialect.write_pagination(w, query);
}

fn write_order(dialect: &dyn SqlDialect, w: &mut SqlWriter, order: &OrderExpr) {
	let emulate = order.nulls != NullsOrder::Default && !dialect.supports_nulls_ordering();
	if emulate {
		// Leading null-indicator key: 0 sorts first
		let (if_null, otherwise) = match order.nulls {
			NullsOrder::First => ("0", "1"),
			_ => ("1", "0"),
		};
		w.push("CASE WHEN ");
		write_expr(dialect, w, &order.expr);
		w.push(&format!(" IS NULL THEN {} ELSE {} END", if_null, otherwise));
		w.push(", ");
	}

	write_expr(dialect, w, &order.expr);
	w.push_keyword(order.direction.as_sql());

	if !emulate {
		match order.nulls {
			NullsOrder::First => w.push_keyword("NULLS FIRST"),
			NullsOrder::Last => w.push_keyword("NULLS LAST"),
			NullsOrder::Default => {}
		}
	}
}

fn write_grouped(dialect: &dyn SqlDialect, w: &mut SqlWriter, expr: &Expr, group: bool) {
	if group {
		w.push("(");
		write_expr(dialect, w, expr);
		w.push(")");
	} else {
		write_expr(dialect, w, expr);
	}
}

pub(crate) fn write_expr(dialect: &dyn SqlDialect, w: &mut SqlWriter, expr: &Expr) {
	match expr {
		Expr::Column(col) => {
			if let Some(table) = &col.table {
				w.push_identifier(table, |s| dialect.escape_iden(s));
				w.push(".");
			}
			w.push_identifier(&col.column, |s| dialect.escape_iden(s));
		}
		Expr::Value(value) => {
			w.push_value(value.clone(), |i| dialect.placeholder(i));
		}
		Expr::Binary { left, op, right } => {
			write_operand(dialect, w, left);
			w.push_keyword(op.as_str());
			w.push_space();
			write_operand(dialect, w, right);
		}
		Expr::InList {
			expr,
			list,
			negated,
		} => {
			write_operand(dialect, w, expr);
			w.push_keyword(if *negated { "NOT IN" } else { "IN" });
			w.push(" (");
			w.push_list(list, ", ", |w, item| write_expr(dialect, w, item));
			w.push(")");
		}
		Expr::IsNull { expr, negated } => {
			write_operand(dialect, w, expr);
			w.push_keyword(if *negated { "IS NOT NULL" } else { "IS NULL" });
		}
		Expr::And(children) => {
			w.push_list(children, " AND ", |w, child| {
				write_grouped(dialect, w, child, matches!(child, Expr::Or(_)));
			});
		}
		Expr::Or(children) => {
			w.push_list(children, " OR ", |w, child| {
				write_grouped(dialect, w, child, matches!(child, Expr::And(_)));
			});
		}
		Expr::Not(inner) => {
			w.push("NOT (");
			write_expr(dialect, w, inner);
			w.push(")");
		}
		Expr::NotTrue(inner) => {
			if dialect.supports_is_true() {
				w.push("(");
				write_expr(dialect, w, inner);
				w.push(") IS NOT TRUE");
			} else {
				w.push("CASE WHEN ");
				write_expr(dialect, w, inner);
				w.push(" THEN 1 ELSE 0 END = 0");
			}
		}
		Expr::Func { name, args } => {
			w.push(name);
			w.push("(");
			w.push_list(args, ", ", |w, arg| write_expr(dialect, w, arg));
			w.push(")");
		}
		Expr::Template { sql, args } => {
			let mut args = args.iter();
			let mut pieces = sql.split("{}").peekable();
			while let Some(piece) = pieces.next() {
				w.push(piece);
				if pieces.peek().is_some()
					&& let Some(arg) = args.next()
				{
					write_expr(dialect, w, arg);
				}
			}
		}
		Expr::Exists { subquery, negated } => {
			w.push(if *negated { "NOT EXISTS (" } else { "EXISTS (" });
			write_select(dialect, w, subquery);
			w.push(")");
		}
		Expr::Subquery(subquery) => {
			w.push("(");
			write_select(dialect, w, subquery);
			w.push(")");
		}
		Expr::Constant(true) => w.push("1 = 1"),
		Expr::Constant(false) => w.push("1 = 0"),
	}
}

/// Operands of comparisons: boolean connectives need parentheses
fn write_operand(dialect: &dyn SqlDialect, w: &mut SqlWriter, expr: &Expr) {
	let group = matches!(
		expr,
		Expr::And(_) | Expr::Or(_) | Expr::Binary { .. } | Expr::Constant(_)
	);
	write_grouped(dialect, w, expr, group);
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::sql::{BinOp, Join};
	use rstest::rstest;

	fn users() -> SelectQuery {
		SelectQuery::new("users")
	}

	fn col(name: &str) -> Expr {
		Expr::column(Some("users"), name)
	}

	#[rstest]
	fn test_scenario_where_clause_postgres() {
		let mut query = users();
		query.and_where(Expr::all(vec![
			Expr::binary(col("age"), BinOp::Gte, Expr::value(18)),
			Expr::any(vec![
				Expr::binary(col("status"), BinOp::Eq, Expr::value("active")),
				Expr::binary(col("status"), BinOp::Eq, Expr::value("pending")),
			]),
		]));
		let (sql, values) = build_select(&PostgresDialect::new(), &query);
		assert_eq!(
			sql,
			r#"SELECT "users".* FROM "users" WHERE "users"."age" >= $1 AND ("users"."status" = $2 OR "users"."status" = $3)"#
		);
		assert_eq!(
			values,
			vec![Value::Int(18), Value::from("active"), Value::from("pending")]
		);
	}

	#[rstest]
	fn test_and_inside_or_is_grouped() {
		let mut query = users();
		query.and_where(Expr::any(vec![
			Expr::all(vec![
				Expr::is_null(col("a"), false),
				Expr::is_null(col("b"), false),
			]),
			Expr::is_null(col("c"), true),
		]));
		let (sql, _) = build_select(&PostgresDialect::new(), &query);
		assert!(sql.ends_with(
			r#"WHERE ("users"."a" IS NULL AND "users"."b" IS NULL) OR "users"."c" IS NOT NULL"#
		));
	}

	#[rstest]
	fn test_join_and_exists_share_placeholder_sequence() {
		let mut query = users();
		query.join(Join {
			kind: JoinKind::Left,
			table: "organizations".into(),
			alias: "organization".into(),
			on: Expr::binary(
				Expr::column(Some("organization"), "id"),
				BinOp::Eq,
				col("organization_id"),
			),
		});
		query.and_where(Expr::binary(
			Expr::column(Some("organization"), "name"),
			BinOp::Eq,
			Expr::value("acme"),
		));
		let mut posts = SelectQuery::new("posts").column(Expr::template("1", vec![]));
		posts.and_where(Expr::binary(
			Expr::column(Some("posts"), "author_id"),
			BinOp::Eq,
			col("id"),
		));
		posts.and_where(Expr::binary(
			Expr::column(Some("posts"), "title"),
			BinOp::Eq,
			Expr::value("x"),
		));
		query.and_where(Expr::exists(posts, false));

		let (sql, values) = build_select(&PostgresDialect::new(), &query);
		assert_eq!(
			sql,
			concat!(
				r#"SELECT "users".* FROM "users" LEFT JOIN "organizations" AS "organization" ON "organization"."id" = "users"."organization_id""#,
				r#" WHERE "organization"."name" = $1 AND EXISTS (SELECT 1 FROM "posts" WHERE "posts"."author_id" = "users"."id" AND "posts"."title" = $2)"#
			)
		);
		assert_eq!(values.len(), 2);
	}

	#[rstest]
	fn test_constants_render_portably() {
		let mut query = users();
		query.and_where(Expr::Constant(false));
		let (sql, values) = build_select(&MySqlDialect::new(), &query);
		assert_eq!(sql, "SELECT `users`.* FROM `users` WHERE 1 = 0");
		assert!(values.is_empty());
	}

	#[rstest]
	fn test_template_rendering() {
		let mut query = users();
		query.and_where(Expr::template(
			"{} @> {}::jsonb",
			vec![col("tags"), Expr::value(Value::Json(serde_json::json!({"a": 1})))],
		));
		let (sql, _) = build_select(&PostgresDialect::new(), &query);
		assert!(sql.ends_with(r#"WHERE "users"."tags" @> $1::jsonb"#));
	}

	#[rstest]
	fn test_dialect_lookup() {
		for adapter in AdapterId::ALL {
			assert_eq!(dialect_for(adapter).map(|d| d.adapter()), adapter.is_sql().then_some(adapter));
		}
	}

	#[rstest]
	#[case::postgres(AdapterId::Postgres, r#"WHERE ("users"."age" > $1) IS NOT TRUE"#)]
	#[case::sqlite(AdapterId::Sqlite, r#"WHERE ("users"."age" > ?) IS NOT TRUE"#)]
	#[case::mssql(AdapterId::MsSql, "WHERE CASE WHEN [users].[age] > @P1 THEN 1 ELSE 0 END = 0")]
	fn test_not_true_treats_unknown_as_violation(#[case] adapter: AdapterId, #[case] tail: &str) {
		let mut query = users();
		query.and_where(Expr::violation(Expr::binary(col("age"), BinOp::Gt, Expr::value(10))));
		let dialect = dialect_for(adapter).unwrap();
		let (sql, _) = build_select(dialect, &query);
		assert!(sql.ends_with(tail), "{}", sql);
	}

	#[rstest]
	fn test_not_wraps_inner() {
		let mut query = users();
		query.and_where(
			Expr::binary(col("name"), BinOp::Custom("~"), Expr::value("^a")).negate(),
		);
		let (sql, _) = build_select(&PostgresDialect::new(), &query);
		assert!(sql.ends_with(r#"WHERE NOT ("users"."name" ~ $1)"#));
	}
}
