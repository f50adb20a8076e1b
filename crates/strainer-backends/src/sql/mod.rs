//! SQL query representation
//!
//! A [`SelectQuery`] is the compiled form of a filter against a relational
//! backend. Operators add [`Expr`] predicates to it, the order compiler adds
//! [`OrderExpr`]s, and a [`dialect::SqlDialect`] renders it.

pub mod cockroachdb;
pub mod dialect;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod sqlite;
pub mod writer;

pub use cockroachdb::CockroachDbDialect;
pub use dialect::{SqlDialect, build_select, dialect_for};
pub use mssql::MsSqlDialect;
pub use mysql::MySqlDialect;
pub use postgres::PostgresDialect;
pub use sqlite::SqliteDialect;
pub use writer::SqlWriter;

use strainer_core::order::{Direction, NullsOrder};
use strainer_core::value::Value;

/// A column, optionally qualified by a table alias
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnRef {
	pub table: Option<String>,
	pub column: String,
}

impl ColumnRef {
	pub fn new(table: Option<&str>, column: impl Into<String>) -> Self {
		Self {
			table: table.map(str::to_string),
			column: column.into(),
		}
	}
}

/// Binary comparison operators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinOp {
	Eq,
	Ne,
	Gt,
	Gte,
	Lt,
	Lte,
	Like,
	NotLike,
	ILike,
	NotILike,
	/// Dialect-specific infix operator (`@>`, `~*`, `SIMILAR TO`, ...)
	Custom(&'static str),
}

impl BinOp {
	pub fn as_str(&self) -> &'static str {
		match self {
			BinOp::Eq => "=",
			BinOp::Ne => "<>",
			BinOp::Gt => ">",
			BinOp::Gte => ">=",
			BinOp::Lt => "<",
			BinOp::Lte => "<=",
			BinOp::Like => "LIKE",
			BinOp::NotLike => "NOT LIKE",
			BinOp::ILike => "ILIKE",
			BinOp::NotILike => "NOT ILIKE",
			BinOp::Custom(op) => op,
		}
	}

	/// Exact logical complement, where one exists
	fn complement(&self) -> Option<BinOp> {
		match self {
			BinOp::Eq => Some(BinOp::Ne),
			BinOp::Ne => Some(BinOp::Eq),
			BinOp::Like => Some(BinOp::NotLike),
			BinOp::NotLike => Some(BinOp::Like),
			BinOp::ILike => Some(BinOp::NotILike),
			BinOp::NotILike => Some(BinOp::ILike),
			_ => None,
		}
	}
}

/// SQL expression tree
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
	Column(ColumnRef),
	/// Bound parameter
	Value(Value),
	Binary {
		left: Box<Expr>,
		op: BinOp,
		right: Box<Expr>,
	},
	InList {
		expr: Box<Expr>,
		list: Vec<Expr>,
		negated: bool,
	},
	IsNull {
		expr: Box<Expr>,
		negated: bool,
	},
	And(Vec<Expr>),
	Or(Vec<Expr>),
	Not(Box<Expr>),
	/// True when the inner predicate is false or unknown (`IS NOT TRUE`)
	NotTrue(Box<Expr>),
	Func {
		name: String,
		args: Vec<Expr>,
	},
	/// Free-form SQL with `{}` markers replaced by the rendered args in order
	Template {
		sql: String,
		args: Vec<Expr>,
	},
	Exists {
		subquery: Box<SelectQuery>,
		negated: bool,
	},
	/// Scalar subquery
	Subquery(Box<SelectQuery>),
	/// Always true / always false, rendered portably as `1 = 1` / `1 = 0`
	Constant(bool),
}

impl Expr {
	pub fn column(table: Option<&str>, column: impl Into<String>) -> Self {
		Expr::Column(ColumnRef::new(table, column))
	}

	pub fn value(value: impl Into<Value>) -> Self {
		Expr::Value(value.into())
	}

	pub fn binary(left: Expr, op: BinOp, right: Expr) -> Self {
		Expr::Binary {
			left: Box::new(left),
			op,
			right: Box::new(right),
		}
	}

	pub fn template(sql: impl Into<String>, args: Vec<Expr>) -> Self {
		Expr::Template {
			sql: sql.into(),
			args,
		}
	}

	pub fn func(name: impl Into<String>, args: Vec<Expr>) -> Self {
		Expr::Func {
			name: name.into(),
			args,
		}
	}

	pub fn is_null(expr: Expr, negated: bool) -> Self {
		Expr::IsNull {
			expr: Box::new(expr),
			negated,
		}
	}

	pub fn in_list(expr: Expr, list: Vec<Expr>, negated: bool) -> Self {
		Expr::InList {
			expr: Box::new(expr),
			list,
			negated,
		}
	}

	pub fn exists(subquery: SelectQuery, negated: bool) -> Self {
		Expr::Exists {
			subquery: Box::new(subquery),
			negated,
		}
	}

	/// Conjunction. Always-true members are dropped, an always-false member
	/// absorbs everything and a single member is returned as is.
	pub fn all(children: Vec<Expr>) -> Self {
		let mut kept = Vec::with_capacity(children.len());
		for child in children {
			match child {
				Expr::Constant(true) => {}
				Expr::Constant(false) => return Expr::Constant(false),
				Expr::And(inner) => kept.extend(inner),
				other => kept.push(other),
			}
		}
		match kept.len() {
			0 => Expr::Constant(true),
			1 => kept.remove(0),
			_ => Expr::And(kept),
		}
	}

	/// Disjunction, the dual of [`Expr::all`]. An empty disjunction is
	/// always true: an empty `_or` places no constraint.
	pub fn any(children: Vec<Expr>) -> Self {
		if children.is_empty() {
			return Expr::Constant(true);
		}
		let mut kept = Vec::with_capacity(children.len());
		for child in children {
			match child {
				Expr::Constant(false) => {}
				Expr::Constant(true) => return Expr::Constant(true),
				Expr::Or(inner) => kept.extend(inner),
				other => kept.push(other),
			}
		}
		match kept.len() {
			0 => Expr::Constant(false),
			1 => kept.remove(0),
			_ => Expr::Or(kept),
		}
	}

	/// Rows for which `predicate` does not hold, NULL comparisons included.
	///
	/// Two-valued predicates are negated directly; everything else is
	/// wrapped in [`Expr::NotTrue`].
	pub fn violation(predicate: Expr) -> Self {
		match predicate {
			Expr::Constant(_) | Expr::IsNull { .. } | Expr::Exists { .. } | Expr::NotTrue(_) => {
				predicate.negate()
			}
			other => Expr::NotTrue(Box::new(other)),
		}
	}

	/// Logical negation of the compiled predicate.
	///
	/// Rewrites only where the result is identical under three-valued logic,
	/// so `negate(negate(e)) == e` for every expression.
	pub fn negate(self) -> Self {
		match self {
			Expr::Not(inner) => *inner,
			Expr::Constant(b) => Expr::Constant(!b),
			Expr::IsNull { expr, negated } => Expr::IsNull {
				expr,
				negated: !negated,
			},
			Expr::InList {
				expr,
				list,
				negated,
			} => Expr::InList {
				expr,
				list,
				negated: !negated,
			},
			Expr::Exists { subquery, negated } => Expr::Exists {
				subquery,
				negated: !negated,
			},
			Expr::Binary { left, op, right } => match op.complement() {
				Some(complement) => Expr::Binary {
					left,
					op: complement,
					right,
				},
				None => Expr::Not(Box::new(Expr::Binary { left, op, right })),
			},
			other => Expr::Not(Box::new(other)),
		}
	}

	/// Number of leaf predicates, including those inside subqueries
	pub fn predicate_count(&self) -> usize {
		match self {
			Expr::And(children) | Expr::Or(children) => {
				children.iter().map(Expr::predicate_count).sum()
			}
			Expr::Not(inner) | Expr::NotTrue(inner) => inner.predicate_count(),
			Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => {
				subquery.predicate_count()
			}
			Expr::Constant(_) | Expr::Column(_) | Expr::Value(_) => 0,
			_ => 1,
		}
	}

	/// Number of correlated subqueries
	pub fn subquery_count(&self) -> usize {
		match self {
			Expr::And(children) | Expr::Or(children) => {
				children.iter().map(Expr::subquery_count).sum()
			}
			Expr::Not(inner) | Expr::NotTrue(inner) => inner.subquery_count(),
			Expr::Exists { subquery, .. } | Expr::Subquery(subquery) => {
				1 + subquery.join_count()
			}
			Expr::Binary { left, right, .. } => left.subquery_count() + right.subquery_count(),
			Expr::Template { args, .. } | Expr::Func { args, .. } => {
				args.iter().map(Expr::subquery_count).sum()
			}
			_ => 0,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
	Inner,
	Left,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Join {
	pub kind: JoinKind,
	pub table: String,
	pub alias: String,
	pub on: Expr,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderExpr {
	pub expr: Expr,
	pub direction: Direction,
	pub nulls: NullsOrder,
}

/// A SELECT over one root table
#[derive(Debug, Clone, PartialEq)]
pub struct SelectQuery {
	pub table: String,
	pub alias: String,
	/// Selected expressions; empty selects `alias.*`
	pub columns: Vec<Expr>,
	pub joins: Vec<Join>,
	/// AND-ed predicates
	pub conditions: Vec<Expr>,
	pub orders: Vec<OrderExpr>,
	pub limit: Option<u64>,
	pub offset: Option<u64>,
}

impl SelectQuery {
	pub fn new(table: impl Into<String>) -> Self {
		let table = table.into();
		Self {
			alias: table.clone(),
			table,
			columns: Vec::new(),
			joins: Vec::new(),
			conditions: Vec::new(),
			orders: Vec::new(),
			limit: None,
			offset: None,
		}
	}

	pub fn alias(mut self, alias: impl Into<String>) -> Self {
		self.alias = alias.into();
		self
	}

	pub fn column(mut self, expr: Expr) -> Self {
		self.columns.push(expr);
		self
	}

	pub fn limit(mut self, limit: u64) -> Self {
		self.limit = Some(limit);
		self
	}

	pub fn offset(mut self, offset: u64) -> Self {
		self.offset = Some(offset);
		self
	}

	/// AND a predicate into the WHERE clause. Always-true predicates leave
	/// the query untouched.
	pub fn and_where(&mut self, expr: Expr) {
		match expr {
			Expr::Constant(true) => {}
			Expr::And(children) => {
				for child in children {
					self.and_where(child);
				}
			}
			other => self.conditions.push(other),
		}
	}

	pub fn has_join(&self, alias: &str) -> bool {
		self.joins.iter().any(|j| j.alias == alias)
	}

	/// Add a join unless one with the same alias exists.
	///
	/// Returns whether the join was added.
	pub fn join(&mut self, join: Join) -> bool {
		if self.has_join(&join.alias) {
			return false;
		}
		self.joins.push(join);
		true
	}

	pub fn order_by(&mut self, order: OrderExpr) {
		self.orders.push(order);
	}

	/// The combined WHERE predicate
	pub fn where_expr(&self) -> Expr {
		Expr::all(self.conditions.clone())
	}

	pub fn predicate_count(&self) -> usize {
		self.conditions.iter().map(Expr::predicate_count).sum()
	}

	/// Explicit joins plus correlated subqueries
	pub fn join_count(&self) -> usize {
		self.joins.len()
			+ self
				.conditions
				.iter()
				.map(Expr::subquery_count)
				.sum::<usize>()
			+ self
				.orders
				.iter()
				.map(|o| o.expr.subquery_count())
				.sum::<usize>()
	}
}
