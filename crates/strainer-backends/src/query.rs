//! Compiled queries
//!
//! [`CompiledQuery`] is the backend-native value the compiler mutates: a SQL
//! SELECT rendered through a dialect, or a search request body. Predicates
//! are built per leaf by adapters and combined here, so combinator logic is
//! written once per query kind instead of once per adapter.

use crate::search::{SearchClause, SearchRequest};
use crate::sql::{
	BinOp, Expr, Join, JoinKind, OrderExpr, SelectQuery, SqlDialect, build_select, dialect_for,
};
use serde_json::{Map, Value as Json, json};
use std::fmt;
use strainer_core::order::{Direction, NullsOrder};
use strainer_core::queryable::Queryable;
use strainer_core::settings::ToManyMode;
use strainer_core::types::{AdapterId, AssociationLink, FieldPath};
use strainer_core::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
	Sql,
	Search,
}

/// One compiled filter predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
	Sql(Expr),
	Search(SearchClause),
}

impl Predicate {
	pub fn kind(&self) -> PredicateKind {
		match self {
			Predicate::Sql(_) => PredicateKind::Sql,
			Predicate::Search(_) => PredicateKind::Search,
		}
	}

	pub fn constant(kind: PredicateKind, value: bool) -> Self {
		match kind {
			PredicateKind::Sql => Predicate::Sql(Expr::Constant(value)),
			PredicateKind::Search => Predicate::Search(SearchClause::Constant(value)),
		}
	}

	pub fn is_constant(&self, value: bool) -> bool {
		matches!(self, Predicate::Sql(Expr::Constant(b)) | Predicate::Search(SearchClause::Constant(b)) if *b == value)
	}

	fn into_sql(self) -> Option<Expr> {
		match self {
			Predicate::Sql(expr) => Some(expr),
			Predicate::Search(_) => None,
		}
	}

	fn into_search(self) -> Option<SearchClause> {
		match self {
			Predicate::Search(clause) => Some(clause),
			Predicate::Sql(_) => None,
		}
	}

	/// Conjunction of predicates of one kind
	pub fn all(kind: PredicateKind, children: Vec<Predicate>) -> Self {
		match kind {
			PredicateKind::Sql => Predicate::Sql(Expr::all(
				children.into_iter().filter_map(Predicate::into_sql).collect(),
			)),
			PredicateKind::Search => Predicate::Search(SearchClause::all(
				children.into_iter().filter_map(Predicate::into_search).collect(),
			)),
		}
	}

	pub fn any(kind: PredicateKind, children: Vec<Predicate>) -> Self {
		match kind {
			PredicateKind::Sql => Predicate::Sql(Expr::any(
				children.into_iter().filter_map(Predicate::into_sql).collect(),
			)),
			PredicateKind::Search => Predicate::Search(SearchClause::any(
				children.into_iter().filter_map(Predicate::into_search).collect(),
			)),
		}
	}

	/// Negation of the compiled predicate; `p.negate().negate() == p`
	pub fn negate(self) -> Self {
		match self {
			Predicate::Sql(expr) => Predicate::Sql(expr.negate()),
			Predicate::Search(clause) => Predicate::Search(clause.negate()),
		}
	}

	pub fn leaf_count(&self) -> usize {
		match self {
			Predicate::Sql(expr) => expr.predicate_count(),
			Predicate::Search(clause) => clause.leaf_count(),
		}
	}
}

/// Rendered form of a compiled query: text plus bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedQuery {
	pub text: String,
	pub params: Vec<Value>,
}

/// Backend-native query under construction
#[derive(Clone)]
pub enum CompiledQuery {
	Sql {
		dialect: &'static dyn SqlDialect,
		select: SelectQuery,
	},
	Search(SearchRequest),
}

impl fmt::Debug for CompiledQuery {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			CompiledQuery::Sql { dialect, select } => f
				.debug_struct("Sql")
				.field("adapter", &dialect.adapter())
				.field("select", select)
				.finish(),
			CompiledQuery::Search(request) => f.debug_tuple("Search").field(request).finish(),
		}
	}
}

impl PartialEq for CompiledQuery {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(
				CompiledQuery::Sql { dialect, select },
				CompiledQuery::Sql {
					dialect: other_dialect,
					select: other_select,
				},
			) => dialect.adapter() == other_dialect.adapter() && select == other_select,
			(CompiledQuery::Search(a), CompiledQuery::Search(b)) => a == b,
			_ => false,
		}
	}
}

impl CompiledQuery {
	/// Base query selecting every row of `queryable`
	pub fn for_queryable(queryable: &Queryable) -> Self {
		match dialect_for(queryable.adapter) {
			Some(dialect) => CompiledQuery::Sql {
				dialect,
				select: SelectQuery::new(queryable.source.clone()),
			},
			None => CompiledQuery::Search(SearchRequest::new(queryable.source.clone())),
		}
	}

	pub fn adapter(&self) -> AdapterId {
		match self {
			CompiledQuery::Sql { dialect, .. } => dialect.adapter(),
			CompiledQuery::Search(_) => AdapterId::Search,
		}
	}

	pub fn kind(&self) -> PredicateKind {
		match self {
			CompiledQuery::Sql { .. } => PredicateKind::Sql,
			CompiledQuery::Search(_) => PredicateKind::Search,
		}
	}

	pub fn as_select(&self) -> Option<&SelectQuery> {
		match self {
			CompiledQuery::Sql { select, .. } => Some(select),
			CompiledQuery::Search(_) => None,
		}
	}

	pub fn as_search(&self) -> Option<&SearchRequest> {
		match self {
			CompiledQuery::Search(request) => Some(request),
			CompiledQuery::Sql { .. } => None,
		}
	}

	/// Binding under which root fields are addressed: the table alias for
	/// SQL, the empty path prefix for search documents
	pub fn root_binding(&self) -> String {
		match self {
			CompiledQuery::Sql { select, .. } => select.alias.clone(),
			CompiledQuery::Search(_) => String::new(),
		}
	}

	/// Binding for the queryable reached through `path`.
	///
	/// SQL join aliases join the path segments with `__`, so the same path
	/// always maps to the same join.
	pub fn binding_for(&self, path: &FieldPath) -> String {
		match self {
			CompiledQuery::Sql { .. } => path.segments().join("__"),
			CompiledQuery::Search(_) => path.dotted(),
		}
	}

	/// AND a predicate into the query.
	///
	/// Returns `false`, leaving the query untouched, when the predicate was
	/// built for another kind of query.
	pub fn and_predicate(&mut self, predicate: Predicate) -> bool {
		match (self, predicate) {
			(CompiledQuery::Sql { select, .. }, Predicate::Sql(expr)) => {
				select.and_where(expr);
				true
			}
			(CompiledQuery::Search(request), Predicate::Search(clause)) => {
				request.and_filter(clause);
				true
			}
			_ => false,
		}
	}

	/// Make the target of a to-one association addressable at `binding`
	pub fn bind_to_one(
		&mut self,
		parent: &str,
		binding: &str,
		link: &AssociationLink,
		related: &Queryable,
	) {
		match self {
			CompiledQuery::Sql { select, .. } => {
				let added = select.join(Join {
					kind: JoinKind::Left,
					table: related.source.clone(),
					alias: binding.to_string(),
					on: correlation(parent, binding, link),
				});
				if added {
					tracing::debug!(alias = binding, table = %related.source, "joined to-one association");
				}
			}
			// Object fields are addressed by their dotted path
			CompiledQuery::Search(_) => {}
		}
	}

	/// Fresh scope for predicates over the rows of a to-many association
	pub fn open_scope(&self, related: &Queryable, binding: &str) -> CompiledQuery {
		match self {
			CompiledQuery::Sql { dialect, .. } => CompiledQuery::Sql {
				dialect: *dialect,
				select: SelectQuery::new(related.source.clone())
					.alias(binding)
					.column(Expr::template("1", vec![])),
			},
			CompiledQuery::Search(_) => CompiledQuery::Search(SearchRequest::new(binding)),
		}
	}

	/// Close a to-many scope into a predicate on the parent.
	///
	/// `Exists` matches parents with at least one related row satisfying
	/// `predicate`; `AllMatch` matches parents none of whose related rows
	/// violate it, a related row whose predicate is unknown counting as a
	/// violation.
	pub fn close_scope(
		scope: CompiledQuery,
		parent: &str,
		binding: &str,
		link: &AssociationLink,
		predicate: Predicate,
		mode: ToManyMode,
	) -> Option<Predicate> {
		let negated = mode == ToManyMode::AllMatch;
		match (scope, predicate) {
			(CompiledQuery::Sql { mut select, .. }, Predicate::Sql(expr)) => {
				select.and_where(correlation(parent, binding, link));
				select.and_where(if negated { Expr::violation(expr) } else { expr });
				Some(Predicate::Sql(Expr::exists(select, negated)))
			}
			(CompiledQuery::Search(_), Predicate::Search(clause)) => {
				let clause = if negated { clause.negate() } else { clause };
				let nested = SearchClause::nested(binding, clause);
				Some(Predicate::Search(if negated { nested.negate() } else { nested }))
			}
			_ => None,
		}
	}

	/// Order by a field addressed at `binding`
	pub fn push_order(
		&mut self,
		binding: &str,
		column: &str,
		direction: Direction,
		nulls: NullsOrder,
	) {
		match self {
			CompiledQuery::Sql { select, .. } => select.order_by(OrderExpr {
				expr: Expr::column(Some(binding).filter(|b| !b.is_empty()), column),
				direction,
				nulls,
			}),
			CompiledQuery::Search(request) => {
				let field = search_field(binding, column);
				request.sort.push(sort_entry(&field, direction, nulls, None));
			}
		}
	}

	/// Order by a field of a to-many association without duplicating parent
	/// rows: the minimum for ascending order, the maximum for descending.
	#[allow(clippy::too_many_arguments)]
	pub fn push_aggregate_order(
		&mut self,
		parent: &str,
		binding: &str,
		link: &AssociationLink,
		related: &Queryable,
		column: &str,
		direction: Direction,
		nulls: NullsOrder,
	) {
		let aggregate = match direction {
			Direction::Asc => "MIN",
			Direction::Desc => "MAX",
		};
		match self {
			CompiledQuery::Sql { select, .. } => {
				let mut sub = SelectQuery::new(related.source.clone())
					.alias(binding)
					.column(Expr::func(
						aggregate,
						vec![Expr::column(Some(binding), column)],
					));
				sub.and_where(correlation(parent, binding, link));
				select.order_by(OrderExpr {
					expr: Expr::Subquery(Box::new(sub)),
					direction,
					nulls,
				});
			}
			CompiledQuery::Search(request) => {
				let field = search_field(binding, column);
				let mode = aggregate.to_ascii_lowercase();
				request
					.sort
					.push(sort_entry(&field, direction, nulls, Some((binding, &mode))));
			}
		}
	}

	pub fn limit(&self) -> Option<u64> {
		match self {
			CompiledQuery::Sql { select, .. } => select.limit,
			CompiledQuery::Search(request) => request.size,
		}
	}

	pub fn offset(&self) -> Option<u64> {
		match self {
			CompiledQuery::Sql { select, .. } => select.offset,
			CompiledQuery::Search(request) => request.from,
		}
	}

	pub fn set_limit(&mut self, limit: Option<u64>) {
		match self {
			CompiledQuery::Sql { select, .. } => select.limit = limit,
			CompiledQuery::Search(request) => request.size = limit,
		}
	}

	pub fn set_offset(&mut self, offset: Option<u64>) {
		match self {
			CompiledQuery::Sql { select, .. } => select.offset = offset,
			CompiledQuery::Search(request) => request.from = offset,
		}
	}

	pub fn has_order(&self) -> bool {
		match self {
			CompiledQuery::Sql { select, .. } => !select.orders.is_empty(),
			CompiledQuery::Search(request) => !request.sort.is_empty(),
		}
	}

	pub fn predicate_count(&self) -> usize {
		match self {
			CompiledQuery::Sql { select, .. } => select.predicate_count(),
			CompiledQuery::Search(request) => request.leaf_count(),
		}
	}

	/// Joins plus correlated subqueries (nested queries for search)
	pub fn join_count(&self) -> usize {
		match self {
			CompiledQuery::Sql { select, .. } => select.join_count(),
			CompiledQuery::Search(request) => request.nested_count(),
		}
	}

	pub fn render(&self) -> RenderedQuery {
		match self {
			CompiledQuery::Sql { dialect, select } => {
				let (text, params) = build_select(*dialect, select);
				RenderedQuery { text, params }
			}
			CompiledQuery::Search(request) => RenderedQuery {
				text: format!("{} {}", request.index, request.body()),
				params: Vec::new(),
			},
		}
	}
}

/// `binding.related_key = parent.owner_key`
fn correlation(parent: &str, binding: &str, link: &AssociationLink) -> Expr {
	Expr::binary(
		Expr::column(Some(binding), link.related_key.clone()),
		BinOp::Eq,
		Expr::column(Some(parent), link.owner_key.clone()),
	)
}

pub(crate) fn search_field(binding: &str, column: &str) -> String {
	if binding.is_empty() {
		column.to_string()
	} else {
		format!("{}.{}", binding, column)
	}
}

fn sort_entry(
	field: &str,
	direction: Direction,
	nulls: NullsOrder,
	nested: Option<(&str, &str)>,
) -> Json {
	let mut spec = Map::new();
	spec.insert(
		"order".into(),
		json!(match direction {
			Direction::Asc => "asc",
			Direction::Desc => "desc",
		}),
	);
	match nulls {
		NullsOrder::First => {
			spec.insert("missing".into(), json!("_first"));
		}
		NullsOrder::Last => {
			spec.insert("missing".into(), json!("_last"));
		}
		NullsOrder::Default => {}
	}
	if let Some((path, mode)) = nested {
		spec.insert("mode".into(), json!(mode));
		spec.insert("nested".into(), json!({ "path": path }));
	}
	let mut entry = Map::new();
	entry.insert(field.to_string(), Json::Object(spec));
	Json::Object(entry)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use strainer_core::types::Cardinality;

	fn users() -> Queryable {
		Queryable::new("User", "users", AdapterId::Postgres)
	}

	fn posts_link() -> AssociationLink {
		AssociationLink {
			target: "Post".into(),
			cardinality: Cardinality::Many,
			owner_key: "id".into(),
			related_key: "author_id".into(),
		}
	}

	#[rstest]
	fn test_and_predicate_rejects_foreign_kind() {
		let mut query = CompiledQuery::for_queryable(&users());
		assert!(!query.and_predicate(Predicate::Search(SearchClause::Constant(false))));
		assert!(query.and_predicate(Predicate::Sql(Expr::Constant(true))));
		assert_eq!(query, CompiledQuery::for_queryable(&users()));
	}

	#[rstest]
	fn test_all_match_scope_renders_not_exists() {
		let query = CompiledQuery::for_queryable(&users());
		let posts = Queryable::new("Post", "posts", AdapterId::Postgres);
		let scope = query.open_scope(&posts, "posts");
		let predicate = Predicate::Sql(Expr::binary(
			Expr::column(Some("posts"), "published"),
			BinOp::Eq,
			Expr::value(true),
		));
		let closed = CompiledQuery::close_scope(
			scope,
			"users",
			"posts",
			&posts_link(),
			predicate,
			ToManyMode::AllMatch,
		)
		.unwrap();

		let mut query = query;
		query.and_predicate(closed);
		assert_eq!(
			query.render().text,
			r#"SELECT "users".* FROM "users" WHERE NOT EXISTS (SELECT 1 FROM "posts" WHERE "posts"."author_id" = "users"."id" AND ("posts"."published" = $1) IS NOT TRUE)"#
		);
	}

	#[rstest]
	fn test_aggregate_order_uses_min_for_ascending() {
		let mut query = CompiledQuery::for_queryable(&users());
		let posts = Queryable::new("Post", "posts", AdapterId::Postgres);
		query.push_aggregate_order(
			"users",
			"posts",
			&posts_link(),
			&posts,
			"created_at",
			Direction::Asc,
			NullsOrder::Default,
		);
		assert_eq!(
			query.render().text,
			r#"SELECT "users".* FROM "users" ORDER BY (SELECT MIN("posts"."created_at") FROM "posts" WHERE "posts"."author_id" = "users"."id") ASC"#
		);
		assert_eq!(query.join_count(), 1);
	}

	#[rstest]
	fn test_search_sort_entries() {
		let index = Queryable::new("User", "users", AdapterId::Search);
		let mut query = CompiledQuery::for_queryable(&index);
		query.push_order("organization", "name", Direction::Desc, NullsOrder::Last);
		query.push_aggregate_order(
			"",
			"posts",
			&posts_link(),
			&index,
			"score",
			Direction::Desc,
			NullsOrder::Default,
		);
		let request = query.as_search().unwrap();
		assert_eq!(
			request.sort,
			vec![
				json!({ "organization.name": { "order": "desc", "missing": "_last" } }),
				json!({ "posts.score": { "order": "desc", "mode": "max", "nested": { "path": "posts" } } }),
			]
		);
		assert_eq!(query.join_count(), 1);
	}
}
