//! Search-engine request bodies
//!
//! The search adapter compiles filters into an Elasticsearch/OpenSearch
//! compatible query DSL. [`SearchClause`] mirrors [`crate::sql::Expr`]: the
//! same simplification rules apply, and negation is an involution.

use serde_json::{Map, Value as Json, json};

#[derive(Debug, Clone, PartialEq)]
pub enum SearchClause {
	/// `match_all` / `match_none`
	Constant(bool),
	/// A leaf query (`term`, `range`, `exists`, ...)
	Query(Json),
	And(Vec<SearchClause>),
	Or(Vec<SearchClause>),
	Not(Box<SearchClause>),
	/// Query over a `nested` field
	Nested {
		path: String,
		clause: Box<SearchClause>,
	},
}

impl SearchClause {
	/// Single-key leaf query: `{kind: body}`
	pub fn leaf(kind: &str, body: Json) -> Self {
		let mut object = Map::new();
		object.insert(kind.to_string(), body);
		SearchClause::Query(Json::Object(object))
	}

	/// `{kind: {field: body}}`
	pub fn field_query(kind: &str, field: &str, body: Json) -> Self {
		let mut inner = Map::new();
		inner.insert(field.to_string(), body);
		Self::leaf(kind, Json::Object(inner))
	}

	pub fn exists(field: &str) -> Self {
		Self::leaf("exists", json!({ "field": field }))
	}

	pub fn nested(path: impl Into<String>, clause: SearchClause) -> Self {
		SearchClause::Nested {
			path: path.into(),
			clause: Box::new(clause),
		}
	}

	pub fn all(children: Vec<SearchClause>) -> Self {
		let mut kept = Vec::with_capacity(children.len());
		for child in children {
			match child {
				SearchClause::Constant(true) => {}
				SearchClause::Constant(false) => return SearchClause::Constant(false),
				SearchClause::And(inner) => kept.extend(inner),
				other => kept.push(other),
			}
		}
		match kept.len() {
			0 => SearchClause::Constant(true),
			1 => kept.remove(0),
			_ => SearchClause::And(kept),
		}
	}

	/// An empty disjunction places no constraint
	pub fn any(children: Vec<SearchClause>) -> Self {
		if children.is_empty() {
			return SearchClause::Constant(true);
		}
		let mut kept = Vec::with_capacity(children.len());
		for child in children {
			match child {
				SearchClause::Constant(false) => {}
				SearchClause::Constant(true) => return SearchClause::Constant(true),
				SearchClause::Or(inner) => kept.extend(inner),
				other => kept.push(other),
			}
		}
		match kept.len() {
			0 => SearchClause::Constant(false),
			1 => kept.remove(0),
			_ => SearchClause::Or(kept),
		}
	}

	pub fn negate(self) -> Self {
		match self {
			SearchClause::Not(inner) => *inner,
			SearchClause::Constant(b) => SearchClause::Constant(!b),
			other => SearchClause::Not(Box::new(other)),
		}
	}

	pub fn leaf_count(&self) -> usize {
		match self {
			SearchClause::Constant(_) => 0,
			SearchClause::Query(_) => 1,
			SearchClause::And(children) | SearchClause::Or(children) => {
				children.iter().map(SearchClause::leaf_count).sum()
			}
			SearchClause::Not(inner) => inner.leaf_count(),
			SearchClause::Nested { clause, .. } => clause.leaf_count(),
		}
	}

	pub fn nested_count(&self) -> usize {
		match self {
			SearchClause::And(children) | SearchClause::Or(children) => {
				children.iter().map(SearchClause::nested_count).sum()
			}
			SearchClause::Not(inner) => inner.nested_count(),
			SearchClause::Nested { clause, .. } => 1 + clause.nested_count(),
			_ => 0,
		}
	}

	/// Render into query DSL
	pub fn to_json(&self) -> Json {
		match self {
			SearchClause::Constant(true) => json!({ "match_all": {} }),
			SearchClause::Constant(false) => json!({ "match_none": {} }),
			SearchClause::Query(query) => query.clone(),
			SearchClause::And(children) => json!({
				"bool": { "filter": children.iter().map(SearchClause::to_json).collect::<Vec<_>>() }
			}),
			SearchClause::Or(children) => json!({
				"bool": {
					"should": children.iter().map(SearchClause::to_json).collect::<Vec<_>>(),
					"minimum_should_match": 1
				}
			}),
			SearchClause::Not(inner) => json!({
				"bool": { "must_not": [inner.to_json()] }
			}),
			SearchClause::Nested { path, clause } => json!({
				"nested": { "path": path, "query": clause.to_json() }
			}),
		}
	}
}

/// A search request against one index
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
	pub index: String,
	/// AND-ed filter clauses
	pub filters: Vec<SearchClause>,
	pub sort: Vec<Json>,
	pub from: Option<u64>,
	pub size: Option<u64>,
}

impl SearchRequest {
	pub fn new(index: impl Into<String>) -> Self {
		Self {
			index: index.into(),
			filters: Vec::new(),
			sort: Vec::new(),
			from: None,
			size: None,
		}
	}

	pub fn limit(mut self, size: u64) -> Self {
		self.size = Some(size);
		self
	}

	pub fn offset(mut self, from: u64) -> Self {
		self.from = Some(from);
		self
	}

	/// AND a clause into the request. `match_all` leaves it untouched.
	pub fn and_filter(&mut self, clause: SearchClause) {
		match clause {
			SearchClause::Constant(true) => {}
			SearchClause::And(children) => {
				for child in children {
					self.and_filter(child);
				}
			}
			other => self.filters.push(other),
		}
	}

	pub fn filter_clause(&self) -> SearchClause {
		SearchClause::all(self.filters.clone())
	}

	pub fn leaf_count(&self) -> usize {
		self.filters.iter().map(SearchClause::leaf_count).sum()
	}

	pub fn nested_count(&self) -> usize {
		let in_sort = self
			.sort
			.iter()
			.filter(|s| {
				s.as_object()
					.and_then(|o| o.values().next())
					.is_some_and(|spec| spec.get("nested").is_some())
			})
			.count();
		self.filters.iter().map(SearchClause::nested_count).sum::<usize>() + in_sort
	}

	/// The `_search` request body
	pub fn body(&self) -> Json {
		let mut body = Map::new();
		body.insert("query".into(), self.filter_clause().to_json());
		if !self.sort.is_empty() {
			body.insert("sort".into(), Json::Array(self.sort.clone()));
		}
		if let Some(from) = self.from {
			body.insert("from".into(), json!(from));
		}
		if let Some(size) = self.size {
			body.insert("size".into(), json!(size));
		}
		Json::Object(body)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	fn term(field: &str, value: &str) -> SearchClause {
		SearchClause::field_query("term", field, json!(value))
	}

	#[rstest]
	fn test_body_for_and_or() {
		let mut request = SearchRequest::new("users").limit(10);
		request.and_filter(SearchClause::all(vec![
			SearchClause::field_query("range", "age", json!({ "gte": 18 })),
			SearchClause::any(vec![term("status", "active"), term("status", "pending")]),
		]));
		assert_eq!(
			request.body(),
			json!({
				"query": { "bool": { "filter": [
					{ "range": { "age": { "gte": 18 } } },
					{ "bool": {
						"should": [
							{ "term": { "status": "active" } },
							{ "term": { "status": "pending" } }
						],
						"minimum_should_match": 1
					} }
				] } },
				"size": 10
			})
		);
	}

	#[rstest]
	fn test_empty_request_matches_all() {
		assert_eq!(
			SearchRequest::new("users").body(),
			json!({ "query": { "match_all": {} } })
		);
	}

	#[rstest]
	fn test_double_negation() {
		let clause = term("status", "active");
		assert_eq!(clause.clone().negate().negate(), clause);
		assert_eq!(
			SearchClause::Constant(false).negate(),
			SearchClause::Constant(true)
		);
	}

	#[rstest]
	fn test_nested_counts() {
		let clause = SearchClause::nested("posts", term("posts.title", "x"));
		assert_eq!(clause.leaf_count(), 1);
		assert_eq!(clause.nested_count(), 1);
		assert_eq!(
			clause.to_json(),
			json!({ "nested": { "path": "posts", "query": { "term": { "posts.title": "x" } } } })
		);
	}
}
