//! Filter AST and payload parsing
//!
//! A client filter payload is a nested JSON object:
//!
//! ```text
//! {
//!   "age": { "_gte": 18 },
//!   "_or": [ { "status": { "_eq": "active" } }, { "status": { "_eq": "pending" } } ],
//!   "organization": { "name": { "_ilike": "%acme%" } }
//! }
//! ```
//!
//! Keys starting with `_` are combinators (`_and`, `_or`, `_not`) or
//! operators; every other key names a field, and nesting a field object
//! inside another walks an association path. Sibling keys form an implicit
//! AND.

use crate::error::{FilterError, FilterResult};
use crate::operators::OperatorTag;
use crate::types::FieldPath;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as Json};

/// Boolean connective
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Combinator {
	And,
	Or,
	Not,
}

/// One `field operator value` test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Leaf {
	pub field: FieldPath,
	pub operator: OperatorTag,
	/// Raw operand; coerced against the field type during compilation
	pub value: Json,
}

/// Recursive filter tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FilterNode {
	Combinator {
		op: Combinator,
		children: Vec<FilterNode>,
	},
	Leaf(Leaf),
}

impl FilterNode {
	pub fn leaf(field: impl Into<FieldPath>, operator: OperatorTag, value: impl Into<Json>) -> Self {
		FilterNode::Leaf(Leaf {
			field: field.into(),
			operator,
			value: value.into(),
		})
	}

	pub fn and(children: Vec<FilterNode>) -> Self {
		FilterNode::Combinator {
			op: Combinator::And,
			children,
		}
	}

	pub fn or(children: Vec<FilterNode>) -> Self {
		FilterNode::Combinator {
			op: Combinator::Or,
			children,
		}
	}

	#[allow(clippy::should_implement_trait)]
	pub fn not(child: FilterNode) -> Self {
		FilterNode::Combinator {
			op: Combinator::Not,
			children: vec![child],
		}
	}

	/// The identity filter, matching every row
	pub fn empty() -> Self {
		FilterNode::and(Vec::new())
	}

	/// Whether the tree places no constraint at all.
	///
	/// `AND`/`OR` over only empty children are the identity. A `NOT` over the
	/// identity matches nothing, so it is not empty.
	pub fn is_empty(&self) -> bool {
		match self {
			FilterNode::Leaf(_) => false,
			FilterNode::Combinator {
				op: Combinator::Not,
				..
			} => false,
			FilterNode::Combinator { children, .. } => children.iter().all(FilterNode::is_empty),
		}
	}

	/// Every leaf, depth first, left to right
	pub fn leaves(&self) -> Vec<&Leaf> {
		let mut out = Vec::new();
		self.collect_leaves(&mut out);
		out
	}

	fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Leaf>) {
		match self {
			FilterNode::Leaf(leaf) => out.push(leaf),
			FilterNode::Combinator { children, .. } => {
				for child in children {
					child.collect_leaves(out);
				}
			}
		}
	}

	/// Distinct field paths referenced by the tree, in first-seen order
	pub fn referenced_paths(&self) -> Vec<FieldPath> {
		let mut paths: Vec<FieldPath> = Vec::new();
		for leaf in self.leaves() {
			if !paths.contains(&leaf.field) {
				paths.push(leaf.field.clone());
			}
		}
		paths
	}

	pub fn depth(&self) -> usize {
		match self {
			FilterNode::Leaf(_) => 1,
			FilterNode::Combinator { children, .. } => {
				1 + children.iter().map(FilterNode::depth).max().unwrap_or(0)
			}
		}
	}

	/// Check structural invariants of a hand-built tree
	pub fn validate(&self) -> FilterResult<()> {
		match self {
			FilterNode::Leaf(leaf) if leaf.field.is_empty() => Err(FilterError::MalformedFilter(
				format!("operator {} has no field", leaf.operator),
			)),
			FilterNode::Leaf(_) => Ok(()),
			FilterNode::Combinator {
				op: Combinator::Not,
				children,
			} if children.len() != 1 => Err(FilterError::MalformedFilter(format!(
				"_not takes exactly one child, got {}",
				children.len()
			))),
			FilterNode::Combinator { children, .. } => {
				children.iter().try_for_each(FilterNode::validate)
			}
		}
	}

	/// Parse a filter payload. `null` is the empty filter.
	pub fn parse(payload: &Json) -> FilterResult<FilterNode> {
		match payload {
			Json::Null => Ok(FilterNode::empty()),
			Json::Object(map) => parse_object(map, &FieldPath::new(Vec::new())),
			other => Err(FilterError::MalformedFilter(format!(
				"filter must be an object, got {}",
				json_kind(other)
			))),
		}
	}
}

impl Default for FilterNode {
	fn default() -> Self {
		FilterNode::empty()
	}
}

fn parse_object(map: &Map<String, Json>, prefix: &FieldPath) -> FilterResult<FilterNode> {
	let mut parts = Vec::with_capacity(map.len());

	for (key, value) in map {
		let node = match key.as_str() {
			"_and" => FilterNode::and(parse_list(key, value, prefix)?),
			"_or" => FilterNode::or(parse_list(key, value, prefix)?),
			"_not" => FilterNode::not(parse_nested(key, value, prefix)?),
			op if op.starts_with('_') => parse_operator(op, value, prefix)?,
			field => {
				let path = prefix.child(field);
				match value {
					Json::Object(inner) => parse_object(inner, &path)?,
					Json::Null => FilterNode::empty(),
					other => {
						return Err(FilterError::MalformedFilter(format!(
							"field '{}' expects an object of operators, got {}",
							path,
							json_kind(other)
						)));
					}
				}
			}
		};
		parts.push(node);
	}

	if parts.len() == 1 {
		Ok(parts.remove(0))
	} else {
		Ok(FilterNode::and(parts))
	}
}

fn parse_list(key: &str, value: &Json, prefix: &FieldPath) -> FilterResult<Vec<FilterNode>> {
	match value {
		Json::Array(items) => items
			.iter()
			.map(|item| parse_nested(key, item, prefix))
			.collect(),
		// A lone object is accepted as a one-element list
		Json::Object(map) => Ok(vec![parse_object(map, prefix)?]),
		Json::Null => Ok(Vec::new()),
		other => Err(FilterError::MalformedFilter(format!(
			"{} expects a list of filters, got {}",
			key,
			json_kind(other)
		))),
	}
}

fn parse_nested(key: &str, value: &Json, prefix: &FieldPath) -> FilterResult<FilterNode> {
	match value {
		Json::Object(map) => parse_object(map, prefix),
		Json::Null => Ok(FilterNode::empty()),
		other => Err(FilterError::MalformedFilter(format!(
			"{} expects a filter object, got {}",
			key,
			json_kind(other)
		))),
	}
}

fn parse_operator(tag: &str, value: &Json, prefix: &FieldPath) -> FilterResult<FilterNode> {
	if prefix.is_empty() {
		return Err(FilterError::MalformedFilter(format!(
			"operator {} must be nested under a field",
			tag
		)));
	}
	let operator = OperatorTag::from_tag(tag).ok_or_else(|| {
		FilterError::unsupported(prefix.dotted(), tag, "unknown operator")
	})?;
	Ok(FilterNode::Leaf(Leaf {
		field: prefix.clone(),
		operator,
		value: value.clone(),
	}))
}

pub(crate) fn json_kind(value: &Json) -> &'static str {
	match value {
		Json::Null => "null",
		Json::Bool(_) => "boolean",
		Json::Number(_) => "number",
		Json::String(_) => "string",
		Json::Array(_) => "array",
		Json::Object(_) => "object",
	}
}
