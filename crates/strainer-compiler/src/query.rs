//! Filter compilation
//!
//! [`QueryCompiler`] walks a [`FilterNode`] tree against a queryable and
//! produces the backend-native predicate, resolving dotted paths across
//! associations as it goes.
//!
//! Siblings under one `AND`/`OR` that share an association head are
//! compiled together inside that association. For a to-one head this only
//! shares the join; for a to-many head the whole group becomes a single
//! `EXISTS` (or `NOT EXISTS ... NOT` in all-match mode), so the same related
//! row has to satisfy every grouped leaf. `NOT` nodes are never grouped.

use crate::fields::{Resolver, Scope};
use crate::options::CompileOptions;
use serde_json::Value as Json;
use std::sync::Arc;
use strainer_backends::adapter::{Adapter, ApplyOptions};
use strainer_backends::query::{CompiledQuery, Predicate, PredicateKind};
use strainer_core::error::{FilterError, FilterResult};
use strainer_core::filter::{Combinator, FilterNode, Leaf};
use strainer_core::operand::Operand;
use strainer_core::queryable::Queryable;
use strainer_core::settings::ToManyMode;
use strainer_core::types::{Cardinality, FieldPath};

/// Rank of association groups when siblings are reordered by cost
const ASSOCIATION_RANK: u8 = 4;

/// State shared by one compilation
struct Pass<'a> {
	adapter: &'a dyn Adapter,
	options: &'a CompileOptions,
	mode: ToManyMode,
	kind: PredicateKind,
}

/// One run of siblings compiled together
enum Part<'n> {
	Single(&'n FilterNode),
	Through {
		head: String,
		nodes: Vec<&'n FilterNode>,
	},
}

/// Compiles filter trees into backend-native queries
#[derive(Debug, Clone)]
pub struct QueryCompiler {
	resolver: Arc<Resolver>,
}

impl QueryCompiler {
	pub fn new(resolver: Arc<Resolver>) -> Self {
		Self { resolver }
	}

	pub fn resolver(&self) -> &Arc<Resolver> {
		&self.resolver
	}

	/// Compile `filter` into a fresh query over every row of `queryable`
	pub fn compile(
		&self,
		queryable: &Queryable,
		filter: &FilterNode,
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		let adapter = self.resolver.adapter_for(queryable)?;
		self.apply(adapter.new_query(queryable), queryable, filter, options)
	}

	/// Parse a JSON filter payload and compile it
	pub fn compile_payload(
		&self,
		queryable: &Queryable,
		payload: &Json,
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		let filter = FilterNode::parse(payload)?;
		self.compile(queryable, &filter, options)
	}

	/// AND the compiled `filter` into an existing query.
	///
	/// An empty filter returns `query` unchanged. Nothing is applied unless
	/// the whole tree compiles.
	pub fn apply(
		&self,
		mut query: CompiledQuery,
		queryable: &Queryable,
		filter: &FilterNode,
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		filter.validate()?;
		let paths = filter.referenced_paths();
		options.access.check(&paths)?;
		for path in &paths {
			self.resolver.check_depth(path)?;
		}
		if filter.is_empty() {
			tracing::trace!(queryable = %queryable.id, "empty filter, query unchanged");
			return Ok(query);
		}

		let adapter = self.resolver.adapter_for(queryable)?;
		let pass = Pass {
			adapter: adapter.as_ref(),
			options,
			mode: options
				.to_many_mode
				.unwrap_or(self.resolver.settings().to_many_filter_mode),
			kind: query.kind(),
		};
		let scope = Scope::root(queryable, query.root_binding());
		let predicate = self.node(&pass, &mut query, &scope, filter)?;
		tracing::debug!(
			queryable = %queryable.id,
			adapter = %adapter.id(),
			leaves = predicate.leaf_count(),
			"compiled filter"
		);
		if !query.and_predicate(predicate) {
			return Err(FilterError::AdapterUnavailable {
				queryable: queryable.id.to_string(),
			});
		}
		Ok(query)
	}

	fn node(
		&self,
		pass: &Pass<'_>,
		query: &mut CompiledQuery,
		scope: &Scope<'_>,
		node: &FilterNode,
	) -> FilterResult<Predicate> {
		match node {
			FilterNode::Leaf(leaf) => match leaf.field.head() {
				Some(head) if leaf.field.is_nested() => {
					self.through(pass, query, scope, head, Combinator::And, &[node])
				}
				_ => self.leaf(pass, scope, leaf),
			},
			FilterNode::Combinator {
				op: Combinator::Not,
				children,
			} => {
				let child = children.first().ok_or_else(|| {
					FilterError::MalformedFilter("_not takes exactly one child".to_string())
				})?;
				Ok(self.node(pass, query, scope, child)?.negate())
			}
			FilterNode::Combinator { op, children } => {
				let children: Vec<&FilterNode> = children.iter().collect();
				self.combine(pass, query, scope, *op, &children)
			}
		}
	}

	/// Compile siblings under `op`, grouping those that share an
	/// association head
	fn combine(
		&self,
		pass: &Pass<'_>,
		query: &mut CompiledQuery,
		scope: &Scope<'_>,
		op: Combinator,
		children: &[&FilterNode],
	) -> FilterResult<Predicate> {
		let mut ordered = children.to_vec();
		if self.resolver.settings().reorder_predicates {
			ordered.sort_by_key(|child| cost_rank(child));
		}

		let mut parts: Vec<Part<'_>> = Vec::new();
		for child in ordered {
			let Some(head) = shared_head(child) else {
				parts.push(Part::Single(child));
				continue;
			};
			let existing = parts.iter_mut().find_map(|part| match part {
				Part::Through { head: h, nodes } if *h == head => Some(nodes),
				_ => None,
			});
			match existing {
				Some(nodes) => nodes.push(child),
				None => parts.push(Part::Through {
					head,
					nodes: vec![child],
				}),
			}
		}

		let mut predicates = Vec::with_capacity(parts.len());
		for part in parts {
			predicates.push(match part {
				Part::Single(child) => self.node(pass, query, scope, child)?,
				Part::Through { head, nodes } => {
					self.through(pass, query, scope, &head, op, &nodes)?
				}
			});
		}
		Ok(match op {
			Combinator::Or => Predicate::any(pass.kind, predicates),
			_ => Predicate::all(pass.kind, predicates),
		})
	}

	/// Compile `nodes`, all addressed through the association `head`, inside
	/// the associated queryable
	fn through(
		&self,
		pass: &Pass<'_>,
		query: &mut CompiledQuery,
		scope: &Scope<'_>,
		head: &str,
		op: Combinator,
		nodes: &[&FilterNode],
	) -> FilterResult<Predicate> {
		let path = scope.path.child(head);
		let field = self
			.resolver
			.field(pass.adapter, scope.queryable, head, &path)?;
		let hop = self.resolver.hop(&field, &path)?;
		let binding = query.binding_for(&path);
		let stripped: Vec<FilterNode> = nodes.iter().map(|n| strip_head(n)).collect();
		let stripped: Vec<&FilterNode> = stripped.iter().collect();
		let inner = Scope {
			queryable: &hop.related,
			path: path.clone(),
			binding: binding.clone(),
		};

		match hop.link.cardinality {
			Cardinality::One => {
				query.bind_to_one(&scope.binding, &binding, hop.link, &hop.related);
				self.combine(pass, query, &inner, op, &stripped)
			}
			Cardinality::Many => {
				let mut sub = query.open_scope(&hop.related, &binding);
				let predicate = self.combine(pass, &mut sub, &inner, op, &stripped)?;
				tracing::debug!(path = %path, mode = ?pass.mode, "scoped to-many filter");
				CompiledQuery::close_scope(
					sub,
					&scope.binding,
					&binding,
					hop.link,
					predicate,
					pass.mode,
				)
				.ok_or_else(|| {
					FilterError::MalformedFilter(format!("cannot filter through '{}'", path))
				})
			}
		}
	}

	fn leaf(&self, pass: &Pass<'_>, scope: &Scope<'_>, leaf: &Leaf) -> FilterResult<Predicate> {
		let path = scope.absolute(&leaf.field);
		let dotted = path.dotted();
		let operator = leaf.operator;
		let name = leaf
			.field
			.head()
			.ok_or_else(|| FilterError::MalformedFilter(format!("operator {} has no field", operator)))?;
		let field = self
			.resolver
			.field(pass.adapter, scope.queryable, name, &path)?;
		let Some(ty) = field.semantic_type() else {
			return Err(FilterError::unsupported(
				dotted,
				operator.tag(),
				"associations take a nested filter, not an operator",
			));
		};
		if !pass.adapter.implements(ty, operator) {
			return Err(FilterError::unsupported(
				dotted,
				operator.tag(),
				format!("not available for {} fields on {}", ty, pass.adapter.id()),
			));
		}
		if let Some(capability) = &pass.options.capability
			&& let Some(feature) = pass.adapter.required_feature(ty, operator)
		{
			capability.require(feature)?;
		}

		let operand = Operand::coerce(
			&dotted,
			operator,
			ty,
			field.enum_values.as_deref(),
			&leaf.value,
		)?;
		let mut apply = ApplyOptions::default().with_binding(scope.binding.clone());
		apply.distance_unit = pass.options.distance_unit;
		pass.adapter
			.build_predicate(&field, operator, &operand, &apply)
			.ok_or_else(|| {
				FilterError::unsupported(dotted, operator.tag(), "no predicate for this operand")
			})
	}
}

/// Association head shared by every leaf of `node`.
///
/// `NOT` nodes and trees without leaves have none.
fn shared_head(node: &FilterNode) -> Option<String> {
	if matches!(
		node,
		FilterNode::Combinator {
			op: Combinator::Not,
			..
		}
	) {
		return None;
	}
	let leaves = node.leaves();
	let first = leaves.first()?;
	if !first.field.is_nested() {
		return None;
	}
	let head = first.field.head()?;
	leaves
		.iter()
		.all(|leaf| leaf.field.is_nested() && leaf.field.head() == Some(head))
		.then(|| head.to_string())
}

/// The same tree with the first segment of every leaf path removed
fn strip_head(node: &FilterNode) -> FilterNode {
	match node {
		FilterNode::Leaf(leaf) => FilterNode::Leaf(Leaf {
			field: leaf.field.tail(),
			operator: leaf.operator,
			value: leaf.value.clone(),
		}),
		FilterNode::Combinator { op, children } => FilterNode::Combinator {
			op: *op,
			children: children.iter().map(strip_head).collect(),
		},
	}
}

/// Cost rank of a subtree: its most expensive leaf, associations last
fn cost_rank(node: &FilterNode) -> u8 {
	match node {
		FilterNode::Leaf(leaf) if leaf.field.is_nested() => ASSOCIATION_RANK,
		FilterNode::Leaf(leaf) => leaf.operator.cost_class() as u8,
		FilterNode::Combinator { children, .. } => {
			children.iter().map(cost_rank).max().unwrap_or(0)
		}
	}
}

impl Scope<'_> {
	fn absolute(&self, relative: &FieldPath) -> FieldPath {
		FieldPath::new(
			self.path
				.segments()
				.iter()
				.chain(relative.segments())
				.cloned()
				.collect(),
		)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use strainer_core::operators::OperatorTag;

	#[rstest]
	fn test_shared_head_requires_every_leaf() {
		let grouped = FilterNode::and(vec![
			FilterNode::leaf("posts.title", OperatorTag::Eq, "a"),
			FilterNode::leaf("posts.views", OperatorTag::Gt, 3),
		]);
		assert_eq!(shared_head(&grouped), Some("posts".to_string()));

		let mixed = FilterNode::and(vec![
			FilterNode::leaf("posts.title", OperatorTag::Eq, "a"),
			FilterNode::leaf("age", OperatorTag::Gt, 3),
		]);
		assert_eq!(shared_head(&mixed), None);
	}

	#[rstest]
	fn test_not_is_never_grouped() {
		let node = FilterNode::not(FilterNode::leaf("posts.title", OperatorTag::Eq, "a"));
		assert_eq!(shared_head(&node), None);
		assert_eq!(shared_head(&FilterNode::empty()), None);
	}

	#[rstest]
	fn test_strip_head() {
		let node = FilterNode::or(vec![
			FilterNode::leaf("posts.title", OperatorTag::Eq, "a"),
			FilterNode::leaf("posts.author.name", OperatorTag::Eq, "b"),
		]);
		let stripped = strip_head(&node);
		let paths: Vec<String> = stripped.leaves().iter().map(|l| l.field.dotted()).collect();
		assert_eq!(paths, vec!["title", "author.name"]);
	}

	#[rstest]
	#[case(FilterNode::leaf("age", OperatorTag::Eq, 1), 0)]
	#[case(FilterNode::leaf("age", OperatorTag::Gt, 1), 1)]
	#[case(FilterNode::leaf("name", OperatorTag::Regex, "a"), 3)]
	#[case(FilterNode::leaf("posts.title", OperatorTag::Eq, "a"), ASSOCIATION_RANK)]
	fn test_cost_rank(#[case] node: FilterNode, #[case] rank: u8) {
		assert_eq!(cost_rank(&node), rank);
	}
}
