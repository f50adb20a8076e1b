//! Order compilation
//!
//! Order paths follow the same association rules as filters, with one
//! restriction: a to-many hop would duplicate parent rows, so it is only
//! allowed when the caller opted in for that path, and then sorts by the
//! minimum (ascending) or maximum (descending) related value.

use crate::fields::Resolver;
use crate::options::CompileOptions;
use std::sync::Arc;
use strainer_backends::adapter::Adapter;
use strainer_backends::query::CompiledQuery;
use strainer_core::error::{FilterError, FilterResult};
use strainer_core::order::OrderTerm;
use strainer_core::queryable::Queryable;
use strainer_core::types::{Cardinality, FieldDescriptor, FieldPath};

#[derive(Debug, Clone)]
pub struct OrderCompiler {
	resolver: Arc<Resolver>,
}

impl OrderCompiler {
	pub fn new(resolver: Arc<Resolver>) -> Self {
		Self { resolver }
	}

	/// Append `terms` to the ordering of `query`, in order
	pub fn compile_order(
		&self,
		mut query: CompiledQuery,
		queryable: &Queryable,
		terms: &[OrderTerm],
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		if terms.is_empty() {
			return Ok(query);
		}
		options.access.check(terms.iter().map(|t| &t.path))?;
		let adapter = self.resolver.adapter_for(queryable)?;
		for term in terms {
			self.resolver.check_depth(&term.path)?;
			self.term(adapter.as_ref(), &mut query, queryable, term, options)?;
		}
		tracing::debug!(queryable = %queryable.id, terms = terms.len(), "compiled order");
		Ok(query)
	}

	fn term(
		&self,
		adapter: &dyn Adapter,
		query: &mut CompiledQuery,
		queryable: &Queryable,
		term: &OrderTerm,
		options: &CompileOptions,
	) -> FilterResult<()> {
		let Some((last, hops)) = term.path.segments().split_last() else {
			return Err(FilterError::MalformedFilter("order term has no field".to_string()));
		};

		let mut binding = query.root_binding();
		let mut walked = FieldPath::new(Vec::new());
		let mut related: Option<Arc<Queryable>> = None;
		for (index, segment) in hops.iter().enumerate() {
			let current = related.as_deref().unwrap_or(queryable);
			walked = walked.child(segment.as_str());
			let field = self.resolver.field(adapter, current, segment, &term.path)?;
			let hop = self.resolver.hop(&field, &term.path)?;
			let next = query.binding_for(&walked);

			if hop.link.cardinality == Cardinality::Many {
				if !options.orders_through(&walked) {
					return Err(FilterError::NotOrderable {
						path: term.path.dotted(),
						reason: format!("'{}' is a to-many association", walked),
					});
				}
				if index + 1 != hops.len() {
					return Err(FilterError::NotOrderable {
						path: term.path.dotted(),
						reason: format!("ordering through '{}' must end at one of its fields", walked),
					});
				}
				let target = self.resolver.field(adapter, &hop.related, last, &term.path)?;
				orderable(&target, &term.path)?;
				query.push_aggregate_order(
					&binding,
					&next,
					hop.link,
					&hop.related,
					&target.column,
					term.direction,
					term.nulls,
				);
				return Ok(());
			}

			query.bind_to_one(&binding, &next, hop.link, &hop.related);
			binding = next;
			related = Some(hop.related);
		}

		let current = related.as_deref().unwrap_or(queryable);
		let field = self.resolver.field(adapter, current, last, &term.path)?;
		orderable(&field, &term.path)?;
		query.push_order(&binding, &field.column, term.direction, term.nulls);
		Ok(())
	}
}

fn orderable(field: &FieldDescriptor, path: &FieldPath) -> FilterResult<()> {
	match field.semantic_type() {
		None => Err(FilterError::NotOrderable {
			path: path.dotted(),
			reason: "associations cannot be ordered, order by one of their fields".to_string(),
		}),
		Some(ty) if !ty.is_orderable() => Err(FilterError::NotOrderable {
			path: path.dotted(),
			reason: format!("{} fields have no ordering", ty),
		}),
		Some(_) => Ok(()),
	}
}
