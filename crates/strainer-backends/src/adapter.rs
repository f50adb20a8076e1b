//! Adapter contract
//!
//! An [`Adapter`] knows one backend: which queryables it serves, how its
//! native column types map to semantic types, and how each operator is
//! expressed. The [`AdapterSet`] holds the configured adapters and derives
//! the [`OperatorRegistry`] from what they implement, so the registry can
//! never advertise an operator that has no implementation.

use crate::adapters::{
	CockroachDbAdapter, MsSqlAdapter, MySqlAdapter, PostgresAdapter, SearchAdapter, SqliteAdapter,
};
use crate::query::{CompiledQuery, Predicate};
use std::fmt::Debug;
use std::sync::Arc;
use strainer_core::capability::Feature;
use strainer_core::error::{FilterError, FilterResult};
use strainer_core::operand::Operand;
use strainer_core::operator_registry::OperatorRegistry;
use strainer_core::operators::{OperatorTag, candidates};
use strainer_core::queryable::Queryable;
use strainer_core::types::{AdapterId, FieldDescriptor, SemanticType};
use strainer_core::value::DistanceUnit;

/// Per-call options for [`Adapter::apply_operator`]
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ApplyOptions {
	/// Table alias or document path the field is addressed under
	pub binding: Option<String>,
	/// Unit for `_near` distances given without one
	pub distance_unit: Option<DistanceUnit>,
}

impl ApplyOptions {
	pub fn with_binding(mut self, binding: impl Into<String>) -> Self {
		self.binding = Some(binding.into());
		self
	}

	pub fn with_distance_unit(mut self, unit: DistanceUnit) -> Self {
		self.distance_unit = Some(unit);
		self
	}

	pub(crate) fn binding(&self) -> &str {
		self.binding.as_deref().unwrap_or("")
	}
}

/// Outcome of applying one operator
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
	Applied(CompiledQuery),
	/// The adapter does not implement the operator; the query is unchanged
	NoMatch(CompiledQuery),
}

impl Dispatch {
	pub fn is_applied(&self) -> bool {
		matches!(self, Dispatch::Applied(_))
	}

	pub fn into_query(self) -> CompiledQuery {
		match self {
			Dispatch::Applied(query) | Dispatch::NoMatch(query) => query,
		}
	}
}

pub trait Adapter: Debug + Send + Sync {
	fn id(&self) -> AdapterId;

	fn handles(&self, queryable: &Queryable) -> bool {
		queryable.adapter == self.id()
	}

	/// Semantic type of a backend-native column type, `None` when the type
	/// is not filterable
	fn semantic_type(&self, native_type: &str) -> Option<SemanticType>;

	/// Members of a native enum type such as MySQL's `enum('a','b')`
	fn enum_members(&self, _native_type: &str) -> Option<Vec<String>> {
		None
	}

	/// Field descriptors of `queryable`, enum overrides applied
	fn queryable_fields(&self, queryable: &Queryable) -> Vec<FieldDescriptor> {
		let mut fields = Vec::with_capacity(queryable.columns.len() + queryable.associations.len());
		for column in &queryable.columns {
			let (ty, members) = match queryable.enums.get(&column.name) {
				Some(members) => (Some(SemanticType::Enum), Some(members.clone())),
				None => {
					let ty = self.semantic_type(&column.native_type);
					let members = ty
						.filter(|t| *t == SemanticType::Enum)
						.and_then(|_| self.enum_members(&column.native_type));
					(ty, members)
				}
			};
			let Some(ty) = ty else {
				tracing::debug!(
					queryable = %queryable.id,
					column = %column.name,
					native_type = %column.native_type,
					"skipping column with unmapped type"
				);
				continue;
			};
			let mut field = FieldDescriptor::scalar(column.name.clone(), ty)
				.with_nullable(column.nullable)
				.with_native_type(column.native_type.clone());
			if let Some(members) = members {
				field = field.with_enum_values(members);
			}
			fields.push(field);
		}
		for association in &queryable.associations {
			fields.push(FieldDescriptor::association(
				association.name.clone(),
				association.link.clone(),
			));
		}
		fields
	}

	/// Whether `operator` is implemented for fields of type `ty`
	fn implements(&self, ty: SemanticType, operator: OperatorTag) -> bool;

	/// Backend feature the operator needs, if any
	fn required_feature(&self, _ty: SemanticType, _operator: OperatorTag) -> Option<Feature> {
		None
	}

	/// Ordered operators for `ty`: the implemented subset of the type's
	/// vocabulary, in vocabulary order
	fn operators_for_type(&self, ty: SemanticType) -> Vec<OperatorTag> {
		candidates(ty)
			.iter()
			.copied()
			.filter(|op| self.implements(ty, *op))
			.collect()
	}

	/// Base query over every row of `queryable`
	fn new_query(&self, queryable: &Queryable) -> CompiledQuery {
		CompiledQuery::for_queryable(queryable)
	}

	/// Build the predicate for an implemented operator. Only called after
	/// [`Adapter::implements`] returned `true`.
	fn compile_leaf(
		&self,
		field: &FieldDescriptor,
		ty: SemanticType,
		operator: OperatorTag,
		operand: &Operand,
		options: &ApplyOptions,
	) -> Option<Predicate>;

	/// Predicate for `field operator operand`, `None` when the operator is
	/// not implemented for the field
	fn build_predicate(
		&self,
		field: &FieldDescriptor,
		operator: OperatorTag,
		operand: &Operand,
		options: &ApplyOptions,
	) -> Option<Predicate> {
		let ty = field.semantic_type()?;
		if !self.implements(ty, operator) {
			return None;
		}
		self.compile_leaf(field, ty, operator, operand, options)
	}

	/// Apply one operator to `query`.
	///
	/// Never fails: an operator the adapter does not implement yields
	/// [`Dispatch::NoMatch`] with the query unchanged.
	fn apply_operator(
		&self,
		mut query: CompiledQuery,
		field: &FieldDescriptor,
		operator: OperatorTag,
		operand: &Operand,
		options: &ApplyOptions,
	) -> Dispatch {
		let options = match options.binding {
			Some(_) => options.clone(),
			None => options.clone().with_binding(query.root_binding()),
		};
		let Some(predicate) = self.build_predicate(field, operator, operand, &options) else {
			return Dispatch::NoMatch(query);
		};
		if query.and_predicate(predicate) {
			Dispatch::Applied(query)
		} else {
			Dispatch::NoMatch(query)
		}
	}
}

/// The configured adapters, looked up by id or by queryable
#[derive(Debug, Clone, Default)]
pub struct AdapterSet {
	adapters: Vec<Arc<dyn Adapter>>,
}

impl AdapterSet {
	pub fn new() -> Self {
		Self::default()
	}

	/// Every built-in adapter
	pub fn with_defaults() -> Self {
		let mut set = Self::new();
		set.register(Arc::new(PostgresAdapter::new()));
		set.register(Arc::new(CockroachDbAdapter::new()));
		set.register(Arc::new(MySqlAdapter::new()));
		set.register(Arc::new(SqliteAdapter::new()));
		set.register(Arc::new(MsSqlAdapter::new()));
		set.register(Arc::new(SearchAdapter::new()));
		set
	}

	/// Add an adapter, replacing any with the same id
	pub fn register(&mut self, adapter: Arc<dyn Adapter>) {
		self.adapters.retain(|a| a.id() != adapter.id());
		self.adapters.push(adapter);
	}

	pub fn get(&self, id: AdapterId) -> Option<&Arc<dyn Adapter>> {
		self.adapters.iter().find(|a| a.id() == id)
	}

	/// The first adapter that claims `queryable`
	pub fn for_queryable(&self, queryable: &Queryable) -> FilterResult<&Arc<dyn Adapter>> {
		self.adapters
			.iter()
			.find(|a| a.handles(queryable))
			.ok_or_else(|| FilterError::AdapterUnavailable {
				queryable: queryable.id.to_string(),
			})
	}

	pub fn ids(&self) -> Vec<AdapterId> {
		self.adapters.iter().map(|a| a.id()).collect()
	}

	pub fn len(&self) -> usize {
		self.adapters.len()
	}

	pub fn is_empty(&self) -> bool {
		self.adapters.is_empty()
	}

	/// Registry of everything the configured adapters implement
	pub fn operator_registry(&self) -> OperatorRegistry {
		let mut registry = OperatorRegistry::new();
		for adapter in &self.adapters {
			for ty in SemanticType::catalogue() {
				for operator in adapter.operators_for_type(ty) {
					registry.register(
						adapter.id(),
						ty,
						operator,
						adapter.required_feature(ty, operator),
					);
				}
			}
		}
		registry
	}
}
