//! Field resolution
//!
//! [`FieldCatalog`] caches the field descriptors an adapter derives for a
//! queryable; [`Resolver`] walks dotted paths across associations on top of
//! it. Both the query and the order compiler resolve through the same
//! resolver so that a path always maps to the same join binding.

use dashmap::DashMap;
use std::sync::Arc;
use strainer_backends::adapter::{Adapter, AdapterSet};
use strainer_core::error::{FilterError, FilterResult};
use strainer_core::queryable::Queryable;
use strainer_core::schema_registry::QueryableRegistry;
use strainer_core::settings::CompilerSettings;
use strainer_core::types::{AdapterId, AssociationLink, FieldDescriptor, FieldPath, QueryableId};

/// Field descriptors per adapter and queryable, built once per definition
#[derive(Debug, Default)]
pub struct FieldCatalog {
	entries: DashMap<(AdapterId, QueryableId), CatalogEntry>,
}

/// Descriptors together with the definition they were derived from
#[derive(Debug)]
struct CatalogEntry {
	definition: Queryable,
	fields: Arc<Vec<FieldDescriptor>>,
}

impl FieldCatalog {
	pub fn new() -> Self {
		Self::default()
	}

	/// Descriptors of `queryable`, rebuilt whenever the definition passed
	/// in differs from the one they were built from
	pub fn fields(&self, adapter: &dyn Adapter, queryable: &Queryable) -> Arc<Vec<FieldDescriptor>> {
		let key = (adapter.id(), queryable.id.clone());
		if let Some(entry) = self.entries.get(&key)
			&& entry.definition == *queryable
		{
			return Arc::clone(&entry.fields);
		}
		let fields = Arc::new(adapter.queryable_fields(queryable));
		tracing::debug!(
			queryable = %queryable.id,
			adapter = %adapter.id(),
			count = fields.len(),
			"built field descriptors"
		);
		self.entries.insert(
			key,
			CatalogEntry {
				definition: queryable.clone(),
				fields: Arc::clone(&fields),
			},
		);
		fields
	}

	/// Drop cached descriptors of `queryable` after its definition changed
	pub fn invalidate(&self, queryable: &QueryableId) {
		self.entries.retain(|(_, id), _| id != queryable);
	}

	pub fn clear(&self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

/// Shared state of the query and order compilers
#[derive(Debug)]
pub struct Resolver {
	adapters: Arc<AdapterSet>,
	registry: Arc<QueryableRegistry>,
	catalog: FieldCatalog,
	settings: CompilerSettings,
}

/// One association hop
pub(crate) struct Hop<'a> {
	pub link: &'a AssociationLink,
	pub related: Arc<Queryable>,
}

/// Queryable that relative paths are resolved against, and where it sits
/// in the root query
pub(crate) struct Scope<'a> {
	pub queryable: &'a Queryable,
	/// Association path from the root queryable
	pub path: FieldPath,
	pub binding: String,
}

impl<'a> Scope<'a> {
	pub fn root(queryable: &'a Queryable, binding: String) -> Self {
		Self {
			queryable,
			path: FieldPath::new(Vec::new()),
			binding,
		}
	}
}

impl Resolver {
	pub fn new(
		adapters: Arc<AdapterSet>,
		registry: Arc<QueryableRegistry>,
		settings: CompilerSettings,
	) -> Self {
		Self {
			adapters,
			registry,
			catalog: FieldCatalog::new(),
			settings,
		}
	}

	pub fn adapters(&self) -> &AdapterSet {
		&self.adapters
	}

	pub fn registry(&self) -> &QueryableRegistry {
		&self.registry
	}

	pub fn catalog(&self) -> &FieldCatalog {
		&self.catalog
	}

	pub fn settings(&self) -> &CompilerSettings {
		&self.settings
	}

	pub fn adapter_for(&self, queryable: &Queryable) -> FilterResult<&Arc<dyn Adapter>> {
		self.adapters.for_queryable(queryable)
	}

	/// Descriptor of `name` on `queryable`
	pub fn field(
		&self,
		adapter: &dyn Adapter,
		queryable: &Queryable,
		name: &str,
		full_path: &FieldPath,
	) -> FilterResult<FieldDescriptor> {
		self.catalog
			.fields(adapter, queryable)
			.iter()
			.find(|f| f.name == name)
			.cloned()
			.ok_or_else(|| FilterError::UnknownField {
				queryable: queryable.id.to_string(),
				field: full_path.dotted(),
			})
	}

	/// Follow the association `field`, loading its target from the registry
	pub(crate) fn hop<'f>(
		&self,
		field: &'f FieldDescriptor,
		full_path: &FieldPath,
	) -> FilterResult<Hop<'f>> {
		let Some(link) = field.association_link() else {
			return Err(FilterError::UnknownField {
				queryable: field.name.clone(),
				field: full_path.dotted(),
			});
		};
		let related = self
			.registry
			.get(&link.target)
			.ok_or_else(|| FilterError::UnknownField {
				queryable: link.target.to_string(),
				field: full_path.dotted(),
			})?;
		Ok(Hop { link, related })
	}

	/// Reject paths crossing more associations than configured
	pub fn check_depth(&self, path: &FieldPath) -> FilterResult<()> {
		let hops = path.len().saturating_sub(1);
		let max = self.settings.max_association_depth;
		if hops > max {
			return Err(FilterError::MalformedFilter(format!(
				"'{}' crosses {} associations, at most {} allowed",
				path, hops, max
			)));
		}
		Ok(())
	}
}
