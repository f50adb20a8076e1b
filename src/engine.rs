//! The [`Strainer`] entry point

use serde_json::Value as Json;
use std::path::Path;
use std::sync::Arc;
use strainer_backends::{AdapterSet, BackendHandle, CapabilityCache, CompiledQuery};
use strainer_compiler::{CompileOptions, OrderCompiler, QueryCompiler, Resolver};
use strainer_core::{
	AdapterCapability, FilterError, FilterNode, FilterResult, OrderTerm, Queryable, QueryableId,
	QueryableRegistry, StrainerSettings,
};

#[cfg(feature = "complexity")]
use strainer_backends::LoadMetrics;
#[cfg(feature = "complexity")]
use strainer_complexity::{ComplexityAnalyzer, ComplexityCheck};

/// One engine instance: adapters, queryable metadata, compilers, the
/// capability cache and the complexity analyzer, built from one
/// [`StrainerSettings`].
///
/// Every method takes `&self`; share it behind an `Arc`.
#[derive(Debug)]
pub struct Strainer {
	settings: StrainerSettings,
	registry: Arc<QueryableRegistry>,
	filters: QueryCompiler,
	orders: OrderCompiler,
	capabilities: CapabilityCache,
	#[cfg(feature = "complexity")]
	analyzer: ComplexityAnalyzer,
}

impl Default for Strainer {
	fn default() -> Self {
		Self::new(StrainerSettings::default())
	}
}

impl Strainer {
	/// Engine with every built-in adapter
	pub fn new(settings: StrainerSettings) -> Self {
		Self::with_adapters(settings, AdapterSet::with_defaults())
	}

	pub fn with_adapters(settings: StrainerSettings, adapters: AdapterSet) -> Self {
		let registry = Arc::new(QueryableRegistry::new(settings.registry.clone()));
		let resolver = Arc::new(Resolver::new(
			Arc::new(adapters),
			Arc::clone(&registry),
			settings.compiler.clone(),
		));
		tracing::debug!(
			adapters = ?resolver.adapters().ids(),
			complexity = settings.complexity.enabled,
			"strainer engine configured"
		);
		Self {
			#[cfg(feature = "complexity")]
			analyzer: ComplexityAnalyzer::new(settings.complexity.clone()),
			filters: QueryCompiler::new(Arc::clone(&resolver)),
			orders: OrderCompiler::new(resolver),
			capabilities: CapabilityCache::new(),
			registry,
			settings,
		}
	}

	/// Engine configured from a TOML file
	pub fn from_toml_file(path: impl AsRef<Path>) -> FilterResult<Self> {
		Ok(Self::new(StrainerSettings::from_toml_file(path)?))
	}

	pub fn settings(&self) -> &StrainerSettings {
		&self.settings
	}

	pub fn adapters(&self) -> &AdapterSet {
		self.filters.resolver().adapters()
	}

	pub fn registry(&self) -> &Arc<QueryableRegistry> {
		&self.registry
	}

	pub fn capabilities(&self) -> &CapabilityCache {
		&self.capabilities
	}

	#[cfg(feature = "complexity")]
	pub fn analyzer(&self) -> &ComplexityAnalyzer {
		&self.analyzer
	}

	/// Register queryable metadata supplied by the schema layer.
	///
	/// Replacing a queryable drops its cached field list.
	pub fn register(&self, queryable: Queryable) -> FilterResult<()> {
		let id = queryable.id.clone();
		self.registry.register(queryable)?;
		self.filters.resolver().catalog().invalidate(&id);
		Ok(())
	}

	pub fn queryable(&self, id: &QueryableId) -> FilterResult<Arc<Queryable>> {
		self.registry
			.get(id)
			.ok_or_else(|| FilterError::Registry(format!("queryable {} is not registered", id)))
	}

	/// Compile `filter` into a fresh query over `queryable`
	pub fn compile(
		&self,
		queryable: &Queryable,
		filter: &FilterNode,
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		self.filters.compile(queryable, filter, options)
	}

	/// Compile a JSON filter payload against a registered queryable
	pub fn compile_payload(
		&self,
		id: &QueryableId,
		payload: &Json,
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		let queryable = self.queryable(id)?;
		self.filters.compile_payload(&queryable, payload, options)
	}

	/// AND `filter` into an existing query
	pub fn apply(
		&self,
		query: CompiledQuery,
		queryable: &Queryable,
		filter: &FilterNode,
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		self.filters.apply(query, queryable, filter, options)
	}

	pub fn compile_order(
		&self,
		query: CompiledQuery,
		queryable: &Queryable,
		terms: &[OrderTerm],
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		self.orders.compile_order(query, queryable, terms, options)
	}

	/// Parse an order payload (`[{"age": "desc_nulls_last"}, ...]`) and
	/// append it to `query`
	pub fn compile_order_payload(
		&self,
		query: CompiledQuery,
		queryable: &Queryable,
		payload: &Json,
		options: &CompileOptions,
	) -> FilterResult<CompiledQuery> {
		let terms = OrderTerm::parse_list(payload)?;
		self.compile_order(query, queryable, &terms, options)
	}

	/// Capabilities of the backend behind `handle`, detected once per
	/// connection target
	pub async fn detect_capabilities(&self, handle: &dyn BackendHandle) -> Arc<AdapterCapability> {
		self.capabilities.get_or_detect(handle).await
	}

	/// `options` gated by the capabilities of the backend behind `handle`
	pub async fn options_for(
		&self,
		handle: &dyn BackendHandle,
		options: CompileOptions,
	) -> CompileOptions {
		options.with_capability(self.detect_capabilities(handle).await)
	}

	/// Admission check of `query` against the live load of `handle`
	#[cfg(feature = "complexity")]
	pub async fn check_complexity(
		&self,
		query: &CompiledQuery,
		handle: &dyn BackendHandle,
	) -> ComplexityCheck {
		self.analyzer.check_complexity(query, handle).await
	}

	/// Admission check against a load snapshot, explaining through `handle`
	/// when one is given
	#[cfg(feature = "complexity")]
	pub async fn check_under_load(
		&self,
		query: &CompiledQuery,
		load: LoadMetrics,
		handle: Option<&dyn BackendHandle>,
	) -> ComplexityCheck {
		self.analyzer.check_under_load(query, load, handle).await
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use strainer_core::AdapterId;

	#[rstest]
	fn test_unregistered_queryable_is_a_registry_error() {
		let strainer = Strainer::default();
		let err = strainer.queryable(&QueryableId::from("Ghost")).unwrap_err();
		assert!(matches!(err, FilterError::Registry(_)));
	}

	#[rstest]
	fn test_every_builtin_adapter_is_configured() {
		let strainer = Strainer::default();
		let ids = strainer.adapters().ids();
		for id in AdapterId::ALL {
			assert!(ids.contains(&id), "{} missing", id);
		}
	}
}
