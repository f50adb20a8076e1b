//! Per-call compile options

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use strainer_core::access::FieldAccess;
use strainer_core::capability::AdapterCapability;
use strainer_core::settings::ToManyMode;
use strainer_core::types::FieldPath;
use strainer_core::value::DistanceUnit;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompileOptions {
	/// Fields the caller may filter on
	pub access: FieldAccess,
	/// Detected capabilities of the target backend. When present, operators
	/// needing a missing feature are rejected instead of compiled.
	#[serde(skip)]
	pub capability: Option<Arc<AdapterCapability>>,
	/// Overrides the configured to-many filter mode
	pub to_many_mode: Option<ToManyMode>,
	/// Unit for `_near` distances given without one
	pub distance_unit: Option<DistanceUnit>,
	/// Dotted to-many association paths the caller allows ordering through
	pub orderable_to_many: BTreeSet<String>,
}

impl CompileOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_access(mut self, access: FieldAccess) -> Self {
		self.access = access;
		self
	}

	pub fn with_capability(mut self, capability: Arc<AdapterCapability>) -> Self {
		self.capability = Some(capability);
		self
	}

	pub fn with_to_many_mode(mut self, mode: ToManyMode) -> Self {
		self.to_many_mode = Some(mode);
		self
	}

	pub fn with_distance_unit(mut self, unit: DistanceUnit) -> Self {
		self.distance_unit = Some(unit);
		self
	}

	/// Allow ordering through the to-many association at `path`
	pub fn allow_to_many_order(mut self, path: impl Into<String>) -> Self {
		self.orderable_to_many.insert(path.into());
		self
	}

	pub(crate) fn orders_through(&self, path: &FieldPath) -> bool {
		self.orderable_to_many.contains(&path.dotted())
	}
}
