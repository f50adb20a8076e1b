//! Operator registry
//!
//! Maps `(adapter, semantic type)` to the ordered operators the adapter
//! implements for that type, together with the backend feature each one
//! needs. The registry is an owned value built at startup and passed to the
//! compiler; there is no global table.

use crate::capability::{AdapterCapability, Feature};
use crate::operators::{Arity, OperatorTag};
use crate::types::{AdapterId, SemanticType};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Discovery view of one operator across all registered adapters
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OperatorSpec {
	pub operator_tag: OperatorTag,
	pub applicable_types: BTreeSet<SemanticType>,
	/// Operand shape on the first applicable type; see [`OperatorTag::arity`]
	/// for operators whose shape depends on the field type
	pub arity: Arity,
	pub adapter_availability: BTreeSet<AdapterId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Registration {
	operator: OperatorTag,
	requires: Option<Feature>,
}

#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
	entries: BTreeMap<(AdapterId, SemanticType), Vec<Registration>>,
}

impl OperatorRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	/// Record that `adapter` implements `operator` for `ty`.
	///
	/// Registration order is advertisement order. Registering the same
	/// triple twice replaces the feature requirement.
	pub fn register(
		&mut self,
		adapter: AdapterId,
		ty: SemanticType,
		operator: OperatorTag,
		requires: Option<Feature>,
	) {
		let slot = self.entries.entry((adapter, ty)).or_default();
		match slot.iter_mut().find(|r| r.operator == operator) {
			Some(existing) => existing.requires = requires,
			None => slot.push(Registration { operator, requires }),
		}
	}

	/// Ordered operators implemented for `ty` on `adapter`
	pub fn operators_for(&self, ty: SemanticType, adapter: AdapterId) -> Vec<OperatorTag> {
		self.entries
			.get(&(adapter, ty))
			.map(|slot| slot.iter().map(|r| r.operator).collect())
			.unwrap_or_default()
	}

	/// Operators for `ty` whose required feature the detected backend has
	pub fn available_for(&self, ty: SemanticType, capability: &AdapterCapability) -> Vec<OperatorTag> {
		self.entries
			.get(&(capability.adapter_id, ty))
			.map(|slot| {
				slot.iter()
					.filter(|r| r.requires.is_none_or(|f| capability.supports(f)))
					.map(|r| r.operator)
					.collect()
			})
			.unwrap_or_default()
	}

	pub fn is_registered(&self, adapter: AdapterId, ty: SemanticType, operator: OperatorTag) -> bool {
		self.requirement(adapter, ty, operator).is_some()
	}

	/// `None` when not registered, `Some(None)` when registered without a
	/// feature requirement
	pub fn requirement(
		&self,
		adapter: AdapterId,
		ty: SemanticType,
		operator: OperatorTag,
	) -> Option<Option<Feature>> {
		self.entries
			.get(&(adapter, ty))?
			.iter()
			.find(|r| r.operator == operator)
			.map(|r| r.requires)
	}

	pub fn spec(&self, operator: OperatorTag) -> Option<OperatorSpec> {
		let mut applicable_types = BTreeSet::new();
		let mut adapter_availability = BTreeSet::new();
		let mut arity = None;

		for ((adapter, ty), slot) in &self.entries {
			if slot.iter().any(|r| r.operator == operator) {
				applicable_types.insert(*ty);
				adapter_availability.insert(*adapter);
				arity.get_or_insert_with(|| operator.arity(*ty));
			}
		}

		arity.map(|arity| OperatorSpec {
			operator_tag: operator,
			applicable_types,
			arity,
			adapter_availability,
		})
	}

	/// Specs for every operator registered anywhere
	pub fn specs(&self) -> Vec<OperatorSpec> {
		OperatorTag::ALL
			.iter()
			.filter_map(|op| self.spec(*op))
			.collect()
	}

	pub fn adapters(&self) -> BTreeSet<AdapterId> {
		self.entries.keys().map(|(adapter, _)| *adapter).collect()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
