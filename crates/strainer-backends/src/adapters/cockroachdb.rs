//! CockroachDB adapter
//!
//! CockroachDB shares PostgreSQL's operator spelling, minus `SIMILAR TO`.
//! Full-text search arrived in 23.1 and spatial support in 20.2, so both are
//! capability-gated.

use super::postgres;
use crate::adapter::{Adapter, ApplyOptions};
use crate::query::Predicate;
use strainer_core::capability::Feature;
use strainer_core::operand::Operand;
use strainer_core::operators::{OperatorTag, candidates};
use strainer_core::types::{AdapterId, FieldDescriptor, SemanticType};

#[derive(Debug, Clone, Default)]
pub struct CockroachDbAdapter;

impl CockroachDbAdapter {
	pub fn new() -> Self {
		Self
	}
}

impl Adapter for CockroachDbAdapter {
	fn id(&self) -> AdapterId {
		AdapterId::CockroachDb
	}

	fn semantic_type(&self, native_type: &str) -> Option<SemanticType> {
		postgres::semantic_type(native_type)
	}

	fn implements(&self, ty: SemanticType, operator: OperatorTag) -> bool {
		candidates(ty).contains(&operator) && operator != OperatorTag::Similar
	}

	fn required_feature(&self, ty: SemanticType, operator: OperatorTag) -> Option<Feature> {
		if operator == OperatorTag::Search {
			return Some(Feature::FullText);
		}
		postgres::geo_requirement(ty, operator)
	}

	fn compile_leaf(
		&self,
		field: &FieldDescriptor,
		ty: SemanticType,
		operator: OperatorTag,
		operand: &Operand,
		options: &ApplyOptions,
	) -> Option<Predicate> {
		postgres::leaf(field, ty, operator, operand, options).map(Predicate::Sql)
	}
}
