//! Operator vocabulary
//!
//! Operators are a closed set. Which of them a field exposes depends on its
//! semantic type (see [`candidates`]) and on which adapter implements them
//! (see [`crate::operator_registry`]).

use crate::types::{ElementType, SemanticType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A named comparison or test, spelled `_tag` in filter payloads
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorTag {
	// Comparison
	Eq,
	Neq,
	Gt,
	Gte,
	Lt,
	Lte,
	In,
	Nin,
	IsNull,
	// Text
	Like,
	Nlike,
	Ilike,
	Nilike,
	StartsWith,
	EndsWith,
	Includes,
	Regex,
	Iregex,
	Similar,
	Search,
	// Arrays and documents
	Contains,
	ContainedIn,
	Overlaps,
	HasKey,
	HasKeysAny,
	HasKeysAll,
	// Geo
	Near,
	WithinBox,
}

/// Shape of the operand an operator expects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arity {
	/// `true` / `false`
	Flag,
	/// One value of the field's type
	Scalar,
	/// A list of values of the field's type
	List,
	/// A string pattern or search query
	Pattern,
	/// A JSON document or array value of the field's type
	Document,
	/// One key or a list of keys
	Keys,
	/// `{point: {lat, lng}, distance}`
	Radius,
	/// `{south_west: {..}, north_east: {..}}`
	Box,
}

/// Rough evaluation cost, used to order sibling predicates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CostClass {
	Trivial,
	Range,
	Pattern,
	Expensive,
}

impl OperatorTag {
	pub const ALL: [OperatorTag; 28] = [
		OperatorTag::Eq,
		OperatorTag::Neq,
		OperatorTag::Gt,
		OperatorTag::Gte,
		OperatorTag::Lt,
		OperatorTag::Lte,
		OperatorTag::In,
		OperatorTag::Nin,
		OperatorTag::IsNull,
		OperatorTag::Like,
		OperatorTag::Nlike,
		OperatorTag::Ilike,
		OperatorTag::Nilike,
		OperatorTag::StartsWith,
		OperatorTag::EndsWith,
		OperatorTag::Includes,
		OperatorTag::Regex,
		OperatorTag::Iregex,
		OperatorTag::Similar,
		OperatorTag::Search,
		OperatorTag::Contains,
		OperatorTag::ContainedIn,
		OperatorTag::Overlaps,
		OperatorTag::HasKey,
		OperatorTag::HasKeysAny,
		OperatorTag::HasKeysAll,
		OperatorTag::Near,
		OperatorTag::WithinBox,
	];

	/// Payload spelling, including the leading underscore
	pub fn tag(&self) -> &'static str {
		match self {
			OperatorTag::Eq => "_eq",
			OperatorTag::Neq => "_neq",
			OperatorTag::Gt => "_gt",
			OperatorTag::Gte => "_gte",
			OperatorTag::Lt => "_lt",
			OperatorTag::Lte => "_lte",
			OperatorTag::In => "_in",
			OperatorTag::Nin => "_nin",
			OperatorTag::IsNull => "_is_null",
			OperatorTag::Like => "_like",
			OperatorTag::Nlike => "_nlike",
			OperatorTag::Ilike => "_ilike",
			OperatorTag::Nilike => "_nilike",
			OperatorTag::StartsWith => "_starts_with",
			OperatorTag::EndsWith => "_ends_with",
			OperatorTag::Includes => "_includes",
			OperatorTag::Regex => "_regex",
			OperatorTag::Iregex => "_iregex",
			OperatorTag::Similar => "_similar",
			OperatorTag::Search => "_search",
			OperatorTag::Contains => "_contains",
			OperatorTag::ContainedIn => "_contained_in",
			OperatorTag::Overlaps => "_overlaps",
			OperatorTag::HasKey => "_has_key",
			OperatorTag::HasKeysAny => "_has_keys_any",
			OperatorTag::HasKeysAll => "_has_keys_all",
			OperatorTag::Near => "_near",
			OperatorTag::WithinBox => "_within_box",
		}
	}

	pub fn from_tag(tag: &str) -> Option<OperatorTag> {
		Self::ALL.iter().copied().find(|op| op.tag() == tag)
	}

	/// Operand shape. `_contains` takes a document on JSON fields but a list
	/// on array fields, so arity depends on the field type.
	pub fn arity(&self, ty: SemanticType) -> Arity {
		match self {
			OperatorTag::IsNull => Arity::Flag,
			OperatorTag::In | OperatorTag::Nin => Arity::List,
			OperatorTag::Like
			| OperatorTag::Nlike
			| OperatorTag::Ilike
			| OperatorTag::Nilike
			| OperatorTag::StartsWith
			| OperatorTag::EndsWith
			| OperatorTag::Includes
			| OperatorTag::Regex
			| OperatorTag::Iregex
			| OperatorTag::Similar
			| OperatorTag::Search => Arity::Pattern,
			OperatorTag::Contains | OperatorTag::ContainedIn | OperatorTag::Overlaps => {
				if ty == SemanticType::Json {
					Arity::Document
				} else {
					Arity::List
				}
			}
			OperatorTag::HasKey | OperatorTag::HasKeysAny | OperatorTag::HasKeysAll => {
				Arity::Keys
			}
			OperatorTag::Near => Arity::Radius,
			OperatorTag::WithinBox => Arity::Box,
			OperatorTag::Eq
			| OperatorTag::Neq
			| OperatorTag::Gt
			| OperatorTag::Gte
			| OperatorTag::Lt
			| OperatorTag::Lte => Arity::Scalar,
		}
	}

	pub fn cost_class(&self) -> CostClass {
		match self {
			OperatorTag::Eq | OperatorTag::Neq | OperatorTag::IsNull => CostClass::Trivial,
			OperatorTag::Gt
			| OperatorTag::Gte
			| OperatorTag::Lt
			| OperatorTag::Lte
			| OperatorTag::In
			| OperatorTag::Nin
			| OperatorTag::HasKey
			| OperatorTag::HasKeysAny
			| OperatorTag::HasKeysAll => CostClass::Range,
			OperatorTag::Like
			| OperatorTag::Nlike
			| OperatorTag::Ilike
			| OperatorTag::Nilike
			| OperatorTag::StartsWith
			| OperatorTag::EndsWith
			| OperatorTag::Includes
			| OperatorTag::Contains
			| OperatorTag::ContainedIn
			| OperatorTag::Overlaps => CostClass::Pattern,
			OperatorTag::Regex
			| OperatorTag::Iregex
			| OperatorTag::Similar
			| OperatorTag::Search
			| OperatorTag::Near
			| OperatorTag::WithinBox => CostClass::Expensive,
		}
	}

	pub fn is_negative(&self) -> bool {
		matches!(
			self,
			OperatorTag::Neq | OperatorTag::Nin | OperatorTag::Nlike | OperatorTag::Nilike
		)
	}
}

impl fmt::Display for OperatorTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.tag())
	}
}

const EQUALITY: &[OperatorTag] = &[
	OperatorTag::Eq,
	OperatorTag::Neq,
	OperatorTag::In,
	OperatorTag::Nin,
	OperatorTag::IsNull,
];

const ORDERED: &[OperatorTag] = &[
	OperatorTag::Eq,
	OperatorTag::Neq,
	OperatorTag::Gt,
	OperatorTag::Gte,
	OperatorTag::Lt,
	OperatorTag::Lte,
	OperatorTag::In,
	OperatorTag::Nin,
	OperatorTag::IsNull,
];

const TEXT: &[OperatorTag] = &[
	OperatorTag::Eq,
	OperatorTag::Neq,
	OperatorTag::Gt,
	OperatorTag::Gte,
	OperatorTag::Lt,
	OperatorTag::Lte,
	OperatorTag::In,
	OperatorTag::Nin,
	OperatorTag::IsNull,
	OperatorTag::Like,
	OperatorTag::Nlike,
	OperatorTag::Ilike,
	OperatorTag::Nilike,
	OperatorTag::StartsWith,
	OperatorTag::EndsWith,
	OperatorTag::Includes,
	OperatorTag::Regex,
	OperatorTag::Iregex,
	OperatorTag::Similar,
	OperatorTag::Search,
];

const BOOLEAN: &[OperatorTag] = &[OperatorTag::Eq, OperatorTag::Neq, OperatorTag::IsNull];

const JSON: &[OperatorTag] = &[
	OperatorTag::Eq,
	OperatorTag::Neq,
	OperatorTag::IsNull,
	OperatorTag::Contains,
	OperatorTag::ContainedIn,
	OperatorTag::HasKey,
	OperatorTag::HasKeysAny,
	OperatorTag::HasKeysAll,
];

const COORDINATES: &[OperatorTag] = &[
	OperatorTag::IsNull,
	OperatorTag::Near,
	OperatorTag::WithinBox,
];

const ARRAY: &[OperatorTag] = &[
	OperatorTag::Eq,
	OperatorTag::Neq,
	OperatorTag::IsNull,
	OperatorTag::Contains,
	OperatorTag::ContainedIn,
	OperatorTag::Overlaps,
];

/// The full operator vocabulary of a semantic type, in advertisement order.
///
/// This is the upper bound: an adapter exposes the subset it implements.
pub fn candidates(ty: SemanticType) -> &'static [OperatorTag] {
	match ty {
		SemanticType::String => TEXT,
		SemanticType::Integer
		| SemanticType::Float
		| SemanticType::Decimal
		| SemanticType::Date
		| SemanticType::DateTime
		| SemanticType::Time => ORDERED,
		SemanticType::Boolean => BOOLEAN,
		SemanticType::Uuid | SemanticType::Enum => EQUALITY,
		SemanticType::Json => JSON,
		SemanticType::Coordinates => COORDINATES,
		SemanticType::Array(ElementType::Boolean) => &ARRAY[..3],
		SemanticType::Array(_) => ARRAY,
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_tag_round_trip_for_every_operator() {
		for op in OperatorTag::ALL {
			assert_eq!(OperatorTag::from_tag(op.tag()), Some(op));
		}
		assert_eq!(OperatorTag::from_tag("_bogus"), None);
		assert_eq!(OperatorTag::from_tag("eq"), None);
	}

	#[rstest]
	#[case(SemanticType::Integer, OperatorTag::Gte, true)]
	#[case(SemanticType::Integer, OperatorTag::Like, false)]
	#[case(SemanticType::Enum, OperatorTag::Gt, false)]
	#[case(SemanticType::Enum, OperatorTag::In, true)]
	#[case(SemanticType::String, OperatorTag::Search, true)]
	#[case(SemanticType::Coordinates, OperatorTag::Near, true)]
	#[case(SemanticType::Json, OperatorTag::HasKey, true)]
	#[case(SemanticType::Array(ElementType::Integer), OperatorTag::Overlaps, true)]
	#[case(SemanticType::Array(ElementType::Boolean), OperatorTag::Overlaps, false)]
	fn test_candidates(#[case] ty: SemanticType, #[case] op: OperatorTag, #[case] expected: bool) {
		assert_eq!(candidates(ty).contains(&op), expected);
	}

	#[rstest]
	fn test_contains_arity_depends_on_type() {
		assert_eq!(
			OperatorTag::Contains.arity(SemanticType::Json),
			Arity::Document
		);
		assert_eq!(
			OperatorTag::Contains.arity(SemanticType::Array(ElementType::String)),
			Arity::List
		);
	}

	#[rstest]
	fn test_cost_classes_are_ordered() {
		assert!(OperatorTag::Eq.cost_class() < OperatorTag::Gte.cost_class());
		assert!(OperatorTag::Gte.cost_class() < OperatorTag::Like.cost_class());
		assert!(OperatorTag::Like.cost_class() < OperatorTag::Search.cost_class());
	}
}
