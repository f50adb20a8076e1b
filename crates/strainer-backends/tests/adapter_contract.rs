//! Advertised operators and implemented operators must coincide for every
//! adapter, semantic type and operator.

use proptest::prelude::*;
use rstest::rstest;
use serde_json::{Value as Json, json};
use strainer_backends::{Adapter, AdapterSet, ApplyOptions, Dispatch};
use strainer_core::operators::candidates;
use strainer_core::{
	Arity, ElementType, FieldDescriptor, Operand, OperatorTag, Queryable, SemanticType, Value,
};

// ============================================================================
// Sample operands
// ============================================================================

fn sample_scalar(ty: SemanticType) -> Json {
	match ty {
		SemanticType::String => json!("alice"),
		SemanticType::Integer => json!(42),
		SemanticType::Float => json!(1.5),
		SemanticType::Decimal => json!("19.99"),
		SemanticType::Boolean => json!(true),
		SemanticType::Date => json!("2024-01-31"),
		SemanticType::DateTime => json!("2024-01-31T12:00:00Z"),
		SemanticType::Time => json!("12:30"),
		SemanticType::Uuid => json!("67e55044-10b1-426f-9247-bb680e5fe0c8"),
		SemanticType::Enum => json!("active"),
		SemanticType::Json => json!({ "plan": "pro" }),
		SemanticType::Coordinates => json!({ "lat": 48.85, "lng": 2.35 }),
		SemanticType::Array(element) => json!([sample_scalar(element.scalar())]),
	}
}

fn sample_raw(ty: SemanticType, operator: OperatorTag) -> Json {
	match operator.arity(ty) {
		Arity::Flag => json!(true),
		Arity::Scalar => sample_scalar(ty),
		Arity::List => match ty {
			SemanticType::Array(element) => json!([sample_scalar(element.scalar())]),
			other => json!([sample_scalar(other)]),
		},
		Arity::Pattern => json!("ali%"),
		Arity::Document => json!({ "plan": "pro" }),
		Arity::Keys if operator == OperatorTag::HasKey => json!("plan"),
		Arity::Keys => json!(["plan", "seats"]),
		Arity::Radius => json!({ "point": { "lat": 48.85, "lng": 2.35 }, "distance": 5, "unit": "km" }),
		Arity::Box => json!({
			"south_west": { "lat": 48.0, "lng": 2.0 },
			"north_east": { "lat": 49.0, "lng": 3.0 }
		}),
	}
}

fn sample_operand(ty: SemanticType, operator: OperatorTag) -> Operand {
	Operand::coerce("field", operator, ty, None, &sample_raw(ty, operator))
		.unwrap_or_else(|e| panic!("sample for {} {} must coerce: {}", ty.name(), operator, e))
}

fn queryable(adapter: &dyn Adapter) -> Queryable {
	Queryable::new("Sample", "samples", adapter.id())
}

// ============================================================================
// Contract
// ============================================================================

#[rstest]
fn test_every_advertised_operator_compiles() {
	let set = AdapterSet::with_defaults();
	for id in set.ids() {
		let adapter = set.get(id).unwrap();
		for ty in SemanticType::catalogue() {
			let field = FieldDescriptor::scalar("field", ty);
			for operator in adapter.operators_for_type(ty) {
				let operand = sample_operand(ty, operator);
				let predicate = adapter.build_predicate(
					&field,
					operator,
					&operand,
					&ApplyOptions::default().with_binding("samples"),
				);
				assert!(
					predicate.is_some(),
					"{} advertises {} on {} but builds nothing",
					id,
					operator,
					ty.name()
				);
			}
		}
	}
}

#[rstest]
fn test_unadvertised_operators_leave_query_unchanged() {
	let set = AdapterSet::with_defaults();
	for id in set.ids() {
		let adapter = set.get(id).unwrap();
		let base = adapter.new_query(&queryable(adapter.as_ref()));
		for ty in SemanticType::catalogue() {
			let field = FieldDescriptor::scalar("field", ty);
			let advertised = adapter.operators_for_type(ty);
			for operator in OperatorTag::ALL {
				if advertised.contains(&operator) {
					continue;
				}
				assert!(!adapter.implements(ty, operator));
				// Any well-formed operand will do; the adapter must not look at it
				let operand = if candidates(ty).contains(&operator) {
					sample_operand(ty, operator)
				} else {
					Operand::Flag(true)
				};
				let dispatch = adapter.apply_operator(
					base.clone(),
					&field,
					operator,
					&operand,
					&ApplyOptions::default(),
				);
				assert_eq!(dispatch, Dispatch::NoMatch(base.clone()), "{} {} {}", id, ty.name(), operator);
			}
		}
	}
}

#[rstest]
fn test_registry_mirrors_adapters() {
	let set = AdapterSet::with_defaults();
	let registry = set.operator_registry();
	for id in set.ids() {
		let adapter = set.get(id).unwrap();
		for ty in SemanticType::catalogue() {
			assert_eq!(
				registry.operators_for(ty, id),
				adapter.operators_for_type(ty),
				"{} {}",
				id,
				ty.name()
			);
		}
	}
}

#[rstest]
fn test_advertised_operators_stay_within_vocabulary() {
	let set = AdapterSet::with_defaults();
	for id in set.ids() {
		let adapter = set.get(id).unwrap();
		for ty in SemanticType::catalogue() {
			for operator in adapter.operators_for_type(ty) {
				assert!(candidates(ty).contains(&operator));
			}
		}
	}
}

// ============================================================================
// Per-adapter vocabulary spot checks
// ============================================================================

#[rstest]
#[case(strainer_core::AdapterId::Postgres, OperatorTag::Similar, true)]
#[case(strainer_core::AdapterId::CockroachDb, OperatorTag::Similar, false)]
#[case(strainer_core::AdapterId::Sqlite, OperatorTag::Search, false)]
#[case(strainer_core::AdapterId::MySql, OperatorTag::Regex, true)]
#[case(strainer_core::AdapterId::MsSql, OperatorTag::Regex, false)]
#[case(strainer_core::AdapterId::Search, OperatorTag::Search, true)]
fn test_string_vocabulary(
	#[case] id: strainer_core::AdapterId,
	#[case] operator: OperatorTag,
	#[case] expected: bool,
) {
	let set = AdapterSet::with_defaults();
	let adapter = set.get(id).unwrap();
	assert_eq!(
		adapter.operators_for_type(SemanticType::String).contains(&operator),
		expected
	);
}

#[rstest]
fn test_boolean_arrays_have_no_containment() {
	let set = AdapterSet::with_defaults();
	let adapter = set.get(strainer_core::AdapterId::Postgres).unwrap();
	let operators = adapter.operators_for_type(SemanticType::Array(ElementType::Boolean));
	assert!(!operators.contains(&OperatorTag::Contains));
}

// ============================================================================
// Parameter binding
// ============================================================================

proptest! {
	#[test]
	fn prop_string_operands_are_always_bound(text in "[a-z' ;\"\\-]{1,16}") {
		let set = AdapterSet::with_defaults();
		let field = FieldDescriptor::scalar("name", SemanticType::String);
		for id in set.ids().into_iter().filter(|id| id.is_sql()) {
			let adapter = set.get(id).unwrap();
			let query = adapter
				.apply_operator(
					adapter.new_query(&queryable(adapter.as_ref())),
					&field,
					OperatorTag::Eq,
					&Operand::Scalar(Value::String(text.clone())),
					&ApplyOptions::default(),
				)
				.into_query();
			let rendered = query.render();
			prop_assert_eq!(&rendered.params, &vec![Value::String(text.clone())]);
			prop_assert!(!rendered.text.contains('\''), "{}: {}", id, rendered.text);
		}
	}
}
