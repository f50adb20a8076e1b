//! Operand coercion
//!
//! Turns the raw JSON operand of a [`crate::filter::Leaf`] into an
//! [`Operand`] whose shape matches the operator's arity and whose values
//! match the field's semantic type. Any mismatch is an `InvalidValue`.

use crate::error::{FilterError, FilterResult};
use crate::filter::json_kind;
use crate::operators::{Arity, OperatorTag};
use crate::types::SemanticType;
use crate::value::{DistanceUnit, GeoPoint, Value};
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde_json::Value as Json;
use std::str::FromStr;
use uuid::Uuid;

/// A validated operand, ready for an adapter
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
	Flag(bool),
	/// `Value::Null` only appears for `_eq` / `_neq`
	Scalar(Value),
	List(Vec<Value>),
	Pattern(String),
	Document(Json),
	Keys(Vec<String>),
	Near {
		center: GeoPoint,
		distance: f64,
		unit: Option<DistanceUnit>,
	},
	Bounds {
		south_west: GeoPoint,
		north_east: GeoPoint,
	},
}

impl Operand {
	/// Coerce `raw` for `operator` applied to a field of type `ty`.
	///
	/// `enum_values` restricts scalar and list members of enum fields.
	pub fn coerce(
		field: &str,
		operator: OperatorTag,
		ty: SemanticType,
		enum_values: Option<&[String]>,
		raw: &Json,
	) -> FilterResult<Operand> {
		let invalid = |reason: String| FilterError::invalid_value(field, operator.tag(), reason);

		match operator.arity(ty) {
			Arity::Flag => match raw {
				Json::Bool(b) => Ok(Operand::Flag(*b)),
				other => Err(invalid(format!("expected a boolean, got {}", json_kind(other)))),
			},
			Arity::Scalar => {
				if raw.is_null() {
					return match operator {
						OperatorTag::Eq | OperatorTag::Neq => Ok(Operand::Scalar(Value::Null)),
						_ => Err(invalid("null is only allowed with _eq and _neq".into())),
					};
				}
				coerce_value(ty, enum_values, raw)
					.map(Operand::Scalar)
					.map_err(invalid)
			}
			Arity::List => {
				let items = raw
					.as_array()
					.ok_or_else(|| invalid(format!("expected a list, got {}", json_kind(raw))))?;
				// Array operators take elements; _in / _nin take whole values
				let item_type = match ty {
					SemanticType::Array(element) => element.scalar(),
					other => other,
				};
				let mut values = Vec::with_capacity(items.len());
				for (index, item) in items.iter().enumerate() {
					if item.is_null() {
						return Err(invalid(format!("list item {} is null", index)));
					}
					let value = coerce_value(item_type, enum_values, item)
						.map_err(|reason| invalid(format!("list item {}: {}", index, reason)))?;
					values.push(value);
				}
				Ok(Operand::List(values))
			}
			Arity::Pattern => match raw {
				Json::String(s) if operator == OperatorTag::Search && s.trim().is_empty() => {
					Err(invalid("search query must not be empty".into()))
				}
				Json::String(s) => Ok(Operand::Pattern(s.clone())),
				other => Err(invalid(format!("expected a string, got {}", json_kind(other)))),
			},
			Arity::Document => match raw {
				Json::Object(_) | Json::Array(_) => Ok(Operand::Document(raw.clone())),
				other => Err(invalid(format!(
					"expected a JSON object or array, got {}",
					json_kind(other)
				))),
			},
			Arity::Keys => {
				let keys = match raw {
					Json::String(s) => vec![s.clone()],
					Json::Array(items) if operator != OperatorTag::HasKey => items
						.iter()
						.map(|item| {
							item.as_str()
								.map(str::to_string)
								.ok_or_else(|| invalid("keys must be strings".into()))
						})
						.collect::<FilterResult<Vec<_>>>()?,
					other => {
						return Err(invalid(format!("expected a key, got {}", json_kind(other))));
					}
				};
				if keys.is_empty() {
					return Err(invalid("at least one key is required".into()));
				}
				Ok(Operand::Keys(keys))
			}
			Arity::Radius => {
				let object = raw
					.as_object()
					.ok_or_else(|| invalid("expected {point, distance}".into()))?;
				let center = object
					.get("point")
					.ok_or_else(|| invalid("missing point".into()))
					.and_then(|p| parse_point(p).map_err(&invalid))?;
				let distance = object
					.get("distance")
					.and_then(Json::as_f64)
					.ok_or_else(|| invalid("distance must be a number".into()))?;
				if !distance.is_finite() || distance < 0.0 {
					return Err(invalid("distance must be a non-negative number".into()));
				}
				let unit = match object.get("unit") {
					None | Some(Json::Null) => None,
					Some(u) => Some(
						serde_json::from_value::<DistanceUnit>(u.clone())
							.map_err(|_| invalid(format!("unknown distance unit {}", u)))?,
					),
				};
				Ok(Operand::Near {
					center,
					distance,
					unit,
				})
			}
			Arity::Box => {
				let object = raw
					.as_object()
					.ok_or_else(|| invalid("expected {south_west, north_east}".into()))?;
				let corner = |key: &str| {
					object
						.get(key)
						.ok_or_else(|| invalid(format!("missing {}", key)))
						.and_then(|p| parse_point(p).map_err(&invalid))
				};
				let south_west = corner("south_west")?;
				let north_east = corner("north_east")?;
				if south_west.lat > north_east.lat {
					return Err(invalid("south_west must be south of north_east".into()));
				}
				Ok(Operand::Bounds {
					south_west,
					north_east,
				})
			}
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Operand::List(values) => Some(values),
			_ => None,
		}
	}

	pub fn is_null_scalar(&self) -> bool {
		matches!(self, Operand::Scalar(Value::Null))
	}
}

fn parse_point(raw: &Json) -> Result<GeoPoint, String> {
	let object = raw
		.as_object()
		.ok_or_else(|| "point must be an object with lat and lng".to_string())?;
	let coord = |key: &str| {
		object
			.get(key)
			.and_then(Json::as_f64)
			.ok_or_else(|| format!("point.{} must be a number", key))
	};
	let point = GeoPoint::new(coord("lat")?, coord("lng")?);
	if !point.is_valid() {
		return Err(format!(
			"point ({}, {}) is outside WGS84 bounds",
			point.lat, point.lng
		));
	}
	Ok(point)
}

/// Coerce one JSON value into the typed value of `ty`
pub fn coerce_value(
	ty: SemanticType,
	enum_values: Option<&[String]>,
	raw: &Json,
) -> Result<Value, String> {
	let mismatch = || format!("expected {}, got {}", ty, json_kind(raw));

	match ty {
		SemanticType::String => raw
			.as_str()
			.map(|s| Value::String(s.to_string()))
			.ok_or_else(mismatch),
		SemanticType::Integer => match raw {
			Json::Number(n) => n.as_i64().map(Value::Int).ok_or_else(mismatch),
			Json::String(s) => s
				.parse::<i64>()
				.map(Value::Int)
				.map_err(|_| format!("'{}' is not an integer", s)),
			_ => Err(mismatch()),
		},
		SemanticType::Float => match raw {
			Json::Number(n) => n.as_f64().map(Value::Float).ok_or_else(mismatch),
			Json::String(s) => s
				.parse::<f64>()
				.map(Value::Float)
				.map_err(|_| format!("'{}' is not a number", s)),
			_ => Err(mismatch()),
		},
		SemanticType::Decimal => {
			let text = match raw {
				Json::Number(n) => n.to_string(),
				Json::String(s) => s.clone(),
				_ => return Err(mismatch()),
			};
			Decimal::from_str(&text)
				.or_else(|_| Decimal::from_scientific(&text))
				.map(Value::Decimal)
				.map_err(|_| format!("'{}' is not a decimal", text))
		}
		SemanticType::Boolean => raw.as_bool().map(Value::Bool).ok_or_else(mismatch),
		SemanticType::Date => {
			let s = raw.as_str().ok_or_else(mismatch)?;
			NaiveDate::parse_from_str(s, "%Y-%m-%d")
				.map(Value::Date)
				.map_err(|_| format!("'{}' is not a date (YYYY-MM-DD)", s))
		}
		SemanticType::DateTime => {
			let s = raw.as_str().ok_or_else(mismatch)?;
			parse_datetime(s)
				.map(Value::DateTime)
				.ok_or_else(|| format!("'{}' is not an RFC 3339 timestamp", s))
		}
		SemanticType::Time => {
			let s = raw.as_str().ok_or_else(mismatch)?;
			NaiveTime::parse_from_str(s, "%H:%M:%S%.f")
				.or_else(|_| NaiveTime::parse_from_str(s, "%H:%M"))
				.map(Value::Time)
				.map_err(|_| format!("'{}' is not a time (HH:MM[:SS])", s))
		}
		SemanticType::Uuid => {
			let s = raw.as_str().ok_or_else(mismatch)?;
			Uuid::parse_str(s)
				.map(Value::Uuid)
				.map_err(|_| format!("'{}' is not a UUID", s))
		}
		SemanticType::Enum => {
			let s = raw.as_str().ok_or_else(mismatch)?;
			if let Some(members) = enum_values
				&& !members.iter().any(|m| m == s)
			{
				return Err(format!(
					"'{}' is not one of {}",
					s,
					members.join(", ")
				));
			}
			Ok(Value::String(s.to_string()))
		}
		SemanticType::Json => Ok(Value::Json(raw.clone())),
		SemanticType::Coordinates => parse_point(raw).map(|p| {
			Value::Json(serde_json::json!({"lat": p.lat, "lng": p.lng}))
		}),
		SemanticType::Array(element) => {
			let items = raw.as_array().ok_or_else(mismatch)?;
			items
				.iter()
				.map(|item| coerce_value(element.scalar(), enum_values, item))
				.collect::<Result<Vec<_>, _>>()
				.map(Value::Array)
		}
	}
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
	if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
		return Some(dt.with_timezone(&Utc));
	}
	// Naive timestamps are taken as UTC
	NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
		.or_else(|_| NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f"))
		.ok()
		.map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::types::ElementType;
	use rstest::rstest;
	use serde_json::json;

	fn coerce(op: OperatorTag, ty: SemanticType, raw: Json) -> FilterResult<Operand> {
		Operand::coerce("f", op, ty, None, &raw)
	}

	#[rstest]
	#[case(SemanticType::Integer, json!(18), Value::Int(18))]
	#[case(SemanticType::Integer, json!("42"), Value::Int(42))]
	#[case(SemanticType::Float, json!(1.5), Value::Float(1.5))]
	#[case(SemanticType::Boolean, json!(true), Value::Bool(true))]
	#[case(SemanticType::String, json!("x"), Value::String("x".into()))]
	#[case(
		SemanticType::Date,
		json!("2024-02-29"),
		Value::Date(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap())
	)]
	fn test_scalar_coercion(#[case] ty: SemanticType, #[case] raw: Json, #[case] expected: Value) {
		assert_eq!(
			coerce(OperatorTag::Eq, ty, raw).unwrap(),
			Operand::Scalar(expected)
		);
	}

	#[rstest]
	fn test_decimal_and_datetime() {
		let op = coerce(OperatorTag::Gt, SemanticType::Decimal, json!("10.25")).unwrap();
		assert_eq!(op, Operand::Scalar(Value::Decimal(Decimal::new(1025, 2))));

		let op = coerce(
			OperatorTag::Lt,
			SemanticType::DateTime,
			json!("2024-01-01T09:00:00+09:00"),
		)
		.unwrap();
		match op {
			Operand::Scalar(Value::DateTime(dt)) => {
				assert_eq!(dt.to_rfc3339(), "2024-01-01T00:00:00+00:00")
			}
			other => panic!("unexpected operand: {other:?}"),
		}
	}

	#[rstest]
	#[case(SemanticType::Integer, json!("abc"))]
	#[case(SemanticType::Integer, json!(true))]
	#[case(SemanticType::Uuid, json!("not-a-uuid"))]
	#[case(SemanticType::Date, json!("2024-13-01"))]
	#[case(SemanticType::Boolean, json!("yes"))]
	fn test_scalar_mismatch(#[case] ty: SemanticType, #[case] raw: Json) {
		let err = coerce(OperatorTag::Eq, ty, raw).unwrap_err();
		assert_eq!(err.code(), "invalid_value");
	}

	#[rstest]
	fn test_null_only_for_equality() {
		assert!(
			coerce(OperatorTag::Eq, SemanticType::Integer, Json::Null)
				.unwrap()
				.is_null_scalar()
		);
		assert!(coerce(OperatorTag::Gt, SemanticType::Integer, Json::Null).is_err());
	}

	#[rstest]
	fn test_enum_membership() {
		let members = vec!["active".to_string(), "pending".to_string()];
		assert!(
			Operand::coerce(
				"status",
				OperatorTag::In,
				SemanticType::Enum,
				Some(&members),
				&json!(["active", "pending"])
			)
			.is_ok()
		);
		let err = Operand::coerce(
			"status",
			OperatorTag::Eq,
			SemanticType::Enum,
			Some(&members),
			&json!("archived"),
		)
		.unwrap_err();
		assert!(err.to_string().contains("archived"));
	}

	#[rstest]
	fn test_list_operands() {
		assert_eq!(
			coerce(OperatorTag::In, SemanticType::Integer, json!([])).unwrap(),
			Operand::List(vec![])
		);
		assert!(coerce(OperatorTag::In, SemanticType::Integer, json!(1)).is_err());
		assert!(coerce(OperatorTag::In, SemanticType::Integer, json!([1, null])).is_err());
		assert_eq!(
			coerce(
				OperatorTag::Contains,
				SemanticType::Array(ElementType::String),
				json!(["a"])
			)
			.unwrap(),
			Operand::List(vec![Value::from("a")])
		);
	}

	#[rstest]
	fn test_keys_and_documents() {
		assert_eq!(
			coerce(OperatorTag::HasKey, SemanticType::Json, json!("k")).unwrap(),
			Operand::Keys(vec!["k".into()])
		);
		assert!(coerce(OperatorTag::HasKey, SemanticType::Json, json!(["a", "b"])).is_err());
		assert!(coerce(OperatorTag::HasKeysAny, SemanticType::Json, json!([])).is_err());
		assert_eq!(
			coerce(OperatorTag::Contains, SemanticType::Json, json!({"a": 1})).unwrap(),
			Operand::Document(json!({"a": 1}))
		);
		assert!(coerce(OperatorTag::Contains, SemanticType::Json, json!(1)).is_err());
	}

	#[rstest]
	fn test_near_operand() {
		let op = coerce(
			OperatorTag::Near,
			SemanticType::Coordinates,
			json!({"point": {"lat": 35.68, "lng": 139.76}, "distance": 500, "unit": "kilometers"}),
		)
		.unwrap();
		assert_eq!(
			op,
			Operand::Near {
				center: GeoPoint::new(35.68, 139.76),
				distance: 500.0,
				unit: Some(DistanceUnit::Kilometers),
			}
		);
		assert!(
			coerce(
				OperatorTag::Near,
				SemanticType::Coordinates,
				json!({"point": {"lat": 135.0, "lng": 0.0}, "distance": 1})
			)
			.is_err()
		);
		assert!(
			coerce(
				OperatorTag::Near,
				SemanticType::Coordinates,
				json!({"point": {"lat": 1.0, "lng": 0.0}, "distance": -1})
			)
			.is_err()
		);
	}

	#[rstest]
	#[case("km", DistanceUnit::Kilometers)]
	#[case("mi", DistanceUnit::Miles)]
	#[case("feet", DistanceUnit::Feet)]
	fn test_near_operand_short_units(#[case] unit: &str, #[case] expected: DistanceUnit) {
		let op = coerce(
			OperatorTag::Near,
			SemanticType::Coordinates,
			json!({"point": {"lat": 1.0, "lng": 2.0}, "distance": 3, "unit": unit}),
		)
		.unwrap();
		assert!(matches!(op, Operand::Near { unit: Some(u), .. } if u == expected));
		assert!(
			coerce(
				OperatorTag::Near,
				SemanticType::Coordinates,
				json!({"point": {"lat": 1.0, "lng": 2.0}, "distance": 3, "unit": "furlongs"}),
			)
			.is_err()
		);
	}

	#[rstest]
	fn test_box_operand_checks_corners() {
		let ok = coerce(
			OperatorTag::WithinBox,
			SemanticType::Coordinates,
			json!({"south_west": {"lat": 1.0, "lng": 1.0}, "north_east": {"lat": 2.0, "lng": 2.0}}),
		);
		assert!(ok.is_ok());
		let err = coerce(
			OperatorTag::WithinBox,
			SemanticType::Coordinates,
			json!({"south_west": {"lat": 3.0, "lng": 1.0}, "north_east": {"lat": 2.0, "lng": 2.0}}),
		);
		assert!(err.is_err());
	}

	#[rstest]
	fn test_empty_search_is_invalid() {
		assert!(coerce(OperatorTag::Search, SemanticType::String, json!("  ")).is_err());
		assert!(coerce(OperatorTag::Like, SemanticType::String, json!("")).is_ok());
	}
}
