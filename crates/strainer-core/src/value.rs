//! Typed operand values
//!
//! Filter payloads arrive as loosely typed JSON. Before an operator reaches an
//! adapter, every operand is coerced into a [`Value`] that matches the
//! semantic type of the field it is applied to.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// A bound operand value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
	Null,
	Bool(bool),
	Int(i64),
	Float(f64),
	Decimal(Decimal),
	String(String),
	Date(NaiveDate),
	DateTime(DateTime<Utc>),
	Time(NaiveTime),
	Uuid(Uuid),
	/// Arbitrary JSON document (jsonb containment, search terms, ...)
	Json(serde_json::Value),
	/// Homogeneous list, used for array-typed columns
	Array(Vec<Value>),
}

impl Value {
	pub fn is_null(&self) -> bool {
		matches!(self, Value::Null)
	}

	/// Short name of the variant, used in error messages
	pub fn kind(&self) -> &'static str {
		match self {
			Value::Null => "null",
			Value::Bool(_) => "boolean",
			Value::Int(_) => "integer",
			Value::Float(_) => "float",
			Value::Decimal(_) => "decimal",
			Value::String(_) => "string",
			Value::Date(_) => "date",
			Value::DateTime(_) => "datetime",
			Value::Time(_) => "time",
			Value::Uuid(_) => "uuid",
			Value::Json(_) => "json",
			Value::Array(_) => "array",
		}
	}

	/// Convert the value back to JSON.
	///
	/// The search adapter embeds operands directly in the request body, so
	/// the conversion has to be lossless for every scalar kind.
	pub fn to_json(&self) -> serde_json::Value {
		use serde_json::Value as Json;

		match self {
			Value::Null => Json::Null,
			Value::Bool(b) => Json::Bool(*b),
			Value::Int(i) => Json::from(*i),
			Value::Float(f) => serde_json::Number::from_f64(*f)
				.map(Json::Number)
				.unwrap_or(Json::Null),
			Value::Decimal(d) => Json::String(d.to_string()),
			Value::String(s) => Json::String(s.clone()),
			Value::Date(d) => Json::String(d.format("%Y-%m-%d").to_string()),
			Value::DateTime(dt) => Json::String(dt.to_rfc3339()),
			Value::Time(t) => Json::String(t.format("%H:%M:%S%.f").to_string()),
			Value::Uuid(u) => Json::String(u.to_string()),
			Value::Json(v) => v.clone(),
			Value::Array(items) => Json::Array(items.iter().map(Value::to_json).collect()),
		}
	}
}

impl fmt::Display for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Value::Null => write!(f, "NULL"),
			Value::Bool(b) => write!(f, "{}", b),
			Value::Int(i) => write!(f, "{}", i),
			Value::Float(v) => write!(f, "{}", v),
			Value::Decimal(d) => write!(f, "{}", d),
			Value::String(s) => write!(f, "'{}'", s.replace('\'', "''")),
			Value::Date(d) => write!(f, "'{}'", d),
			Value::DateTime(dt) => write!(f, "'{}'", dt.to_rfc3339()),
			Value::Time(t) => write!(f, "'{}'", t),
			Value::Uuid(u) => write!(f, "'{}'", u),
			Value::Json(v) => write!(f, "'{}'", v),
			Value::Array(items) => {
				write!(f, "[")?;
				for (i, item) in items.iter().enumerate() {
					if i > 0 {
						write!(f, ", ")?;
					}
					write!(f, "{}", item)?;
				}
				write!(f, "]")
			}
		}
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Value::String(s.to_string())
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Value::String(s)
	}
}

impl From<i64> for Value {
	fn from(i: i64) -> Self {
		Value::Int(i)
	}
}

impl From<i32> for Value {
	fn from(i: i32) -> Self {
		Value::Int(i as i64)
	}
}

impl From<f64> for Value {
	fn from(f: f64) -> Self {
		Value::Float(f)
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Value::Bool(b)
	}
}

impl From<Uuid> for Value {
	fn from(u: Uuid) -> Self {
		Value::Uuid(u)
	}
}

impl From<DateTime<Utc>> for Value {
	fn from(dt: DateTime<Utc>) -> Self {
		Value::DateTime(dt)
	}
}

/// A WGS84 coordinate pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
	pub lat: f64,
	pub lng: f64,
}

impl GeoPoint {
	pub fn new(lat: f64, lng: f64) -> Self {
		Self { lat, lng }
	}

	pub fn is_valid(&self) -> bool {
		(-90.0..=90.0).contains(&self.lat) && (-180.0..=180.0).contains(&self.lng)
	}

	/// Well-known text representation, longitude first
	pub fn to_wkt(&self) -> String {
		format!("POINT({} {})", self.lng, self.lat)
	}
}

/// Unit used to interpret the distance of a `_near` operand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceUnit {
	#[default]
	#[serde(alias = "m")]
	Meters,
	#[serde(alias = "km")]
	Kilometers,
	#[serde(alias = "mi")]
	Miles,
	#[serde(alias = "ft")]
	Feet,
}

impl DistanceUnit {
	/// Convert distance to meters
	pub fn to_meters(self, distance: f64) -> f64 {
		match self {
			DistanceUnit::Meters => distance,
			DistanceUnit::Kilometers => distance * 1000.0,
			DistanceUnit::Miles => distance * 1609.34,
			DistanceUnit::Feet => distance * 0.3048,
		}
	}

	/// Suffix understood by search engines (`10km`, `3mi`, ...)
	pub fn search_suffix(self) -> &'static str {
		match self {
			DistanceUnit::Meters => "m",
			DistanceUnit::Kilometers => "km",
			DistanceUnit::Miles => "mi",
			DistanceUnit::Feet => "ft",
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(DistanceUnit::Meters, 10.0, 10.0)]
	#[case(DistanceUnit::Kilometers, 2.0, 2000.0)]
	#[case(DistanceUnit::Feet, 10.0, 3.048)]
	fn test_distance_unit_to_meters(
		#[case] unit: DistanceUnit,
		#[case] distance: f64,
		#[case] expected: f64,
	) {
		assert!((unit.to_meters(distance) - expected).abs() < 1e-9);
	}

	#[rstest]
	#[case("m", DistanceUnit::Meters)]
	#[case("km", DistanceUnit::Kilometers)]
	#[case("kilometers", DistanceUnit::Kilometers)]
	#[case("mi", DistanceUnit::Miles)]
	#[case("ft", DistanceUnit::Feet)]
	fn test_distance_unit_accepts_suffixes(#[case] raw: &str, #[case] expected: DistanceUnit) {
		let unit: DistanceUnit = serde_json::from_value(serde_json::json!(raw)).unwrap();
		assert_eq!(unit, expected);
		let suffix: DistanceUnit = serde_json::from_value(serde_json::json!(expected.search_suffix())).unwrap();
		assert_eq!(suffix, expected);
	}

	#[rstest]
	fn test_value_to_json_keeps_scalars() {
		assert_eq!(Value::Int(3).to_json(), serde_json::json!(3));
		assert_eq!(Value::from("a").to_json(), serde_json::json!("a"));
		assert_eq!(
			Value::Array(vec![Value::Int(1), Value::Int(2)]).to_json(),
			serde_json::json!([1, 2])
		);
	}

	#[rstest]
	fn test_value_display_escapes_quotes() {
		assert_eq!(Value::from("O'Brien").to_string(), "'O''Brien'");
	}

	#[rstest]
	fn test_geo_point_validity() {
		assert!(GeoPoint::new(35.0, 139.0).is_valid());
		assert!(!GeoPoint::new(95.0, 0.0).is_valid());
	}
}
