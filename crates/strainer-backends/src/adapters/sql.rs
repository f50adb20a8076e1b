//! Building blocks shared by the relational adapters

use crate::adapter::ApplyOptions;
use crate::sql::{BinOp, Expr};
use serde_json::Value as Json;
use strainer_core::operand::Operand;
use strainer_core::operators::OperatorTag;
use strainer_core::types::{ElementType, FieldDescriptor, SemanticType};
use strainer_core::value::{GeoPoint, Value};

/// Column of `field` qualified by the binding alias
pub(crate) fn column(field: &FieldDescriptor, options: &ApplyOptions) -> Expr {
	let binding = options.binding();
	Expr::column((!binding.is_empty()).then_some(binding), field.column.clone())
}

/// Comparison, membership and null checks.
///
/// `param` turns an operand value into the expression it is compared
/// against, which lets a dialect add casts.
pub(crate) fn comparison(
	col: Expr,
	operator: OperatorTag,
	operand: &Operand,
	param: impl Fn(Value) -> Expr,
) -> Option<Expr> {
	let binop = |op: BinOp, value: &Value| Some(Expr::binary(col.clone(), op, param(value.clone())));

	match (operator, operand) {
		(OperatorTag::Eq, Operand::Scalar(Value::Null)) => Some(Expr::is_null(col, false)),
		(OperatorTag::Neq, Operand::Scalar(Value::Null)) => Some(Expr::is_null(col, true)),
		(OperatorTag::Eq, Operand::Scalar(value)) => binop(BinOp::Eq, value),
		(OperatorTag::Neq, Operand::Scalar(value)) => binop(BinOp::Ne, value),
		(OperatorTag::Gt, Operand::Scalar(value)) => binop(BinOp::Gt, value),
		(OperatorTag::Gte, Operand::Scalar(value)) => binop(BinOp::Gte, value),
		(OperatorTag::Lt, Operand::Scalar(value)) => binop(BinOp::Lt, value),
		(OperatorTag::Lte, Operand::Scalar(value)) => binop(BinOp::Lte, value),
		// Empty lists short-circuit instead of rendering `IN ()`
		(OperatorTag::In, Operand::List(values)) if values.is_empty() => Some(Expr::Constant(false)),
		(OperatorTag::Nin, Operand::List(values)) if values.is_empty() => Some(Expr::Constant(true)),
		(OperatorTag::In, Operand::List(values)) => Some(Expr::in_list(
			col,
			values.iter().cloned().map(&param).collect(),
			false,
		)),
		(OperatorTag::Nin, Operand::List(values)) => Some(Expr::in_list(
			col,
			values.iter().cloned().map(&param).collect(),
			true,
		)),
		(OperatorTag::IsNull, Operand::Flag(is_null)) => Some(Expr::is_null(col, !is_null)),
		_ => None,
	}
}

/// How a dialect spells case-sensitive and case-insensitive matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LikeStyle {
	/// `LIKE` / `ILIKE`
	Native,
	/// `LIKE` under the column collation, `LOWER() LIKE LOWER()` for the
	/// insensitive forms. `escape_clause` appends `ESCAPE '\'`.
	Lower { escape_clause: bool },
	/// SQLite: `GLOB` is case-sensitive, `LIKE` is not
	Glob,
}

/// `_like`, `_nlike`, `_ilike`, `_nilike`, `_starts_with`, `_ends_with` and
/// `_includes`
pub(crate) fn text_match(
	col: Expr,
	operator: OperatorTag,
	pattern: &str,
	style: LikeStyle,
) -> Option<Expr> {
	let value = || Expr::value(pattern.to_string());

	if let Some(affixed) = affix(operator, pattern, style) {
		return Some(match style {
			LikeStyle::Glob => Expr::template("{} GLOB {}", vec![col, Expr::value(affixed)]),
			LikeStyle::Lower {
				escape_clause: false,
			} => Expr::binary(col, BinOp::Like, Expr::value(affixed)),
			_ => Expr::template("{} LIKE {} ESCAPE '\\'", vec![col, Expr::value(affixed)]),
		});
	}

	let expr = match (style, operator) {
		(LikeStyle::Glob, OperatorTag::Like) => {
			Expr::template("{} GLOB {}", vec![col, Expr::value(like_to_glob(pattern))])
		}
		(LikeStyle::Glob, OperatorTag::Nlike) => {
			Expr::template("{} NOT GLOB {}", vec![col, Expr::value(like_to_glob(pattern))])
		}
		(LikeStyle::Glob, OperatorTag::Ilike) => Expr::binary(col, BinOp::Like, value()),
		(LikeStyle::Glob, OperatorTag::Nilike) => Expr::binary(col, BinOp::NotLike, value()),
		(LikeStyle::Native, OperatorTag::Ilike) => Expr::binary(col, BinOp::ILike, value()),
		(LikeStyle::Native, OperatorTag::Nilike) => Expr::binary(col, BinOp::NotILike, value()),
		(LikeStyle::Lower { .. }, OperatorTag::Ilike) => {
			Expr::template("LOWER({}) LIKE LOWER({})", vec![col, value()])
		}
		(LikeStyle::Lower { .. }, OperatorTag::Nilike) => {
			Expr::template("LOWER({}) NOT LIKE LOWER({})", vec![col, value()])
		}
		(_, OperatorTag::Like) => Expr::binary(col, BinOp::Like, value()),
		(_, OperatorTag::Nlike) => Expr::binary(col, BinOp::NotLike, value()),
		_ => return None,
	};
	Some(expr)
}

fn affix(operator: OperatorTag, raw: &str, style: LikeStyle) -> Option<String> {
	let (escaped, any) = match style {
		LikeStyle::Glob => (glob_escape(raw), "*"),
		_ => (like_escape(raw), "%"),
	};
	match operator {
		OperatorTag::StartsWith => Some(format!("{}{}", escaped, any)),
		OperatorTag::EndsWith => Some(format!("{}{}", any, escaped)),
		OperatorTag::Includes => Some(format!("{}{}{}", any, escaped, any)),
		_ => None,
	}
}

/// Escape LIKE metacharacters with a backslash
pub(crate) fn like_escape(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	for c in raw.chars() {
		if matches!(c, '\\' | '%' | '_' | '[') {
			out.push('\\');
		}
		out.push(c);
	}
	out
}

pub(crate) fn glob_escape(raw: &str) -> String {
	let mut out = String::with_capacity(raw.len());
	for c in raw.chars() {
		match c {
			'*' => out.push_str("[*]"),
			'?' => out.push_str("[?]"),
			'[' => out.push_str("[[]"),
			other => out.push(other),
		}
	}
	out
}

/// Translate a LIKE pattern into the equivalent GLOB pattern
pub(crate) fn like_to_glob(pattern: &str) -> String {
	let mut out = String::with_capacity(pattern.len());
	for c in pattern.chars() {
		match c {
			'%' => out.push('*'),
			'_' => out.push('?'),
			other => out.push_str(&glob_escape(&other.to_string())),
		}
	}
	out
}

pub(crate) fn pattern(operand: &Operand) -> Option<&str> {
	match operand {
		Operand::Pattern(p) => Some(p),
		_ => None,
	}
}

pub(crate) fn keys(operand: &Operand) -> Option<&[String]> {
	match operand {
		Operand::Keys(keys) if !keys.is_empty() => Some(keys),
		_ => None,
	}
}

/// JSON path addressing one top-level key: `$."key"`
pub(crate) fn json_path(key: &str) -> String {
	format!("$.\"{}\"", key.replace('\\', "\\\\").replace('"', "\\\""))
}

/// A list operand as one JSON array parameter
pub(crate) fn json_array(values: &[Value]) -> Value {
	Value::Json(Json::Array(values.iter().map(Value::to_json).collect()))
}

/// Distance of a `_near` operand in meters
pub(crate) fn near_meters(operand: &Operand, options: &ApplyOptions) -> Option<(GeoPoint, f64)> {
	match operand {
		Operand::Near {
			center,
			distance,
			unit,
		} => {
			let unit = unit.or(options.distance_unit).unwrap_or_default();
			Some((*center, unit.to_meters(*distance)))
		}
		_ => None,
	}
}

pub(crate) fn bounds(operand: &Operand) -> Option<(GeoPoint, GeoPoint)> {
	match operand {
		Operand::Bounds {
			south_west,
			north_east,
		} => Some((*south_west, *north_east)),
		_ => None,
	}
}

/// Counter-clockwise WKT polygon of a bounding box
pub(crate) fn bbox_wkt(south_west: GeoPoint, north_east: GeoPoint) -> String {
	let (w, s, e, n) = (south_west.lng, south_west.lat, north_east.lng, north_east.lat);
	format!(
		"POLYGON(({w} {s}, {e} {s}, {e} {n}, {w} {n}, {w} {s}))",
		w = w,
		s = s,
		e = e,
		n = n
	)
}

/// Lower-cased native type with any `(precision, scale)` suffix removed
pub(crate) fn base_type(native: &str) -> String {
	let lowered = native.trim().to_ascii_lowercase();
	match lowered.find('(') {
		Some(open) => {
			let close = lowered.rfind(')').map_or(lowered.len(), |i| i + 1);
			format!("{}{}", lowered[..open].trim_end(), &lowered[close..])
		}
		None => lowered,
	}
}

/// Element type name of an array type (`int4[]`, or `_int4` on Postgres)
pub(crate) fn array_element(base: &str) -> Option<&str> {
	base.strip_suffix("[]").map(str::trim_end)
}

/// Array type over a scalar element type
pub(crate) fn array_of(element: Option<SemanticType>) -> Option<SemanticType> {
	element
		.and_then(ElementType::from_scalar)
		.map(SemanticType::Array)
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case("50%_off", "50\\%\\_off")]
	#[case("a\\b", "a\\\\b")]
	#[case("[x]", "\\[x]")]
	fn test_like_escape(#[case] raw: &str, #[case] expected: &str) {
		assert_eq!(like_escape(raw), expected);
	}

	#[rstest]
	#[case("a%b_c", "a*b?c")]
	#[case("5*", "5[*]")]
	fn test_like_to_glob(#[case] raw: &str, #[case] expected: &str) {
		assert_eq!(like_to_glob(raw), expected);
	}

	#[rstest]
	#[case("VARCHAR(255)", "varchar")]
	#[case("numeric(10, 2)", "numeric")]
	#[case("geography(Point, 4326)", "geography")]
	#[case("varchar(20)[]", "varchar[]")]
	#[case(" int4 ", "int4")]
	fn test_base_type(#[case] native: &str, #[case] expected: &str) {
		assert_eq!(base_type(native), expected);
	}

	#[rstest]
	fn test_empty_lists_short_circuit() {
		let col = Expr::column(None, "age");
		assert_eq!(
			comparison(col.clone(), OperatorTag::In, &Operand::List(vec![]), Expr::Value),
			Some(Expr::Constant(false))
		);
		assert_eq!(
			comparison(col, OperatorTag::Nin, &Operand::List(vec![]), Expr::Value),
			Some(Expr::Constant(true))
		);
	}

	#[rstest]
	fn test_json_path_quotes_key() {
		assert_eq!(json_path("a\"b"), "$.\"a\\\"b\"");
	}

	#[rstest]
	fn test_bbox_wkt() {
		assert_eq!(
			bbox_wkt(GeoPoint::new(1.0, 2.0), GeoPoint::new(3.0, 4.0)),
			"POLYGON((2 1, 4 1, 4 3, 2 3, 2 1))"
		);
	}
}
