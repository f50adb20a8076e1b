//! Filterable-field allow-list
//!
//! The authorization layer decides which fields a caller may filter on and
//! hands the decision over as a [`FieldAccess`]. The compiler rejects the
//! whole filter if any referenced path falls outside it.

use crate::error::{FilterError, FilterResult};
use crate::types::FieldPath;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldAccess {
	#[default]
	All,
	None,
	/// Dotted paths. A path authorizes itself and everything below it.
	Only(BTreeSet<String>),
}

impl FieldAccess {
	pub fn only<I, S>(fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		FieldAccess::Only(fields.into_iter().map(Into::into).collect())
	}

	pub fn allows(&self, path: &FieldPath) -> bool {
		match self {
			FieldAccess::All => true,
			FieldAccess::None => false,
			FieldAccess::Only(allowed) => path.prefixes().any(|p| allowed.contains(&p.dotted())),
		}
	}

	/// Reject when any path is not allowed, naming every offender
	pub fn check<'a, I>(&self, paths: I) -> FilterResult<()>
	where
		I: IntoIterator<Item = &'a FieldPath>,
	{
		let mut denied: Vec<String> = Vec::new();
		for path in paths {
			let dotted = path.dotted();
			if !self.allows(path) && !denied.contains(&dotted) {
				denied.push(dotted);
			}
		}
		if denied.is_empty() {
			Ok(())
		} else {
			Err(FilterError::UnauthorizedField { fields: denied })
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	#[case(FieldAccess::All, "salary", true)]
	#[case(FieldAccess::None, "name", false)]
	#[case(FieldAccess::only(["name"]), "name", true)]
	#[case(FieldAccess::only(["name"]), "salary", false)]
	#[case(FieldAccess::only(["organization"]), "organization.name", true)]
	#[case(FieldAccess::only(["organization.name"]), "organization.revenue", false)]
	fn test_allows(#[case] access: FieldAccess, #[case] path: &str, #[case] expected: bool) {
		assert_eq!(access.allows(&FieldPath::parse(path)), expected);
	}

	#[rstest]
	fn test_check_names_all_offenders_once() {
		let access = FieldAccess::only(["name"]);
		let paths = [
			FieldPath::parse("name"),
			FieldPath::parse("salary"),
			FieldPath::parse("ssn"),
			FieldPath::parse("salary"),
		];
		let err = access.check(paths.iter()).unwrap_err();
		assert_eq!(
			err,
			FilterError::UnauthorizedField {
				fields: vec!["salary".into(), "ssn".into()]
			}
		);
	}
}
