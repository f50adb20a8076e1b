//! Backend capability model
//!
//! An [`AdapterCapability`] records what a live backend was observed to
//! support. Detection itself lives with the backends; this module only
//! holds the data and the `supports` / `require` checks.

use crate::error::{FilterError, FilterResult};
use crate::types::AdapterId;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::LazyLock;

/// Optional backend features an operator or the analyzer can depend on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
	/// JSON documents and containment (`jsonb`, JSON1, `JSON_CONTAINS`)
	Json,
	/// `JSON_OVERLAPS` style array overlap
	JsonArrayOverlap,
	FullText,
	Regex,
	/// Geography / geometry functions
	Spatial,
	/// Native array columns
	Arrays,
	/// `NULLS FIRST` / `NULLS LAST` in ORDER BY
	NullsOrdering,
	/// Machine readable explain output
	ExplainJson,
}

impl Feature {
	pub const ALL: [Feature; 8] = [
		Feature::Json,
		Feature::JsonArrayOverlap,
		Feature::FullText,
		Feature::Regex,
		Feature::Spatial,
		Feature::Arrays,
		Feature::NullsOrdering,
		Feature::ExplainJson,
	];

	pub fn as_str(&self) -> &'static str {
		match self {
			Feature::Json => "json",
			Feature::JsonArrayOverlap => "json_array_overlap",
			Feature::FullText => "full_text",
			Feature::Regex => "regex",
			Feature::Spatial => "spatial",
			Feature::Arrays => "arrays",
			Feature::NullsOrdering => "nulls_ordering",
			Feature::ExplainJson => "explain_json",
		}
	}
}

impl fmt::Display for Feature {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Comparable `major.minor.patch` version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Version {
	pub major: u32,
	pub minor: u32,
	pub patch: u32,
}

static VERSION_RE: LazyLock<Regex> =
	LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)(?:\.(\d+))?").expect("valid version pattern"));

impl Version {
	pub const fn new(major: u32, minor: u32, patch: u32) -> Self {
		Self {
			major,
			minor,
			patch,
		}
	}

	/// Extract the first `x.y[.z]` triple from a vendor version string.
	///
	/// Vendor strings carry a lot of noise around the number
	/// (`PostgreSQL 15.4 (Debian 15.4-1.pgdg120+1) on x86_64...`,
	/// `8.0.35-0ubuntu0.22.04.1`, `CockroachDB CCL v23.1.11 ...`), so the
	/// parser searches rather than anchoring.
	pub fn parse(raw: &str) -> Option<Version> {
		let caps = VERSION_RE.captures(raw)?;
		let major = caps.get(1)?.as_str().parse().ok()?;
		let minor = caps.get(2)?.as_str().parse().ok()?;
		let patch = match caps.get(3) {
			Some(m) => m.as_str().parse().ok()?,
			None => 0,
		};
		Some(Version::new(major, minor, patch))
	}

	pub fn at_least(&self, major: u32, minor: u32, patch: u32) -> bool {
		*self >= Version::new(major, minor, patch)
	}
}

impl fmt::Display for Version {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
	}
}

/// What a backend connection was observed to support
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterCapability {
	pub adapter_id: AdapterId,
	/// `None` when the version string could not be parsed
	pub version: Option<Version>,
	pub extensions: BTreeSet<String>,
	pub feature_flags: BTreeMap<Feature, bool>,
}

impl AdapterCapability {
	pub fn new(adapter_id: AdapterId, version: Option<Version>) -> Self {
		Self {
			adapter_id,
			version,
			extensions: BTreeSet::new(),
			feature_flags: BTreeMap::new(),
		}
	}

	/// The most restrictive capability set: every optional feature off
	pub fn conservative(adapter_id: AdapterId) -> Self {
		let mut cap = Self::new(adapter_id, None);
		for feature in Feature::ALL {
			cap.feature_flags.insert(feature, false);
		}
		cap
	}

	pub fn with_feature(mut self, feature: Feature, enabled: bool) -> Self {
		self.feature_flags.insert(feature, enabled);
		self
	}

	pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
		self.extensions.insert(extension.into());
		self
	}

	pub fn has_extension(&self, name: &str) -> bool {
		self.extensions.contains(name)
	}

	/// Unknown features count as unsupported
	pub fn supports(&self, feature: Feature) -> bool {
		self.feature_flags.get(&feature).copied().unwrap_or(false)
	}

	/// Fail with an actionable error when `feature` is not available
	pub fn require(&self, feature: Feature) -> FilterResult<()> {
		if self.supports(feature) {
			return Ok(());
		}
		Err(FilterError::CapabilityMissing {
			feature,
			adapter: self.adapter_id,
			version: self.version,
			hint: remediation_hint(self.adapter_id, feature),
		})
	}

	pub fn enabled_features(&self) -> impl Iterator<Item = Feature> + '_ {
		self.feature_flags
			.iter()
			.filter(|(_, enabled)| **enabled)
			.map(|(feature, _)| *feature)
	}
}

/// Human-actionable advice for enabling a feature on a given backend
pub fn remediation_hint(adapter: AdapterId, feature: Feature) -> String {
	let hint = match (adapter, feature) {
		(AdapterId::Postgres, Feature::Spatial) => "install the postgis extension",
		(AdapterId::Postgres, _) => "upgrade PostgreSQL to a supported release",
		(AdapterId::CockroachDb, Feature::FullText) => "upgrade CockroachDB to 23.1 or later",
		(AdapterId::CockroachDb, _) => "upgrade CockroachDB to a supported release",
		(AdapterId::MySql, Feature::JsonArrayOverlap) => "upgrade MySQL to 8.0.17 or later",
		(AdapterId::MySql, Feature::Regex) => "upgrade MySQL to 8.0 or later",
		(AdapterId::MySql, _) => "upgrade MySQL to 8.0 or later",
		(AdapterId::Sqlite, Feature::Json) => "build SQLite with the JSON1 extension",
		(AdapterId::Sqlite, Feature::Regex) => "register a REGEXP function on the connection",
		(AdapterId::Sqlite, _) => "upgrade SQLite to 3.30 or later",
		(AdapterId::MsSql, Feature::FullText) => "create a full-text catalog and index",
		(AdapterId::MsSql, _) => "upgrade SQL Server to 2016 or later",
		(AdapterId::Search, _) => "upgrade the search cluster",
	};
	hint.to_string()
}
