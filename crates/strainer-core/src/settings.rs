//! Engine settings
//!
//! Every section is `#[serde(default)]`, so a TOML file only needs the keys
//! it changes:
//!
//! ```toml
//! [compiler]
//! to_many_filter_mode = "all_match"
//!
//! [complexity]
//! base_limit = 60.0
//! ```

use crate::error::{FilterError, FilterResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// How a filter through a to-many association is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToManyMode {
	/// At least one related row matches (`EXISTS`)
	#[default]
	Exists,
	/// Every related row matches; vacuously true without related rows
	AllMatch,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompilerSettings {
	pub to_many_filter_mode: ToManyMode,
	/// Maximum association hops in one field path
	pub max_association_depth: usize,
	/// Stably sort AND/OR children by operator cost
	pub reorder_predicates: bool,
}

impl Default for CompilerSettings {
	fn default() -> Self {
		Self {
			to_many_filter_mode: ToManyMode::Exists,
			max_association_depth: 3,
			reorder_predicates: false,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplexitySettings {
	pub enabled: bool,
	/// Score limit at zero load
	pub base_limit: f64,
	/// Fraction of the adaptive limit above which queries are accepted with a warning
	pub warn_ratio: f64,
	/// How strongly load shrinks the limit
	pub load_weight: f64,
	/// Planner cost units per score point
	pub cost_divisor: f64,
	/// Estimated rows per score point
	pub rows_divisor: f64,
	/// Offsets at or above this count as large
	pub large_offset_threshold: u64,
	pub cache_enabled: bool,
	pub cache_ttl_secs: u64,
	pub cache_max_entries: usize,
}

impl Default for ComplexitySettings {
	fn default() -> Self {
		Self {
			enabled: true,
			base_limit: 75.0,
			warn_ratio: 0.7,
			load_weight: 0.7,
			cost_divisor: 100.0,
			rows_divisor: 1000.0,
			large_offset_threshold: 1000,
			cache_enabled: true,
			cache_ttl_secs: 300,
			cache_max_entries: 10_000,
		}
	}
}

impl ComplexitySettings {
	pub fn cache_ttl(&self) -> Duration {
		Duration::from_secs(self.cache_ttl_secs)
	}
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistrySettings {
	/// How long one attempt waits for the write lock
	pub lock_timeout_ms: u64,
	pub max_retries: u32,
	/// Base backoff between attempts, doubled each retry
	pub backoff_ms: u64,
}

impl Default for RegistrySettings {
	fn default() -> Self {
		Self {
			lock_timeout_ms: 50,
			max_retries: 5,
			backoff_ms: 10,
		}
	}
}

impl RegistrySettings {
	pub fn lock_timeout(&self) -> Duration {
		Duration::from_millis(self.lock_timeout_ms)
	}

	/// Backoff before retry number `attempt` (0-based), capped at 1s
	pub fn backoff(&self, attempt: u32) -> Duration {
		let factor = 1u64 << attempt.min(10);
		Duration::from_millis(self.backoff_ms.saturating_mul(factor).min(1000))
	}
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StrainerSettings {
	pub compiler: CompilerSettings,
	pub complexity: ComplexitySettings,
	pub registry: RegistrySettings,
}

impl StrainerSettings {
	pub fn from_toml_str(source: &str) -> FilterResult<Self> {
		toml::from_str(source)
			.map_err(|e| FilterError::Config(format!("invalid settings: {}", e)))
	}

	pub fn from_toml_file(path: impl AsRef<Path>) -> FilterResult<Self> {
		let path = path.as_ref();
		let source = std::fs::read_to_string(path).map_err(|e| {
			FilterError::Config(format!("cannot read {}: {}", path.display(), e))
		})?;
		Self::from_toml_str(&source)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;
	use std::io::Write;

	#[rstest]
	fn test_defaults() {
		let settings = StrainerSettings::default();
		assert_eq!(settings.compiler.to_many_filter_mode, ToManyMode::Exists);
		assert_eq!(settings.complexity.warn_ratio, 0.7);
		assert_eq!(settings.complexity.load_weight, 0.7);
		assert_eq!(settings.complexity.cache_ttl(), Duration::from_secs(300));
	}

	#[rstest]
	fn test_partial_toml() {
		let settings = StrainerSettings::from_toml_str(
			r#"
			[compiler]
			to_many_filter_mode = "all_match"

			[complexity]
			base_limit = 60.0
			"#,
		)
		.unwrap();
		assert_eq!(settings.compiler.to_many_filter_mode, ToManyMode::AllMatch);
		assert_eq!(settings.compiler.max_association_depth, 3);
		assert_eq!(settings.complexity.base_limit, 60.0);
		assert!(settings.complexity.cache_enabled);
		assert_eq!(settings.registry, RegistrySettings::default());
	}

	#[rstest]
	fn test_invalid_toml_is_reported() {
		let err = StrainerSettings::from_toml_str("[compiler]\nmax_association_depth = \"deep\"")
			.unwrap_err();
		assert!(err.to_string().contains("invalid settings"));
	}

	#[rstest]
	fn test_from_file() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		writeln!(file, "[registry]\nmax_retries = 9").unwrap();
		let settings = StrainerSettings::from_toml_file(file.path()).unwrap();
		assert_eq!(settings.registry.max_retries, 9);
	}

	#[rstest]
	#[case(0, 10)]
	#[case(1, 20)]
	#[case(3, 80)]
	#[case(12, 1000)]
	fn test_backoff_doubles_and_caps(#[case] attempt: u32, #[case] expected_ms: u64) {
		let settings = RegistrySettings::default();
		assert_eq!(settings.backoff(attempt), Duration::from_millis(expected_ms));
	}
}
