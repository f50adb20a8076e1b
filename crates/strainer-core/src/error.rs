//! Caller-visible error taxonomy
//!
//! Every variant is a local validation failure detected before a query ever
//! reaches a backend. None of them are retried.

use crate::capability::{Feature, Version};
use crate::types::AdapterId;
use thiserror::Error;

/// Errors raised while validating and compiling filters or order terms
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FilterError {
	#[error("Unknown field '{field}' on {queryable}")]
	UnknownField { queryable: String, field: String },

	#[error("Operator {operator} is not supported for field '{field}': {reason}")]
	UnsupportedOperator {
		field: String,
		operator: String,
		reason: String,
	},

	#[error("Invalid value for {field} {operator}: {reason}")]
	InvalidValue {
		field: String,
		operator: String,
		reason: String,
	},

	#[error("Unauthorized filter field(s): {}", .fields.join(", "))]
	UnauthorizedField { fields: Vec<String> },

	#[error("Cannot order by '{path}': {reason}")]
	NotOrderable { path: String, reason: String },

	#[error("No adapter handles queryable {queryable}")]
	AdapterUnavailable { queryable: String },

	#[error(
		"{feature} is required but not available on {adapter}{}: {hint}",
		.version.map(|v| format!(" {}", v)).unwrap_or_default()
	)]
	CapabilityMissing {
		feature: Feature,
		adapter: AdapterId,
		version: Option<Version>,
		hint: String,
	},

	#[error("Malformed filter: {0}")]
	MalformedFilter(String),

	#[error("Registry error: {0}")]
	Registry(String),

	#[error("Configuration error: {0}")]
	Config(String),
}

impl FilterError {
	/// Stable machine-readable code for API layers
	pub fn code(&self) -> &'static str {
		match self {
			FilterError::UnknownField { .. } => "unknown_field",
			FilterError::UnsupportedOperator { .. } => "unsupported_operator",
			FilterError::InvalidValue { .. } => "invalid_value",
			FilterError::UnauthorizedField { .. } => "unauthorized_field",
			FilterError::NotOrderable { .. } => "not_orderable",
			FilterError::AdapterUnavailable { .. } => "adapter_unavailable",
			FilterError::CapabilityMissing { .. } => "capability_missing",
			FilterError::MalformedFilter(_) => "malformed_filter",
			FilterError::Registry(_) => "registry",
			FilterError::Config(_) => "config",
		}
	}

	pub fn invalid_value(
		field: impl Into<String>,
		operator: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		FilterError::InvalidValue {
			field: field.into(),
			operator: operator.into(),
			reason: reason.into(),
		}
	}

	pub fn unsupported(
		field: impl Into<String>,
		operator: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		FilterError::UnsupportedOperator {
			field: field.into(),
			operator: operator.into(),
			reason: reason.into(),
		}
	}
}

pub type FilterResult<T> = Result<T, FilterError>;
