//! Probe errors
//!
//! Failures talking to a live backend. They never reach callers of the
//! compiler or the analyzer: every probe has a fallback and the error is
//! only logged.

use strainer_core::types::AdapterId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProbeError {
	#[error("Database error: {0}")]
	Database(#[from] sqlx::Error),

	#[error("HTTP error: {0}")]
	Http(#[from] reqwest::Error),

	#[error("Parse error: {0}")]
	Parse(String),

	#[error("{operation} is not supported by {adapter}")]
	Unsupported {
		adapter: AdapterId,
		operation: &'static str,
	},
}

impl ProbeError {
	pub fn unsupported(adapter: AdapterId, operation: &'static str) -> Self {
		ProbeError::Unsupported { adapter, operation }
	}
}

pub type ProbeResult<T> = Result<T, ProbeError>;

#[cfg(test)]
mod tests {
	use super::*;
	use rstest::rstest;

	#[rstest]
	fn test_unsupported_message() {
		let err = ProbeError::unsupported(AdapterId::Sqlite, "explain");
		assert_eq!(err.to_string(), "explain is not supported by sqlite");
	}
}
