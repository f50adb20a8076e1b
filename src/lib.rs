//! # Strainer
//!
//! Backend-agnostic compilation of client filter and order payloads into
//! native queries, with live capability detection and load-adaptive
//! complexity control.
//!
//! A filter payload such as `{"age": {"_gte": 18}, "posts": {"views": {"_gt": 100}}}`
//! is parsed into a [`FilterNode`] tree, checked against the caller's
//! allow-list, resolved through the queryable's associations and rendered
//! by the adapter that owns the queryable: parameterized SQL for Postgres,
//! CockroachDB, MySQL, SQLite and SQL Server, or a JSON request body for an
//! Elasticsearch-compatible search engine.
//!
//! ## Crates
//!
//! - [`strainer_core`]: filter and order ASTs, operators, queryable metadata,
//!   settings, errors
//! - [`strainer_backends`]: adapters, SQL dialects, the search request body,
//!   capability detection and live backend handles
//! - [`strainer_compiler`]: the filter and order compilers
//! - [`strainer_complexity`]: explain-plan and heuristic scoring with
//!   load-adaptive admission (feature `complexity`, on by default)
//!
//! ## Quick Example
//!
//! ```
//! use strainer::prelude::*;
//! use serde_json::json;
//!
//! let strainer = Strainer::default();
//! strainer
//! 	.register(
//! 		Queryable::new("User", "users", AdapterId::Postgres)
//! 			.column("age", "integer")
//! 			.column("name", "text"),
//! 	)
//! 	.unwrap();
//!
//! let query = strainer
//! 	.compile_payload(
//! 		&QueryableId::from("User"),
//! 		&json!({"_or": [{"age": {"_lt": 18}}, {"name": {"_eq": "root"}}]}),
//! 		&CompileOptions::new(),
//! 	)
//! 	.unwrap();
//! assert_eq!(
//! 	query.render().text,
//! 	r#"SELECT "users".* FROM "users" WHERE "users"."age" < $1 OR "users"."name" = $2"#
//! );
//! ```
//!
//! ## Configuration
//!
//! [`StrainerSettings`] is read from TOML; every key is optional:
//!
//! ```toml
//! [compiler]
//! to_many_filter_mode = "exists"
//! max_association_depth = 3
//!
//! [complexity]
//! base_limit = 75.0
//! cache_ttl_secs = 300
//! ```

mod engine;

pub use engine::Strainer;

pub use strainer_backends;
pub use strainer_compiler;
#[cfg(feature = "complexity")]
pub use strainer_complexity;
pub use strainer_core;

pub use strainer_backends::{
	Adapter, AdapterSet, BackendHandle, CapabilityCache, CompiledQuery, LoadMetrics, MySqlHandle,
	PgHandle, ProbeError, RenderedQuery, SearchHandle, SqliteHandle,
};
pub use strainer_compiler::{CompileOptions, OrderCompiler, QueryCompiler};
#[cfg(feature = "complexity")]
pub use strainer_complexity::{
	AnalysisMethod, ComplexityAnalysis, ComplexityAnalyzer, ComplexityCheck, Verdict,
};
pub use strainer_core::{
	AdapterCapability, AdapterId, FieldAccess, FilterError, FilterNode, FilterResult, OrderTerm,
	Queryable, QueryableId, StrainerSettings, ToManyMode,
};

/// Everything needed to configure an engine and compile payloads
pub mod prelude {
	pub use crate::Strainer;
	pub use strainer_backends::{BackendHandle, CompiledQuery, LoadMetrics};
	pub use strainer_compiler::CompileOptions;
	pub use strainer_core::{
		AdapterId, Direction, FieldAccess, FilterError, FilterNode, FilterResult, NullsOrder,
		OperatorTag, OrderTerm, Queryable, QueryableId, StrainerSettings, ToManyMode,
	};

	#[cfg(feature = "complexity")]
	pub use strainer_complexity::{ComplexityCheck, Verdict};
}
