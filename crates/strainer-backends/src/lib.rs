//! # strainer-backends
//!
//! Everything that knows about a concrete backend:
//!
//! - [`adapter`]: the adapter contract and the configured [`AdapterSet`]
//! - [`adapters`]: Postgres, CockroachDB, MySQL, SQLite, SQL Server and
//!   search-engine operator implementations
//! - [`sql`] and [`search`]: the query values adapters build
//! - [`query`]: [`CompiledQuery`], the value the compiler mutates
//! - [`capability`] and [`handle`]: live capability detection, explain and
//!   load probes
//!
//! ## Example
//!
//! ```
//! use strainer_backends::{Adapter, ApplyOptions, PostgresAdapter};
//! use strainer_core::{AdapterId, FieldDescriptor, Operand, OperatorTag, Queryable, SemanticType, Value};
//!
//! let adapter = PostgresAdapter::new();
//! let users = Queryable::new("User", "users", AdapterId::Postgres);
//! let age = FieldDescriptor::scalar("age", SemanticType::Integer);
//! let query = adapter
//! 	.apply_operator(
//! 		adapter.new_query(&users),
//! 		&age,
//! 		OperatorTag::Gte,
//! 		&Operand::Scalar(Value::Int(18)),
//! 		&ApplyOptions::default(),
//! 	)
//! 	.into_query();
//! assert_eq!(
//! 	query.render().text,
//! 	r#"SELECT "users".* FROM "users" WHERE "users"."age" >= $1"#
//! );
//! ```

pub mod adapter;
pub mod adapters;
pub mod capability;
pub mod error;
pub mod handle;
pub mod query;
pub mod search;
pub mod sql;

pub use adapter::{Adapter, AdapterSet, ApplyOptions, Dispatch};
pub use adapters::{
	CockroachDbAdapter, MsSqlAdapter, MySqlAdapter, PostgresAdapter, SearchAdapter, SqliteAdapter,
};
pub use capability::{CapabilityCache, capability_from, detect};
pub use error::{ProbeError, ProbeResult};
pub use handle::{BackendHandle, LoadMetrics, MySqlHandle, PgHandle, SearchHandle, SqliteHandle};
pub use query::{CompiledQuery, Predicate, PredicateKind, RenderedQuery};
pub use search::{SearchClause, SearchRequest};
pub use sql::{SelectQuery, SqlDialect};
