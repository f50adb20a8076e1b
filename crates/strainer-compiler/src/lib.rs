//! # strainer-compiler
//!
//! Turns filter trees and order terms into backend-native queries.
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use serde_json::json;
//! use strainer_backends::AdapterSet;
//! use strainer_compiler::{CompileOptions, QueryCompiler, Resolver};
//! use strainer_core::{AdapterId, CompilerSettings, Queryable, QueryableRegistry, RegistrySettings};
//!
//! let users = Queryable::new("User", "users", AdapterId::Postgres).column("age", "int4");
//! let resolver = Resolver::new(
//!     Arc::new(AdapterSet::with_defaults()),
//!     Arc::new(QueryableRegistry::new(RegistrySettings::default())),
//!     CompilerSettings::default(),
//! );
//! let compiler = QueryCompiler::new(Arc::new(resolver));
//! let query = compiler
//!     .compile_payload(&users, &json!({"age": {"_gte": 18}}), &CompileOptions::default())
//!     .unwrap();
//! assert_eq!(
//!     query.render().text,
//!     r#"SELECT "users".* FROM "users" WHERE "users"."age" >= $1"#
//! );
//! ```

pub mod fields;
pub mod options;
pub mod order;
pub mod query;

pub use fields::{FieldCatalog, Resolver};
pub use options::CompileOptions;
pub use order::OrderCompiler;
pub use query::QueryCompiler;
