//! Built-in adapters
//!
//! One module per backend. The relational adapters share the comparison and
//! pattern building blocks in [`sql`]; each decides which operators it
//! implements and how the backend-specific ones are spelled.

pub mod cockroachdb;
pub mod mssql;
pub mod mysql;
pub mod postgres;
pub mod search;
pub(crate) mod sql;
pub mod sqlite;

pub use cockroachdb::CockroachDbAdapter;
pub use mssql::MsSqlAdapter;
pub use mysql::MySqlAdapter;
pub use postgres::PostgresAdapter;
pub use search::SearchAdapter;
pub use sqlite::SqliteAdapter;
