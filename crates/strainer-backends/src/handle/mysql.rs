//! MySQL and MariaDB handle

use super::{BackendHandle, LoadMetrics, redact_url};
use crate::error::{ProbeError, ProbeResult};
use crate::query::RenderedQuery;
use async_trait::async_trait;
use serde_json::Value as Json;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;
use sqlx::{MySql, MySqlPool, Row};
use strainer_core::types::AdapterId;
use strainer_core::value::Value;

#[derive(Debug, Clone)]
pub struct MySqlHandle {
	pool: MySqlPool,
	key: String,
}

impl MySqlHandle {
	pub fn new(pool: MySqlPool, key: impl Into<String>) -> Self {
		Self {
			pool,
			key: key.into(),
		}
	}

	pub async fn connect(url: &str) -> ProbeResult<Self> {
		let pool = MySqlPool::connect(url).await?;
		Ok(Self::new(pool, redact_url(url)))
	}

	pub fn pool(&self) -> &MySqlPool {
		&self.pool
	}

	async fn status_value(&self, sql: &str) -> ProbeResult<u64> {
		let row = sqlx::query(sql).fetch_one(&self.pool).await?;
		let raw: String = row.try_get(1)?;
		raw.trim()
			.parse()
			.map_err(|_| ProbeError::Parse(format!("non-numeric status value {:?}", raw)))
	}
}

#[async_trait]
impl BackendHandle for MySqlHandle {
	fn adapter(&self) -> AdapterId {
		AdapterId::MySql
	}

	fn connection_key(&self) -> String {
		self.key.clone()
	}

	async fn server_version(&self) -> ProbeResult<String> {
		let row = sqlx::query("SELECT VERSION()").fetch_one(&self.pool).await?;
		Ok(row.try_get(0)?)
	}

	async fn extensions(&self) -> ProbeResult<Vec<String>> {
		let rows = sqlx::query(
			"SELECT PLUGIN_NAME FROM information_schema.PLUGINS WHERE PLUGIN_STATUS = 'ACTIVE'",
		)
		.fetch_all(&self.pool)
		.await?;
		rows.iter()
			.map(|row| row.try_get::<String, _>(0).map_err(ProbeError::from))
			.collect()
	}

	async fn explain(&self, query: &RenderedQuery) -> ProbeResult<Json> {
		let sql = format!("EXPLAIN FORMAT=JSON {}", query.text);
		let mut statement = sqlx::query(&sql);
		for param in &query.params {
			statement = bind_value(statement, param);
		}
		let row = statement.fetch_one(&self.pool).await?;
		let raw: String = row.try_get(0)?;
		serde_json::from_str(&raw).map_err(|e| ProbeError::Parse(e.to_string()))
	}

	async fn load_metrics(&self) -> ProbeResult<LoadMetrics> {
		let running = self.status_value("SHOW GLOBAL STATUS LIKE 'Threads_running'").await?;
		let capacity = self.status_value("SHOW VARIABLES LIKE 'max_connections'").await?;
		Ok(LoadMetrics::new(running, capacity))
	}
}

fn bind_value<'q>(
	query: Query<'q, MySql, MySqlArguments>,
	value: &'q Value,
) -> Query<'q, MySql, MySqlArguments> {
	match value {
		Value::Null => query.bind(None::<String>),
		Value::Bool(b) => query.bind(b),
		Value::Int(i) => query.bind(i),
		Value::Float(f) => query.bind(f),
		Value::Decimal(d) => query.bind(d),
		Value::String(s) => query.bind(s),
		Value::Date(d) => query.bind(d),
		Value::DateTime(dt) => query.bind(dt),
		Value::Time(t) => query.bind(t),
		// UUIDs are stored as CHAR(36)
		Value::Uuid(u) => query.bind(u.to_string()),
		Value::Json(doc) => query.bind(doc.to_string()),
		Value::Array(_) => query.bind(value.to_json().to_string()),
	}
}
