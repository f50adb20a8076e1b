//! PostgreSQL and CockroachDB handle

use super::{BackendHandle, LoadMetrics, redact_url};
use crate::error::{ProbeError, ProbeResult};
use crate::query::RenderedQuery;
use async_trait::async_trait;
use serde_json::Value as Json;
use sqlx::postgres::PgArguments;
use sqlx::query::Query;
use sqlx::{PgPool, Postgres, Row};
use strainer_core::capability::Feature;
use strainer_core::types::AdapterId;
use strainer_core::value::Value;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct PgHandle {
	adapter: AdapterId,
	pool: PgPool,
	key: String,
}

impl PgHandle {
	pub fn new(pool: PgPool, key: impl Into<String>) -> Self {
		Self {
			adapter: AdapterId::Postgres,
			pool,
			key: key.into(),
		}
	}

	/// Connect a dedicated pool; the redacted URL becomes the connection key
	pub async fn connect(url: &str) -> ProbeResult<Self> {
		let pool = PgPool::connect(url).await?;
		Ok(Self::new(pool, redact_url(url)))
	}

	/// Treat the target as CockroachDB, which speaks the Postgres protocol
	pub fn cockroachdb(mut self) -> Self {
		self.adapter = AdapterId::CockroachDb;
		self
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}

	fn pool_load(&self) -> LoadMetrics {
		let active = self.pool.size().saturating_sub(self.pool.num_idle() as u32);
		LoadMetrics::new(
			u64::from(active),
			u64::from(self.pool.options().get_max_connections()),
		)
	}
}

#[async_trait]
impl BackendHandle for PgHandle {
	fn adapter(&self) -> AdapterId {
		self.adapter
	}

	fn connection_key(&self) -> String {
		self.key.clone()
	}

	async fn server_version(&self) -> ProbeResult<String> {
		let row = sqlx::query("SELECT version()").fetch_one(&self.pool).await?;
		Ok(row.try_get(0)?)
	}

	async fn extensions(&self) -> ProbeResult<Vec<String>> {
		let rows = sqlx::query("SELECT extname FROM pg_extension")
			.fetch_all(&self.pool)
			.await?;
		rows.iter()
			.map(|row| row.try_get::<String, _>(0).map_err(ProbeError::from))
			.collect()
	}

	async fn probe_feature(&self, feature: Feature) -> ProbeResult<Option<bool>> {
		if self.adapter != AdapterId::CockroachDb || feature != Feature::Spatial {
			return Ok(None);
		}
		// Spatial support ships with CockroachDB but can be disabled per cluster
		let probe = sqlx::query("SELECT ST_MakePoint(0, 0) IS NOT NULL")
			.fetch_one(&self.pool)
			.await;
		Ok(Some(probe.is_ok()))
	}

	async fn explain(&self, query: &RenderedQuery) -> ProbeResult<Json> {
		if self.adapter != AdapterId::Postgres {
			return Err(ProbeError::unsupported(self.adapter, "explain"));
		}
		let sql = format!("EXPLAIN (FORMAT JSON) {}", query.text);
		let mut statement = sqlx::query(&sql);
		for param in &query.params {
			statement = bind_value(statement, param);
		}
		let row = statement.fetch_one(&self.pool).await?;
		Ok(row.try_get::<Json, _>(0)?)
	}

	async fn load_metrics(&self) -> ProbeResult<LoadMetrics> {
		if self.adapter != AdapterId::Postgres {
			return Ok(self.pool_load());
		}
		let row = sqlx::query(
			"SELECT \
				(SELECT count(*) FROM pg_stat_activity WHERE state = 'active') AS active, \
				current_setting('max_connections')::int8 AS capacity, \
				(SELECT sum(blks_hit)::float8 / nullif(sum(blks_hit) + sum(blks_read), 0) \
					FROM pg_stat_database) AS hit_ratio",
		)
		.fetch_one(&self.pool)
		.await?;
		let active: i64 = row.try_get("active")?;
		let capacity: i64 = row.try_get("capacity")?;
		let hit_ratio: Option<f64> = row.try_get("hit_ratio")?;
		Ok(LoadMetrics::new(active.max(0) as u64, capacity.max(0) as u64).with_cache_hit_ratio(hit_ratio))
	}
}

fn bind_value<'q>(
	query: Query<'q, Postgres, PgArguments>,
	value: &'q Value,
) -> Query<'q, Postgres, PgArguments> {
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
		Value::Uuid(u) => query.bind(u),
		Value::Json(doc) => query.bind(sqlx::types::Json(doc)),
		Value::Array(items) => bind_array(query, items),
	}
}

/// Arrays bind with the element type of their first member; mixed lists
/// fall back to text and rely on the placeholder cast
fn bind_array<'q>(
	query: Query<'q, Postgres, PgArguments>,
	items: &'q [Value],
) -> Query<'q, Postgres, PgArguments> {
	match items.first() {
		Some(Value::Int(_)) if items.iter().all(|v| matches!(v, Value::Int(_))) => {
			query.bind(collect(items, |v| match v {
				Value::Int(i) => Some(*i),
				_ => None,
			}))
		}
		Some(Value::Float(_)) if items.iter().all(|v| matches!(v, Value::Float(_))) => {
			query.bind(collect(items, |v| match v {
				Value::Float(f) => Some(*f),
				_ => None,
			}))
		}
		Some(Value::Bool(_)) if items.iter().all(|v| matches!(v, Value::Bool(_))) => {
			query.bind(collect(items, |v| match v {
				Value::Bool(b) => Some(*b),
				_ => None,
			}))
		}
		Some(Value::Uuid(_)) if items.iter().all(|v| matches!(v, Value::Uuid(_))) => {
			query.bind(collect::<Uuid>(items, |v| match v {
				Value::Uuid(u) => Some(*u),
				_ => None,
			}))
		}
		_ => query.bind(collect(items, |v| match v {
			Value::String(s) => Some(s.clone()),
			other => Some(other.to_json().to_string().trim_matches('"').to_string()),
		})),
	}
}

fn collect<T>(items: &[Value], f: impl Fn(&Value) -> Option<T>) -> Vec<T> {
	items.iter().filter_map(f).collect()
}
