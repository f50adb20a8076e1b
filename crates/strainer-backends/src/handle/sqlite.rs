//! SQLite handle
//!
//! SQLite has no cost-based explain output and no server load, so load is
//! derived from the pool itself.

use super::{BackendHandle, LoadMetrics};
use crate::error::ProbeResult;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};
use strainer_core::capability::Feature;
use strainer_core::types::AdapterId;

#[derive(Debug, Clone)]
pub struct SqliteHandle {
	pool: SqlitePool,
	key: String,
}

impl SqliteHandle {
	pub fn new(pool: SqlitePool, key: impl Into<String>) -> Self {
		Self {
			pool,
			key: key.into(),
		}
	}

	pub async fn connect(url: &str) -> ProbeResult<Self> {
		let pool = SqlitePool::connect(url).await?;
		Ok(Self::new(pool, url))
	}

	pub fn pool(&self) -> &SqlitePool {
		&self.pool
	}
}

#[async_trait]
impl BackendHandle for SqliteHandle {
	fn adapter(&self) -> AdapterId {
		AdapterId::Sqlite
	}

	fn connection_key(&self) -> String {
		self.key.clone()
	}

	async fn server_version(&self) -> ProbeResult<String> {
		let row = sqlx::query("SELECT sqlite_version()").fetch_one(&self.pool).await?;
		Ok(row.try_get(0)?)
	}

	async fn probe_feature(&self, feature: Feature) -> ProbeResult<Option<bool>> {
		let probe = match feature {
			Feature::Json => "SELECT json('{}')",
			// REGEXP is only available when the connection registered it
			Feature::Regex => "SELECT 'a' REGEXP 'a'",
			_ => return Ok(None),
		};
		Ok(Some(sqlx::query(probe).fetch_one(&self.pool).await.is_ok()))
	}

	async fn load_metrics(&self) -> ProbeResult<LoadMetrics> {
		let active = self.pool.size().saturating_sub(self.pool.num_idle() as u32);
		Ok(LoadMetrics::new(
			u64::from(active),
			u64::from(self.pool.options().get_max_connections()),
		))
	}
}
