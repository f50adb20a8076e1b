//! Analysis cache
//!
//! Analyses are keyed by a SHA-256 of the adapter, the rendered query text
//! and its parameters. Entries past the TTL are treated as misses and
//! overwritten by the next store of the same key; a full cache recycles an
//! expired slot for a new key and otherwise skips the store.
//! Concurrent misses on the same key both compute and the last store wins.

use crate::analysis::ComplexityAnalysis;
use async_trait::async_trait;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use strainer_backends::query::RenderedQuery;
use strainer_core::settings::ComplexitySettings;
use strainer_core::types::AdapterId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CacheError {
	#[error("Cache backend error: {0}")]
	Backend(String),

	#[error("Serialization error: {0}")]
	Serialization(#[from] serde_json::Error),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Storage for computed analyses.
///
/// Failures never reach callers: the analyzer logs them and analyzes
/// without the cache.
#[async_trait]
pub trait AnalysisCache: Send + Sync {
	/// Unexpired analysis stored under `key`
	async fn get(&self, key: &str) -> CacheResult<Option<ComplexityAnalysis>>;

	async fn put(&self, key: &str, analysis: &ComplexityAnalysis) -> CacheResult<()>;

	async fn clear(&self) -> CacheResult<()>;
}

/// Cache key of a rendered query
pub fn cache_key(adapter: AdapterId, query: &RenderedQuery) -> CacheResult<String> {
	let mut hasher = Sha256::new();
	hasher.update(adapter.as_str().as_bytes());
	hasher.update([0u8]);
	hasher.update(query.text.as_bytes());
	hasher.update([0u8]);
	hasher.update(serde_json::to_vec(&query.params)?);
	Ok(hex::encode(hasher.finalize()))
}

#[derive(Debug, Clone)]
struct CachedAnalysis {
	analysis: ComplexityAnalysis,
	stored_at: Instant,
}

impl CachedAnalysis {
	fn is_expired(&self, ttl: Duration) -> bool {
		self.stored_at.elapsed() >= ttl
	}
}

/// Cache statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
	pub entries: usize,
	/// Entries past the TTL still held until overwritten, recycled or cleared
	pub expired_entries: usize,
	pub hits: u64,
	pub misses: u64,
}

/// In-process cache on a concurrent map
#[derive(Debug)]
pub struct MemoryAnalysisCache {
	entries: DashMap<String, CachedAnalysis>,
	ttl: Duration,
	max_entries: usize,
	hits: AtomicU64,
	misses: AtomicU64,
}

impl MemoryAnalysisCache {
	pub fn new(ttl: Duration, max_entries: usize) -> Self {
		Self {
			entries: DashMap::new(),
			ttl,
			max_entries,
			hits: AtomicU64::new(0),
			misses: AtomicU64::new(0),
		}
	}

	pub fn from_settings(settings: &ComplexitySettings) -> Self {
		Self::new(settings.cache_ttl(), settings.cache_max_entries)
	}

	pub fn ttl(&self) -> Duration {
		self.ttl
	}

	pub fn stats(&self) -> CacheStats {
		let expired_entries = self
			.entries
			.iter()
			.filter(|entry| entry.value().is_expired(self.ttl))
			.count();
		CacheStats {
			entries: self.entries.len(),
			expired_entries,
			hits: self.hits.load(Ordering::Relaxed),
			misses: self.misses.load(Ordering::Relaxed),
		}
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}

#[async_trait]
impl AnalysisCache for MemoryAnalysisCache {
	async fn get(&self, key: &str) -> CacheResult<Option<ComplexityAnalysis>> {
		let found = self
			.entries
			.get(key)
			.filter(|entry| !entry.value().is_expired(self.ttl))
			.map(|entry| entry.value().analysis.clone());
		let counter = if found.is_some() { &self.hits } else { &self.misses };
		counter.fetch_add(1, Ordering::Relaxed);
		Ok(found)
	}

	async fn put(&self, key: &str, analysis: &ComplexityAnalysis) -> CacheResult<()> {
		if !self.entries.contains_key(key) && self.entries.len() >= self.max_entries {
			let expired = self
				.entries
				.iter()
				.find(|entry| entry.value().is_expired(self.ttl))
				.map(|entry| entry.key().clone());
			let Some(expired) = expired else {
				tracing::debug!(max_entries = self.max_entries, "analysis cache full, not storing");
				return Ok(());
			};
			self.entries.remove(&expired);
		}
		self.entries.insert(
			key.to_string(),
			CachedAnalysis {
				analysis: analysis.clone(),
				stored_at: Instant::now(),
			},
		);
		Ok(())
	}

	async fn clear(&self) -> CacheResult<()> {
		self.entries.clear();
		Ok(())
	}
}
