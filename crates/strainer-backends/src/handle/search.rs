//! Search engine handle over the Elasticsearch / OpenSearch HTTP API

use super::{BackendHandle, LoadMetrics, redact_url};
use crate::error::{ProbeError, ProbeResult};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use strainer_core::types::AdapterId;

#[derive(Debug, Clone)]
pub struct SearchHandle {
	client: reqwest::Client,
	base_url: String,
}

#[derive(Debug, Deserialize)]
struct RootInfo {
	version: VersionInfo,
}

#[derive(Debug, Deserialize)]
struct VersionInfo {
	number: String,
}

#[derive(Debug, Deserialize)]
struct PluginInfo {
	component: String,
}

#[derive(Debug, Deserialize)]
struct NodesStats {
	#[serde(default)]
	nodes: HashMap<String, NodeStats>,
}

#[derive(Debug, Deserialize)]
struct NodeStats {
	#[serde(default)]
	thread_pool: HashMap<String, ThreadPoolStats>,
}

#[derive(Debug, Default, Deserialize)]
struct ThreadPoolStats {
	#[serde(default)]
	threads: u64,
	#[serde(default)]
	active: u64,
}

impl SearchHandle {
	pub fn new(base_url: impl Into<String>) -> Self {
		Self::with_client(reqwest::Client::new(), base_url)
	}

	pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
		Self {
			client,
			base_url: base_url.into().trim_end_matches('/').to_string(),
		}
	}

	async fn get<T: for<'de> Deserialize<'de>>(&self, path: &str) -> ProbeResult<T> {
		let url = format!("{}/{}", self.base_url, path);
		let response = self.client.get(&url).send().await?.error_for_status()?;
		Ok(response.json::<T>().await?)
	}
}

#[async_trait]
impl BackendHandle for SearchHandle {
	fn adapter(&self) -> AdapterId {
		AdapterId::Search
	}

	fn connection_key(&self) -> String {
		redact_url(&self.base_url)
	}

	async fn server_version(&self) -> ProbeResult<String> {
		let info: RootInfo = self.get("").await?;
		Ok(info.version.number)
	}

	async fn extensions(&self) -> ProbeResult<Vec<String>> {
		let plugins: Vec<PluginInfo> = self.get("_cat/plugins?format=json").await?;
		let mut names: Vec<String> = plugins.into_iter().map(|p| p.component).collect();
		names.sort();
		names.dedup();
		Ok(names)
	}

	async fn load_metrics(&self) -> ProbeResult<LoadMetrics> {
		let stats: NodesStats = self.get("_nodes/stats/thread_pool").await?;
		search_pool_load(&stats)
	}
}

/// Load of the `search` thread pool summed over all nodes
fn search_pool_load(stats: &NodesStats) -> ProbeResult<LoadMetrics> {
	let mut active = 0;
	let mut threads = 0;
	for node in stats.nodes.values() {
		if let Some(pool) = node.thread_pool.get("search") {
			active += pool.active;
			threads += pool.threads;
		}
	}
	if stats.nodes.is_empty() {
		return Err(ProbeError::Parse("node stats without nodes".to_string()));
	}
	Ok(LoadMetrics::new(active, threads))
}
