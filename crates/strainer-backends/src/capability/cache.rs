use super::detect::detect;
use crate::handle::BackendHandle;
use dashmap::DashMap;
use std::sync::Arc;
use strainer_core::capability::AdapterCapability;

/// Process-lifetime capability cache keyed by connection target.
///
/// Detection runs lazily on first use. Two requests racing on a cold key
/// both detect and the later insert wins; detection is deterministic for a
/// given backend, so the overwrite is equivalent.
#[derive(Debug, Default)]
pub struct CapabilityCache {
	entries: DashMap<String, Arc<AdapterCapability>>,
}

impl CapabilityCache {
	pub fn new() -> Self {
		Self::default()
	}

	pub async fn get_or_detect(&self, handle: &dyn BackendHandle) -> Arc<AdapterCapability> {
		let key = handle.connection_key();
		if let Some(cached) = self.get(&key) {
			return cached;
		}
		let capability = Arc::new(detect(handle).await);
		self.entries.insert(key, Arc::clone(&capability));
		capability
	}

	pub fn get(&self, key: &str) -> Option<Arc<AdapterCapability>> {
		self.entries.get(key).map(|entry| Arc::clone(entry.value()))
	}

	/// Seed or replace an entry, for callers that detect out of band
	pub fn insert(&self, key: impl Into<String>, capability: AdapterCapability) {
		self.entries.insert(key.into(), Arc::new(capability));
	}

	pub fn invalidate(&self, key: &str) -> bool {
		self.entries.remove(key).is_some()
	}

	pub fn clear(&self) {
		self.entries.clear();
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}
}
