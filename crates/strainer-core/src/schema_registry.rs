//! Queryable registry
//!
//! Holds every queryable known to the engine plus interface → implementor
//! relationships. Registration can happen from several threads at startup,
//! so writes take the lock with a timeout and retry with backoff instead of
//! blocking indefinitely.

use crate::error::{FilterError, FilterResult};
use crate::queryable::Queryable;
use crate::settings::RegistrySettings;
use crate::types::QueryableId;
use parking_lot::{RwLock, RwLockWriteGuard};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

#[derive(Debug, Default)]
struct RegistryState {
	queryables: HashMap<QueryableId, Arc<Queryable>>,
	implementors: HashMap<String, BTreeSet<QueryableId>>,
}

#[derive(Debug, Default)]
pub struct QueryableRegistry {
	state: RwLock<RegistryState>,
	settings: RegistrySettings,
}

impl QueryableRegistry {
	pub fn new(settings: RegistrySettings) -> Self {
		Self {
			state: RwLock::new(RegistryState::default()),
			settings,
		}
	}

	/// Acquire the write lock, retrying with backoff on contention
	fn write(&self) -> FilterResult<RwLockWriteGuard<'_, RegistryState>> {
		let attempts = self.settings.max_retries.saturating_add(1);
		for attempt in 0..attempts {
			if let Some(guard) = self.state.try_write_for(self.settings.lock_timeout()) {
				return Ok(guard);
			}
			if attempt + 1 < attempts {
				let backoff = self.settings.backoff(attempt);
				tracing::debug!(attempt, ?backoff, "queryable registry busy, retrying");
				std::thread::sleep(backoff);
			}
		}
		tracing::warn!(attempts, "gave up acquiring queryable registry lock");
		Err(FilterError::Registry(format!(
			"registry lock not acquired after {} attempts",
			attempts
		)))
	}

	/// Insert or replace a queryable
	pub fn register(&self, queryable: Queryable) -> FilterResult<()> {
		let mut state = self.write()?;
		state
			.queryables
			.insert(queryable.id.clone(), Arc::new(queryable));
		Ok(())
	}

	/// Record that `implementor` implements `interface`
	pub fn register_implementor(
		&self,
		interface: impl Into<String>,
		implementor: impl Into<QueryableId>,
	) -> FilterResult<()> {
		let mut state = self.write()?;
		state
			.implementors
			.entry(interface.into())
			.or_default()
			.insert(implementor.into());
		Ok(())
	}

	pub fn unregister(&self, id: &QueryableId) -> FilterResult<Option<Arc<Queryable>>> {
		let mut state = self.write()?;
		for members in state.implementors.values_mut() {
			members.remove(id);
		}
		Ok(state.queryables.remove(id))
	}

	pub fn get(&self, id: &QueryableId) -> Option<Arc<Queryable>> {
		self.state.read().queryables.get(id).cloned()
	}

	pub fn contains(&self, id: &QueryableId) -> bool {
		self.state.read().queryables.contains_key(id)
	}

	/// Implementors of `interface`, sorted by id
	pub fn implementors(&self, interface: &str) -> Vec<QueryableId> {
		self.state
			.read()
			.implementors
			.get(interface)
			.map(|members| members.iter().cloned().collect())
			.unwrap_or_default()
	}

	pub fn ids(&self) -> Vec<QueryableId> {
		let mut ids: Vec<_> = self.state.read().queryables.keys().cloned().collect();
		ids.sort();
		ids
	}

	pub fn len(&self) -> usize {
		self.state.read().queryables.len()
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn clear(&self) -> FilterResult<()> {
		let mut state = self.write()?;
		state.queryables.clear();
		state.implementors.clear();
		Ok(())
	}
}
