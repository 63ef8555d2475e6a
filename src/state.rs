//! In-memory state of a source node
//!
//! Mutated only by the sync loop. The progress reporter reads it through
//! the same mutex and clears the error log in the same critical section,
//! so every error is reported exactly once.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::queue::WorkQueue;
use crate::strategies::RemovePolicy;

/// Handle shared between the sync loop and the progress reporter
pub type SharedState = Arc<Mutex<SyncState>>;

/// Point-in-time progress snapshot
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Default)]
pub struct Report {
	pub local_count: usize,
	pub queued_count: usize,
	pub remote_count: usize,
	pub remove_count: usize,
	pub errors: Vec<String>,
}

/// File sets, work queues and error log of the source
#[derive(Debug, Default)]
pub struct SyncState {
	/// Names found in the local directory at the last refresh
	pub local: BTreeSet<String>,
	/// Names the destination is known to have
	pub remote: BTreeSet<String>,
	/// Names waiting to be stored on the destination
	pub sync_queue: WorkQueue,
	/// Names waiting to be deleted from the destination
	pub remove_queue: WorkQueue,
	/// Diagnostics since the last report
	pub errors: Vec<String>,
}

impl SyncState {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn into_shared(self) -> SharedState {
		Arc::new(Mutex::new(self))
	}

	/// Rebuild the local set and queue every name for sync
	///
	/// Returns how many names were newly queued.
	pub fn replace_local(&mut self, names: Vec<String>) -> usize {
		let mut queued = 0;
		self.local.clear();
		for name in names {
			if self.sync_queue.push(name.clone()) {
				queued += 1;
			}
			self.local.insert(name);
		}
		queued
	}

	pub fn replace_remote(&mut self, names: Vec<String>) {
		self.remote = names.into_iter().collect();
	}

	pub fn clear_remote(&mut self) {
		self.remote.clear();
	}

	/// Drop queued names the destination already has; returns how many
	pub fn prune_synced(&mut self) -> usize {
		let remote = &self.remote;
		self.sync_queue.retain(|name| !remote.contains(name))
	}

	/// Rebuild the remove queue according to `policy`
	pub fn plan_removals(&mut self, policy: RemovePolicy) {
		self.remove_queue.clear();
		if !policy.deletes_remote() {
			return;
		}
		for name in self.remote.difference(&self.local) {
			self.remove_queue.push(name.clone());
		}
	}

	pub fn record_error(&mut self, message: impl Into<String>) {
		self.errors.push(message.into());
	}

	/// Snapshot without touching the error log
	pub fn snapshot(&self) -> Report {
		Report {
			local_count: self.local.len(),
			queued_count: self.sync_queue.len(),
			remote_count: self.remote.len(),
			remove_count: self.remove_queue.len(),
			errors: self.errors.clone(),
		}
	}

	/// Snapshot and clear the error log
	pub fn take_report(&mut self) -> Report {
		Report {
			local_count: self.local.len(),
			queued_count: self.sync_queue.len(),
			remote_count: self.remote.len(),
			remove_count: self.remove_queue.len(),
			errors: std::mem::take(&mut self.errors),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn names(list: &[&str]) -> Vec<String> {
		list.iter().map(|s| s.to_string()).collect()
	}

	#[test]
	fn test_replace_local_requeues_without_duplicates() {
		let mut state = SyncState::new();
		assert_eq!(state.replace_local(names(&["a", "b"])), 2);
		assert_eq!(state.replace_local(names(&["b", "c"])), 1);
		assert_eq!(state.local.len(), 2);
		assert_eq!(state.sync_queue.iter().collect::<Vec<_>>(), vec!["a", "b", "c"]);
	}

	#[test]
	fn test_prune_drops_remote_names() {
		let mut state = SyncState::new();
		state.replace_local(names(&["a", "b", "c"]));
		state.replace_remote(names(&["b", "zzz"]));
		assert_eq!(state.prune_synced(), 1);
		assert_eq!(state.sync_queue.iter().collect::<Vec<_>>(), vec!["a", "c"]);
	}

	#[test]
	fn test_plan_removals_by_policy() {
		let mut state = SyncState::new();
		state.replace_local(names(&["b"]));
		state.replace_remote(names(&["a", "b"]));

		state.plan_removals(RemovePolicy::Never);
		assert!(state.remove_queue.is_empty());

		state.plan_removals(RemovePolicy::Mirror);
		assert_eq!(state.remove_queue.iter().collect::<Vec<_>>(), vec!["a"]);
	}

	#[test]
	fn test_take_report_clears_errors() {
		let mut state = SyncState::new();
		state.replace_local(names(&["a"]));
		state.record_error("one");
		state.record_error("two");

		let first = state.take_report();
		assert_eq!(first.errors, vec!["one", "two"]);
		assert_eq!(first.local_count, 1);
		assert_eq!(first.queued_count, 1);

		assert!(state.take_report().errors.is_empty());
	}

	#[test]
	fn test_report_json_field_names() {
		let report = Report { local_count: 2, ..Default::default() };
		let value = serde_json::to_value(&report).unwrap();
		assert_eq!(value["local_count"], 2);
		assert!(value.get("remove_count").is_some());
		assert!(value["errors"].as_array().unwrap().is_empty());
	}
}

// vim: ts=4
