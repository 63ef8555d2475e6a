//! Source engine: reconciliation and drain loop
//!
//! One `step()` does at most one unit of work, in priority order:
//! store the front of the sync queue, delete the front of the remove queue,
//! or, with both queues empty, rescan once the poll interval has passed.
//! The state lock is only taken between RPCs, never across one.

use std::io;
use std::path::PathBuf;
use std::time::{Duration, Instant};
use tokio::fs as afs;

use crate::config::Config;
use crate::error::SyncError;
use crate::logging::*;
use crate::protocol::DestinationClient;
use crate::state::{Report, SharedState, SyncState};
use crate::strategies::RemovePolicy;
use crate::util;

/// Longest sleep between idle polls of the queues
const IDLE_TICK: Duration = Duration::from_millis(50);

/// Source loop tuning
#[derive(Debug, Clone)]
pub struct SourceOptions {
	pub poll_interval: Duration,
	pub retry_delay: Duration,
	pub remove_policy: RemovePolicy,
	pub exclude: Vec<glob::Pattern>,
}

impl Default for SourceOptions {
	fn default() -> Self {
		Self {
			poll_interval: Duration::from_millis(3000),
			retry_delay: Duration::from_millis(250),
			remove_policy: RemovePolicy::Never,
			exclude: vec![],
		}
	}
}

impl SourceOptions {
	pub fn from_config(config: &Config) -> Result<Self, SyncError> {
		Ok(Self {
			poll_interval: config.poll_interval(),
			retry_delay: config.retry_delay(),
			remove_policy: config.remove_policy,
			exclude: config.exclude_globs()?,
		})
	}

	fn is_excluded(&self, name: &str) -> bool {
		self.exclude.iter().any(|p| p.matches(name))
	}
}

/// Outcome of a single `step()`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
	/// Destination already had the file; dropped without a transfer
	AlreadyPresent(String),
	Stored(String),
	/// Store failed; the name went to the back of the queue
	StoreFailed(String),
	/// Local file disappeared before it could be read
	Vanished(String),
	Removed(String),
	/// Delete failed; the name went to the back of the queue
	RemoveFailed(String),
	/// Rescanned both sides
	Reconciled,
	/// Nothing to do until the next poll
	Idle,
}

impl Step {
	/// Whether the loop should back off before the next attempt
	pub fn is_failure(&self) -> bool {
		matches!(self, Step::StoreFailed(_) | Step::RemoveFailed(_))
	}
}

enum Work {
	Store(String),
	Remove(String),
	Poll,
}

/// Drives one destination from one local directory
pub struct SourceEngine<D: DestinationClient> {
	root: PathBuf,
	destination: D,
	state: SharedState,
	options: SourceOptions,
	last_local_refresh: Option<Instant>,
}

impl<D: DestinationClient> SourceEngine<D> {
	pub fn new(root: impl Into<PathBuf>, destination: D, options: SourceOptions) -> Self {
		Self {
			root: root.into(),
			destination,
			state: SyncState::new().into_shared(),
			options,
			last_local_refresh: None,
		}
	}

	/// Handle for the progress reporter
	pub fn state(&self) -> SharedState {
		SharedState::clone(&self.state)
	}

	pub fn destination(&self) -> &D {
		&self.destination
	}

	/// Rescan the local directory and queue every name found
	pub async fn refresh_local(&mut self) -> bool {
		self.last_local_refresh = Some(Instant::now());
		let options = &self.options;
		let listing = util::list_plain_files(&self.root, |name| !options.is_excluded(name)).await;

		let mut state = self.state.lock().await;
		match listing {
			Ok(names) => {
				let queued = state.replace_local(names);
				debug!("local: {} files, {} newly queued", state.local.len(), queued);
				true
			}
			Err(e) => {
				let message = format!("cannot list {}: {}", self.root.display(), e);
				debug!("{}", message);
				state.record_error(message);
				false
			}
		}
	}

	/// Fetch the destination listing; on failure the remote set is emptied
	pub async fn refresh_remote(&mut self) -> bool {
		let listing = self.destination.list_files().await;

		let mut state = self.state.lock().await;
		match listing {
			Ok(names) => {
				state.replace_remote(names);
				debug!("remote: {} files", state.remote.len());
				true
			}
			Err(e) => {
				let message = format!("failed to get remote file list: {}", e);
				debug!("{}", message);
				state.record_error(message);
				state.clear_remote();
				false
			}
		}
	}

	/// Full refresh of both sides followed by queue planning
	///
	/// Removals are only planned when both listings succeeded; an unreadable
	/// local directory must never look like an empty one.
	pub async fn reconcile(&mut self) {
		let local_ok = self.refresh_local().await;
		let remote_ok = self.refresh_remote().await;

		let mut state = self.state.lock().await;
		let pruned = state.prune_synced();
		if local_ok && remote_ok {
			state.plan_removals(self.options.remove_policy);
		} else {
			state.remove_queue.clear();
		}
		debug!(
			"reconciled: {} to send ({} already remote), {} to remove",
			state.sync_queue.len(),
			pruned,
			state.remove_queue.len()
		);
	}

	/// Perform one unit of work
	pub async fn step(&mut self) -> Step {
		let work = {
			let mut state = self.state.lock().await;
			if let Some(name) = state.sync_queue.front().map(str::to_string) {
				if state.remote.contains(&name) {
					state.sync_queue.remove(&name);
					return Step::AlreadyPresent(name);
				}
				Work::Store(name)
			} else if let Some(name) = state.remove_queue.front().map(str::to_string) {
				Work::Remove(name)
			} else {
				Work::Poll
			}
		};

		match work {
			Work::Store(name) => self.send(name).await,
			Work::Remove(name) => self.remove(name).await,
			Work::Poll if self.poll_due() => {
				self.reconcile().await;
				Step::Reconciled
			}
			Work::Poll => Step::Idle,
		}
	}

	/// Reconcile once, then drain both queues or give up after `max_failures`
	/// failed steps
	///
	/// Every successful step shrinks a queue, so only failures can keep this
	/// from finishing.
	pub async fn run_until_idle(&mut self, max_failures: usize) -> Report {
		self.reconcile().await;
		let mut failures = 0;
		while !self.is_drained().await {
			if self.step().await.is_failure() {
				failures += 1;
				if failures >= max_failures {
					debug!("giving up after {} failed steps", failures);
					break;
				}
				tokio::time::sleep(self.options.retry_delay).await;
			}
		}
		self.state.lock().await.snapshot()
	}

	/// Loop forever
	pub async fn run(&mut self) {
		info!("running source sync for {}", self.root.display());
		loop {
			let step = self.step().await;
			if step.is_failure() {
				tokio::time::sleep(self.options.retry_delay).await;
			} else if step == Step::Idle {
				tokio::time::sleep(self.idle_tick()).await;
			} else {
				tokio::task::yield_now().await;
			}
		}
	}

	async fn send(&mut self, name: String) -> Step {
		let data = match afs::read(self.root.join(&name)).await {
			Ok(data) => data,
			Err(e) if e.kind() == io::ErrorKind::NotFound => {
				let mut state = self.state.lock().await;
				state.sync_queue.remove(&name);
				state.local.remove(&name);
				state.record_error(format!("{} vanished before it was sent", name));
				debug!("{} vanished before it was sent", name);
				return Step::Vanished(name);
			}
			Err(e) => {
				let mut state = self.state.lock().await;
				state.sync_queue.requeue(&name);
				state.record_error(format!("cannot read {}: {}", name, e));
				return Step::StoreFailed(name);
			}
		};

		let size = data.len();
		let result = self.destination.store_file(&name, data).await;

		let mut state = self.state.lock().await;
		match result {
			Ok(()) => {
				state.sync_queue.remove(&name);
				state.remote.insert(name.clone());
				debug!("remain: {} sent {} ({} bytes)", state.sync_queue.len(), name, size);
				Step::Stored(name)
			}
			Err(e) => {
				let message = format!("store {} failed: {}", name, e.diagnostic());
				debug!("{}", message);
				state.sync_queue.requeue(&name);
				state.record_error(message);
				Step::StoreFailed(name)
			}
		}
	}

	async fn remove(&mut self, name: String) -> Step {
		let result = self.destination.delete_file(&name).await;

		let mut state = self.state.lock().await;
		match result {
			Ok(()) => {
				state.remove_queue.remove(&name);
				state.remote.remove(&name);
				debug!("remain: {} removed {}", state.remove_queue.len(), name);
				Step::Removed(name)
			}
			Err(e) => {
				let message = format!("delete {} failed: {}", name, e.diagnostic());
				debug!("{}", message);
				state.remove_queue.requeue(&name);
				state.record_error(message);
				Step::RemoveFailed(name)
			}
		}
	}

	async fn is_drained(&self) -> bool {
		let state = self.state.lock().await;
		state.sync_queue.is_empty() && state.remove_queue.is_empty()
	}

	fn poll_due(&self) -> bool {
		match self.last_local_refresh {
			Some(at) => at.elapsed() >= self.options.poll_interval,
			None => true,
		}
	}

	fn idle_tick(&self) -> Duration {
		let remaining = match self.last_local_refresh {
			Some(at) => self.options.poll_interval.saturating_sub(at.elapsed()),
			None => Duration::ZERO,
		};
		remaining.min(IDLE_TICK)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::protocol::{LocalDestination, RpcError, RpcResult};
	use crate::store::DestinationStore;
	use async_trait::async_trait;
	use std::collections::BTreeMap;
	use std::fs;
	use tempfile::TempDir;

	/// In-memory destination that can be told to fail stores
	#[derive(Default)]
	struct MemoryDestination {
		files: BTreeMap<String, Vec<u8>>,
		fail_stores: bool,
		store_calls: usize,
	}

	#[async_trait]
	impl DestinationClient for MemoryDestination {
		async fn list_files(&mut self) -> RpcResult<Vec<String>> {
			Ok(self.files.keys().cloned().collect())
		}

		async fn store_file(&mut self, name: &str, data: Vec<u8>) -> RpcResult<()> {
			self.store_calls += 1;
			if self.fail_stores {
				return Err(RpcError::Remote("disk full".to_string()));
			}
			self.files.insert(name.to_string(), data);
			Ok(())
		}

		async fn delete_file(&mut self, name: &str) -> RpcResult<()> {
			match self.files.remove(name) {
				Some(_) => Ok(()),
				None => Err(RpcError::Remote(format!("no such file {}", name))),
			}
		}
	}

	fn quick() -> SourceOptions {
		SourceOptions { retry_delay: Duration::ZERO, ..SourceOptions::default() }
	}

	#[tokio::test]
	async fn test_step_priority_and_idle() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.jpg"), b"a").unwrap();
		let mut engine = SourceEngine::new(dir.path(), MemoryDestination::default(), quick());

		assert_eq!(engine.step().await, Step::Reconciled);
		assert_eq!(engine.step().await, Step::Stored("a.jpg".to_string()));
		assert_eq!(engine.step().await, Step::Idle);
		assert_eq!(engine.destination().files["a.jpg"], b"a");
	}

	#[tokio::test]
	async fn test_already_present_skips_transfer() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.jpg"), b"a").unwrap();
		let mut dest = MemoryDestination::default();
		dest.files.insert("a.jpg".to_string(), b"old".to_vec());

		let mut engine = SourceEngine::new(dir.path(), dest, quick());
		engine.refresh_local().await;
		engine.refresh_remote().await;

		assert_eq!(engine.step().await, Step::AlreadyPresent("a.jpg".to_string()));
		assert_eq!(engine.destination().store_calls, 0);
	}

	#[tokio::test]
	async fn test_failed_store_is_requeued_and_logged() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.jpg"), b"a").unwrap();
		fs::write(dir.path().join("b.jpg"), b"b").unwrap();
		let dest = MemoryDestination { fail_stores: true, ..Default::default() };
		let mut engine = SourceEngine::new(dir.path(), dest, quick());

		engine.reconcile().await;
		assert_eq!(engine.step().await, Step::StoreFailed("a.jpg".to_string()));

		let state = engine.state();
		let state = state.lock().await;
		assert_eq!(state.sync_queue.iter().collect::<Vec<_>>(), vec!["b.jpg", "a.jpg"]);
		assert_eq!(state.errors.len(), 1);
		assert!(state.errors[0].contains("disk full"));
	}

	#[tokio::test]
	async fn test_vanished_file_is_dropped() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.jpg"), b"a").unwrap();
		let mut engine = SourceEngine::new(dir.path(), MemoryDestination::default(), quick());

		engine.reconcile().await;
		fs::remove_file(dir.path().join("a.jpg")).unwrap();
		assert_eq!(engine.step().await, Step::Vanished("a.jpg".to_string()));

		let report = engine.state().lock().await.take_report();
		assert_eq!(report.queued_count, 0);
		assert_eq!(report.local_count, 0);
		assert_eq!(report.errors.len(), 1);
	}

	#[tokio::test]
	async fn test_exclude_patterns() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("a.jpg"), b"a").unwrap();
		fs::write(dir.path().join("a.jpg.tmp"), b"partial").unwrap();
		let options = SourceOptions {
			exclude: vec![glob::Pattern::new("*.tmp").unwrap()],
			..quick()
		};
		let mut engine = SourceEngine::new(dir.path(), MemoryDestination::default(), options);

		let report = engine.run_until_idle(10).await;
		assert_eq!(report.local_count, 1);
		assert_eq!(engine.destination().files.keys().collect::<Vec<_>>(), vec!["a.jpg"]);
	}

	#[tokio::test]
	async fn test_remote_listing_failure_plans_nothing() {
		let src = TempDir::new().unwrap();
		fs::write(src.path().join("a.jpg"), b"a").unwrap();
		// Destination root does not exist, so listing fails remotely
		let dest = LocalDestination::new(DestinationStore::new(src.path().join("missing")));
		let options = SourceOptions { remove_policy: RemovePolicy::Mirror, ..quick() };
		let mut engine = SourceEngine::new(src.path(), dest, options);

		engine.reconcile().await;
		let report = engine.state().lock().await.take_report();
		assert_eq!(report.remote_count, 0);
		assert_eq!(report.remove_count, 0);
		assert_eq!(report.queued_count, 1);
		assert!(report.errors[0].starts_with("failed to get remote file list"));
	}

	#[tokio::test]
	async fn test_local_listing_failure_never_mirrors_deletes() {
		let dir = TempDir::new().unwrap();
		let dest_root = dir.path().join("dest");
		fs::create_dir(&dest_root).unwrap();
		fs::write(dest_root.join("a.jpg"), b"a").unwrap();
		fs::write(dest_root.join("b.jpg"), b"b").unwrap();

		let dest = LocalDestination::new(DestinationStore::new(&dest_root));
		let options = SourceOptions { remove_policy: RemovePolicy::Mirror, ..quick() };
		let mut engine = SourceEngine::new(dir.path().join("unmounted"), dest, options);

		let report = engine.run_until_idle(100).await;
		assert_eq!(report.remove_count, 0);
		assert_eq!(report.remote_count, 2);
		assert_eq!(report.errors.len(), 1);
		assert!(report.errors[0].starts_with("cannot list"));
		assert!(dest_root.join("a.jpg").exists());
		assert!(dest_root.join("b.jpg").exists());
	}
}

// vim: ts=4
