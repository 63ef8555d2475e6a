//! Destination-side file operations
//!
//! The store is the only writer of its managed root. It keeps no state
//! between requests besides the directory contents themselves.

use std::path::{Path, PathBuf};
use tokio::fs as afs;

use crate::error::StoreError;
use crate::logging::*;
use crate::util;
use crate::validation::validate_file_name;

/// Default name of the liveness marker written into the managed root
pub const DEFAULT_LIVENESS_MARKER: &str = "sync_listening.pid";

/// Authoritative file store under a managed root directory
#[derive(Debug, Clone)]
pub struct DestinationStore {
	root: PathBuf,
	marker: String,
}

impl DestinationStore {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self { root: root.into(), marker: DEFAULT_LIVENESS_MARKER.to_string() }
	}

	/// Use a different liveness marker file name
	pub fn with_marker(mut self, marker: impl Into<String>) -> Self {
		self.marker = marker.into();
		self
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn marker_path(&self) -> PathBuf {
		self.root.join(&self.marker)
	}

	/// Create the managed root if it does not exist yet
	pub async fn prepare(&self) -> Result<(), StoreError> {
		afs::create_dir_all(&self.root).await.map_err(|source| StoreError::Io {
			op: "create",
			name: self.root.display().to_string(),
			source,
		})
	}

	/// Sorted names of the stored files, marker excluded
	pub async fn list_files(&self) -> Result<Vec<String>, StoreError> {
		let marker = self.marker.as_str();
		util::list_plain_files(&self.root, |name| name != marker).await.map_err(|source| {
			StoreError::Io { op: "list", name: self.root.display().to_string(), source }
		})
	}

	/// Write `data` to `root/name`, creating or overwriting
	///
	/// Not atomic: a crash mid-write can leave a truncated file, which the
	/// next store of the same name overwrites.
	pub async fn store_file(&self, name: &str, data: &[u8]) -> Result<(), StoreError> {
		let path = self.checked_path(name)?;
		afs::write(&path, data).await.map_err(|source| StoreError::Io {
			op: "write",
			name: name.to_string(),
			source,
		})?;
		debug!("Stored {} ({} bytes)", name, data.len());
		Ok(())
	}

	/// Remove `root/name`; a missing file is an error
	pub async fn delete_file(&self, name: &str) -> Result<(), StoreError> {
		let path = self.checked_path(name)?;
		afs::remove_file(&path).await.map_err(|source| StoreError::Io {
			op: "delete",
			name: name.to_string(),
			source,
		})?;
		debug!("Deleted {}", name);
		Ok(())
	}

	/// Write this process id into the marker file
	pub async fn write_liveness_marker(&self) -> Result<PathBuf, StoreError> {
		let path = self.marker_path();
		afs::write(&path, std::process::id().to_string()).await.map_err(|source| {
			StoreError::Io { op: "write", name: self.marker.clone(), source }
		})?;
		Ok(path)
	}

	fn checked_path(&self, name: &str) -> Result<PathBuf, StoreError> {
		validate_file_name(name).map_err(|e| StoreError::InvalidName {
			name: name.to_string(),
			reason: e.to_string(),
		})?;
		if name == self.marker {
			return Err(StoreError::InvalidName {
				name: name.to_string(),
				reason: "reserved for the liveness marker".to_string(),
			});
		}
		Ok(self.root.join(name))
	}
}


// vim: ts=4
