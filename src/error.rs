//! Error types for dsync operations

use std::error::Error;
use std::fmt;
use std::io;

use crate::protocol::ProtocolError;
use crate::validation::ValidationError;

/// Main error type for node startup and top-level operations
#[derive(Debug)]
pub enum SyncError {
	/// Failed to bind a listening socket
	BindFailed { addr: String, source: io::Error },

	/// Failed to reach the destination node
	ConnectFailed { addr: String, source: ProtocolError },

	/// Managed directory is missing or unusable
	InvalidDirectory { path: String, message: String },

	/// I/O error
	Io(io::Error),

	/// Invalid configuration
	InvalidConfig { message: String },

	/// Protocol error (nested)
	Protocol(ProtocolError),

	/// Generic error message
	Other { message: String },
}

impl fmt::Display for SyncError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			SyncError::BindFailed { addr, source } => {
				write!(f, "Failed to bind {}: {}", addr, source)
			}
			SyncError::ConnectFailed { addr, source } => {
				write!(f, "Failed to connect to {}: {}", addr, source)
			}
			SyncError::InvalidDirectory { path, message } => {
				write!(f, "Invalid directory {}: {}", path, message)
			}
			SyncError::Io(e) => write!(f, "I/O error: {}", e),
			SyncError::InvalidConfig { message } => {
				write!(f, "Invalid configuration: {}", message)
			}
			SyncError::Protocol(e) => write!(f, "Protocol error: {}", e),
			SyncError::Other { message } => write!(f, "{}", message),
		}
	}
}

impl Error for SyncError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			SyncError::BindFailed { source, .. } => Some(source),
			SyncError::ConnectFailed { source, .. } => Some(source),
			SyncError::Io(e) => Some(e),
			SyncError::Protocol(e) => Some(e),
			_ => None,
		}
	}
}

impl From<io::Error> for SyncError {
	fn from(e: io::Error) -> Self {
		SyncError::Io(e)
	}
}

impl From<String> for SyncError {
	fn from(e: String) -> Self {
		SyncError::Other { message: e }
	}
}

impl From<ProtocolError> for SyncError {
	fn from(e: ProtocolError) -> Self {
		SyncError::Protocol(e)
	}
}

impl From<ValidationError> for SyncError {
	fn from(e: ValidationError) -> Self {
		SyncError::InvalidConfig { message: e.to_string() }
	}
}

/// Failures of a single destination store operation
///
/// These never escape the destination: the request handler turns them into
/// `failed` replies carrying `to_string()` as the diagnostic.
#[derive(Debug)]
pub enum StoreError {
	/// Name is not a single plain file name inside the managed root
	InvalidName { name: String, reason: String },

	/// Filesystem operation failed
	Io { op: &'static str, name: String, source: io::Error },
}

impl fmt::Display for StoreError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			StoreError::InvalidName { name, reason } => {
				write!(f, "Invalid file name {:?}: {}", name, reason)
			}
			StoreError::Io { op, name, source } => {
				write!(f, "Failed to {} {}: {}", op, name, source)
			}
		}
	}
}

impl Error for StoreError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			StoreError::Io { source, .. } => Some(source),
			StoreError::InvalidName { .. } => None,
		}
	}
}


// vim: ts=4
