//! Protocol error types
//!
//! `ProtocolError` covers everything that can go wrong on a channel.
//! `RpcError` is the typed outcome of a single request, separating a
//! `failed` reply from the peer from a failure to get any reply at all.

use std::fmt;
use std::io;
use std::time::Duration;

/// Protocol error type
#[derive(Debug)]
pub enum ProtocolError {
	/// I/O error from async operations
	Io(io::Error),
	/// Header or payload JSON could not be parsed or produced
	Json(String),
	/// Protocol violation (unexpected format or state)
	ProtocolViolation(String),
	/// Command not understood by this endpoint
	UnknownCommand(String),
	/// Reply did not match the request that was sent
	UnexpectedReply { expected: &'static str, got: String },
	/// No reply within the request timeout
	Timeout(Duration),
	/// Peer closed the connection
	Disconnected,
	/// Generic error message
	Other(String),
}

impl fmt::Display for ProtocolError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			ProtocolError::Io(e) => write!(f, "I/O error: {}", e),
			ProtocolError::Json(msg) => write!(f, "JSON error: {}", msg),
			ProtocolError::ProtocolViolation(msg) => write!(f, "Protocol violation: {}", msg),
			ProtocolError::UnknownCommand(cmd) => write!(f, "Unknown command: {}", cmd),
			ProtocolError::UnexpectedReply { expected, got } => {
				write!(f, "Unexpected reply: expected {}, got {}", expected, got)
			}
			ProtocolError::Timeout(d) => write!(f, "No reply within {:?}", d),
			ProtocolError::Disconnected => write!(f, "Connection closed by peer"),
			ProtocolError::Other(msg) => write!(f, "{}", msg),
		}
	}
}

impl std::error::Error for ProtocolError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			ProtocolError::Io(e) => Some(e),
			_ => None,
		}
	}
}

// From implementations for automatic conversion
impl From<io::Error> for ProtocolError {
	fn from(e: io::Error) -> Self {
		ProtocolError::Io(e)
	}
}

impl From<String> for ProtocolError {
	fn from(e: String) -> Self {
		ProtocolError::Other(e)
	}
}

impl From<&str> for ProtocolError {
	fn from(e: &str) -> Self {
		ProtocolError::Other(e.to_string())
	}
}

impl From<json5::Error> for ProtocolError {
	fn from(e: json5::Error) -> Self {
		ProtocolError::Json(e.to_string())
	}
}

impl From<serde_json::Error> for ProtocolError {
	fn from(e: serde_json::Error) -> Self {
		ProtocolError::Json(e.to_string())
	}
}

/// Outcome of one request/reply exchange that did not succeed
#[derive(Debug)]
pub enum RpcError {
	/// The peer answered `failed` with this diagnostic
	Remote(String),
	/// No usable reply: transport failure, timeout or malformed reply
	Transport(ProtocolError),
}

impl RpcError {
	/// Diagnostic suitable for the error log
	pub fn diagnostic(&self) -> String {
		self.to_string()
	}
}

impl fmt::Display for RpcError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			RpcError::Remote(msg) => write!(f, "remote failed: {}", msg),
			RpcError::Transport(e) => write!(f, "transport: {}", e),
		}
	}
}

impl std::error::Error for RpcError {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			RpcError::Transport(e) => Some(e),
			RpcError::Remote(_) => None,
		}
	}
}

impl From<ProtocolError> for RpcError {
	fn from(e: ProtocolError) -> Self {
		RpcError::Transport(e)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_unknown_command_names_command() {
		let err = ProtocolError::UnknownCommand("frobnicate".to_string());
		assert!(err.to_string().contains("frobnicate"));
	}

	#[test]
	fn test_rpc_error_keeps_remote_diagnostic() {
		let err = RpcError::Remote("disk full".to_string());
		assert!(err.diagnostic().contains("disk full"));
	}

	#[test]
	fn test_timeout_converts_to_transport() {
		let err: RpcError = ProtocolError::Timeout(Duration::from_secs(3)).into();
		assert!(matches!(err, RpcError::Transport(ProtocolError::Timeout(_))));
	}
}

// vim: ts=4
