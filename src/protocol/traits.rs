//! Protocol traits
//!
//! `DestinationClient` is the only thing the source engine knows about the
//! destination. `RequestHandler` is what a server plugs into the shared
//! connection loop.

use async_trait::async_trait;

use super::error::{ProtocolError, RpcError};
use super::types::{Frame, Reply};

/// Result type for protocol operations
pub type ProtocolResult<T> = Result<T, ProtocolError>;

/// Result type for a single request/reply exchange
pub type RpcResult<T> = Result<T, RpcError>;

/// Operations the source drives against a destination
///
/// Every call is one request and one reply. Implementations take `&mut self`
/// so a caller cannot have two requests in flight on the same channel.
#[async_trait]
pub trait DestinationClient: Send {
	/// Names currently present on the destination
	async fn list_files(&mut self) -> RpcResult<Vec<String>>;

	/// Create or overwrite `name` with `data`
	async fn store_file(&mut self, name: &str, data: Vec<u8>) -> RpcResult<()>;

	/// Remove `name`; removing a missing file is a failure
	async fn delete_file(&mut self, name: &str) -> RpcResult<()>;
}

/// Server side: turn one request frame into exactly one reply frame
///
/// Handlers never fail. Errors are reported as `failed` replies so the
/// connection keeps serving.
#[async_trait]
pub trait RequestHandler: Send + Sync {
	async fn handle(&self, frame: Frame) -> Frame;
}

/// Interpret a reply to `list_files`
pub(crate) fn expect_file_list(reply: Reply) -> RpcResult<Vec<String>> {
	match reply {
		Reply::FileList(files) => Ok(files),
		Reply::Failed(diagnostic) => Err(RpcError::Remote(diagnostic)),
		other => Err(RpcError::Transport(ProtocolError::UnexpectedReply {
			expected: "file_list",
			got: other.command().to_string(),
		})),
	}
}

/// Interpret a reply to `store_file` / `delete_file`
pub(crate) fn expect_ok(reply: Reply) -> RpcResult<()> {
	match reply {
		Reply::Ok => Ok(()),
		Reply::Failed(diagnostic) => Err(RpcError::Remote(diagnostic)),
		other => Err(RpcError::Transport(ProtocolError::UnexpectedReply {
			expected: "ok",
			got: other.command().to_string(),
		})),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_expect_ok_maps_failed_to_remote() {
		let result = expect_ok(Reply::Failed("no such file".to_string()));
		assert!(matches!(result, Err(RpcError::Remote(ref d)) if d == "no such file"));
	}

	#[test]
	fn test_expect_file_list_rejects_ok() {
		let result = expect_file_list(Reply::Ok);
		assert!(matches!(
			result,
			Err(RpcError::Transport(ProtocolError::UnexpectedReply { expected: "file_list", .. }))
		));
	}
}

// vim: ts=4
