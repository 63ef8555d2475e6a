//! In-process destination client
//!
//! Runs requests through the same `RequestHandler` the TCP server uses,
//! minus the socket. Frames are still built and decoded, so behaviour
//! matches a remote destination exactly.

use async_trait::async_trait;
use std::sync::Arc;

use super::traits::{
	expect_file_list, expect_ok, DestinationClient, ProtocolResult, RequestHandler, RpcResult,
};
use super::types::{Reply, Request};
use crate::serve::DestinationHandler;
use crate::store::DestinationStore;

/// Destination living in the same process
#[derive(Clone)]
pub struct LocalDestination {
	handler: Arc<DestinationHandler>,
}

impl LocalDestination {
	pub fn new(store: DestinationStore) -> Self {
		Self { handler: Arc::new(DestinationHandler::new(store)) }
	}

	async fn call(&self, request: Request) -> ProtocolResult<Reply> {
		Reply::from_frame(self.handler.handle(request.into_frame()).await)
	}
}

#[async_trait]
impl DestinationClient for LocalDestination {
	async fn list_files(&mut self) -> RpcResult<Vec<String>> {
		expect_file_list(self.call(Request::ListFiles).await?)
	}

	async fn store_file(&mut self, name: &str, data: Vec<u8>) -> RpcResult<()> {
		expect_ok(self.call(Request::StoreFile { name: name.to_string(), data }).await?)
	}

	async fn delete_file(&mut self, name: &str) -> RpcResult<()> {
		expect_ok(self.call(Request::DeleteFile { name: name.to_string() }).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::protocol::RpcError;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_local_destination_store_list_delete() {
		let dir = TempDir::new().unwrap();
		let mut dest = LocalDestination::new(DestinationStore::new(dir.path()));

		dest.store_file("b.jpg", b"bb".to_vec()).await.unwrap();
		dest.store_file("a.jpg", b"a".to_vec()).await.unwrap();
		assert_eq!(dest.list_files().await.unwrap(), vec!["a.jpg", "b.jpg"]);

		dest.delete_file("a.jpg").await.unwrap();
		assert_eq!(dest.list_files().await.unwrap(), vec!["b.jpg"]);

		let err = dest.delete_file("a.jpg").await.unwrap_err();
		assert!(matches!(err, RpcError::Remote(_)));
	}
}

// vim: ts=4
