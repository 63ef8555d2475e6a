use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::error::SyncError;
use crate::logging::*;
use crate::protocol::{serve_listener, Frame, ProtocolError, Reply, Request, RequestHandler};
use crate::store::DestinationStore;

/////////////
// Handler //
/////////////

/// Maps destination requests onto the store
///
/// The store sits behind a mutex so requests from concurrent connections
/// are applied one at a time.
pub struct DestinationHandler {
	store: Mutex<DestinationStore>,
}

impl DestinationHandler {
	pub fn new(store: DestinationStore) -> Self {
		Self { store: Mutex::new(store) }
	}

	async fn dispatch(&self, request: Request) -> Reply {
		let store = self.store.lock().await;
		match request {
			Request::ListFiles => match store.list_files().await {
				Ok(files) => {
					debug!("Listing {} files", files.len());
					Reply::FileList(files)
				}
				Err(e) => {
					warn!("{}", e);
					Reply::failed(e)
				}
			},
			Request::StoreFile { name, data } => match store.store_file(&name, &data).await {
				Ok(()) => Reply::Ok,
				Err(e) => {
					warn!("{}", e);
					Reply::failed(e)
				}
			},
			Request::DeleteFile { name } => match store.delete_file(&name).await {
				Ok(()) => Reply::Ok,
				Err(e) => {
					warn!("{}", e);
					Reply::failed(e)
				}
			},
			other => Reply::failed(ProtocolError::UnknownCommand(other.command().to_string())),
		}
	}
}

#[async_trait]
impl RequestHandler for DestinationHandler {
	async fn handle(&self, frame: Frame) -> Frame {
		let reply = match Request::from_frame(frame) {
			Ok(request) => self.dispatch(request).await,
			Err(e) => {
				warn!("Rejected request: {}", e);
				Reply::failed(e)
			}
		};
		reply.into_frame()
	}
}

////////////
// Server //
////////////

/// Listening destination node
pub struct DestinationServer {
	listener: TcpListener,
	handler: Arc<DestinationHandler>,
}

impl DestinationServer {
	/// Prepare the managed root, bind, then write the liveness marker
	///
	/// The marker is only written once the listener exists, so its presence
	/// means connections will be accepted.
	pub async fn bind(addr: &str, store: DestinationStore) -> Result<Self, SyncError> {
		store.prepare().await.map_err(|e| SyncError::InvalidDirectory {
			path: store.root().display().to_string(),
			message: e.to_string(),
		})?;

		let listener = TcpListener::bind(addr)
			.await
			.map_err(|source| SyncError::BindFailed { addr: addr.to_string(), source })?;

		let marker = store.write_liveness_marker().await.map_err(|e| SyncError::Other {
			message: format!("Cannot write liveness marker: {}", e),
		})?;
		debug!("Liveness marker at {}", marker.display());

		Ok(Self { listener, handler: Arc::new(DestinationHandler::new(store)) })
	}

	pub fn local_addr(&self) -> Result<SocketAddr, SyncError> {
		Ok(self.listener.local_addr()?)
	}

	/// Serve forever
	pub async fn run(self) -> Result<(), SyncError> {
		info!("sync listening on {}", self.local_addr()?);
		serve_listener(self.listener, self.handler).await?;
		Ok(())
	}
}

/// `--dest` entry point
pub async fn serve(config: &Config) -> Result<(), SyncError> {
	let store = DestinationStore::new(&config.path).with_marker(config.liveness_marker.clone());
	info!("running dest sync for {}", config.path.display());
	let server = DestinationServer::bind(&config.dest_bind_addr(), store).await?;
	server.run().await
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::fs;
	use tempfile::TempDir;

	#[tokio::test]
	async fn test_unknown_command_leaves_directory_alone() {
		let dir = TempDir::new().unwrap();
		fs::write(dir.path().join("keep.jpg"), b"k").unwrap();
		let handler = DestinationHandler::new(DestinationStore::new(dir.path()));

		let reply = handler.handle(Frame::new("rm_file", "keep.jpg", Vec::new())).await;
		assert_eq!(reply.command, "failed");
		assert!(reply.argument.contains("rm_file"));
		assert!(dir.path().join("keep.jpg").exists());
	}

	#[tokio::test]
	async fn test_report_is_not_a_destination_command() {
		let dir = TempDir::new().unwrap();
		let handler = DestinationHandler::new(DestinationStore::new(dir.path()));
		let reply = handler.handle(Frame::bare("report")).await;
		assert_eq!(reply.command, "failed");
	}

	#[tokio::test]
	async fn test_store_failure_becomes_failed_reply() {
		let dir = TempDir::new().unwrap();
		let handler = DestinationHandler::new(DestinationStore::new(dir.path().join("missing")));
		let reply = handler.handle(Frame::new("store_file", "a.jpg", b"a".to_vec())).await;
		assert_eq!(reply.command, "failed");
		assert!(reply.argument.contains("a.jpg"));
	}
}

// vim: ts=4
