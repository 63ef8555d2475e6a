//! Shared server loop for request/reply endpoints
//!
//! Used by both the destination server and the progress reporter. Each
//! connection reads one frame, hands it to the `RequestHandler` and writes
//! back exactly one reply before reading the next frame.

use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncWrite, BufReader};
use tokio::net::TcpListener;
use tracing::{debug, warn};

use super::error::ProtocolError;
use super::frame::{read_frame, write_frame};
use super::traits::{ProtocolResult, RequestHandler};
use super::types::Reply;

/// Serve one connection until the peer disconnects
///
/// A header that cannot be parsed leaves the stream position unknown, so it
/// is answered with `failed` and the connection is closed. Unknown commands
/// are the handler's business and keep the connection open.
pub async fn serve_connection<S, H>(stream: S, handler: &H) -> ProtocolResult<()>
where
	S: AsyncRead + AsyncWrite + Unpin,
	H: RequestHandler + ?Sized,
{
	let (reader, mut writer) = tokio::io::split(stream);
	let mut reader = BufReader::new(reader);

	loop {
		let frame = match read_frame(&mut reader).await {
			Ok(Some(frame)) => frame,
			Ok(None) => return Ok(()),
			Err(ProtocolError::Io(e)) => return Err(ProtocolError::Io(e)),
			Err(e) => {
				let _ = write_frame(&mut writer, &Reply::failed(&e).into_frame()).await;
				return Err(e);
			}
		};

		let reply = handler.handle(frame).await;
		write_frame(&mut writer, &reply).await?;
	}
}

/// Accept connections forever, one task per connection
pub async fn serve_listener<H>(listener: TcpListener, handler: Arc<H>) -> ProtocolResult<()>
where
	H: RequestHandler + 'static,
{
	loop {
		let (stream, peer) = match listener.accept().await {
			Ok(accepted) => accepted,
			Err(e) => {
				// Typically fd exhaustion; back off instead of spinning
				warn!("accept failed: {}", e);
				tokio::time::sleep(Duration::from_millis(100)).await;
				continue;
			}
		};
		let _ = stream.set_nodelay(true);
		let handler = Arc::clone(&handler);
		tokio::spawn(async move {
			debug!("connection from {}", peer);
			match serve_connection(stream, handler.as_ref()).await {
				Ok(()) => debug!("connection from {} closed", peer),
				Err(e) => warn!("connection from {} ended: {}", peer, e),
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::protocol::types::Frame;
	use async_trait::async_trait;
	use tokio::io::AsyncWriteExt;

	struct Echo;

	#[async_trait]
	impl RequestHandler for Echo {
		async fn handle(&self, frame: Frame) -> Frame {
			Frame::new("ok", frame.command, frame.payload)
		}
	}

	#[tokio::test]
	async fn test_one_reply_per_request_in_order() {
		let (client, server) = tokio::io::duplex(4096);
		let task = tokio::spawn(async move { serve_connection(server, &Echo).await });

		let (reader, mut writer) = tokio::io::split(client);
		let mut reader = BufReader::new(reader);
		for cmd in ["first", "second", "third"] {
			write_frame(&mut writer, &Frame::bare(cmd)).await.unwrap();
			let reply = read_frame(&mut reader).await.unwrap().unwrap();
			assert_eq!(reply.argument, cmd);
		}

		writer.shutdown().await.unwrap();
		drop(writer);
		drop(reader);
		assert!(task.await.unwrap().is_ok());
	}

	#[tokio::test]
	async fn test_garbage_header_gets_failed_reply() {
		let (client, server) = tokio::io::duplex(4096);
		let task = tokio::spawn(async move { serve_connection(server, &Echo).await });

		let (reader, mut writer) = tokio::io::split(client);
		let mut reader = BufReader::new(reader);
		writer.write_all(b"not json at all\n").await.unwrap();
		let reply = read_frame(&mut reader).await.unwrap().unwrap();
		assert_eq!(reply.command, "failed");
		assert!(task.await.unwrap().is_err());
	}

	#[tokio::test]
	async fn test_non_utf8_header_gets_failed_reply() {
		let (client, server) = tokio::io::duplex(4096);
		let task = tokio::spawn(async move { serve_connection(server, &Echo).await });

		let (reader, mut writer) = tokio::io::split(client);
		let mut reader = BufReader::new(reader);
		writer.write_all(b"{\"cmd\":\"\xc3\x28\"}\n").await.unwrap();
		let reply = read_frame(&mut reader).await.unwrap().unwrap();
		assert_eq!(reply.command, "failed");
		assert!(reply.argument.contains("UTF-8"));
		assert!(task.await.unwrap().is_err());
	}
}

// vim: ts=4
