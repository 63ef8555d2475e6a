//! TCP request/reply channel and the remote destination client
//!
//! A `Channel` owns at most one connection. Every request is bounded by the
//! request timeout; when a request fails for any transport reason the
//! connection is dropped, because a late reply would otherwise be read as
//! the answer to the next request. The next request reconnects.

use async_trait::async_trait;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};
use std::time::Duration;
use tokio::io::BufReader;
use tokio::net::{TcpSocket, TcpStream};
use tracing::debug;

use super::error::ProtocolError;
use super::frame::{read_frame, write_frame};
use super::traits::{expect_file_list, expect_ok, DestinationClient, ProtocolResult, RpcResult};
use super::types::{Frame, Reply, Request};

/// Strict request/reply channel to one peer
#[derive(Debug)]
pub struct Channel {
	addr: String,
	local_port: u16,
	timeout: Duration,
	conn: Option<BufReader<TcpStream>>,
}

impl Channel {
	/// Create an unconnected channel; the first request connects
	pub fn new(addr: impl Into<String>, timeout: Duration) -> Self {
		Self { addr: addr.into(), local_port: 0, timeout, conn: None }
	}

	/// Bind outgoing connections to this local port (0 = any)
	pub fn with_local_port(mut self, port: u16) -> Self {
		self.local_port = port;
		self
	}

	pub fn is_connected(&self) -> bool {
		self.conn.is_some()
	}

	/// Connect now instead of on the first request
	pub async fn connect(&mut self) -> ProtocolResult<()> {
		let timeout = self.timeout;
		match tokio::time::timeout(timeout, self.open()).await {
			Ok(result) => result,
			Err(_) => Err(ProtocolError::Timeout(timeout)),
		}
	}

	/// Send one frame and wait for its reply
	pub async fn request(&mut self, frame: Frame) -> ProtocolResult<Frame> {
		let timeout = self.timeout;
		let result = match tokio::time::timeout(timeout, self.exchange(frame)).await {
			Ok(result) => result,
			Err(_) => Err(ProtocolError::Timeout(timeout)),
		};
		if let Err(e) = &result {
			debug!("[channel] dropping connection to {}: {}", self.addr, e);
			self.conn = None;
		}
		result
	}

	/// Typed wrapper around `request`
	pub async fn call(&mut self, request: Request) -> ProtocolResult<Reply> {
		let reply = self.request(request.into_frame()).await?;
		Reply::from_frame(reply)
	}

	async fn exchange(&mut self, frame: Frame) -> ProtocolResult<Frame> {
		if self.conn.is_none() {
			self.open().await?;
		}
		let conn = self.conn.as_mut().ok_or(ProtocolError::Disconnected)?;
		write_frame(conn.get_mut(), &frame).await?;
		read_frame(conn).await?.ok_or(ProtocolError::Disconnected)
	}

	async fn open(&mut self) -> ProtocolResult<()> {
		let stream = if self.local_port == 0 {
			TcpStream::connect(&self.addr).await?
		} else {
			let remote = tokio::net::lookup_host(&self.addr)
				.await?
				.next()
				.ok_or_else(|| ProtocolError::Other(format!("Cannot resolve {}", self.addr)))?;
			let (socket, local_ip) = if remote.is_ipv4() {
				(TcpSocket::new_v4()?, IpAddr::V4(Ipv4Addr::UNSPECIFIED))
			} else {
				(TcpSocket::new_v6()?, IpAddr::V6(Ipv6Addr::UNSPECIFIED))
			};
			socket.set_reuseaddr(true)?;
			socket.bind(SocketAddr::new(local_ip, self.local_port))?;
			socket.connect(remote).await?
		};
		stream.set_nodelay(true)?;
		debug!("[channel] connected to {}", self.addr);
		self.conn = Some(BufReader::new(stream));
		Ok(())
	}
}

/// Destination reached over TCP
#[derive(Debug)]
pub struct RemoteDestination {
	channel: Channel,
}

impl RemoteDestination {
	/// Connect eagerly so startup can report an unreachable destination
	pub async fn connect(channel: Channel) -> ProtocolResult<Self> {
		let mut channel = channel;
		channel.connect().await?;
		Ok(Self { channel })
	}

	pub fn channel(&self) -> &Channel {
		&self.channel
	}
}

#[async_trait]
impl DestinationClient for RemoteDestination {
	async fn list_files(&mut self) -> RpcResult<Vec<String>> {
		expect_file_list(self.channel.call(Request::ListFiles).await?)
	}

	async fn store_file(&mut self, name: &str, data: Vec<u8>) -> RpcResult<()> {
		expect_ok(self.channel.call(Request::StoreFile { name: name.to_string(), data }).await?)
	}

	async fn delete_file(&mut self, name: &str) -> RpcResult<()> {
		expect_ok(self.channel.call(Request::DeleteFile { name: name.to_string() }).await?)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use tokio::net::TcpListener;

	#[tokio::test]
	async fn test_silent_peer_times_out_and_reconnects() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap().to_string();

		// Accept connections, read nothing, answer nothing
		let server = tokio::spawn(async move {
			let mut held = Vec::new();
			for _ in 0..2 {
				let (stream, _) = listener.accept().await.unwrap();
				held.push(stream);
			}
			held
		});

		let mut channel = Channel::new(addr, Duration::from_millis(100));
		let err = channel.request(Frame::bare("list_files")).await.unwrap_err();
		assert!(matches!(err, ProtocolError::Timeout(_)));
		assert!(!channel.is_connected());

		// Second attempt opens a fresh connection and times out again
		let err = channel.request(Frame::bare("list_files")).await.unwrap_err();
		assert!(matches!(err, ProtocolError::Timeout(_)));

		let held = server.await.unwrap();
		assert_eq!(held.len(), 2);
	}

	#[tokio::test]
	async fn test_connection_refused_is_io_error() {
		let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
		let addr = listener.local_addr().unwrap().to_string();
		drop(listener);

		let mut channel = Channel::new(addr, Duration::from_secs(2));
		let err = channel.connect().await.unwrap_err();
		assert!(matches!(err, ProtocolError::Io(_)));
	}
}

// vim: ts=4
