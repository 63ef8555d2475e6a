//! Progress reporter
//!
//! A small request/reply server co-located with the source. Each `report`
//! request returns a snapshot of the source state and clears its error
//! log, so a diagnostic is delivered to exactly one reader.

use async_trait::async_trait;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

use crate::error::SyncError;
use crate::logging::*;
use crate::protocol::{
	serve_listener, Channel, Frame, ProtocolError, Reply, Request, RequestHandler,
};
use crate::state::{Report, SharedState};

/// Answers `report` from the shared source state
pub struct ReportHandler {
	state: SharedState,
}

impl ReportHandler {
	pub fn new(state: SharedState) -> Self {
		Self { state }
	}
}

#[async_trait]
impl RequestHandler for ReportHandler {
	async fn handle(&self, frame: Frame) -> Frame {
		let reply = match Request::from_frame(frame) {
			Ok(Request::Report) => {
				let report = self.state.lock().await.take_report();
				debug!("Reporting {} queued, {} errors", report.queued_count, report.errors.len());
				Reply::Report(report)
			}
			Ok(other) => Reply::failed(ProtocolError::UnknownCommand(other.command().to_string())),
			Err(e) => Reply::failed(e),
		};
		reply.into_frame()
	}
}

/// Listening progress reporter
pub struct ProgressReporter {
	listener: TcpListener,
	handler: Arc<ReportHandler>,
}

impl ProgressReporter {
	pub async fn bind(addr: &str, state: SharedState) -> Result<Self, SyncError> {
		let listener = TcpListener::bind(addr)
			.await
			.map_err(|source| SyncError::BindFailed { addr: addr.to_string(), source })?;
		Ok(Self { listener, handler: Arc::new(ReportHandler::new(state)) })
	}

	pub fn local_addr(&self) -> Result<SocketAddr, SyncError> {
		Ok(self.listener.local_addr()?)
	}

	/// Serve forever
	pub async fn run(self) -> Result<(), SyncError> {
		info!("progress listening on {}", self.local_addr()?);
		serve_listener(self.listener, self.handler).await?;
		Ok(())
	}
}

/// Ask a progress reporter for one report (`--progress`)
pub async fn query_report(addr: &str, timeout: Duration) -> Result<Report, SyncError> {
	let mut channel = Channel::new(addr, timeout);
	channel
		.connect()
		.await
		.map_err(|source| SyncError::ConnectFailed { addr: addr.to_string(), source })?;
	match channel.call(Request::Report).await? {
		Reply::Report(report) => Ok(report),
		Reply::Failed(diagnostic) => Err(SyncError::Other { message: diagnostic }),
		other => Err(SyncError::Protocol(ProtocolError::UnexpectedReply {
			expected: "report",
			got: other.command().to_string(),
		})),
	}
}


// vim: ts=4
