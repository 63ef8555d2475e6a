//! Request/reply transport
//!
//! Every exchange is one `(command, argument, payload)` frame out and one
//! frame back. The source engine depends only on `DestinationClient`;
//! servers plug a `RequestHandler` into the shared connection loop.
//!
//! # Example Usage
//!
//! ```ignore
//! use dsync::protocol::{Channel, DestinationClient, RemoteDestination};
//!
//! let channel = Channel::new("127.0.0.1:9898", Duration::from_secs(30));
//! let mut dest = RemoteDestination::connect(channel).await?;
//! for name in dest.list_files().await? {
//!     println!("{}", name);
//! }
//! ```

pub mod client;
pub mod error;
pub mod frame;
pub mod internal;
pub mod server;
pub mod traits;
pub mod types;

// Re-export public API
pub use client::{Channel, RemoteDestination};
pub use error::{ProtocolError, RpcError};
pub use frame::{read_frame, write_frame};
pub use internal::LocalDestination;
pub use server::{serve_connection, serve_listener};
pub use traits::{DestinationClient, ProtocolResult, RequestHandler, RpcResult};
pub use types::{command, FileListPayload, Frame, Reply, Request};

// vim: ts=4
