//! # dsync - One-way directory replication
//!
//! A source node keeps pushing the files of a growing local directory to a
//! destination node until both hold the same names. An optional progress
//! reporter next to the source answers status queries.
//!
//! ## Running a destination and a source in one process
//!
//! ```rust,ignore
//! use dsync::protocol::{Channel, RemoteDestination};
//! use dsync::serve::DestinationServer;
//! use dsync::store::DestinationStore;
//! use dsync::sync::{SourceEngine, SourceOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let server = DestinationServer::bind("127.0.0.1:0", DestinationStore::new("./dest")).await?;
//!     let addr = server.local_addr()?.to_string();
//!     tokio::spawn(server.run());
//!
//!     let channel = Channel::new(addr, std::time::Duration::from_secs(30));
//!     let dest = RemoteDestination::connect(channel).await?;
//!     let mut engine = SourceEngine::new("./src", dest, SourceOptions::default());
//!     let report = engine.run_until_idle(1000).await;
//!     println!("{} files on the destination", report.remote_count);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod progress;
pub mod protocol;
pub mod queue;
pub mod serve;
pub mod state;
pub mod store;
pub mod strategies;
pub mod sync;
pub mod util;
pub mod validation;

// Re-export commonly used types
pub use config::Config;
pub use error::{StoreError, SyncError};
pub use state::{Report, SharedState, SyncState};
pub use strategies::RemovePolicy;
pub use sync::{SourceEngine, SourceOptions, Step};

// vim: ts=4
