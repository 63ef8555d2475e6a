//! Logging prelude module for convenient access to tracing macros.
//!
//! # Usage
//!
//! ```ignore
//! use crate::logging::*;
//!
//! info!("destination listening on {}", addr);
//! debug!("found {} files locally", count);
//! ```

pub use tracing::{debug, error, info, warn};

/// Initialize the tracing subscriber with environment filter support.
///
/// `RUST_LOG` always wins. Without it, logs at INFO level and above are
/// displayed, or DEBUG and above when `verbose` is set:
///
/// ```bash
/// RUST_LOG=dsync=trace dsync --src --path ./log
/// RUST_LOG=dsync::sync=debug dsync --src --path ./log
/// ```
pub fn init_tracing(verbose: bool) {
	let default_level = if verbose { "debug" } else { "info" };
	let _ = tracing_subscriber::fmt()
		.with_env_filter(
			tracing_subscriber::EnvFilter::try_from_default_env()
				.unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
		)
		.with_writer(std::io::stderr)
		.try_init();
}

// vim: ts=4
