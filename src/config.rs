//! Configuration for dsync nodes
//!
//! The configuration follows a priority chain:
//! 1. Built-in defaults (Config::default())
//! 2. Config file (`.toml`, otherwise JSON5 so `//` comments are allowed)
//! 3. Environment variables (DSYNC_* prefix)
//! 4. CLI flags (highest priority, applied by main)

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::SyncError;
use crate::store::DEFAULT_LIVENESS_MARKER;
use crate::strategies::RemovePolicy;
use crate::validation;

/// Prefix of environment variables overriding config values
pub const ENV_PREFIX: &str = "DSYNC_";

/// Unified configuration for source, destination and progress roles
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Config {
	// ========================================================================
	// MANAGED DIRECTORY
	// ========================================================================
	/// Directory owned by this node
	pub path: PathBuf,

	/// Glob patterns the source never sends (e.g. "*.tmp")
	pub exclude_patterns: Vec<String>,

	/// File written into the destination root while it is listening
	pub liveness_marker: String,

	// ========================================================================
	// NETWORK
	// ========================================================================
	/// Interface servers bind to
	pub bind_host: String,

	/// Destination host the source connects to
	pub dest_host: String,

	/// Destination listening port
	pub dest_port: u16,

	/// Local port for the source's outgoing connection (0 = any)
	pub src_port: u16,

	/// Progress reporter host queried by `--progress`
	pub prog_host: String,

	/// Progress reporter listening port
	pub prog_port: u16,

	// ========================================================================
	// SYNC BEHAVIOR
	// ========================================================================
	/// How often the source rescans when idle (milliseconds)
	pub poll_interval_ms: u64,

	/// Upper bound on one request/reply exchange (seconds)
	pub request_timeout_secs: u64,

	/// Pause after a failed operation before the next attempt (milliseconds)
	pub retry_delay_ms: u64,

	/// What to do with remote files that disappeared locally
	pub remove_policy: RemovePolicy,

	/// Run the progress reporter alongside the source loop
	pub progress_enabled: bool,

	// ========================================================================
	// OUTPUT
	// ========================================================================
	/// Debug-level logging
	pub verbose: bool,
}

impl Default for Config {
	fn default() -> Self {
		Config {
			path: PathBuf::from("."),
			exclude_patterns: vec![],
			liveness_marker: DEFAULT_LIVENESS_MARKER.to_string(),

			bind_host: "0.0.0.0".to_string(),
			dest_host: "127.0.0.1".to_string(),
			dest_port: 9898,
			src_port: 0,
			prog_host: "127.0.0.1".to_string(),
			prog_port: 9696,

			poll_interval_ms: 3000,
			request_timeout_secs: 30,
			retry_delay_ms: 250,
			remove_policy: RemovePolicy::Never,
			progress_enabled: true,

			verbose: false,
		}
	}
}

impl Config {
	/// Load a config file on top of the defaults
	pub fn load(path: &Path) -> Result<Self, SyncError> {
		let text = std::fs::read_to_string(path).map_err(|e| SyncError::InvalidConfig {
			message: format!("Cannot read {}: {}", path.display(), e),
		})?;
		let is_toml = path.extension().map(|ext| ext == "toml").unwrap_or(false);
		let parsed = if is_toml { Self::from_toml_str(&text) } else { Self::from_json5_str(&text) };
		parsed.map_err(|e| SyncError::InvalidConfig {
			message: format!("{}: {}", path.display(), e),
		})
	}

	pub fn from_json5_str(text: &str) -> Result<Self, SyncError> {
		json5::from_str(text).map_err(|e| SyncError::InvalidConfig { message: e.to_string() })
	}

	pub fn from_toml_str(text: &str) -> Result<Self, SyncError> {
		toml::from_str(text).map_err(|e| SyncError::InvalidConfig { message: e.to_string() })
	}

	/// Apply `DSYNC_*` overrides from the process environment
	pub fn apply_env(&mut self) -> Result<(), SyncError> {
		self.apply_env_from(std::env::vars())
	}

	/// Apply `DSYNC_*` overrides from an explicit variable list
	pub fn apply_env_from<I>(&mut self, vars: I) -> Result<(), SyncError>
	where
		I: IntoIterator<Item = (String, String)>,
	{
		for (key, value) in vars {
			let Some(name) = key.strip_prefix(ENV_PREFIX) else {
				continue;
			};
			match name {
				"PATH" => self.path = PathBuf::from(value),
				"BIND_HOST" => self.bind_host = value,
				"DEST_HOST" => self.dest_host = value,
				"DEST_PORT" => self.dest_port = parse_env(&key, &value)?,
				"SRC_PORT" => self.src_port = parse_env(&key, &value)?,
				"PROG_HOST" => self.prog_host = value,
				"PROG_PORT" => self.prog_port = parse_env(&key, &value)?,
				"POLL_INTERVAL_MS" => self.poll_interval_ms = parse_env(&key, &value)?,
				"REQUEST_TIMEOUT_SECS" => self.request_timeout_secs = parse_env(&key, &value)?,
				"RETRY_DELAY_MS" => self.retry_delay_ms = parse_env(&key, &value)?,
				"REMOVE_POLICY" => {
					self.remove_policy =
						value.parse().map_err(|message| SyncError::InvalidConfig { message })?
				}
				"PROGRESS_ENABLED" => self.progress_enabled = parse_env(&key, &value)?,
				"VERBOSE" => self.verbose = parse_env(&key, &value)?,
				_ => {}
			}
		}
		Ok(())
	}

	/// Check every value a node depends on
	pub fn validate(&self) -> Result<(), SyncError> {
		validation::validate_port("destPort", self.dest_port)?;
		validation::validate_port("progPort", self.prog_port)?;
		validation::validate_timeout_secs(self.request_timeout_secs)?;
		validation::validate_poll_interval_ms(self.poll_interval_ms)?;
		validation::validate_file_name(&self.liveness_marker)?;
		for pattern in &self.exclude_patterns {
			validation::validate_glob_pattern(pattern)?;
		}
		Ok(())
	}

	/// Compiled exclude globs
	pub fn exclude_globs(&self) -> Result<Vec<glob::Pattern>, SyncError> {
		self.exclude_patterns
			.iter()
			.map(|p| {
				glob::Pattern::new(p).map_err(|e| SyncError::InvalidConfig {
					message: format!("Invalid exclude pattern {:?}: {}", p, e),
				})
			})
			.collect()
	}

	pub fn dest_addr(&self) -> String {
		format!("{}:{}", self.dest_host, self.dest_port)
	}

	pub fn dest_bind_addr(&self) -> String {
		format!("{}:{}", self.bind_host, self.dest_port)
	}

	pub fn prog_addr(&self) -> String {
		format!("{}:{}", self.prog_host, self.prog_port)
	}

	pub fn prog_bind_addr(&self) -> String {
		format!("{}:{}", self.bind_host, self.prog_port)
	}

	pub fn poll_interval(&self) -> Duration {
		Duration::from_millis(self.poll_interval_ms)
	}

	pub fn request_timeout(&self) -> Duration {
		Duration::from_secs(self.request_timeout_secs)
	}

	pub fn retry_delay(&self) -> Duration {
		Duration::from_millis(self.retry_delay_ms)
	}
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, SyncError> {
	value.trim().parse().map_err(|_| SyncError::InvalidConfig {
		message: format!("{} has invalid value {:?}", key, value),
	})
}


// vim: ts=4
