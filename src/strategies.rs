//! Reconciliation strategy enums
//!
//! Each enum includes a FromStr implementation for CLI and config parsing.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

// ============================================================================
// REMOVE POLICY
// ============================================================================

/// What the source does with files that exist on the destination but not locally
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RemovePolicy {
	/// Never delete remote files; the destination only grows (default)
	#[default]
	Never,

	/// Delete remote files that disappeared locally
	Mirror,
}

impl RemovePolicy {
	/// Whether reconciliation should populate the remove queue
	pub fn deletes_remote(self) -> bool {
		matches!(self, Self::Mirror)
	}
}

impl FromStr for RemovePolicy {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"never" | "no-delete" | "keep" => Ok(Self::Never),
			"mirror" | "delete" | "delete-on-divergence" => Ok(Self::Mirror),
			_ => Err(format!("Unknown remove policy: {}. Valid options: never, mirror", s)),
		}
	}
}

impl std::fmt::Display for RemovePolicy {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			Self::Never => write!(f, "never"),
			Self::Mirror => write!(f, "mirror"),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_remove_policy_from_str() {
		assert_eq!("never".parse::<RemovePolicy>().unwrap(), RemovePolicy::Never);
		assert_eq!("MIRROR".parse::<RemovePolicy>().unwrap(), RemovePolicy::Mirror);
		assert_eq!(
			"delete-on-divergence".parse::<RemovePolicy>().unwrap(),
			RemovePolicy::Mirror
		);
		assert!("sometimes".parse::<RemovePolicy>().is_err());
	}

	#[test]
	fn test_remove_policy_default_keeps_remote() {
		assert_eq!(RemovePolicy::default(), RemovePolicy::Never);
		assert!(!RemovePolicy::Never.deletes_remote());
		assert!(RemovePolicy::Mirror.deletes_remote());
	}

	#[test]
	fn test_remove_policy_serde() {
		let json = serde_json::to_string(&RemovePolicy::Mirror).unwrap();
		assert_eq!(json, "\"mirror\"");
	}
}

// vim: ts=4
