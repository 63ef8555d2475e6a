//! Configuration validation functions

use super::ValidationError;

/// Validate a TCP port used for binding or connecting
pub fn validate_port(name: &str, port: u16) -> Result<(), ValidationError> {
	if port == 0 {
		return Err(ValidationError::ConfigError(format!("{} must be greater than 0", name)));
	}
	Ok(())
}

/// Validate timeout in seconds
pub fn validate_timeout_secs(timeout_secs: u64) -> Result<(), ValidationError> {
	if timeout_secs == 0 {
		return Err(ValidationError::ConfigError("Timeout must be greater than 0".to_string()));
	}
	if timeout_secs > 3600 {
		return Err(ValidationError::ConfigError(format!(
			"Timeout too large: {} seconds (max 3600)",
			timeout_secs
		)));
	}
	Ok(())
}

/// Validate the local directory poll interval
pub fn validate_poll_interval_ms(interval_ms: u64) -> Result<(), ValidationError> {
	if interval_ms == 0 {
		return Err(ValidationError::ConfigError(
			"Poll interval must be greater than 0".to_string(),
		));
	}
	Ok(())
}

/// Validate an exclude glob
pub fn validate_glob_pattern(pattern: &str) -> Result<(), ValidationError> {
	glob::Pattern::new(pattern).map(|_| ()).map_err(|e| {
		ValidationError::ConfigError(format!("Invalid exclude pattern {:?}: {}", pattern, e))
	})
}


// vim: ts=4
