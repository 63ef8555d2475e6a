//! File name validation functions

use std::path::{Component, Path};

use super::ValidationError;

/// Check if a name has no parent directory references
pub fn is_path_safe(path: &Path) -> bool {
	!path.components().any(|c| matches!(c, Component::ParentDir))
}

/// Check if a name is exactly one plain path component
///
/// Listings are shallow, so every managed file lives directly under the
/// root. Anything with separators, `.`/`..` or a root prefix is rejected.
pub fn is_plain_file_name(name: &str) -> bool {
	let mut components = Path::new(name).components();
	matches!((components.next(), components.next()), (Some(Component::Normal(_)), None))
		&& !name.contains('/')
		&& !name.contains('\\')
}

/// Validate a file name received over the wire
///
/// # Returns
/// `Ok(())` if the name is a single plain component, `Err(ValidationError)`
/// describing the first problem found otherwise
pub fn validate_file_name(name: &str) -> Result<(), ValidationError> {
	if name.is_empty() {
		return Err(ValidationError::PathError("File name is empty".to_string()));
	}
	let path = Path::new(name);
	if path.is_absolute() {
		return Err(ValidationError::PathError(format!(
			"File name must be relative, got absolute path: {:?}",
			name
		)));
	}
	if !is_path_safe(path) {
		return Err(ValidationError::PathError(
			"File name contains parent directory reference (..)".to_string(),
		));
	}
	if !is_plain_file_name(name) {
		return Err(ValidationError::PathError(format!(
			"File name must not contain directory components: {:?}",
			name
		)));
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_is_path_safe_with_parent() {
		assert!(is_path_safe(Path::new("file.txt")));
		assert!(!is_path_safe(Path::new("../file.txt")));
		assert!(!is_path_safe(Path::new("dir/../file.txt")));
	}

	#[test]
	fn test_plain_file_names() {
		assert!(is_plain_file_name("frame_0001.jpg"));
		assert!(is_plain_file_name(".hidden"));
		assert!(!is_plain_file_name("dir/file.jpg"));
		assert!(!is_plain_file_name("."));
		assert!(!is_plain_file_name(".."));
		assert!(!is_plain_file_name("a\\b"));
	}

	#[test]
	fn test_validate_file_name_ok() {
		assert!(validate_file_name("a.jpg").is_ok());
		assert!(validate_file_name("record_12_34.json").is_ok());
	}

	#[test]
	fn test_validate_file_name_empty() {
		let result = validate_file_name("");
		assert!(result.unwrap_err().to_string().contains("empty"));
	}

	#[test]
	fn test_validate_file_name_absolute() {
		let result = validate_file_name("/etc/passwd");
		assert!(result.unwrap_err().to_string().contains("must be relative"));
	}

	#[test]
	fn test_validate_file_name_parent() {
		let result = validate_file_name("../escape.jpg");
		assert!(result.unwrap_err().to_string().contains("parent directory"));
	}

	#[test]
	fn test_validate_file_name_nested() {
		let result = validate_file_name("sub/a.jpg");
		assert!(result.unwrap_err().to_string().contains("directory components"));
	}
}

// vim: ts=4
