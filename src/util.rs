use std::io;
use std::path::Path;
use tokio::fs as afs;

use crate::logging::*;

/// Sorted names of the regular files directly inside `dir`
///
/// Shallow: subdirectories are skipped, symlinks count when they point at a
/// regular file. Names that are not valid UTF-8 cannot travel in the
/// protocol and are skipped with a warning. `keep` filters the rest.
pub async fn list_plain_files<F>(dir: &Path, keep: F) -> io::Result<Vec<String>>
where
	F: Fn(&str) -> bool,
{
	let mut entries = afs::read_dir(dir).await?;
	let mut names = Vec::new();

	while let Some(entry) = entries.next_entry().await? {
		let file_name = entry.file_name();
		let name = match file_name.to_str() {
			Some(name) => name,
			None => {
				warn!("Skipping non UTF-8 file name {:?} in {}", file_name, dir.display());
				continue;
			}
		};

		match afs::metadata(entry.path()).await {
			Ok(meta) if meta.is_file() => {}
			Ok(_) => continue,
			Err(e) => {
				debug!("Cannot access {}: {}", entry.path().display(), e);
				continue;
			}
		}

		if keep(name) {
			names.push(name.to_string());
		}
	}

	names.sort();
	Ok(names)
}


// vim: ts=4
