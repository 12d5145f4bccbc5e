use std::{
	fs,
	path::{Path, PathBuf},
};

use log::debug;

use crate::error::BuildError;

/// Represents a single file to be packed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
	/// The name of the file, without any leading directories.
	pub name: String,

	/// The entire content of the file.
	pub data: Vec<u8>,
}

/// Represents the order in which enumerated files are packed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Ordering {
	/// Keeps the order yielded by the directory listing, which depends on the platform and filesystem.
	#[default]
	Listing,

	/// Sorts files by the bytes of their names, for reproducible images.
	Lexicographic,
}

/// Represents a regular file found by listing a directory, not yet read.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Listed {
	name: String,
	path: PathBuf,
}

/// Attempts to read every regular file directly inside `dir`.
///
/// Subdirectories and other non-regular entries are skipped; symbolic links are followed, and dangling ones are skipped.
pub fn enumerate(dir: &Path, ordering: Ordering) -> Result<Vec<SourceFile>, BuildError> {
	let mut listed = list(dir)?;

	if ordering == Ordering::Lexicographic {
		listed.sort_by(|a, b| a.name.as_bytes().cmp(b.name.as_bytes()));
	}

	let files = read_listed(listed)?;

	debug!("enumerated {} files in <{}>", files.len(), dir.display());

	Ok(files)
}

fn list(dir: &Path) -> Result<Vec<Listed>, BuildError> {
	let unavailable = |source| BuildError::DirectoryUnavailable {
		path: dir.to_path_buf(),
		source,
	};

	let mut listed = Vec::new();

	for entry in fs::read_dir(dir).map_err(unavailable)? {
		let entry = entry.map_err(unavailable)?;
		let path = entry.path();

		// Resolve through links so that a link to a regular file is packed like the file itself.

		let metadata = match fs::metadata(&path) {
			Ok(metadata) => metadata,
			Err(err) => {
				debug!("skipping unresolvable entry <{}> [{}]", path.display(), err);

				continue;
			}
		};

		if !metadata.is_file() {
			debug!("skipping non-regular entry <{}>", path.display());

			continue;
		}

		// Names are stored as raw bytes, so only names that are valid UTF-8 are accepted.

		let name = entry.file_name().into_string().map_err(|_| BuildError::InvalidName {
			path: path.clone(),
		})?;

		listed.push(Listed {
			name,
			path,
		});
	}

	Ok(listed)
}

fn read_listed(listed: Vec<Listed>) -> Result<Vec<SourceFile>, BuildError> {
	listed
		.into_iter()
		.map(|Listed { name, path }| -> Result<SourceFile, BuildError> {
			let data = fs::read(&path).map_err(|source| BuildError::FileReadFailure {
				path,
				source,
			})?;

			Ok(SourceFile {
				name,
				data,
			})
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use std::fs;

	use super::{enumerate, list, read_listed, Ordering};
	use crate::error::BuildError;

	#[test]
	fn test_enumerate_skips_directories() {
		let temp = tempfile::tempdir().expect("failed to create temporary directory");

		fs::write(temp.path().join("kernel.sym"), b"symbols").expect("failed to write file");
		fs::create_dir(temp.path().join("nested")).expect("failed to create directory");
		fs::write(temp.path().join("nested").join("hidden.txt"), b"hidden").expect("failed to write nested file");

		let files = enumerate(temp.path(), Ordering::Listing).expect("failed to enumerate");

		assert_eq!(files.len(), 1);
		assert_eq!(files[0].name, "kernel.sym");
		assert_eq!(files[0].data, b"symbols");
	}

	#[test]
	fn test_enumerate_lexicographic() {
		let temp = tempfile::tempdir().expect("failed to create temporary directory");

		for name in ["zeta", "Alpha", "beta", "alpha"] {
			fs::write(temp.path().join(name), name.as_bytes()).expect("failed to write file");
		}

		let files = enumerate(temp.path(), Ordering::Lexicographic).expect("failed to enumerate");
		let names: Vec<_> = files.iter().map(|file| file.name.as_str()).collect();

		assert_eq!(names, ["Alpha", "alpha", "beta", "zeta"]);
	}

	#[test]
	fn test_enumerate_empty() {
		let temp = tempfile::tempdir().expect("failed to create temporary directory");

		let files = enumerate(temp.path(), Ordering::Listing).expect("failed to enumerate");

		assert!(files.is_empty());
	}

	#[test]
	fn test_enumerate_missing() {
		let temp = tempfile::tempdir().expect("failed to create temporary directory");

		let result = enumerate(&temp.path().join("missing"), Ordering::Listing);

		assert!(matches!(result, Err(BuildError::DirectoryUnavailable { .. })));
	}

	#[test]
	#[cfg(unix)]
	fn test_enumerate_skips_dangling_links() {
		let temp = tempfile::tempdir().expect("failed to create temporary directory");

		fs::write(temp.path().join("init"), b"init").expect("failed to write file");
		std::os::unix::fs::symlink(temp.path().join("gone"), temp.path().join("dangling")).expect("failed to create link");

		let files = enumerate(temp.path(), Ordering::Listing).expect("failed to enumerate");

		assert_eq!(files.len(), 1);
		assert_eq!(files[0].name, "init");
	}

	#[test]
	#[cfg(unix)]
	fn test_enumerate_follows_links() {
		let temp = tempfile::tempdir().expect("failed to create temporary directory");
		let outside = tempfile::tempdir().expect("failed to create temporary directory");

		fs::write(outside.path().join("kernel.sym"), b"symbols").expect("failed to write file");
		std::os::unix::fs::symlink(outside.path().join("kernel.sym"), temp.path().join("linked.sym")).expect("failed to create link");
		std::os::unix::fs::symlink(outside.path(), temp.path().join("linked-dir")).expect("failed to create link");

		let files = enumerate(temp.path(), Ordering::Listing).expect("failed to enumerate");

		assert_eq!(files.len(), 1);
		assert_eq!(files[0].name, "linked.sym");
		assert_eq!(files[0].data, b"symbols");
	}

	#[test]
	#[cfg(target_os = "linux")]
	fn test_enumerate_invalid_name() {
		use std::{ffi::OsStr, os::unix::ffi::OsStrExt};

		let temp = tempfile::tempdir().expect("failed to create temporary directory");

		fs::write(temp.path().join(OsStr::from_bytes(b"ab\xffcd")), b"data").expect("failed to write file");

		let result = enumerate(temp.path(), Ordering::Listing);

		assert!(matches!(result, Err(BuildError::InvalidName { .. })));
	}

	#[test]
	fn test_read_listed_removed() {
		let temp = tempfile::tempdir().expect("failed to create temporary directory");

		fs::write(temp.path().join("init"), b"init").expect("failed to write first file");
		fs::write(temp.path().join("motd"), b"motd").expect("failed to write second file");

		let listed = list(temp.path()).expect("failed to list");

		assert_eq!(listed.len(), 2);

		// Remove a file between listing and reading.

		fs::remove_file(temp.path().join("motd")).expect("failed to remove file");

		let result = read_listed(listed);

		match result {
			Err(BuildError::FileReadFailure {
				path,
				..
			}) => assert_eq!(path, temp.path().join("motd")),
			other => panic!("expected read failure, got {:?}", other),
		}
	}
}
