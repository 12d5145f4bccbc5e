use core::fmt;
use std::{error::Error, fmt::Display, io, path::PathBuf};

/// Represents a build-related error.
#[derive(Debug)]
pub enum BuildError {
	/// Indicates that the input directory, or an entry within it, could not be listed.
	DirectoryUnavailable {
		path: PathBuf,
		source: io::Error,
	},

	/// Indicates that a listed file could not be read.
	FileReadFailure {
		path: PathBuf,
		source: io::Error,
	},

	/// Indicates that the name of a listed file is not valid UTF-8.
	InvalidName {
		path: PathBuf,
	},

	/// Indicates that the output could not be created or written.
	OutputWriteFailure(io::Error),

	/// Indicates that a count, size or offset does not fit the 32-bit fields of the format.
	ImageTooLarge,

	/// Indicates that a name exceeds the name field while long names are rejected.
	NameTooLong {
		name: String,
	},
}

/// Represents a read-related error.
#[derive(Debug)]
pub enum ReadError {
	/// Indicates that a generic I/O error occurred.
	IoError(io::Error),

	/// Indicates that the superblock does not start with the expected magic number.
	InvalidMagic(u32),

	/// Indicates that the image was produced by an unknown version of the format.
	UnsupportedVersion(u32),

	/// Indicates that the header at the offset does not start with the expected magic number.
	InvalidHeader {
		offset: u32,
	},

	/// Indicates that the header chain points outside of the image or back onto itself.
	BrokenChain {
		offset: u32,
	},

	/// Indicates that the header chain and the superblock disagree on the number of files.
	CountMismatch {
		expected: u32,
		found: u32,
	},
}

impl Error for BuildError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::DirectoryUnavailable {
				source,
				..
			} => Some(source),
			Self::FileReadFailure {
				source,
				..
			} => Some(source),
			Self::OutputWriteFailure(err) => Some(err),
			_ => None,
		}
	}
}

impl Error for ReadError {
	fn source(&self) -> Option<&(dyn Error + 'static)> {
		match self {
			Self::IoError(err) => Some(err),
			_ => None,
		}
	}
}

impl Display for BuildError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::DirectoryUnavailable {
				path,
				source,
			} => write!(f, "directory unavailable <{}> [{}]", path.display(), source),
			Self::FileReadFailure {
				path,
				source,
			} => write!(f, "failed to read file <{}> [{}]", path.display(), source),
			Self::InvalidName {
				path,
			} => write!(f, "file name is not valid UTF-8 <{}>", path.display()),
			Self::OutputWriteFailure(err) => write!(f, "failed to write output [{}]", err),
			Self::ImageTooLarge => write!(f, "image exceeds the 32-bit limits of the format"),
			Self::NameTooLong {
				name,
			} => write!(f, "name too long [{}]", name),
		}
	}
}

impl Display for ReadError {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::IoError(err) => write!(f, "input/output error [{}]", err),
			Self::InvalidMagic(magic) => write!(f, "invalid magic [{:#010x}]", magic),
			Self::UnsupportedVersion(version) => write!(f, "unsupported version [{}]", version),
			Self::InvalidHeader {
				offset,
			} => write!(f, "invalid header at offset {}", offset),
			Self::BrokenChain {
				offset,
			} => write!(f, "broken header chain at offset {}", offset),
			Self::CountMismatch {
				expected,
				found,
			} => write!(f, "expected {} headers, found {}", expected, found),
		}
	}
}

impl From<io::Error> for BuildError {
	fn from(value: io::Error) -> Self {
		Self::OutputWriteFailure(value)
	}
}

impl From<io::Error> for ReadError {
	fn from(value: io::Error) -> Self {
		Self::IoError(value)
	}
}
