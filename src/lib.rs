//! Library for building and reading `KEONFS` images, the flat read-only ramdisk format consumed by early-stage kernels.
//!
//! An image is a 32-byte superblock, followed by a contiguous table of 84-byte file headers linked into a chain,
//! followed by the payload of every file, each aligned to a 4-byte boundary.

use std::{fs::File, io::BufWriter, io::Write, path::Path};

use error::BuildError;
use layout::{Layout, NamePolicy};
use source::Ordering;
use write::ImageWriter;

/// Contains types for errors.
pub mod error;

/// Contains the logic for enumerating the files that make up an image.
pub mod source;

/// Contains the logic for planning the byte layout of an image.
pub mod layout;

/// Contains the logic for serializing a planned layout to an image.
pub mod write;

/// Contains types and the accompanying logic for reading from images.
pub mod read;

/// Represents the magic number at the start of the superblock and of every file header.
pub const MAGIC: u32 = 0x4B454F4E; // KEON

/// Represents the version of the format produced and understood by this library.
pub const VERSION: u32 = 1;

/// Represents the number of bytes of the superblock.
pub const SUPERBLOCK_SIZE: u32 = 32;

/// Represents the number of bytes of a single file header.
pub const HEADER_SIZE: u32 = 84;

/// Represents the number of bytes of the name field of a file header.
pub const NAME_FIELD_SIZE: usize = 64;

/// Represents the maximum length of the name of a file, excluding the null-terminator.
pub const NAME_SIZE: usize = NAME_FIELD_SIZE - 1;

/// Represents the alignment, in bytes, of the start of every payload.
pub const ALIGNMENT: u32 = 4;

/// Represents the null terminator for the names of files.
pub const NULL_TERMINATOR: u8 = b'\0';

/// Represents the options for building an image.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Config {
	/// The order in which enumerated files are packed.
	pub ordering: Ordering,

	/// The treatment of names longer than [`NAME_SIZE`] bytes.
	pub name_policy: NamePolicy,
}

/// Represents the outcome of a successful build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Summary {
	/// The number of files packed into the image.
	pub file_count: u32,

	/// The total size, in bytes, of the image.
	pub total_size: u64,

	/// The files packed into the image, in the order of their headers.
	pub files: Vec<Packed>,
}

/// Represents a single file packed into an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packed {
	/// The name of the file as enumerated, before any truncation.
	pub name: String,

	/// The size, in bytes, of the payload.
	pub size: u32,

	/// The absolute offset of the payload within the image.
	pub offset: u32,
}

/// Attempts to build an image at `output` from every regular file directly inside `input`.
///
/// All files are read and the layout is planned before the output is created, so a failure to read the input leaves no output behind.
pub fn build<I, O>(input: I, output: O, config: &Config) -> Result<Summary, BuildError>
where
	I: AsRef<Path>,
	O: AsRef<Path>,
{
	let files = source::enumerate(input.as_ref(), config.ordering)?;
	let layout = Layout::plan(&files, config.name_policy)?;

	let file = File::create(output.as_ref()).map_err(BuildError::OutputWriteFailure)?;
	let mut out = BufWriter::new(file);

	let total_size = ImageWriter::new(&mut out).write(&layout, &files)?;

	out.flush().map_err(BuildError::OutputWriteFailure)?;

	let files = layout
		.entries
		.iter()
		.zip(files)
		.map(|(entry, file)| Packed {
			name: file.name,
			size: entry.header.size,
			offset: entry.header.offset,
		})
		.collect();

	Ok(Summary {
		file_count: layout.superblock.file_count,
		total_size,
		files,
	})
}
