use log::{debug, warn};

use crate::{
	error::BuildError,
	source::SourceFile,
	ALIGNMENT, HEADER_SIZE, MAGIC, NAME_FIELD_SIZE, NAME_SIZE, NULL_TERMINATOR, SUPERBLOCK_SIZE, VERSION,
};

/// Represents the treatment of names longer than the name field allows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NamePolicy {
	/// Silently keeps the first 63 bytes of the name, logging a warning.
	///
	/// Names sharing the same 63-byte prefix collide without any further detection.
	#[default]
	Truncate,

	/// Fails the build on the first name longer than 63 bytes.
	Reject,
}

/// Represents the superblock at the very start of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Superblock {
	pub magic: u32,
	pub file_count: u32,
	pub version: u32,

	/// The exact size, in bytes, of the whole image.
	pub total_size: u32,

	pub reserved: [u32; 4],
}

/// Represents the header describing a single packed file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
	pub magic: u32,

	/// The name of the file, null-terminated and padded with null bytes.
	pub name: [u8; NAME_FIELD_SIZE],

	/// The size, in bytes, of the payload.
	pub size: u32,

	/// The absolute offset of the payload within the image.
	pub offset: u32,

	/// The absolute offset of the following header, or `0` for the last header.
	pub next_header: u32,

	pub reserved: u32,
}

/// Represents a file header together with the padding preceding its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedEntry {
	pub header: FileHeader,

	/// The number of null bytes written before the payload to align it.
	pub padding: u32,
}

/// Represents the fully computed byte layout of an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
	pub superblock: Superblock,

	/// The planned entries, in the order the files were enumerated.
	pub entries: Vec<PlannedEntry>,
}

impl Layout {
	/// Attempts to plan the layout of an image holding `files`, in order.
	///
	/// Fails only if the image would not fit the 32-bit fields of the format, or if a name is too long under [`NamePolicy::Reject`].
	pub fn plan(files: &[SourceFile], policy: NamePolicy) -> Result<Self, BuildError> {
		let file_count = u32::try_from(files.len()).map_err(|_| BuildError::ImageTooLarge)?;

		// The payload region begins immediately after the header table.

		let mut cursor = file_count.checked_mul(HEADER_SIZE).and_then(|len| len.checked_add(SUPERBLOCK_SIZE)).ok_or(BuildError::ImageTooLarge)?;

		let mut entries = Vec::with_capacity(files.len());

		for (index, file) in files.iter().enumerate() {
			let size = u32::try_from(file.data.len()).map_err(|_| BuildError::ImageTooLarge)?;

			// Align the start of the payload.

			let padding = padding_for(cursor);

			cursor = cursor.checked_add(padding).ok_or(BuildError::ImageTooLarge)?;

			let offset = cursor;

			// Link to the header immediately following in the table, or terminate the chain.
			// Offset 0 always holds the superblock, so it can never be the start of a header.

			let next_header = if index + 1 < files.len() {
				SUPERBLOCK_SIZE + (index as u32 + 1) * HEADER_SIZE
			} else {
				0
			};

			let name = to_name_field(&file.name, policy)?;

			debug!("planned file={}, size={}, padding={}, start_at={}", file.name, size, padding, offset);

			entries.push(PlannedEntry {
				header: FileHeader {
					magic: MAGIC,
					name,
					size,
					offset,
					next_header,
					reserved: 0,
				},
				padding,
			});

			cursor = cursor.checked_add(size).ok_or(BuildError::ImageTooLarge)?;
		}

		Ok(Self {
			superblock: Superblock {
				magic: MAGIC,
				file_count,
				version: VERSION,
				total_size: cursor,
				reserved: [0; 4],
			},
			entries,
		})
	}
}

/// Returns the number of bytes required to advance `pos` to the next multiple of [`ALIGNMENT`].
pub fn padding_for(pos: u32) -> u32 {
	(ALIGNMENT - (pos % ALIGNMENT)) % ALIGNMENT
}

fn to_name_field(name: &str, policy: NamePolicy) -> Result<[u8; NAME_FIELD_SIZE], BuildError> {
	let bytes = name.as_bytes();

	if bytes.len() > NAME_SIZE {
		match policy {
			NamePolicy::Truncate => warn!("truncating name [{}] to {} bytes", name, NAME_SIZE),
			NamePolicy::Reject => {
				return Err(BuildError::NameTooLong {
					name: name.to_owned(),
				})
			}
		}
	}

	// Truncate on raw bytes, leaving at least one null terminator.

	let mut field = [NULL_TERMINATOR; NAME_FIELD_SIZE];
	let len = bytes.len().min(NAME_SIZE);

	field[..len].copy_from_slice(&bytes[..len]);

	Ok(field)
}
