use std::{
	collections::HashSet,
	io::{self, Read, Seek},
};

use byteorder::{LittleEndian, ReadBytesExt};

use crate::{
	error::ReadError,
	layout::Superblock,
	HEADER_SIZE, MAGIC, NAME_FIELD_SIZE, NULL_TERMINATOR, SUPERBLOCK_SIZE, VERSION,
};

/// Represents an image whose header chain has been fully walked and validated.
#[derive(Debug)]
pub struct Archive<'a, R> {
	inner: &'a mut R,

	superblock: Superblock,
	entries: Vec<Entry>,
}

/// Represents an entry.
#[derive(Debug, Clone, Hash, Eq, PartialEq, PartialOrd)]
pub struct Entry {
	/// The name of the entry, up to 63 bytes.
	pub name: String,

	/// The size, in bytes, of the payload.
	pub size: u32,

	/// The absolute offset, in bytes, of the payload.
	pub offset: u32,

	/// The absolute offset, in bytes, of the header describing the entry.
	pub header_offset: u32,
}

/// Represents an entry opened for reading.
#[derive(Debug)]
pub struct OpenEntry<'a, R>
where
	R: Read + Seek,
{
	inner: &'a mut R,

	off: u64,
	len: u64,
	pos: u64,
}

impl<'a, R> Archive<'a, R>
where
	R: Read + Seek,
{
	/// Attempts to read the superblock and every header of the image in `inner`.
	pub fn read(inner: &'a mut R) -> Result<Self, ReadError> {
		inner.seek(io::SeekFrom::Start(0))?;

		let superblock = read_superblock(inner)?;

		// Check if the superblock is of the expected format before trusting anything else.

		if superblock.magic != MAGIC {
			return Err(ReadError::InvalidMagic(superblock.magic));
		}

		if superblock.version != VERSION {
			return Err(ReadError::UnsupportedVersion(superblock.version));
		}

		// Walk the header chain from the first header until it terminates.

		let mut entries: Vec<Entry> = Vec::new();
		let mut visited: HashSet<u32> = HashSet::new();

		let mut next = if superblock.file_count > 0 {
			SUPERBLOCK_SIZE
		} else {
			0
		};

		while next != 0 {
			if entries.len() as u32 >= superblock.file_count {
				return Err(ReadError::CountMismatch {
					expected: superblock.file_count,
					found: entries.len() as u32 + 1,
				});
			}

			let end = next.checked_add(HEADER_SIZE);

			if !visited.insert(next) || end.map_or(true, |end| end > superblock.total_size) {
				return Err(ReadError::BrokenChain {
					offset: next,
				});
			}

			inner.seek(io::SeekFrom::Start(next as u64))?;

			let header_offset = next;

			if inner.read_u32::<LittleEndian>()? != MAGIC {
				return Err(ReadError::InvalidHeader {
					offset: header_offset,
				});
			}

			let name = read_null_terminated(inner)?;
			let size = inner.read_u32::<LittleEndian>()?;
			let offset = inner.read_u32::<LittleEndian>()?;

			next = inner.read_u32::<LittleEndian>()?;

			let _ = inner.read_u32::<LittleEndian>()?; // Reserved (always 0)

			// Check that the payload lies entirely within the image.

			if offset.checked_add(size).map_or(true, |end| end > superblock.total_size) {
				return Err(ReadError::InvalidHeader {
					offset: header_offset,
				});
			}

			entries.push(Entry {
				name,
				size,
				offset,
				header_offset,
			});
		}

		if entries.len() as u32 != superblock.file_count {
			return Err(ReadError::CountMismatch {
				expected: superblock.file_count,
				found: entries.len() as u32,
			});
		}

		Ok(Self {
			inner,
			superblock,
			entries,
		})
	}

	/// Opens and returns the entry at the specified index for reading, if it exists.
	pub fn open(&mut self, index: usize) -> Option<OpenEntry<'_, R>> {
		let entry = self.entries.get(index)?;

		Some(OpenEntry {
			inner: self.inner,
			off: entry.offset as u64,
			len: entry.size as u64,
			pos: 0,
		})
	}
}

impl<'a, R> Archive<'a, R> {
	/// Returns the superblock of the image.
	pub fn superblock(&self) -> &Superblock {
		&self.superblock
	}

	/// Returns the number of entries in the image.
	pub fn len(&self) -> usize {
		self.entries.len()
	}

	/// Returns if the image is void of any entries.
	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	/// Returns the entry at the specified index, if it exists.
	pub fn get(&self, index: usize) -> Option<&Entry> {
		self.entries.get(index)
	}

	/// Returns the index of the first entry with the specified name, if it exists.
	pub fn find(&self, name: &str) -> Option<usize> {
		self.entries.iter().position(|entry| entry.name == name)
	}

	/// Returns an iterator over each of the entries in the image.
	pub fn iter(&self) -> impl Iterator<Item = &Entry> {
		self.entries.iter()
	}
}

impl<'a, R> Read for OpenEntry<'a, R>
where
	R: Read + Seek,
{
	fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
		if self.pos >= self.len {
			return Ok(0);
		}

		self.inner.seek(io::SeekFrom::Start(self.off + self.pos))?;

		// Forbid reading beyond the payload into the padding or the next payload.

		let len = (self.len - self.pos).min(buf.len() as u64) as usize;
		let off = self.inner.read(&mut buf[0..len])?;

		self.pos += off as u64;

		Ok(off)
	}
}

fn read_superblock<T>(inner: &mut T) -> Result<Superblock, io::Error>
where
	T: Read,
{
	let magic = inner.read_u32::<LittleEndian>()?;
	let file_count = inner.read_u32::<LittleEndian>()?;
	let version = inner.read_u32::<LittleEndian>()?;
	let total_size = inner.read_u32::<LittleEndian>()?;

	let mut reserved = [0; 4];

	inner.read_u32_into::<LittleEndian>(&mut reserved)?;

	Ok(Superblock {
		magic,
		file_count,
		version,
		total_size,
		reserved,
	})
}

fn read_null_terminated<T>(inner: &mut T) -> Result<String, io::Error>
where
	T: Read,
{
	let mut buf = [0; NAME_FIELD_SIZE];

	inner.read_exact(&mut buf)?;

	let pos = buf.iter().position(|&b| b == NULL_TERMINATOR).unwrap_or(buf.len());

	Ok(String::from_utf8_lossy(&buf[..pos]).into_owned())
}
