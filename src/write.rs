use std::io::{self, Write};

use byteorder::{LittleEndian, WriteBytesExt};
use log::debug;

use crate::{
	error::BuildError,
	layout::{FileHeader, Layout, Superblock},
	source::SourceFile,
	HEADER_SIZE, NULL_TERMINATOR, SUPERBLOCK_SIZE,
};

/// Represents a writer of images, serializing a planned layout in a single forward pass.
#[derive(Debug)]
pub struct ImageWriter<'a, W> {
	out: &'a mut W,

	pos: u64,
}

impl<'a, W> ImageWriter<'a, W>
where
	W: Write,
{
	/// Creates a new writer with the specified destination.
	pub fn new(out: &'a mut W) -> Self {
		Self {
			out,
			pos: 0,
		}
	}

	/// Attempts to write the superblock, every header and then every aligned payload, returning the number of bytes written.
	///
	/// The payloads of `files` must be given in the same order as they were planned in `layout`.
	pub fn write(mut self, layout: &Layout, files: &[SourceFile]) -> Result<u64, BuildError> {
		debug_assert_eq!(layout.entries.len(), files.len());

		self.write_superblock(&layout.superblock)?;

		for entry in &layout.entries {
			self.write_header(&entry.header)?;
		}

		for (entry, file) in layout.entries.iter().zip(files) {
			self.write_padding(entry.padding)?;

			debug_assert_eq!(self.pos, entry.header.offset as u64);

			self.out.write_all(&file.data)?;
			self.pos += file.data.len() as u64;
		}

		debug!("wrote {} bytes for {} files", self.pos, layout.entries.len());

		Ok(self.pos)
	}

	fn write_superblock(&mut self, superblock: &Superblock) -> io::Result<()> {
		self.out.write_u32::<LittleEndian>(superblock.magic)?;
		self.out.write_u32::<LittleEndian>(superblock.file_count)?;
		self.out.write_u32::<LittleEndian>(superblock.version)?;
		self.out.write_u32::<LittleEndian>(superblock.total_size)?;

		for reserved in superblock.reserved {
			self.out.write_u32::<LittleEndian>(reserved)?;
		}

		self.pos += SUPERBLOCK_SIZE as u64;

		Ok(())
	}

	fn write_header(&mut self, header: &FileHeader) -> io::Result<()> {
		self.out.write_u32::<LittleEndian>(header.magic)?;
		self.out.write_all(&header.name)?;
		self.out.write_u32::<LittleEndian>(header.size)?;
		self.out.write_u32::<LittleEndian>(header.offset)?;
		self.out.write_u32::<LittleEndian>(header.next_header)?;
		self.out.write_u32::<LittleEndian>(header.reserved)?;

		self.pos += HEADER_SIZE as u64;

		Ok(())
	}

	fn write_padding(&mut self, len: u32) -> io::Result<()> {
		for _ in 0..len {
			self.out.write_u8(NULL_TERMINATOR)?;
		}

		self.pos += len as u64;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use std::io::{self, Cursor, Write};

	use super::ImageWriter;
	use crate::{
		error::BuildError,
		layout::{Layout, NamePolicy},
		source::SourceFile,
	};

	fn files() -> Vec<SourceFile> {
		vec![
			SourceFile {
				name: "a.bin".to_owned(),
				data: vec![1, 2, 3, 4, 5],
			},
			SourceFile {
				name: "boot.cfg".to_owned(),
				data: b"timeout=10".to_vec(),
			},
		]
	}

	#[test]
	fn test_write_empty() {
		let mut img: Cursor<Vec<u8>> = Cursor::new(Vec::new());

		let layout = Layout::plan(&[], NamePolicy::Truncate).expect("failed to plan layout");
		let len = ImageWriter::new(&mut img).write(&layout, &[]).expect("failed to write image");

		#[rustfmt::skip]
		let bytes = vec![
			b'N', b'O', b'E', b'K', // Magic
			0, 0, 0, 0, // File count
			1, 0, 0, 0, // Version
			32, 0, 0, 0, // Total size
			0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, // Reserved
		];

		assert_eq!(len, 32);
		assert_eq!(img.get_ref(), &bytes);
	}

	#[test]
	fn test_write() {
		let mut img: Cursor<Vec<u8>> = Cursor::new(Vec::new());

		let files = files();
		let layout = Layout::plan(&files, NamePolicy::Truncate).expect("failed to plan layout");
		let len = ImageWriter::new(&mut img).write(&layout, &files).expect("failed to write image");

		let bytes = img.into_inner();

		assert_eq!(len, 218);
		assert_eq!(bytes.len(), 218);

		// Superblock.

		assert_eq!(bytes[4..8], [2, 0, 0, 0]);
		assert_eq!(bytes[12..16], [218, 0, 0, 0]);

		// First header.

		assert_eq!(bytes[32..36], [b'N', b'O', b'E', b'K']);
		assert_eq!(bytes[36..42], [b'a', b'.', b'b', b'i', b'n', 0]);
		assert_eq!(bytes[100..104], [5, 0, 0, 0]); // Size
		assert_eq!(bytes[104..108], [200, 0, 0, 0]); // Offset
		assert_eq!(bytes[108..112], [116, 0, 0, 0]); // Next header
		assert_eq!(bytes[112..116], [0, 0, 0, 0]); // Reserved

		// Second header.

		assert_eq!(bytes[116..120], [b'N', b'O', b'E', b'K']);
		assert_eq!(bytes[188..192], [208, 0, 0, 0]); // Offset
		assert_eq!(bytes[192..196], [0, 0, 0, 0]); // Next header

		// Payloads with padding.

		assert_eq!(bytes[200..205], [1, 2, 3, 4, 5]);
		assert_eq!(bytes[205..208], [0, 0, 0]);
		assert_eq!(&bytes[208..218], b"timeout=10");
	}

	struct FullDisk;

	impl Write for FullDisk {
		fn write(&mut self, _: &[u8]) -> io::Result<usize> {
			Err(io::Error::new(io::ErrorKind::Other, "no space left on device"))
		}

		fn flush(&mut self) -> io::Result<()> {
			Ok(())
		}
	}

	#[test]
	fn test_write_failure() {
		let files = files();
		let layout = Layout::plan(&files, NamePolicy::Truncate).expect("failed to plan layout");
		let result = ImageWriter::new(&mut FullDisk).write(&layout, &files);

		assert!(matches!(result, Err(BuildError::OutputWriteFailure(_))));
	}
}
