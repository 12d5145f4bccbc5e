//! Command-line application for building and inspecting `KEONFS` images.

use std::{
	fs::{self, File},
	io::{self, BufReader},
	path::{Path, PathBuf},
	process::ExitCode,
};

use clap::{ArgAction, Parser, Subcommand};
use keonfs::{layout::NamePolicy, read::Archive, source::Ordering, Config};
use log::{warn, LevelFilter};

mod logger;

/// Builds, inspects and extracts KEONFS ramdisk images
#[derive(Debug, Parser)]
struct Cli {
	/// Increases the verbosity of diagnostics written to standard error
	#[arg(short, long, action = ArgAction::Count, global = true)]
	verbose: u8,

	/// Indicates the operation to perform
	#[command(subcommand)]
	operation: Operation,
}

/// Represents the operation to perform
#[derive(Debug, Subcommand)]
enum Operation {
	/// Pack every regular file of a directory into an image
	Pack {
		/// Specifies the directory holding the files
		input: PathBuf,

		/// Specifies the image to create or overwrite
		output: PathBuf,

		/// Sorts files by name instead of keeping the directory order
		#[arg(long)]
		sort: bool,

		/// Fails instead of truncating names longer than 63 bytes
		#[arg(long)]
		reject_long_names: bool,
	},

	/// Inspect the contents of an image
	Inspect {
		/// Specifies the image to inspect
		img: PathBuf,
	},

	/// Extract the contents of an image to an output directory
	Extract {
		/// Specifies the image to extract
		img: PathBuf,

		/// Specifies the output directory
		#[arg(short, long)]
		target: PathBuf,
	},
}

fn main() -> ExitCode {
	let cli = Cli::parse();

	let level = match cli.verbose {
		0 => LevelFilter::Warn,
		1 => LevelFilter::Info,
		2 => LevelFilter::Debug,
		_ => LevelFilter::Trace,
	};

	if let Err(err) = logger::StderrLogger::new(level).init() {
		eprintln!("failed to install logger [{}]", err);
	}

	let result = match cli.operation {
		Operation::Pack {
			input,
			output,
			sort,
			reject_long_names,
		} => pack(input, output, sort, reject_long_names),
		Operation::Inspect {
			img,
		} => inspect(img),
		Operation::Extract {
			img,
			target,
		} => extract(img, target),
	};

	match result {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			eprintln!("error: {}", err);

			ExitCode::FAILURE
		}
	}
}

fn pack(input: PathBuf, output: PathBuf, sort: bool, reject_long_names: bool) -> Result<(), Box<dyn std::error::Error>> {
	let config = Config {
		ordering: if sort {
			Ordering::Lexicographic
		} else {
			Ordering::Listing
		},
		name_policy: if reject_long_names {
			NamePolicy::Reject
		} else {
			NamePolicy::Truncate
		},
	};

	let summary = keonfs::build(&input, &output, &config)?;

	for file in &summary.files {
		println!("[PACKER] file={}, size={}, start_at={}", file.name, file.size, file.offset);
	}

	println!("Packed {} files into {}. Total size: {} bytes", summary.file_count, output.display(), summary.total_size);

	Ok(())
}

fn inspect(img: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
	let mut img_file = BufReader::new(File::open(img)?);
	let archive = Archive::read(&mut img_file)?;

	let superblock = archive.superblock();

	println!("Inspecting contents of image (version: {}, files: {}, size: {})...", superblock.version, superblock.file_count, superblock.total_size);

	for entry in archive.iter() {
		println!("[{:<64}] header: {}, offset: {}, size: {}", entry.name, entry.header_offset, entry.offset, entry.size);
	}

	println!("Inspected {} entries.", archive.len());

	Ok(())
}

fn extract(img: PathBuf, target: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
	let mut img_file = BufReader::new(File::open(img)?);
	let mut archive = Archive::read(&mut img_file)?;

	fs::create_dir_all(&target)?;

	println!("Extracting contents of image to path...");

	for index in 0..archive.len() {
		let name = match archive.get(index) {
			Some(entry) => entry.name.clone(),
			None => continue,
		};

		// Names come from the image itself, so refuse anything that would escape the target.

		if Path::new(&name).file_name().map_or(true, |file_name| file_name != name.as_str()) {
			warn!("skipping entry with unsafe name [{}]", name);

			continue;
		}

		let path = target.join(&name);

		println!("Extracting entry [{}] to file <{}>...", name, path.display());

		if let Some(mut open) = archive.open(index) {
			let mut file = File::create(&path)?;

			io::copy(&mut open, &mut file)?;
		}
	}

	println!("Extracted {} entries.", archive.len());

	Ok(())
}
