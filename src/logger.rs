use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

/// Represents a logger writing diagnostics to standard error, keeping standard output for progress.
pub struct StderrLogger {
	max_level: LevelFilter,
}

impl StderrLogger {
	/// Creates a new logger emitting records up to and including `max_level`.
	pub const fn new(max_level: LevelFilter) -> Self {
		Self {
			max_level,
		}
	}

	/// Installs the logger as the global logger; call once during start-up.
	pub fn init(self) -> Result<(), SetLoggerError> {
		let max_level = self.max_level;

		log::set_logger(Box::leak(Box::new(self)))?;
		log::set_max_level(max_level);

		Ok(())
	}
}

impl Log for StderrLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= self.max_level
	}

	fn log(&self, record: &Record) {
		if !self.enabled(record.metadata()) {
			return;
		}

		eprintln!("[{}] {}: {}", record.level(), record.target(), record.args());
	}

	fn flush(&self) {}
}
