//! Timestamped JSON snapshots of a fetched [`ActivityBatch`].

// std
use std::{
	fs::{self, OpenOptions},
	io::{self, Write},
	time::Instant,
};
// crates.io
use time::{format_description::BorrowedFormatItem, macros::format_description};
// self
use crate::{
	_prelude::*,
	activities::ActivityBatch,
	obs::{self, Stage, StageOutcome, StageSpan},
};

/// Directory backups land in by default.
pub const DEFAULT_DATA_DIR: &str = "data";
/// Filename prefix used by default.
pub const DEFAULT_PREFIX: &str = "strava_activities";

const TIMESTAMP_FORMAT: &[BorrowedFormatItem<'static>] =
	format_description!("[year][month][day]_[hour][minute][second]");

/// Summary of one completed backup.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackupReport {
	/// File that was created.
	pub path: PathBuf,
	/// Activities written.
	pub activities: usize,
	/// Pages requested to collect them.
	pub pages: u32,
	/// Time spent serializing and writing the file.
	pub elapsed: std::time::Duration,
}

/// Writes batches to `<data_dir>/<prefix>_<YYYYMMDD_HHMMSS>.json` in UTC.
#[derive(Clone, Debug)]
pub struct BackupWriter {
	data_dir: PathBuf,
	prefix: String,
}
impl BackupWriter {
	/// Creates a writer rooted at `data_dir`.
	pub fn new(data_dir: impl Into<PathBuf>, prefix: impl Into<String>) -> Self {
		Self { data_dir: data_dir.into(), prefix: prefix.into() }
	}

	/// File path a backup taken at `instant` would use.
	pub fn path_for(&self, instant: OffsetDateTime) -> Result<PathBuf> {
		let stamp = instant
			.to_offset(time::UtcOffset::UTC)
			.format(TIMESTAMP_FORMAT)
			.map_err(|err| Error::WriteFailed {
				path: self.data_dir.clone(),
				source: io::Error::other(err),
			})?;

		Ok(self.data_dir.join(format!("{}_{stamp}.json", self.prefix)))
	}

	/// Writes the batch as an indented JSON array, stamped with the current time.
	pub fn write(&self, batch: &ActivityBatch) -> Result<BackupReport> {
		self.write_at(batch, OffsetDateTime::now_utc())
	}

	/// Writes the batch as if the run happened at `instant`.
	///
	/// The file is created fresh; an existing file with the same name is never overwritten.
	pub fn write_at(&self, batch: &ActivityBatch, instant: OffsetDateTime) -> Result<BackupReport> {
		const STAGE: Stage = Stage::Write;

		let _span = StageSpan::new(STAGE, "write").entered();

		obs::record_stage_outcome(STAGE, StageOutcome::Attempt);

		let started = Instant::now();
		let result = self.path_for(instant).and_then(|path| match persist(&path, batch) {
			Ok(()) => Ok(path),
			Err(source) => Err(Error::WriteFailed { path, source }),
		});

		match result {
			Ok(path) => {
				let report = BackupReport {
					path,
					activities: batch.len(),
					pages: batch.pages(),
					elapsed: started.elapsed(),
				};

				tracing::info!(
					path = %report.path.display(),
					activities = report.activities,
					elapsed_ms = report.elapsed.as_millis(),
					"Backup written."
				);
				obs::record_stage_outcome(STAGE, StageOutcome::Success);

				Ok(report)
			},
			Err(err) => {
				tracing::error!(kind = %err.kind(), "{err}");
				obs::record_stage_outcome(STAGE, StageOutcome::Failure);

				Err(err)
			},
		}
	}
}

fn persist(path: &Path, batch: &ActivityBatch) -> io::Result<()> {
	if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
		fs::create_dir_all(parent)?;
	}

	let serialized = serde_json::to_vec_pretty(batch.activities()).map_err(io::Error::other)?;
	let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
	let written = file.write_all(&serialized).and_then(|()| file.sync_all());

	if written.is_err() {
		drop(file);

		let _ = fs::remove_file(path);
	}

	written
}
