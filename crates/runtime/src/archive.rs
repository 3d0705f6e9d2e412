//! Archive files for received snapshots.

use std::collections::BTreeMap;
use std::fs::{self, DirBuilder};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{Datelike, Local, NaiveDateTime, Timelike};
use receiver_protocol::SchemaRef;
use serde::Serialize;
use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::info;

use crate::error::{Error, Result};
use crate::object::ObjectBuffer;

/// Extension of archive files.
pub const ARCHIVE_EXTENSION: &str = "json";

/// Builds `<subsystem>histos_<run>_<mode>_<Y>_<M>_<D>_<h>_<m>_<s>.json`.
///
/// Date and time components are not zero-padded.
pub fn archive_file_name(subsystem: &str, run: i64, mode: &str, at: &NaiveDateTime) -> String {
	format!(
		"{subsystem}histos_{run}_{mode}_{}_{}_{}_{}_{}_{}.{ARCHIVE_EXTENSION}",
		at.year(),
		at.month(),
		at.day(),
		at.hour(),
		at.minute(),
		at.second(),
	)
}

#[derive(Serialize)]
struct ArchivedObject<'a> {
	schema: &'a SchemaRef,
	fields: &'a Map<String, Value>,
}

#[derive(Serialize)]
struct ArchiveDocument<'a> {
	subsystem: &'a str,
	run: i64,
	mode: &'a str,
	written_at: String,
	objects: BTreeMap<&'a str, ArchivedObject<'a>>,
}

/// Writes one archive per received snapshot into the output directory.
#[derive(Debug, Clone)]
pub struct ArchiveWriter {
	output_dir: PathBuf,
	subsystem: String,
}

impl ArchiveWriter {
	pub fn new(output_dir: impl Into<PathBuf>, subsystem: impl Into<String>) -> Self {
		Self {
			output_dir: output_dir.into(),
			subsystem: subsystem.into(),
		}
	}

	/// Writes `objects` stamped with the current local time.
	pub fn write_now(&self, objects: &ObjectBuffer, run: i64, mode: &str) -> Result<PathBuf> {
		self.write(objects, run, mode, &Local::now().naive_local())
	}

	/// Writes `objects` to a fresh archive named after `run`, `mode` and `at`.
	///
	/// Objects are keyed by name; when a name repeats, the later object wins.
	/// The document is staged in a temporary file next to the archive and
	/// renamed into place, so a failed write never leaves a partial archive.
	/// An existing file with the same name is replaced.
	pub fn write(&self, objects: &ObjectBuffer, run: i64, mode: &str, at: &NaiveDateTime) -> Result<PathBuf> {
		let path = self.output_dir.join(archive_file_name(&self.subsystem, run, mode, at));

		let document = ArchiveDocument {
			subsystem: &self.subsystem,
			run,
			mode,
			written_at: at.format("%Y-%m-%dT%H:%M:%S").to_string(),
			objects: objects
				.iter()
				.map(|object| {
					(
						object.name.as_str(),
						ArchivedObject {
							schema: &object.schema,
							fields: &object.fields,
						},
					)
				})
				.collect(),
		};

		let write = || -> io::Result<()> {
			let bytes = serde_json::to_vec_pretty(&document).map_err(io::Error::from)?;
			let mut staged = NamedTempFile::new_in(&self.output_dir)?;
			staged.write_all(&bytes)?;
			staged.as_file().sync_all()?;
			staged.persist(&path).map_err(|err| err.error)?;
			Ok(())
		};
		write().map_err(|source| Error::Archive { path: path.clone(), source })?;

		info!(target = "receiver.archive", path = %path.display(), objects = document.objects.len(), "archive written");
		Ok(path)
	}
}

/// Normalizes `dir` and creates it (and its parents) if missing.
///
/// Trailing separators are stripped. New directories are created owner-only
/// on Unix.
pub fn prepare_output_dir(dir: &Path) -> io::Result<PathBuf> {
	let normalized: PathBuf = dir.components().collect();
	let normalized = if normalized.as_os_str().is_empty() { PathBuf::from(".") } else { normalized };

	let mut builder = DirBuilder::new();
	builder.recursive(true);
	#[cfg(unix)]
	{
		use std::os::unix::fs::DirBuilderExt;
		builder.mode(0o700);
	}
	builder.create(&normalized)?;
	Ok(normalized)
}
