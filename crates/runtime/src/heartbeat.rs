//! Liveness file rewritten once per cycle.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::heartbeat_path;
use crate::error::Result;

/// Writes the current Unix time to `heartbeat.<subsystem>Receiver`.
#[derive(Debug, Clone)]
pub struct HeartbeatWriter {
	path: PathBuf,
}

impl HeartbeatWriter {
	pub fn new(output_dir: &Path, subsystem: &str) -> Self {
		Self {
			path: heartbeat_path(output_dir, subsystem),
		}
	}

	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Overwrites the file with the current time in whole seconds.
	pub fn touch(&self) -> Result<u64> {
		let now = SystemTime::now().duration_since(UNIX_EPOCH).map(|elapsed| elapsed.as_secs()).unwrap_or_default();
		fs::write(&self.path, now.to_string())?;
		Ok(now)
	}
}
