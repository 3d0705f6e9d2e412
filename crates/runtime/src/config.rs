//! Session configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::trending::TrendSpec;

/// Endpoint used when none is configured.
pub const DEFAULT_ENDPOINT: &str = "SUB>tcp://localhost:60201";
/// Subsystem tag used when none is configured.
pub const DEFAULT_SUBSYSTEM: &str = "EMC";
/// Time slept between requests.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(60);
/// Time waited for a response before the socket is reinitialized.
pub const DEFAULT_POLL_TIMEOUT: Duration = Duration::from_secs(10);

/// Immutable settings for one receiver process.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
	/// Transport endpoint descriptor (`MODE>transport://host:port`).
	pub endpoint: String,
	/// Verbosity level; 0 keeps only warnings.
	pub verbosity: u8,
	/// Selection filter forwarded to the producer.
	pub selection: String,
	/// Ask the producer to reset after every request.
	pub reset_on_request: bool,
	/// Request schema definitions with the first request.
	pub request_schemas: bool,
	/// Directory receiving archives, the heartbeat and trend exports.
	pub output_dir: PathBuf,
	/// Pause between cycles that received data.
	pub poll_interval: Duration,
	/// Upper bound on waiting for a response.
	pub poll_timeout: Duration,
	/// Subsystem tag embedded in file names.
	pub subsystem: String,
	/// Trends extracted from received objects.
	pub trends: Vec<TrendSpec>,
}

impl Default for SessionConfig {
	fn default() -> Self {
		Self {
			endpoint: DEFAULT_ENDPOINT.to_string(),
			verbosity: 1,
			selection: String::new(),
			reset_on_request: false,
			request_schemas: true,
			output_dir: PathBuf::from("."),
			poll_interval: DEFAULT_POLL_INTERVAL,
			poll_timeout: DEFAULT_POLL_TIMEOUT,
			subsystem: DEFAULT_SUBSYSTEM.to_string(),
			trends: Vec::new(),
		}
	}
}

impl SessionConfig {
	/// Path of the liveness file: `<output_dir>/heartbeat.<subsystem>Receiver`.
	pub fn heartbeat_path(&self) -> PathBuf {
		heartbeat_path(&self.output_dir, &self.subsystem)
	}

	/// Multi-line summary logged at startup.
	pub fn describe(&self) -> String {
		let mut summary = String::from("Running receiver with configuration:\n");
		summary.push_str(&format!("\tSubsystem: \"{}\"\n", self.subsystem));
		summary.push_str(&format!("\tVerbosity: {}\n", self.verbosity));
		summary.push_str(&format!("\tSelection: \"{}\"\n", self.selection));
		summary.push_str(&format!("\tData directory: \"{}\"\n", self.output_dir.display()));
		summary.push_str(&format!("\tRequest schemas: {}\n", self.request_schemas));
		summary.push_str(&format!("\tReset on request: {}\n", self.reset_on_request));
		summary.push_str(&format!("\tSleep time between requests: {} s\n", self.poll_interval.as_secs_f64()));
		summary.push_str(&format!("\tRequest timeout: {} s\n", self.poll_timeout.as_secs_f64()));
		summary.push_str(&format!("\tEndpoint: {}\n", self.endpoint));
		for trend in &self.trends {
			summary.push_str(&format!("\tTrend: {trend}\n"));
		}
		summary
	}
}

pub(crate) fn heartbeat_path(output_dir: &Path, subsystem: &str) -> PathBuf {
	output_dir.join(format!("heartbeat.{subsystem}Receiver"))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_match_documented_values() {
		let config = SessionConfig::default();
		assert_eq!(config.endpoint, "SUB>tcp://localhost:60201");
		assert_eq!(config.subsystem, "EMC");
		assert!(config.request_schemas);
		assert!(!config.reset_on_request);
		assert_eq!(config.poll_interval, Duration::from_secs(60));
		assert_eq!(config.poll_timeout, Duration::from_secs(10));
	}

	#[test]
	fn heartbeat_path_embeds_subsystem() {
		let config = SessionConfig {
			output_dir: PathBuf::from("/data"),
			subsystem: "TPC".to_string(),
			..Default::default()
		};
		assert_eq!(config.heartbeat_path(), PathBuf::from("/data/heartbeat.TPCReceiver"));
	}

	#[test]
	fn describe_lists_timing_in_seconds() {
		let summary = SessionConfig {
			poll_interval: Duration::from_millis(1500),
			..Default::default()
		}
		.describe();
		assert!(summary.contains("Sleep time between requests: 1.5 s"));
		assert!(summary.contains("Request timeout: 10 s"));
	}
}
