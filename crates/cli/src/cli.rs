use std::path::PathBuf;
use std::time::Duration;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser};
use receiver_runtime::config::{DEFAULT_ENDPOINT, DEFAULT_SUBSYSTEM};
use receiver_runtime::{SessionConfig, TrendSpec};

#[derive(Parser, Debug)]
#[command(name = "zmq-receiver")]
#[command(about = "Requests measurement snapshots from a producer and archives them")]
#[command(version)]
pub struct Cli {
	/// Endpoint descriptor, MODE>transport://host:port (connect) or MODE@... (bind)
	#[arg(long = "in", alias = "ZMQconfigIN", value_name = "ADDRESS", default_value = DEFAULT_ENDPOINT)]
	pub endpoint: String,

	/// Verbosity level (0 warnings only, 1 info, 2 or more debug)
	#[arg(long, value_name = "LEVEL", default_value_t = 1)]
	pub verbose: u8,

	/// Ask the producer to reset its data after every request
	#[arg(long = "resetMerger")]
	pub reset_merger: bool,

	/// Request schema definitions with the first request
	#[arg(
		long = "requestStreamers",
		value_name = "BOOL",
		num_args = 0..=1,
		default_value_t = true,
		default_missing_value = "true",
		action = ArgAction::Set,
		value_parser = BoolishValueParser::new()
	)]
	pub request_streamers: bool,

	/// Selection filter forwarded to the producer
	#[arg(long, value_name = "STRING", default_value_t)]
	pub select: String,

	/// Directory for archives, the heartbeat file and trend exports
	#[arg(long = "dataPath", value_name = "DIR", default_value = ".")]
	pub data_path: PathBuf,

	/// Seconds to sleep between requests
	#[arg(long, alias = "PollInterval", value_name = "SECONDS", default_value = "60", value_parser = parse_seconds)]
	pub sleep: Duration,

	/// Seconds to wait for a response before reinitializing the socket
	#[arg(long, alias = "PollTimeout", value_name = "SECONDS", default_value = "10", value_parser = parse_seconds)]
	pub timeout: Duration,

	/// Subsystem tag used in file names
	#[arg(long, value_name = "TAG", default_value = DEFAULT_SUBSYSTEM)]
	pub subsystem: String,

	/// Trend a statistic of an object field (NAME:OBJECT:FIELD:max|mean|stddev[:ENTRIES]); repeatable
	#[arg(long = "trend", value_name = "SPEC")]
	pub trends: Vec<TrendSpec>,
}

impl Cli {
	pub fn into_config(self) -> SessionConfig {
		SessionConfig {
			endpoint: self.endpoint,
			verbosity: self.verbose,
			selection: self.select,
			reset_on_request: self.reset_merger,
			request_schemas: self.request_streamers,
			output_dir: self.data_path,
			poll_interval: self.sleep,
			poll_timeout: self.timeout,
			subsystem: self.subsystem,
			trends: self.trends,
		}
	}
}

/// Parses fractional seconds into a [`Duration`].
pub fn parse_seconds(value: &str) -> Result<Duration, String> {
	let seconds: f64 = value.trim().parse().map_err(|_| format!("`{value}` is not a number of seconds"))?;
	if !seconds.is_finite() || seconds < 0.0 {
		return Err(format!("`{value}` must be a finite, non-negative number of seconds"));
	}
	Ok(Duration::from_secs_f64(seconds))
}
