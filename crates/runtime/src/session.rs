//! The request/response session loop.
//!
//! One cycle:
//!
//! 1. rewrite the heartbeat file
//! 2. send a request (carrying the pending schema request, if any)
//! 3. poll the socket, bounded by the poll timeout
//! 4. stop on a terminated context (fatal) or a raised interrupt flag (clean)
//! 5. on timeout (or with no socket open), reinitialize the socket and start the next cycle at once
//! 6. otherwise decode the envelope, archive it when a run is active, update trends
//! 7. sleep the poll interval
//!
//! The connection is closed exactly once when [`SessionLoop::run`] returns.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use receiver_protocol::{Envelope, RequestOptions};
use tracing::{debug, info, warn};

use crate::archive::ArchiveWriter;
use crate::config::SessionConfig;
use crate::connection::{ConnectionManager, PollOutcome};
use crate::decoder::{DecodeError, MessageDecoder, RunId};
use crate::error::{Error, Result};
use crate::heartbeat::HeartbeatWriter;
use crate::object::ObjectBuffer;
use crate::transport::{Parts, TransportContext};
use crate::trending::TrendingSet;

/// Mode tag assumed until the producer reports one.
pub const INITIAL_MODE: &str = "B";

const SLEEP_SLICE: Duration = Duration::from_millis(100);

/// State threaded from one cycle to the next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
	pub run: RunId,
	pub mode: String,
	/// Ask for schemas with the next request.
	pub pending_schema_request: bool,
}

impl SessionState {
	fn new(request_schemas: bool) -> Self {
		Self {
			run: RunId::Unset,
			mode: INITIAL_MODE.to_string(),
			pending_schema_request: request_schemas,
		}
	}
}

/// What a received envelope produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
	/// Objects decoded successfully.
	pub objects: usize,
	/// Frames dropped while decoding.
	pub dropped_frames: usize,
	/// Archive written this cycle, if any.
	pub archive: Option<PathBuf>,
	/// Trend exports written this cycle.
	pub trend_exports: Vec<PathBuf>,
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
	/// A response arrived and was processed.
	Received(CycleReport),
	/// The poll timed out, failed or found no socket, and a new socket was attempted.
	Reconnected,
	/// The interrupt flag was raised.
	Interrupted,
}

/// Drives request/response cycles until interrupted or the transport dies.
pub struct SessionLoop<'a, C: TransportContext> {
	config: SessionConfig,
	connection: ConnectionManager<C>,
	interrupted: &'a AtomicBool,
	decoder: MessageDecoder,
	archive: ArchiveWriter,
	heartbeat: HeartbeatWriter,
	trends: TrendingSet,
	state: SessionState,
}

impl<'a, C: TransportContext> SessionLoop<'a, C> {
	/// Wraps an initialized connection.
	pub fn new(config: SessionConfig, connection: ConnectionManager<C>, interrupted: &'a AtomicBool) -> Self {
		Self {
			decoder: MessageDecoder::new(),
			archive: ArchiveWriter::new(&config.output_dir, &config.subsystem),
			heartbeat: HeartbeatWriter::new(&config.output_dir, &config.subsystem),
			trends: TrendingSet::new(config.trends.iter().cloned()),
			state: SessionState::new(config.request_schemas),
			config,
			connection,
			interrupted,
		}
	}

	pub fn state(&self) -> &SessionState {
		&self.state
	}

	pub fn trends(&self) -> &TrendingSet {
		&self.trends
	}

	/// Runs cycles until interrupted (`Ok`) or a fatal transport error (`Err`).
	pub async fn run(mut self) -> Result<()> {
		info!(target = "receiver.session", endpoint = %self.connection.descriptor(), "session started");

		let result = loop {
			match self.run_cycle().await {
				Ok(CycleOutcome::Interrupted) => {
					info!(target = "receiver.session", "interrupt received, leaving session loop");
					break Ok(());
				}
				Ok(CycleOutcome::Reconnected) => {}
				Ok(CycleOutcome::Received(_)) => self.pause().await,
				Err(err) => {
					warn!(target = "receiver.session", error = %err, "session loop failed");
					break Err(err);
				}
			}
		};

		self.connection.close().await;
		result
	}

	/// Runs a single cycle.
	pub async fn run_cycle(&mut self) -> Result<CycleOutcome> {
		if let Err(err) = self.heartbeat.touch() {
			warn!(target = "receiver.session", path = %self.heartbeat.path().display(), error = %err, "cannot write heartbeat");
		}

		self.send_request().await?;

		let outcome = self.connection.poll(self.config.poll_timeout).await?;

		if self.interrupted.load(Ordering::SeqCst) {
			return Ok(CycleOutcome::Interrupted);
		}

		match outcome {
			PollOutcome::TimedOut => {
				warn!(
					target = "receiver.connection",
					endpoint = %self.connection.descriptor(),
					timeout_secs = self.config.poll_timeout.as_secs_f64(),
					"no response before timeout, reinitializing socket"
				);
				self.connection.reinitialize().await?;
				Ok(CycleOutcome::Reconnected)
			}
			PollOutcome::Failed(reason) => {
				warn!(target = "receiver.connection", endpoint = %self.connection.descriptor(), error = %reason, "receive failed, reinitializing socket");
				self.connection.reinitialize().await?;
				Ok(CycleOutcome::Reconnected)
			}
			PollOutcome::Disconnected => {
				debug!(target = "receiver.connection", endpoint = %self.connection.descriptor(), "not connected, retrying");
				self.connection.reinitialize().await?;
				Ok(CycleOutcome::Reconnected)
			}
			PollOutcome::Readable(parts) => Ok(CycleOutcome::Received(self.receive(parts))),
		}
	}

	async fn send_request(&mut self) -> Result<()> {
		let request = RequestOptions {
			selection: self.config.selection.clone(),
			reset_on_request: self.config.reset_on_request,
			schema_on_request: self.state.pending_schema_request,
		};
		self.state.pending_schema_request = false;

		debug!(target = "receiver.session", options = %request.option_string(), "sending request");
		match self.connection.send(request.to_parts()).await {
			Ok(()) => Ok(()),
			Err(err) if err.is_fatal_transport() => Err(err),
			Err(Error::NotConnected) => {
				debug!(target = "receiver.connection", "no socket open, request skipped");
				Ok(())
			}
			Err(err) => {
				warn!(target = "receiver.connection", error = %err, "request send failed");
				Ok(())
			}
		}
	}

	fn receive(&mut self, parts: Parts) -> CycleReport {
		let envelope = Envelope::from_parts(parts);
		let decoded = self.decoder.decode(&envelope);

		for dropped in &decoded.errors {
			match &dropped.error {
				DecodeError::Unrecognized { .. } => {
					debug!(target = "receiver.decode", position = dropped.position, error = %dropped.error, "skipping frame")
				}
				error => warn!(target = "receiver.decode", position = dropped.position, %error, "dropping frame"),
			}
		}
		if decoded.schema_request {
			info!(target = "receiver.decode", "schema mismatch, requesting schemas with the next request");
			self.state.pending_schema_request = true;
		}
		if let Some(metadata) = decoded.metadata {
			self.state.run = metadata.run;
			self.state.mode = metadata.mode;
		}

		let mut report = CycleReport {
			objects: decoded.objects.len(),
			dropped_frames: decoded.errors.len(),
			..Default::default()
		};
		self.persist(&decoded.objects, &mut report);
		report
	}

	fn persist(&mut self, objects: &ObjectBuffer, report: &mut CycleReport) {
		let Some(run) = self.state.run.active() else {
			info!(target = "receiver.archive", run = %self.state.run, "run 0 -> not a real run, nothing written");
			return;
		};
		if objects.is_empty() {
			info!(target = "receiver.archive", run, "no new data");
			return;
		}

		match self.archive.write_now(objects, run, &self.state.mode) {
			Ok(path) => report.archive = Some(path),
			Err(err) => warn!(target = "receiver.archive", run, error = %err, "archive not written, discarding snapshot"),
		}

		if self.trends.is_empty() {
			return;
		}
		let updated = self.trends.observe(objects);
		debug!(target = "receiver.trend", updated, "trends observed");
		match self.trends.export(&self.config.output_dir, &self.config.subsystem) {
			Ok(paths) => report.trend_exports = paths,
			Err(err) => warn!(target = "receiver.trend", error = %err, "trend export failed"),
		}
	}

	/// Sleeps the poll interval, waking early once the interrupt flag is raised.
	async fn pause(&self) {
		let deadline = tokio::time::Instant::now() + self.config.poll_interval;
		loop {
			if self.interrupted.load(Ordering::SeqCst) {
				return;
			}
			let now = tokio::time::Instant::now();
			if now >= deadline {
				return;
			}
			tokio::time::sleep(SLEEP_SLICE.min(deadline - now)).await;
		}
	}
}
