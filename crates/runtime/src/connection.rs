//! Connection lifecycle for the single inbound socket.
//!
//! [`ConnectionManager`] owns the transport context and the socket. It opens
//! the socket, replaces it in place when the producer stops answering, and
//! tears everything down at shutdown. Nothing else touches the socket; the
//! session loop only sees [`PollOutcome`]s.
//!
//! # States
//!
//! ```text
//! Disconnected --initialize--> Connected --reinitialize--> Reinitializing --> Connected
//!                                   |                            |
//!                                   +----------close-------------+--> Disconnected
//! ```
//!
//! Opening a socket is bounded by the connect timeout. When the producer is
//! unreachable the manager stays `Disconnected` instead of failing, polls
//! report [`PollOutcome::Disconnected`], and the next reinitialization tries
//! again.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::DEFAULT_POLL_TIMEOUT;
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};
use crate::transport::{Parts, Socket, TransportContext};

/// Socket lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
	Disconnected,
	Connected,
	Reinitializing,
}

/// Result of waiting for the socket to become readable.
#[derive(Debug)]
pub enum PollOutcome {
	/// A full message arrived.
	Readable(Parts),
	/// Nothing arrived before the timeout.
	TimedOut,
	/// The receive failed; the socket should be replaced.
	Failed(String),
	/// No socket is open because the last connect attempt timed out.
	Disconnected,
}

/// Owns the transport context and the socket opened from it.
pub struct ConnectionManager<C: TransportContext> {
	context: C,
	descriptor: String,
	socket: Option<Box<dyn Socket>>,
	state: ConnectionState,
	connect_timeout: Duration,
	closed: bool,
}

impl<C: TransportContext> ConnectionManager<C> {
	/// Creates a manager for `descriptor` without opening anything yet.
	pub fn new(context: C, descriptor: impl Into<String>) -> Self {
		Self {
			context,
			descriptor: descriptor.into(),
			socket: None,
			state: ConnectionState::Disconnected,
			connect_timeout: DEFAULT_POLL_TIMEOUT,
			closed: false,
		}
	}

	/// Bounds how long opening a socket may take.
	pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
		self.connect_timeout = timeout;
		self
	}

	pub fn state(&self) -> ConnectionState {
		self.state
	}

	/// Endpoint descriptor this manager connects to.
	pub fn descriptor(&self) -> &str {
		&self.descriptor
	}

	/// Opens the socket. Fails on an unparsable descriptor or a failed bind/connect.
	///
	/// A connect that does not complete within the connect timeout is not an
	/// error; the manager stays `Disconnected` and is retried by [`ConnectionManager::reinitialize`].
	pub async fn initialize(&mut self) -> Result<()> {
		let endpoint = Endpoint::parse(&self.descriptor)?;
		match self.open(&endpoint).await {
			Ok(()) => {
				info!(target = "receiver.connection", endpoint = %self.descriptor, "socket initialized");
				Ok(())
			}
			Err(err @ Error::ConnectTimeout { .. }) => {
				warn!(target = "receiver.connection", endpoint = %self.descriptor, error = %err, "producer unreachable, will retry");
				Ok(())
			}
			Err(err) => Err(err),
		}
	}

	/// Replaces the socket through the existing context. The prior socket is closed first.
	pub async fn reinitialize(&mut self) -> Result<()> {
		self.state = ConnectionState::Reinitializing;
		let reopened = match Endpoint::parse(&self.descriptor) {
			Ok(endpoint) => self.open(&endpoint).await,
			Err(err) => Err(err),
		};

		match reopened {
			Ok(()) => {
				info!(target = "receiver.connection", endpoint = %self.descriptor, "socket reinitialized");
				Ok(())
			}
			Err(err @ Error::ConnectTimeout { .. }) => {
				warn!(target = "receiver.connection", endpoint = %self.descriptor, error = %err, "producer unreachable, will retry");
				Ok(())
			}
			Err(err) => {
				self.state = ConnectionState::Disconnected;
				Err(Error::Reinitialize {
					endpoint: self.descriptor.clone(),
					source: Box::new(err),
				})
			}
		}
	}

	async fn open(&mut self, endpoint: &Endpoint) -> Result<()> {
		if let Some(previous) = self.socket.take() {
			debug!(target = "receiver.connection", "closing previous socket");
			previous.close().await;
		}

		let opened = match tokio::time::timeout(self.connect_timeout, self.context.open(endpoint)).await {
			Ok(opened) => opened,
			Err(_) => Err(Error::ConnectTimeout {
				endpoint: self.descriptor.clone(),
				timeout: self.connect_timeout,
			}),
		};

		match opened {
			Ok(socket) => {
				self.socket = Some(socket);
				self.state = ConnectionState::Connected;
				Ok(())
			}
			Err(err) => {
				self.state = ConnectionState::Disconnected;
				Err(err)
			}
		}
	}

	/// Sends one multi-part message on the current socket.
	pub async fn send(&mut self, parts: Parts) -> Result<()> {
		if self.context.is_terminated() {
			return Err(Error::ContextTerminated);
		}
		let socket = self.socket.as_mut().ok_or(Error::NotConnected)?;
		socket.send(parts).await
	}

	/// Waits up to `timeout` for a message.
	///
	/// Returns `Err(ContextTerminated)` when the context has been torn down,
	/// which is fatal to the caller. Without an open socket the outcome is
	/// [`PollOutcome::Disconnected`].
	pub async fn poll(&mut self, timeout: Duration) -> Result<PollOutcome> {
		if self.context.is_terminated() {
			return Err(Error::ContextTerminated);
		}
		let Some(socket) = self.socket.as_mut() else {
			return Ok(PollOutcome::Disconnected);
		};

		let outcome = match tokio::time::timeout(timeout, socket.recv()).await {
			Ok(Ok(parts)) => PollOutcome::Readable(parts),
			Ok(Err(err)) => {
				if self.context.is_terminated() {
					return Err(Error::ContextTerminated);
				}
				PollOutcome::Failed(err.to_string())
			}
			Err(_) => PollOutcome::TimedOut,
		};
		Ok(outcome)
	}

	/// Closes the socket and terminates the context. Later calls do nothing.
	pub async fn close(&mut self) {
		if self.closed {
			return;
		}
		self.closed = true;

		if let Some(socket) = self.socket.take() {
			socket.close().await;
		}
		self.context.terminate();
		self.state = ConnectionState::Disconnected;
		debug!(target = "receiver.connection", endpoint = %self.descriptor, "connection closed");
	}
}

impl<C: TransportContext> Drop for ConnectionManager<C> {
	fn drop(&mut self) {
		if !self.closed && self.socket.is_some() {
			warn!(target = "receiver.connection", endpoint = %self.descriptor, "connection dropped without close");
		}
	}
}
