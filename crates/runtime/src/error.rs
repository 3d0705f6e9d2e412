//! Error types for the receiver runtime.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::endpoint::SocketMode;

/// Errors raised by connection management, persistence and configuration.
#[derive(Debug, Error)]
pub enum Error {
	/// The endpoint descriptor could not be parsed.
	#[error("invalid endpoint `{descriptor}`: {reason}")]
	InvalidEndpoint { descriptor: String, reason: String },

	/// The endpoint names a socket pattern the receiver cannot read from.
	#[error("socket mode {0} cannot receive data")]
	UnsupportedMode(SocketMode),

	/// The shared transport context was terminated; only happens during process shutdown.
	#[error("transport context was terminated")]
	ContextTerminated,

	/// Opening the socket did not complete in time; the producer is likely down.
	#[error("connecting to {endpoint} timed out after {timeout:?}")]
	ConnectTimeout { endpoint: String, timeout: Duration },

	/// No socket is open.
	#[error("socket is not connected")]
	NotConnected,

	/// Bind, connect, send or receive failed inside the transport.
	#[error("transport error: {0}")]
	Transport(String),

	/// Reinitializing the socket after a timeout failed.
	#[error("cannot reinitialize socket {endpoint}: {source}")]
	Reinitialize {
		endpoint: String,
		#[source]
		source: Box<Error>,
	},

	/// Writing an archive file failed.
	#[error("failed to write archive {}: {source}", path.display())]
	Archive {
		path: PathBuf,
		#[source]
		source: std::io::Error,
	},

	/// A trend specification could not be parsed.
	#[error("invalid trend `{spec}`: {reason}")]
	InvalidTrend { spec: String, reason: String },

	#[error(transparent)]
	Io(#[from] std::io::Error),

	#[error(transparent)]
	Json(#[from] serde_json::Error),
}

impl Error {
	/// Returns `true` when the error means the transport is gone for good.
	pub fn is_fatal_transport(&self) -> bool {
		matches!(self, Error::ContextTerminated | Error::Reinitialize { .. })
	}
}

/// Result alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;
