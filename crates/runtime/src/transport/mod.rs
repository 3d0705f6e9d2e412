//! Transport abstraction.
//!
//! [`TransportContext`] is the long-lived owner that opens sockets; a
//! [`Socket`] moves multi-part messages. The ZeroMQ implementation lives in
//! [`zmq`], an in-memory one for tests in [`fake`].
//!
//! Futures are boxed so both traits stay object safe; the connection manager
//! keeps its socket as `Box<dyn Socket>`.

pub mod fake;
pub mod zmq;

use std::future::Future;
use std::pin::Pin;

use crate::endpoint::Endpoint;
use crate::error::Result;

/// Boxed future returned by transport operations.
pub type TransportFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw message parts as they travel over the transport.
pub type Parts = Vec<Vec<u8>>;

/// An open socket that sends and receives multi-part messages.
pub trait Socket: Send {
	/// Sends one multi-part message.
	fn send(&mut self, parts: Parts) -> TransportFuture<'_, Result<()>>;

	/// Waits for the next multi-part message. Callers bound this with a timeout.
	fn recv(&mut self) -> TransportFuture<'_, Result<Parts>>;

	/// Closes the socket, discarding pending messages.
	fn close(self: Box<Self>) -> TransportFuture<'static, ()>;
}

/// Shared transport state that outlives individual sockets.
pub trait TransportContext: Send {
	/// Opens a socket attached to `endpoint`.
	fn open<'a>(&'a mut self, endpoint: &'a Endpoint) -> TransportFuture<'a, Result<Box<dyn Socket>>>;

	/// Terminates the context. Sockets opened afterwards fail with `ContextTerminated`.
	fn terminate(&mut self);

	/// Returns `true` once [`TransportContext::terminate`] has run.
	fn is_terminated(&self) -> bool;
}
