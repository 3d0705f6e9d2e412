//! ZeroMQ transport built on the pure-Rust `zeromq` crate.
//!
//! The crate has no explicit context object, so [`ZmqContext`] only tracks
//! termination; every [`ZmqContext::open`] creates a fresh socket of the
//! requested pattern. `SUB` sockets subscribe to every topic. `SUB` and `PULL`
//! sockets cannot send, so requests written to them are dropped.

use bytes::Bytes;
use tracing::{debug, warn};
use zeromq::{Socket as _, SocketRecv, SocketSend, ZmqMessage};

use super::{Parts, Socket, TransportContext, TransportFuture};
use crate::endpoint::{Attach, Endpoint, SocketMode};
use crate::error::{Error, Result};

/// Transport context for ZeroMQ sockets.
#[derive(Debug, Default)]
pub struct ZmqContext {
	terminated: bool,
}

impl ZmqContext {
	pub fn new() -> Self {
		Self::default()
	}
}

impl TransportContext for ZmqContext {
	fn open<'a>(&'a mut self, endpoint: &'a Endpoint) -> TransportFuture<'a, Result<Box<dyn Socket>>> {
		Box::pin(async move {
			if self.terminated {
				return Err(Error::ContextTerminated);
			}

			let socket = match endpoint.mode {
				SocketMode::Req => ZmqSocket::Req(attach(zeromq::ReqSocket::new(), endpoint).await?),
				SocketMode::Dealer => ZmqSocket::Dealer(attach(zeromq::DealerSocket::new(), endpoint).await?),
				SocketMode::Pull => ZmqSocket::Pull(attach(zeromq::PullSocket::new(), endpoint).await?),
				SocketMode::Sub => {
					let mut socket = attach(zeromq::SubSocket::new(), endpoint).await?;
					socket.subscribe("").await.map_err(transport_error)?;
					ZmqSocket::Sub(socket)
				}
				mode => return Err(Error::UnsupportedMode(mode)),
			};

			debug!(target = "receiver.connection", %endpoint, "zeromq socket opened");
			Ok(Box::new(socket) as Box<dyn Socket>)
		})
	}

	fn terminate(&mut self) {
		self.terminated = true;
	}

	fn is_terminated(&self) -> bool {
		self.terminated
	}
}

async fn attach<S: zeromq::Socket + Send>(mut socket: S, endpoint: &Endpoint) -> Result<S> {
	for address in &endpoint.addresses {
		let attached = match endpoint.attach {
			Attach::Connect => socket.connect(address).await,
			Attach::Bind => socket.bind(address).await.map(|_| ()),
		};

		if let Err(err) = attached {
			let errors = socket.close().await;
			if !errors.is_empty() {
				debug!(target = "receiver.connection", count = errors.len(), "errors while closing failed socket");
			}
			return Err(Error::Transport(format!("{address}: {err}")));
		}
	}
	Ok(socket)
}

fn transport_error(err: zeromq::ZmqError) -> Error {
	Error::Transport(err.to_string())
}

enum ZmqSocket {
	Req(zeromq::ReqSocket),
	Dealer(zeromq::DealerSocket),
	Sub(zeromq::SubSocket),
	Pull(zeromq::PullSocket),
}

impl Socket for ZmqSocket {
	fn send(&mut self, parts: Parts) -> TransportFuture<'_, Result<()>> {
		Box::pin(async move {
			let frames: Vec<Bytes> = parts.into_iter().map(Bytes::from).collect();
			let message = ZmqMessage::try_from(frames).map_err(|err| Error::Transport(err.to_string()))?;

			match self {
				ZmqSocket::Req(socket) => socket.send(message).await.map_err(transport_error),
				ZmqSocket::Dealer(socket) => socket.send(message).await.map_err(transport_error),
				ZmqSocket::Sub(_) | ZmqSocket::Pull(_) => {
					debug!(target = "receiver.connection", "receive-only socket; request dropped");
					Ok(())
				}
			}
		})
	}

	fn recv(&mut self) -> TransportFuture<'_, Result<Parts>> {
		Box::pin(async move {
			let message = match self {
				ZmqSocket::Req(socket) => socket.recv().await,
				ZmqSocket::Dealer(socket) => socket.recv().await,
				ZmqSocket::Sub(socket) => socket.recv().await,
				ZmqSocket::Pull(socket) => socket.recv().await,
			}
			.map_err(transport_error)?;

			Ok(message.into_vec().into_iter().map(|frame| frame.to_vec()).collect())
		})
	}

	fn close(self: Box<Self>) -> TransportFuture<'static, ()> {
		Box::pin(async move {
			let errors = match *self {
				ZmqSocket::Req(socket) => socket.close().await,
				ZmqSocket::Dealer(socket) => socket.close().await,
				ZmqSocket::Sub(socket) => socket.close().await,
				ZmqSocket::Pull(socket) => socket.close().await,
			};
			for err in errors {
				warn!(target = "receiver.connection", error = %err, "error while closing socket");
			}
		})
	}
}
