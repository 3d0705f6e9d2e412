//! In-memory transport for exercising the session loop without a producer.
//!
//! # Example
//!
//! ```ignore
//! let (context, controller) = FakeTransportBuilder::new().build();
//! let mut connection = ConnectionManager::new(context, "REQ>tcp://localhost:5555");
//! connection.initialize().await?;
//!
//! controller.respond(Envelope::new().with_metadata("run=77 HLT_MODE=B"));
//! // ... drive a cycle ...
//! let sent = controller.take_sent();
//! ```
//!
//! Queued responses are shared by every socket the context opens, so they
//! survive reinitialization. A socket with nothing queued never becomes
//! readable, which lets poll timeouts fire naturally.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use receiver_protocol::Envelope;

use super::{Parts, Socket, TransportContext, TransportFuture};
use crate::endpoint::Endpoint;
use crate::error::{Error, Result};

#[derive(Debug, Default)]
struct FakeState {
	responses: VecDeque<Result<Parts>>,
	sent: Vec<Parts>,
	opened: Vec<String>,
	closed: usize,
	failing_opens: usize,
	hanging_opens: usize,
	terminated: bool,
}

/// Builder for creating fake transport instances.
#[derive(Debug, Default)]
pub struct FakeTransportBuilder {
	responses: Vec<Parts>,
}

impl FakeTransportBuilder {
	pub fn new() -> Self {
		Self::default()
	}

	/// Queues a response before the transport is built.
	pub fn with_response(mut self, envelope: Envelope) -> Self {
		self.responses.push(envelope.into_parts());
		self
	}

	/// Builds the context handed to a connection manager and its controller.
	pub fn build(self) -> (FakeContext, FakeTransportController) {
		let state = Arc::new(Mutex::new(FakeState {
			responses: self.responses.into_iter().map(Ok).collect(),
			..Default::default()
		}));

		(FakeContext { state: Arc::clone(&state) }, FakeTransportController { state })
	}
}

/// Controller for queueing responses and inspecting what the receiver did.
#[derive(Debug, Clone)]
pub struct FakeTransportController {
	state: Arc<Mutex<FakeState>>,
}

impl FakeTransportController {
	/// Queues an envelope for the next receive.
	pub fn respond(&self, envelope: Envelope) {
		self.respond_parts(envelope.into_parts());
	}

	/// Queues raw parts for the next receive.
	pub fn respond_parts(&self, parts: Parts) {
		self.state.lock().responses.push_back(Ok(parts));
	}

	/// Makes the next receive fail with a transport error.
	pub fn fail_next_recv(&self, reason: &str) {
		self.state.lock().responses.push_back(Err(Error::Transport(reason.to_string())));
	}

	/// Makes the next `count` socket opens fail.
	pub fn fail_next_opens(&self, count: usize) {
		self.state.lock().failing_opens = count;
	}

	/// Makes the next `count` socket opens never complete, like a connect to a
	/// producer that is down.
	pub fn hang_next_opens(&self, count: usize) {
		self.state.lock().hanging_opens = count;
	}

	/// Terminates the context out from under the receiver.
	pub fn terminate(&self) {
		self.state.lock().terminated = true;
	}

	/// Takes every message sent so far, clearing the log.
	pub fn take_sent(&self) -> Vec<Parts> {
		std::mem::take(&mut self.state.lock().sent)
	}

	/// Endpoints of every successfully opened socket, in order.
	pub fn opened(&self) -> Vec<String> {
		self.state.lock().opened.clone()
	}

	/// Number of sockets closed so far.
	pub fn closed(&self) -> usize {
		self.state.lock().closed
	}

	/// Whether the context has been terminated.
	pub fn is_terminated(&self) -> bool {
		self.state.lock().terminated
	}

	/// Number of responses still queued.
	pub fn pending_responses(&self) -> usize {
		self.state.lock().responses.len()
	}
}

/// Context half of the fake transport.
#[derive(Debug)]
pub struct FakeContext {
	state: Arc<Mutex<FakeState>>,
}

impl TransportContext for FakeContext {
	fn open<'a>(&'a mut self, endpoint: &'a Endpoint) -> TransportFuture<'a, Result<Box<dyn Socket>>> {
		Box::pin(async move {
			let hang = {
				let mut state = self.state.lock();
				let hang = state.hanging_opens > 0;
				if hang {
					state.hanging_opens -= 1;
				}
				hang
			};
			if hang {
				std::future::pending::<()>().await;
			}

			let mut state = self.state.lock();
			if state.terminated {
				return Err(Error::ContextTerminated);
			}
			if state.failing_opens > 0 {
				state.failing_opens -= 1;
				return Err(Error::Transport(format!("connection refused: {endpoint}")));
			}

			state.opened.push(endpoint.to_string());
			Ok(Box::new(FakeSocket {
				state: Arc::clone(&self.state),
			}) as Box<dyn Socket>)
		})
	}

	fn terminate(&mut self) {
		self.state.lock().terminated = true;
	}

	fn is_terminated(&self) -> bool {
		self.state.lock().terminated
	}
}

struct FakeSocket {
	state: Arc<Mutex<FakeState>>,
}

impl Socket for FakeSocket {
	fn send(&mut self, parts: Parts) -> TransportFuture<'_, Result<()>> {
		Box::pin(async move {
			self.state.lock().sent.push(parts);
			Ok(())
		})
	}

	fn recv(&mut self) -> TransportFuture<'_, Result<Parts>> {
		Box::pin(async move {
			let next = self.state.lock().responses.pop_front();
			match next {
				Some(response) => response,
				None => std::future::pending().await,
			}
		})
	}

	fn close(self: Box<Self>) -> TransportFuture<'static, ()> {
		Box::pin(async move {
			self.state.lock().closed += 1;
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[tokio::test]
	async fn queued_response_is_received_once() {
		let (mut context, controller) = FakeTransportBuilder::new().build();
		let endpoint = Endpoint::parse("REQ>tcp://localhost:5555").unwrap();
		let mut socket = context.open(&endpoint).await.unwrap();

		controller.respond(Envelope::new().with_metadata("run=1"));
		let parts = socket.recv().await.unwrap();
		assert_eq!(parts[1], b"run=1");
		assert_eq!(controller.pending_responses(), 0);
	}

	#[tokio::test]
	async fn empty_queue_never_becomes_readable() {
		let (mut context, _controller) = FakeTransportBuilder::new().build();
		let endpoint = Endpoint::parse("REQ>tcp://localhost:5555").unwrap();
		let mut socket = context.open(&endpoint).await.unwrap();

		let result = tokio::time::timeout(std::time::Duration::from_millis(20), socket.recv()).await;
		assert!(result.is_err());
	}

	#[tokio::test]
	async fn failing_opens_are_consumed() {
		let (mut context, controller) = FakeTransportBuilder::new().build();
		let endpoint = Endpoint::parse("REQ>tcp://localhost:5555").unwrap();

		controller.fail_next_opens(1);
		assert!(context.open(&endpoint).await.is_err());
		assert!(context.open(&endpoint).await.is_ok());
		assert_eq!(controller.opened(), vec!["REQ>tcp://localhost:5555".to_string()]);
	}

	#[tokio::test]
	async fn terminated_context_refuses_sockets() {
		let (mut context, controller) = FakeTransportBuilder::new().build();
		let endpoint = Endpoint::parse("SUB>tcp://localhost:5555").unwrap();

		controller.terminate();
		assert!(context.is_terminated());
		assert!(matches!(context.open(&endpoint).await, Err(Error::ContextTerminated)));
	}
}
