//! Request/response round trip over a real ZeroMQ socket pair.

use std::time::Duration;

use bytes::Bytes;
use receiver_protocol::{Envelope, RequestOptions};
use receiver_runtime::{ConnectionManager, ConnectionState, PollOutcome, ZmqContext};
use zeromq::{Socket, SocketRecv, SocketSend, ZmqMessage};

#[tokio::test]
async fn req_socket_round_trip() {
	let mut producer = zeromq::RepSocket::new();
	let bound = producer.bind("tcp://127.0.0.1:0").await.unwrap();

	let server = tokio::spawn(async move {
		let request = producer.recv().await.unwrap();
		let parts: Vec<Vec<u8>> = request.into_vec().into_iter().map(|part| part.to_vec()).collect();
		let options = RequestOptions::from_parts(&parts).unwrap();
		assert!(options.schema_on_request);

		let reply: Vec<Bytes> = Envelope::new().with_metadata("run=77 HLT_MODE=B").into_parts().into_iter().map(Bytes::from).collect();
		producer.send(ZmqMessage::try_from(reply).unwrap()).await.unwrap();
		producer.close().await;
	});

	let mut connection = ConnectionManager::new(ZmqContext::new(), format!("REQ>{bound}"));
	connection.initialize().await.unwrap();

	let request = RequestOptions {
		schema_on_request: true,
		..Default::default()
	};
	connection.send(request.to_parts()).await.unwrap();

	let PollOutcome::Readable(parts) = connection.poll(Duration::from_secs(5)).await.unwrap() else {
		panic!("expected a reply");
	};
	assert_eq!(Envelope::from_parts(parts).frames()[0].payload, b"run=77 HLT_MODE=B");

	connection.close().await;
	server.await.unwrap();
}

#[tokio::test]
async fn unsupported_mode_fails_to_open() {
	let mut connection = ConnectionManager::new(ZmqContext::new(), "PUB>tcp://127.0.0.1:5999");
	let err = connection.initialize().await.unwrap_err();
	assert!(err.to_string().contains("cannot receive"), "{err}");
	connection.close().await;
}

fn closed_port() -> u16 {
	let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
	listener.local_addr().unwrap().port()
}

#[tokio::test]
async fn unreachable_producer_does_not_block() {
	let endpoint = format!("REQ>tcp://127.0.0.1:{}", closed_port());
	let mut connection = ConnectionManager::new(ZmqContext::new(), endpoint).with_connect_timeout(Duration::from_millis(200));

	tokio::time::timeout(Duration::from_secs(5), connection.initialize()).await.unwrap().unwrap();
	assert_eq!(connection.state(), ConnectionState::Disconnected);

	let outcome = tokio::time::timeout(Duration::from_secs(5), connection.poll(Duration::from_millis(200))).await.unwrap().unwrap();
	assert!(matches!(outcome, PollOutcome::Disconnected));

	tokio::time::timeout(Duration::from_secs(5), connection.reinitialize()).await.unwrap().unwrap();
	assert_eq!(connection.state(), ConnectionState::Disconnected);
	connection.close().await;
}

#[tokio::test]
async fn reinitialize_after_producer_exit_does_not_block() {
	let mut producer = zeromq::RepSocket::new();
	let bound = producer.bind("tcp://127.0.0.1:0").await.unwrap();

	let mut connection = ConnectionManager::new(ZmqContext::new(), format!("REQ>{bound}")).with_connect_timeout(Duration::from_millis(200));
	connection.initialize().await.unwrap();
	producer.close().await;

	tokio::time::timeout(Duration::from_secs(5), connection.reinitialize()).await.unwrap().unwrap();
	connection.close().await;
}
