// receiver-runtime: session loop and everything it drives
//
// Connection lifecycle, envelope decoding, archives, heartbeat and trending.
// Wire shapes live in `receiver-protocol`; option parsing lives in the CLI.

pub mod archive;
pub mod config;
pub mod connection;
pub mod decoder;
pub mod endpoint;
pub mod error;
pub mod heartbeat;
pub mod interrupt;
pub mod object;
pub mod schema;
pub mod session;
pub mod transport;
pub mod trending;

pub use archive::{ArchiveWriter, archive_file_name, prepare_output_dir};
pub use config::SessionConfig;
pub use connection::{ConnectionManager, ConnectionState, PollOutcome};
pub use decoder::{DecodeError, DecodedEnvelope, FrameError, MessageDecoder, RunId, RunMetadata};
pub use endpoint::{Endpoint, SocketMode};
pub use error::{Error, Result};
pub use heartbeat::HeartbeatWriter;
pub use object::{MeasurementObject, ObjectBuffer};
pub use session::{CycleOutcome, CycleReport, SessionLoop, SessionState};
pub use transport::zmq::ZmqContext;
pub use transport::{Socket, TransportContext};
pub use trending::{TrendSpec, TrendStatistic, TrendingSet};
