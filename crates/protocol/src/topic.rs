//! Frame headers.
//!
//! Every inbound payload is preceded by a header part. The first
//! [`DATA_TYPE_LEN`] bytes name the payload's data type; anything after that is
//! the producer's origin tag, which the receiver ignores.

use serde::{Deserialize, Serialize};

/// Length of the data type id at the start of a header part.
pub const DATA_TYPE_LEN: usize = 8;

/// Data type id of session metadata (`run=... HLT_MODE=...`).
pub const INFO_DATA_TYPE: &[u8; DATA_TYPE_LEN] = b"INFO____";
/// Data type id of a batch of schema definitions.
pub const SCHEMA_DATA_TYPE: &[u8; DATA_TYPE_LEN] = b"SCHEMAS_";
/// Data type id of a single measurement object.
pub const OBJECT_DATA_TYPE: &[u8; DATA_TYPE_LEN] = b"OBJECT__";

/// Origin tag appended to headers built by this crate.
pub const DEFAULT_ORIGIN: &[u8; 4] = b"****";

/// Kind of a frame, derived from its header's data type id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameKind {
	Metadata,
	Schema,
	Object,
	Unrecognized,
}

impl FrameKind {
	/// Classifies a header part. Short or unknown headers are [`FrameKind::Unrecognized`].
	pub fn from_header(header: &[u8]) -> Self {
		let Some(id) = header.get(..DATA_TYPE_LEN) else {
			return FrameKind::Unrecognized;
		};

		if id == INFO_DATA_TYPE.as_slice() {
			FrameKind::Metadata
		} else if id == SCHEMA_DATA_TYPE.as_slice() {
			FrameKind::Schema
		} else if id == OBJECT_DATA_TYPE.as_slice() {
			FrameKind::Object
		} else {
			FrameKind::Unrecognized
		}
	}

	/// Returns the data type id for this kind, if it has one.
	pub fn data_type(self) -> Option<&'static [u8; DATA_TYPE_LEN]> {
		match self {
			FrameKind::Metadata => Some(INFO_DATA_TYPE),
			FrameKind::Schema => Some(SCHEMA_DATA_TYPE),
			FrameKind::Object => Some(OBJECT_DATA_TYPE),
			FrameKind::Unrecognized => None,
		}
	}

	/// Builds a header part (data type id + [`DEFAULT_ORIGIN`]).
	pub fn header(self) -> Vec<u8> {
		match self.data_type() {
			Some(id) => {
				let mut header = Vec::with_capacity(DATA_TYPE_LEN + DEFAULT_ORIGIN.len());
				header.extend_from_slice(id);
				header.extend_from_slice(DEFAULT_ORIGIN);
				header
			}
			None => Vec::new(),
		}
	}
}

impl std::fmt::Display for FrameKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			FrameKind::Metadata => write!(f, "metadata"),
			FrameKind::Schema => write!(f, "schema"),
			FrameKind::Object => write!(f, "object"),
			FrameKind::Unrecognized => write!(f, "unrecognized"),
		}
	}
}
