//! Multi-part envelopes.
//!
//! An envelope is one producer response. On the wire it is a flat list of
//! parts that pair up as `(header, payload)`:
//!
//! ```text
//! [ "INFO____****", "run=77 HLT_MODE=B",
//!   "SCHEMAS_****", "[{...schema...}]",
//!   "OBJECT__****", "{...object...}",
//!   ... ]
//! ```
//!
//! A trailing header without a payload becomes a frame with an empty payload.

use crate::object::ObjectPayload;
use crate::schema::SchemaDefinition;
use crate::topic::FrameKind;

/// One `(header, payload)` pair of an envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
	/// Kind derived from the header's data type id.
	pub kind: FrameKind,
	/// Raw header part.
	pub header: Vec<u8>,
	/// Raw payload part.
	pub payload: Vec<u8>,
}

impl Frame {
	/// Creates a frame with a header built from `kind`.
	pub fn new(kind: FrameKind, payload: impl Into<Vec<u8>>) -> Self {
		Self {
			kind,
			header: kind.header(),
			payload: payload.into(),
		}
	}

	/// Creates a frame from a raw header, classifying it.
	pub fn with_header(header: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
		let header = header.into();
		Self {
			kind: FrameKind::from_header(&header),
			header,
			payload: payload.into(),
		}
	}

	/// Printable form of the header for diagnostics.
	pub fn header_label(&self) -> String {
		String::from_utf8_lossy(&self.header).into_owned()
	}
}

/// Ordered frames of one inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Envelope {
	frames: Vec<Frame>,
}

impl Envelope {
	pub fn new() -> Self {
		Self::default()
	}

	/// Pairs raw transport parts into frames, preserving arrival order.
	pub fn from_parts(parts: Vec<Vec<u8>>) -> Self {
		let mut frames = Vec::with_capacity(parts.len().div_ceil(2));
		let mut parts = parts.into_iter();
		while let Some(header) = parts.next() {
			let payload = parts.next().unwrap_or_default();
			frames.push(Frame::with_header(header, payload));
		}
		Self { frames }
	}

	/// Flattens the envelope back into transport parts.
	pub fn into_parts(self) -> Vec<Vec<u8>> {
		let mut parts = Vec::with_capacity(self.frames.len() * 2);
		for frame in self.frames {
			parts.push(frame.header);
			parts.push(frame.payload);
		}
		parts
	}

	pub fn frames(&self) -> &[Frame] {
		&self.frames
	}

	pub fn len(&self) -> usize {
		self.frames.len()
	}

	pub fn is_empty(&self) -> bool {
		self.frames.is_empty()
	}

	pub fn push(&mut self, frame: Frame) {
		self.frames.push(frame);
	}

	/// Appends a metadata frame carrying a parameter string such as `run=77 HLT_MODE=B`.
	pub fn with_metadata(mut self, params: &str) -> Self {
		self.push(Frame::new(FrameKind::Metadata, params.as_bytes()));
		self
	}

	/// Appends a schema frame carrying `schemas` as a JSON array.
	pub fn with_schemas(mut self, schemas: &[SchemaDefinition]) -> serde_json::Result<Self> {
		self.push(Frame::new(FrameKind::Schema, serde_json::to_vec(schemas)?));
		Ok(self)
	}

	/// Appends an object frame carrying `object` as JSON.
	pub fn with_object(mut self, object: &ObjectPayload) -> serde_json::Result<Self> {
		self.push(Frame::new(FrameKind::Object, serde_json::to_vec(object)?));
		Ok(self)
	}

	/// Appends a frame with an arbitrary header and payload.
	pub fn with_raw(mut self, header: impl Into<Vec<u8>>, payload: impl Into<Vec<u8>>) -> Self {
		self.push(Frame::with_header(header, payload));
		self
	}
}

impl FromIterator<Frame> for Envelope {
	fn from_iter<I: IntoIterator<Item = Frame>>(iter: I) -> Self {
		Self {
			frames: iter.into_iter().collect(),
		}
	}
}

impl<'a> IntoIterator for &'a Envelope {
	type Item = &'a Frame;
	type IntoIter = std::slice::Iter<'a, Frame>;

	fn into_iter(self) -> Self::IntoIter {
		self.frames.iter()
	}
}
