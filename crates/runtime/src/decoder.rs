//! Envelope decoding with per-frame error isolation.
//!
//! Every frame is classified on its own, in arrival order. A frame that fails
//! to decode is recorded in [`DecodedEnvelope::errors`] and skipped; later
//! frames are still processed.
//!
//! | frame | on success | on failure |
//! |---|---|---|
//! | metadata | run and mode update | [`DecodeError::Malformed`] |
//! | schema | schemas registered | [`DecodeError::Malformed`] |
//! | object | appended to the buffer | [`DecodeError::SchemaMismatch`] (re-request schemas) or [`DecodeError::Malformed`] |
//! | unrecognized | skipped | |

use receiver_protocol::{Envelope, Frame, FrameKind, MODE_KEY, ObjectPayload, RUN_KEY, SchemaDefinition, SchemaRef, parse_param_string};
use thiserror::Error;
use tracing::debug;

use crate::object::{MeasurementObject, ObjectBuffer};
use crate::schema::{SchemaRegistry, validate_fields};

/// Run number as reported by the producer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunId {
	/// No usable run number has been seen.
	#[default]
	Unset,
	Number(i64),
}

impl RunId {
	/// Parses a metadata value; absent or non-numeric values are [`RunId::Unset`].
	pub fn parse(value: Option<&str>) -> Self {
		value.and_then(|value| value.trim().parse::<i64>().ok()).map_or(RunId::Unset, RunId::Number)
	}

	/// Returns the run number when it names a real run (set and non-zero).
	pub fn active(self) -> Option<i64> {
		match self {
			RunId::Number(run) if run != 0 => Some(run),
			_ => None,
		}
	}
}

impl std::fmt::Display for RunId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self {
			RunId::Unset => f.write_str("unset"),
			RunId::Number(run) => write!(f, "{run}"),
		}
	}
}

/// Session metadata carried by a metadata frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunMetadata {
	pub run: RunId,
	pub mode: String,
}

/// Why a single frame was dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
	/// The object was encoded with a schema the registry does not know (or knows differently).
	#[error("schema mismatch for {schema}: {reason}")]
	SchemaMismatch { schema: SchemaRef, reason: String },
	/// The payload is not a recognizable encoding at all.
	#[error("malformed {kind} payload: {reason}")]
	Malformed { kind: FrameKind, reason: String },
	/// The header names no known data type.
	#[error("unrecognized frame header `{header}`")]
	Unrecognized { header: String },
}

impl DecodeError {
	/// Whether requesting schemas again could make the frame decodable.
	pub fn is_recoverable(&self) -> bool {
		matches!(self, DecodeError::SchemaMismatch { .. })
	}
}

/// A dropped frame and where it sat in the envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameError {
	pub position: usize,
	pub error: DecodeError,
}

/// Everything one envelope produced.
#[derive(Debug, Default)]
pub struct DecodedEnvelope {
	/// Last metadata frame of the envelope, if any.
	pub metadata: Option<RunMetadata>,
	/// Schemas registered while decoding.
	pub schemas: Vec<SchemaRef>,
	/// Successfully decoded objects, in arrival order.
	pub objects: ObjectBuffer,
	/// Set when at least one object hit a schema mismatch.
	pub schema_request: bool,
	/// Dropped frames.
	pub errors: Vec<FrameError>,
}

/// Decodes envelopes against the schemas seen so far.
#[derive(Debug, Default)]
pub struct MessageDecoder {
	registry: SchemaRegistry,
}

impl MessageDecoder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn registry(&self) -> &SchemaRegistry {
		&self.registry
	}

	/// Registers a schema directly, as if it had arrived in a schema frame.
	pub fn register_schema(&mut self, schema: SchemaDefinition) -> SchemaRef {
		self.registry.register(schema)
	}

	/// Decodes every frame of `envelope`.
	pub fn decode(&mut self, envelope: &Envelope) -> DecodedEnvelope {
		let mut decoded = DecodedEnvelope::default();

		for (position, frame) in envelope.frames().iter().enumerate() {
			let result = match frame.kind {
				FrameKind::Metadata => decode_metadata(frame).map(|metadata| {
					debug!(target = "receiver.decode", position, run = %metadata.run, mode = %metadata.mode, "metadata frame");
					decoded.metadata = Some(metadata);
				}),
				FrameKind::Schema => self.decode_schemas(frame).map(|schemas| {
					debug!(target = "receiver.decode", position, count = schemas.len(), "schema frame");
					decoded.schemas.extend(schemas);
				}),
				FrameKind::Object => self.decode_object(frame).map(|object| {
					debug!(target = "receiver.decode", position, name = %object.name, "object frame");
					decoded.objects.push(object);
				}),
				FrameKind::Unrecognized => Err(DecodeError::Unrecognized {
					header: frame.header_label(),
				}),
			};

			if let Err(error) = result {
				if error.is_recoverable() {
					decoded.schema_request = true;
				}
				decoded.errors.push(FrameError { position, error });
			}
		}

		decoded
	}

	fn decode_schemas(&mut self, frame: &Frame) -> Result<Vec<SchemaRef>, DecodeError> {
		let schemas: Vec<SchemaDefinition> = serde_json::from_slice(&frame.payload).map_err(|err| DecodeError::Malformed {
			kind: FrameKind::Schema,
			reason: err.to_string(),
		})?;
		Ok(schemas.into_iter().map(|schema| self.registry.register(schema)).collect())
	}

	fn decode_object(&self, frame: &Frame) -> Result<MeasurementObject, DecodeError> {
		let payload: ObjectPayload = serde_json::from_slice(&frame.payload).map_err(|err| DecodeError::Malformed {
			kind: FrameKind::Object,
			reason: err.to_string(),
		})?;

		if payload.name.is_empty() {
			return Err(DecodeError::Malformed {
				kind: FrameKind::Object,
				reason: "object has no name".to_string(),
			});
		}

		let Some(schema) = self.registry.get(&payload.schema) else {
			return Err(DecodeError::SchemaMismatch {
				schema: payload.schema,
				reason: "schema not registered".to_string(),
			});
		};

		if let Err(reason) = validate_fields(schema, &payload.fields) {
			return Err(DecodeError::SchemaMismatch {
				schema: payload.schema,
				reason,
			});
		}

		Ok(MeasurementObject {
			name: payload.name,
			schema: payload.schema,
			fields: payload.fields,
		})
	}
}

fn decode_metadata(frame: &Frame) -> Result<RunMetadata, DecodeError> {
	let text = std::str::from_utf8(&frame.payload).map_err(|err| DecodeError::Malformed {
		kind: FrameKind::Metadata,
		reason: err.to_string(),
	})?;

	let params = parse_param_string(text);
	Ok(RunMetadata {
		run: RunId::parse(params.get(RUN_KEY).map(String::as_str)),
		mode: params.get(MODE_KEY).cloned().unwrap_or_default(),
	})
}

#[cfg(test)]
mod tests {
	use receiver_protocol::{FieldKind, ObjectPayload};

	use super::*;

	fn schema() -> SchemaDefinition {
		SchemaDefinition::new("Histogram1D", 1).field("contents", FieldKind::FloatArray)
	}

	fn histogram(name: &str) -> ObjectPayload {
		ObjectPayload::new(SchemaRef::new("Histogram1D", 1), name).field("contents", vec![1.0, 2.0])
	}

	#[test]
	fn run_id_parsing() {
		assert_eq!(RunId::parse(Some("77")), RunId::Number(77));
		assert_eq!(RunId::parse(Some(" 0 ")), RunId::Number(0));
		assert_eq!(RunId::parse(Some("abc")), RunId::Unset);
		assert_eq!(RunId::parse(Some("-4")), RunId::Number(-4));
		assert_eq!(RunId::parse(Some("4.5")), RunId::Unset);
		assert_eq!(RunId::parse(None), RunId::Unset);
	}

	#[test]
	fn only_nonzero_runs_are_active() {
		assert_eq!(RunId::Number(77).active(), Some(77));
		assert_eq!(RunId::Number(-4).active(), Some(-4));
		assert_eq!(RunId::Number(0).active(), None);
		assert_eq!(RunId::Unset.active(), None);
	}

	#[test]
	fn decodes_metadata_schema_and_objects() {
		let envelope = Envelope::new()
			.with_metadata("run=77 HLT_MODE=B")
			.with_schemas(&[schema()])
			.unwrap()
			.with_object(&histogram("h1"))
			.unwrap()
			.with_object(&histogram("h2"))
			.unwrap();

		let mut decoder = MessageDecoder::new();
		let decoded = decoder.decode(&envelope);

		assert_eq!(
			decoded.metadata,
			Some(RunMetadata {
				run: RunId::Number(77),
				mode: "B".to_string()
			})
		);
		assert_eq!(decoded.schemas, vec![SchemaRef::new("Histogram1D", 1)]);
		assert_eq!(decoded.objects.names().collect::<Vec<_>>(), vec!["h1", "h2"]);
		assert!(!decoded.schema_request);
		assert!(decoded.errors.is_empty());
	}

	#[test]
	fn metadata_without_mode_yields_empty_mode() {
		let decoded = MessageDecoder::new().decode(&Envelope::new().with_metadata("run=12"));
		let metadata = decoded.metadata.unwrap();
		assert_eq!(metadata.run, RunId::Number(12));
		assert_eq!(metadata.mode, "");
	}

	#[test]
	fn unknown_schema_requests_schemas_and_continues() {
		let envelope = Envelope::new()
			.with_object(&histogram("h1"))
			.unwrap()
			.with_schemas(&[schema()])
			.unwrap()
			.with_object(&histogram("h2"))
			.unwrap();

		let decoded = MessageDecoder::new().decode(&envelope);

		assert!(decoded.schema_request);
		assert_eq!(decoded.objects.names().collect::<Vec<_>>(), vec!["h2"]);
		assert_eq!(decoded.errors.len(), 1);
		assert_eq!(decoded.errors[0].position, 0);
		assert!(decoded.errors[0].error.is_recoverable());
	}

	#[test]
	fn schema_drift_is_a_mismatch() {
		let mut decoder = MessageDecoder::new();
		decoder.register_schema(schema());

		let drifted = ObjectPayload::new(SchemaRef::new("Histogram1D", 1), "h1").field("bins", vec![1.0]);
		let decoded = decoder.decode(&Envelope::new().with_object(&drifted).unwrap());

		assert!(decoded.schema_request);
		assert!(decoded.objects.is_empty());
		assert!(matches!(decoded.errors[0].error, DecodeError::SchemaMismatch { .. }));
	}

	#[test]
	fn malformed_object_is_skipped_without_schema_request() {
		let mut decoder = MessageDecoder::new();
		decoder.register_schema(schema());

		let envelope = Envelope::new()
			.with_raw(FrameKind::Object.header(), "not json at all")
			.with_object(&histogram("h2"))
			.unwrap();
		let decoded = decoder.decode(&envelope);

		assert!(!decoded.schema_request);
		assert_eq!(decoded.objects.names().collect::<Vec<_>>(), vec!["h2"]);
		assert!(matches!(
			decoded.errors[0],
			FrameError {
				position: 0,
				error: DecodeError::Malformed { kind: FrameKind::Object, .. }
			}
		));
	}

	#[test]
	fn unrecognized_and_bad_metadata_frames_are_recorded() {
		let envelope = Envelope::new().with_raw("ROOTTOBJ****", "x").with_raw(FrameKind::Metadata.header(), vec![0xff, 0xfe]);
		let decoded = MessageDecoder::new().decode(&envelope);

		assert!(decoded.metadata.is_none());
		assert_eq!(decoded.errors.len(), 2);
		assert!(matches!(decoded.errors[0].error, DecodeError::Unrecognized { ref header } if header == "ROOTTOBJ****"));
		assert!(matches!(decoded.errors[1].error, DecodeError::Malformed { kind: FrameKind::Metadata, .. }));
	}

	#[test]
	fn bad_schema_frame_does_not_block_objects() {
		let mut decoder = MessageDecoder::new();
		decoder.register_schema(schema());

		let envelope = Envelope::new()
			.with_raw(FrameKind::Schema.header(), "{")
			.with_object(&histogram("h1"))
			.unwrap();
		let decoded = decoder.decode(&envelope);

		assert_eq!(decoded.objects.len(), 1);
		assert!(!decoded.schema_request);
		assert_eq!(decoded.errors.len(), 1);
	}

	#[test]
	fn schemas_persist_across_envelopes() {
		let mut decoder = MessageDecoder::new();
		decoder.decode(&Envelope::new().with_schemas(&[schema()]).unwrap());

		let decoded = decoder.decode(&Envelope::new().with_object(&histogram("h1")).unwrap());
		assert_eq!(decoded.objects.len(), 1);
		assert_eq!(decoder.registry().len(), 1);
	}
}
