//! Measurement object payloads carried by object frames.
//!
//! ```json
//! {
//!   "schema": { "name": "Histogram1D", "version": 2 },
//!   "name": "h1",
//!   "fields": { "title": "Cluster energy", "contents": [1.0, 4.0, 2.0] }
//! }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::schema::SchemaRef;

/// Wire form of one measurement object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectPayload {
	/// Schema the producer serialized the object with.
	pub schema: SchemaRef,
	/// Object name, used as its key in archives.
	pub name: String,
	/// Field values keyed by field name.
	#[serde(default)]
	pub fields: Map<String, Value>,
}

impl ObjectPayload {
	pub fn new(schema: SchemaRef, name: impl Into<String>) -> Self {
		Self {
			schema,
			name: name.into(),
			fields: Map::new(),
		}
	}

	/// Sets a field value.
	pub fn field(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
		self.fields.insert(name.into(), value.into());
		self
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn builder_serializes_expected_shape() {
		let payload = ObjectPayload::new(SchemaRef::new("Histogram1D", 2), "h1").field("contents", vec![1.0, 2.0]);
		let json = serde_json::to_value(&payload).unwrap();

		assert_eq!(json["schema"]["name"], "Histogram1D");
		assert_eq!(json["schema"]["version"], 2);
		assert_eq!(json["name"], "h1");
		assert_eq!(json["fields"]["contents"][1], 2.0);
	}

	#[test]
	fn missing_fields_default_to_empty() {
		let payload: ObjectPayload = serde_json::from_str(r#"{"schema":{"name":"S","version":1},"name":"n"}"#).unwrap();
		assert!(payload.fields.is_empty());
	}
}
