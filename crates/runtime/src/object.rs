//! Decoded measurement objects and the per-cycle buffer that owns them.

use receiver_protocol::SchemaRef;
use serde::Serialize;
use serde_json::{Map, Value};

/// One decoded, schema-checked measurement object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeasurementObject {
	pub name: String,
	pub schema: SchemaRef,
	pub fields: Map<String, Value>,
}

impl MeasurementObject {
	/// Returns a numeric-array field as `f64`s, or `None` when absent or not numeric.
	pub fn series(&self, field: &str) -> Option<Vec<f64>> {
		self.fields.get(field)?.as_array()?.iter().map(Value::as_f64).collect()
	}
}

/// Objects decoded from one envelope.
///
/// A buffer is created for each received envelope and dropped when the cycle
/// ends, so nothing leaks from one response into the next.
#[derive(Debug, Default)]
pub struct ObjectBuffer {
	objects: Vec<MeasurementObject>,
}

impl ObjectBuffer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, object: MeasurementObject) {
		self.objects.push(object);
	}

	pub fn len(&self) -> usize {
		self.objects.len()
	}

	pub fn is_empty(&self) -> bool {
		self.objects.is_empty()
	}

	pub fn iter(&self) -> std::slice::Iter<'_, MeasurementObject> {
		self.objects.iter()
	}

	/// Finds the first object called `name`.
	pub fn get(&self, name: &str) -> Option<&MeasurementObject> {
		self.objects.iter().find(|object| object.name == name)
	}

	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.objects.iter().map(|object| object.name.as_str())
	}
}

impl<'a> IntoIterator for &'a ObjectBuffer {
	type Item = &'a MeasurementObject;
	type IntoIter = std::slice::Iter<'a, MeasurementObject>;

	fn into_iter(self) -> Self::IntoIter {
		self.objects.iter()
	}
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	fn object(name: &str, contents: Value) -> MeasurementObject {
		MeasurementObject {
			name: name.to_string(),
			schema: SchemaRef::new("Histogram1D", 1),
			fields: json!({ "contents": contents }).as_object().cloned().unwrap(),
		}
	}

	#[test]
	fn series_reads_numeric_arrays() {
		assert_eq!(object("h", json!([1, 2.5])).series("contents"), Some(vec![1.0, 2.5]));
		assert_eq!(object("h", json!(["a"])).series("contents"), None);
		assert_eq!(object("h", json!([1])).series("missing"), None);
	}

	#[test]
	fn buffer_keeps_arrival_order() {
		let mut buffer = ObjectBuffer::new();
		buffer.push(object("h2", json!([])));
		buffer.push(object("h1", json!([])));

		assert_eq!(buffer.names().collect::<Vec<_>>(), vec!["h2", "h1"]);
		assert!(buffer.get("h1").is_some());
		assert!(buffer.get("h3").is_none());
	}
}
