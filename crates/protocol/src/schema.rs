//! Schema definitions carried by schema frames.
//!
//! A schema frame holds a JSON array of [`SchemaDefinition`]s:
//!
//! ```json
//! [{
//!   "name": "Histogram1D",
//!   "version": 2,
//!   "fields": [
//!     { "name": "title", "kind": "text" },
//!     { "name": "contents", "kind": "float_array" }
//!   ]
//! }]
//! ```

use serde::{Deserialize, Serialize};

/// Identifies one version of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SchemaRef {
	pub name: String,
	pub version: u32,
}

impl SchemaRef {
	pub fn new(name: impl Into<String>, version: u32) -> Self {
		Self { name: name.into(), version }
	}
}

impl std::fmt::Display for SchemaRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{} v{}", self.name, self.version)
	}
}

/// Structural definition required to decode objects of one schema version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaDefinition {
	pub name: String,
	pub version: u32,
	#[serde(default)]
	pub fields: Vec<FieldDefinition>,
}

impl SchemaDefinition {
	pub fn new(name: impl Into<String>, version: u32) -> Self {
		Self {
			name: name.into(),
			version,
			fields: Vec::new(),
		}
	}

	/// Adds a field definition.
	pub fn field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
		self.fields.push(FieldDefinition { name: name.into(), kind });
		self
	}

	pub fn schema_ref(&self) -> SchemaRef {
		SchemaRef::new(self.name.clone(), self.version)
	}
}

/// One named, typed field of a schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDefinition {
	pub name: String,
	pub kind: FieldKind,
}

/// Value kinds a schema field may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
	Integer,
	Float,
	Text,
	Boolean,
	FloatArray,
	IntegerArray,
}

impl std::fmt::Display for FieldKind {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			FieldKind::Integer => "integer",
			FieldKind::Float => "float",
			FieldKind::Text => "text",
			FieldKind::Boolean => "boolean",
			FieldKind::FloatArray => "float_array",
			FieldKind::IntegerArray => "integer_array",
		};
		f.write_str(name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn deserializes_schema_array() {
		let json = r#"[{"name":"Histogram1D","version":2,"fields":[{"name":"contents","kind":"float_array"}]}]"#;
		let schemas: Vec<SchemaDefinition> = serde_json::from_str(json).unwrap();

		assert_eq!(schemas.len(), 1);
		assert_eq!(schemas[0].schema_ref(), SchemaRef::new("Histogram1D", 2));
		assert_eq!(schemas[0].fields[0].kind, FieldKind::FloatArray);
	}

	#[test]
	fn unknown_field_kind_is_rejected() {
		let json = r#"{"name":"X","version":1,"fields":[{"name":"a","kind":"matrix"}]}"#;
		assert!(serde_json::from_str::<SchemaDefinition>(json).is_err());
	}

	#[test]
	fn schema_ref_display() {
		assert_eq!(SchemaRef::new("Histogram1D", 3).to_string(), "Histogram1D v3");
	}
}
