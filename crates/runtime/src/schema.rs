//! Registry of schema definitions received from the producer.
//!
//! Schemas persist for the life of the session: a producer only resends them
//! when the receiver asks with `-SchemaOnRequest`.

use std::collections::HashMap;

use receiver_protocol::{FieldKind, SchemaDefinition, SchemaRef};
use serde_json::{Map, Value};

/// Known schema versions keyed by name and version.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
	schemas: HashMap<SchemaRef, SchemaDefinition>,
}

impl SchemaRegistry {
	/// Registers `schema`, replacing any definition with the same name and version.
	pub fn register(&mut self, schema: SchemaDefinition) -> SchemaRef {
		let key = schema.schema_ref();
		self.schemas.insert(key.clone(), schema);
		key
	}

	pub fn get(&self, schema: &SchemaRef) -> Option<&SchemaDefinition> {
		self.schemas.get(schema)
	}

	pub(crate) fn len(&self) -> usize {
		self.schemas.len()
	}
}

/// Checks `fields` against `schema`. Returns a description of the first mismatch.
pub fn validate_fields(schema: &SchemaDefinition, fields: &Map<String, Value>) -> Result<(), String> {
	for field in &schema.fields {
		let Some(value) = fields.get(&field.name) else {
			return Err(format!("missing field `{}`", field.name));
		};
		if !kind_accepts(field.kind, value) {
			return Err(format!("field `{}` is not {}", field.name, field.kind));
		}
	}

	if let Some(extra) = fields.keys().find(|name| !schema.fields.iter().any(|field| &field.name == *name)) {
		return Err(format!("field `{extra}` is not part of {}", schema.schema_ref()));
	}

	Ok(())
}

fn kind_accepts(kind: FieldKind, value: &Value) -> bool {
	match kind {
		FieldKind::Integer => is_integer(value),
		FieldKind::Float => value.is_number(),
		FieldKind::Text => value.is_string(),
		FieldKind::Boolean => value.is_boolean(),
		FieldKind::FloatArray => value.as_array().is_some_and(|items| items.iter().all(Value::is_number)),
		FieldKind::IntegerArray => value.as_array().is_some_and(|items| items.iter().all(is_integer)),
	}
}

fn is_integer(value: &Value) -> bool {
	value.is_i64() || value.is_u64()
}
