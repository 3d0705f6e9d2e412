//! Outbound request messages.
//!
//! A request is four parts: the control label, the option string, and an empty
//! `(header, payload)` pair that terminates the message:
//!
//! ```text
//! [ "CONFIG", " -select=EMC -ResetOnRequest -SchemaOnRequest", "", "" ]
//! ```

/// Control label of every request.
pub const CONTROL_LABEL: &str = "CONFIG";

const SELECT_OPTION: &str = "-select=";
const RESET_OPTION: &str = "-ResetOnRequest";
const SCHEMA_OPTION: &str = "-SchemaOnRequest";

/// Options rendered into the request's option string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestOptions {
	/// Selection filter; omitted when empty.
	pub selection: String,
	/// Ask the producer to reset its accumulated data after answering.
	pub reset_on_request: bool,
	/// Ask the producer to include schema definitions in its answer.
	pub schema_on_request: bool,
}

impl RequestOptions {
	/// Renders the option string. Each active option is prefixed with a single space.
	pub fn option_string(&self) -> String {
		let mut options = String::new();
		if !self.selection.is_empty() {
			options.push(' ');
			options.push_str(SELECT_OPTION);
			options.push_str(&self.selection);
		}
		if self.reset_on_request {
			options.push(' ');
			options.push_str(RESET_OPTION);
		}
		if self.schema_on_request {
			options.push(' ');
			options.push_str(SCHEMA_OPTION);
		}
		options
	}

	/// Renders the full multi-part request.
	pub fn to_parts(&self) -> Vec<Vec<u8>> {
		vec![CONTROL_LABEL.as_bytes().to_vec(), self.option_string().into_bytes(), Vec::new(), Vec::new()]
	}

	/// Parses a multi-part request. Returns `None` when the control label is missing.
	pub fn from_parts(parts: &[Vec<u8>]) -> Option<Self> {
		let (label, rest) = parts.split_first()?;
		if label.as_slice() != CONTROL_LABEL.as_bytes() {
			return None;
		}

		let options = rest.first().map(|part| String::from_utf8_lossy(part).into_owned()).unwrap_or_default();
		let mut parsed = RequestOptions::default();
		for token in options.split_whitespace() {
			if let Some(selection) = token.strip_prefix(SELECT_OPTION) {
				parsed.selection = selection.to_string();
			} else if token == RESET_OPTION {
				parsed.reset_on_request = true;
			} else if token == SCHEMA_OPTION {
				parsed.schema_on_request = true;
			}
		}
		Some(parsed)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_options_render_empty_string() {
		assert_eq!(RequestOptions::default().option_string(), "");
	}

	#[test]
	fn renders_all_active_options_in_order() {
		let options = RequestOptions {
			selection: "EMC".to_string(),
			reset_on_request: true,
			schema_on_request: true,
		};
		assert_eq!(options.option_string(), " -select=EMC -ResetOnRequest -SchemaOnRequest");
	}

	#[test]
	fn parts_end_with_empty_terminator_pair() {
		let parts = RequestOptions {
			schema_on_request: true,
			..Default::default()
		}
		.to_parts();

		assert_eq!(parts.len(), 4);
		assert_eq!(parts[0], b"CONFIG");
		assert_eq!(parts[1], b" -SchemaOnRequest");
		assert!(parts[2].is_empty());
		assert!(parts[3].is_empty());
	}

	#[test]
	fn from_parts_reads_back_rendered_request() {
		let options = RequestOptions {
			selection: "hist".to_string(),
			reset_on_request: false,
			schema_on_request: true,
		};
		assert_eq!(RequestOptions::from_parts(&options.to_parts()), Some(options));
	}

	#[test]
	fn from_parts_rejects_foreign_label() {
		assert_eq!(RequestOptions::from_parts(&[b"PING".to_vec()]), None);
		assert_eq!(RequestOptions::from_parts(&[]), None);
	}
}
