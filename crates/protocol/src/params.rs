//! Parameter strings carried by metadata frames.
//!
//! The format is a whitespace separated list of `key=value` tokens. Values may
//! be wrapped in double quotes to include whitespace; a bare `key` maps to an
//! empty value.

use std::collections::BTreeMap;

/// Metadata key holding the run number.
pub const RUN_KEY: &str = "run";
/// Metadata key holding the producer's mode tag.
pub const MODE_KEY: &str = "HLT_MODE";

/// Parses a parameter string into a key/value map. Later keys overwrite earlier ones.
pub fn parse_param_string(input: &str) -> BTreeMap<String, String> {
	tokenize(input)
		.into_iter()
		.map(|token| match token.split_once('=') {
			Some((key, value)) => (key.to_string(), value.to_string()),
			None => (token, String::new()),
		})
		.filter(|(key, _)| !key.is_empty())
		.collect()
}

/// Renders a key/value map as a parameter string, quoting values with whitespace.
pub fn format_param_string<'a>(params: impl IntoIterator<Item = (&'a str, &'a str)>) -> String {
	params
		.into_iter()
		.map(|(key, value)| {
			if value.chars().any(char::is_whitespace) {
				format!("{key}=\"{value}\"")
			} else {
				format!("{key}={value}")
			}
		})
		.collect::<Vec<_>>()
		.join(" ")
}

fn tokenize(input: &str) -> Vec<String> {
	let mut tokens = Vec::new();
	let mut current = String::new();
	let mut quoted = false;

	for ch in input.chars() {
		match ch {
			'"' => quoted = !quoted,
			c if c.is_whitespace() && !quoted => {
				if !current.is_empty() {
					tokens.push(std::mem::take(&mut current));
				}
			}
			c => current.push(c),
		}
	}

	if !current.is_empty() {
		tokens.push(current);
	}
	tokens
}
