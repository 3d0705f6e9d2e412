//! Endpoint descriptors of the form `MODE>transport://host:port`.
//!
//! The separator selects how the socket attaches: `>` connects and `@` binds.
//! Several addresses may follow the separator, separated by commas:
//!
//! ```text
//! REQ>tcp://localhost:60201
//! SUB>tcp://merger-a:60201,tcp://merger-b:60201
//! PULL@tcp://*:60300
//! ```

use std::str::FromStr;

use crate::error::{Error, Result};

/// ZeroMQ socket pattern named by an endpoint descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketMode {
	Pub,
	Sub,
	Req,
	Rep,
	Dealer,
	Router,
	Push,
	Pull,
}

impl FromStr for SocketMode {
	type Err = String;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"PUB" => Ok(SocketMode::Pub),
			"SUB" => Ok(SocketMode::Sub),
			"REQ" => Ok(SocketMode::Req),
			"REP" => Ok(SocketMode::Rep),
			"DEALER" => Ok(SocketMode::Dealer),
			"ROUTER" => Ok(SocketMode::Router),
			"PUSH" => Ok(SocketMode::Push),
			"PULL" => Ok(SocketMode::Pull),
			other => Err(format!("unknown socket mode `{other}`")),
		}
	}
}

impl std::fmt::Display for SocketMode {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let name = match self {
			SocketMode::Pub => "PUB",
			SocketMode::Sub => "SUB",
			SocketMode::Req => "REQ",
			SocketMode::Rep => "REP",
			SocketMode::Dealer => "DEALER",
			SocketMode::Router => "ROUTER",
			SocketMode::Push => "PUSH",
			SocketMode::Pull => "PULL",
		};
		f.write_str(name)
	}
}

/// Whether the socket connects out or binds locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attach {
	Connect,
	Bind,
}

/// Parsed endpoint descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
	pub mode: SocketMode,
	pub attach: Attach,
	pub addresses: Vec<String>,
}

impl Endpoint {
	/// Parses a descriptor such as `REQ>tcp://localhost:60201`.
	pub fn parse(descriptor: &str) -> Result<Self> {
		let invalid = |reason: String| Error::InvalidEndpoint {
			descriptor: descriptor.to_string(),
			reason,
		};

		let Some(split) = descriptor.find(['>', '@']) else {
			return Err(invalid("expected `MODE>address` or `MODE@address`".to_string()));
		};

		let (mode, rest) = descriptor.split_at(split);
		let mode = mode.parse::<SocketMode>().map_err(invalid)?;
		let attach = if rest.starts_with('@') { Attach::Bind } else { Attach::Connect };

		let addresses: Vec<String> = rest[1..]
			.split(',')
			.map(str::trim)
			.filter(|address| !address.is_empty())
			.map(str::to_string)
			.collect();

		if addresses.is_empty() {
			return Err(invalid("missing address".to_string()));
		}
		if let Some(bad) = addresses.iter().find(|address| !address.contains("://")) {
			return Err(invalid(format!("address `{bad}` lacks a transport scheme")));
		}

		Ok(Self { mode, attach, addresses })
	}
}

impl std::fmt::Display for Endpoint {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let separator = match self.attach {
			Attach::Connect => '>',
			Attach::Bind => '@',
		};
		write!(f, "{}{}{}", self.mode, separator, self.addresses.join(","))
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn parses_connect_descriptor() {
		let endpoint = Endpoint::parse("REQ>tcp://localhost:5555").unwrap();
		assert_eq!(endpoint.mode, SocketMode::Req);
		assert_eq!(endpoint.attach, Attach::Connect);
		assert_eq!(endpoint.addresses, vec!["tcp://localhost:5555".to_string()]);
	}

	#[test]
	fn parses_bind_and_multiple_addresses() {
		let endpoint = Endpoint::parse("pull@tcp://*:1, ipc:///tmp/x").unwrap();
		assert_eq!(endpoint.mode, SocketMode::Pull);
		assert_eq!(endpoint.attach, Attach::Bind);
		assert_eq!(endpoint.addresses.len(), 2);
		assert_eq!(endpoint.to_string(), "PULL@tcp://*:1,ipc:///tmp/x");
	}

	#[test]
	fn rejects_unknown_mode() {
		let err = Endpoint::parse("FOO>tcp://localhost:1").unwrap_err();
		assert!(matches!(err, Error::InvalidEndpoint { .. }));
		assert!(err.to_string().contains("unknown socket mode"));
	}

	#[test]
	fn rejects_missing_separator_or_address() {
		assert!(Endpoint::parse("tcp://localhost:1").is_err());
		assert!(Endpoint::parse("REQ>").is_err());
		assert!(Endpoint::parse("REQ>localhost:1").is_err());
	}
}
