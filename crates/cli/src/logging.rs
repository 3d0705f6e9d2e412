use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directives(verbose: u8) -> &'static str {
	match verbose {
		0 => "warn",
		1 => "warn,receiver_runtime=info,zmq_receiver=info",
		_ => "warn,receiver_runtime=debug,receiver_cli=debug,zmq_receiver=debug",
	}
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over `verbose`.
///
/// Returns `false` when a subscriber was already installed; that one stays in place.
pub fn init_logging(verbose: u8) -> bool {
	let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbose)));

	match tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).try_init() {
		Ok(()) => true,
		Err(err) => {
			tracing::debug!(target = "receiver", error = %err, "keeping existing log subscriber");
			false
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn verbosity_levels_map_to_filters() {
		assert_eq!(default_directives(0), "warn");
		assert!(default_directives(1).contains("receiver_runtime=info"));
		assert!(default_directives(2).contains("receiver_runtime=debug"));
		assert_eq!(default_directives(7), default_directives(2));
	}

	#[test]
	fn second_init_keeps_first_subscriber() {
		init_logging(1);
		assert!(!init_logging(2));
	}

	#[test]
	fn directives_parse() {
		for level in 0..3 {
			assert!(EnvFilter::try_new(default_directives(level)).is_ok());
		}
	}
}
