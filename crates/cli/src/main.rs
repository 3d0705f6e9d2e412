use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use receiver_cli::{cli::Cli, logging};
use receiver_runtime::{ConnectionManager, SessionConfig, SessionLoop, ZmqContext, interrupt, prepare_output_dir};
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
	let cli = Cli::parse();
	logging::init_logging(cli.verbose);

	match run(cli.into_config()).await {
		Ok(()) => ExitCode::SUCCESS,
		Err(err) => {
			error!(target = "receiver", error = %format!("{err:#}"), "receiver stopped");
			ExitCode::FAILURE
		}
	}
}

async fn run(mut config: SessionConfig) -> Result<()> {
	config.output_dir =
		prepare_output_dir(&config.output_dir).with_context(|| format!("cannot create data directory {}", config.output_dir.display()))?;
	info!(target = "receiver.session", "{}", config.describe());

	interrupt::install();

	let mut connection = ConnectionManager::new(ZmqContext::new(), config.endpoint.clone()).with_connect_timeout(config.poll_timeout);
	if let Err(err) = connection.initialize().await {
		connection.close().await;
		return Err(err).with_context(|| format!("cannot initialize socket {}", config.endpoint));
	}

	SessionLoop::new(config, connection, &interrupt::INTERRUPTED)
		.run()
		.await
		.context("session loop ended")
}
