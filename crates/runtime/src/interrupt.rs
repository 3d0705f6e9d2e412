//! Process-wide interrupt flag.

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::task::JoinHandle;
use tracing::{info, warn};

/// Raised once SIGINT (or SIGTERM on Unix) has been received.
pub static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Spawns a task that raises [`INTERRUPTED`] on the first termination signal.
///
/// Must be called from within a tokio runtime.
pub fn install() -> JoinHandle<()> {
	tokio::spawn(async {
		wait_for_signal().await;
		INTERRUPTED.store(true, Ordering::SeqCst);
	})
}

#[cfg(unix)]
async fn wait_for_signal() {
	use tokio::signal::unix::{SignalKind, signal};

	let mut sigterm = match signal(SignalKind::terminate()) {
		Ok(sigterm) => sigterm,
		Err(err) => {
			warn!(target = "receiver.session", error = %err, "cannot listen for SIGTERM");
			wait_for_ctrl_c().await;
			return;
		}
	};

	tokio::select! {
		_ = wait_for_ctrl_c() => {}
		_ = sigterm.recv() => {
			info!(target = "receiver.session", "received SIGTERM");
		}
	}
}

#[cfg(not(unix))]
async fn wait_for_signal() {
	wait_for_ctrl_c().await;
}

async fn wait_for_ctrl_c() {
	match tokio::signal::ctrl_c().await {
		Ok(()) => info!(target = "receiver.session", "received interrupt"),
		Err(err) => {
			warn!(target = "receiver.session", error = %err, "cannot listen for interrupts");
			std::future::pending::<()>().await;
		}
	}
}
