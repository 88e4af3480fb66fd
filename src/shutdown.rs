// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Shutdown coordination.
//!
//! SIGINT and SIGTERM cancel a shared [`CancellationToken`]. The watch loop and
//! the metrics server both observe the token and stop on their own; signal
//! handling never touches per-notification processing.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Wait for SIGINT or SIGTERM and return the name of the signal received.
///
/// # Errors
///
/// Returns an error if the signal handlers cannot be installed.
pub async fn wait_for_signal() -> std::io::Result<&'static str> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        tokio::select! {
            result = tokio::signal::ctrl_c() => {
                result?;
                Ok("SIGINT")
            }
            _ = sigterm.recv() => Ok("SIGTERM"),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        Ok("SIGINT")
    }
}

/// Cancel `token` when a termination signal arrives.
///
/// The returned task exits once the token is cancelled, whether by a signal or
/// by someone else. If the handlers cannot be installed the failure is logged
/// and the controller keeps running without them.
pub fn spawn_signal_listener(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {}
            result = wait_for_signal() => match result {
                Ok(signal) => {
                    info!(signal = signal, "Received shutdown signal, stopping controller");
                    token.cancel();
                }
                Err(e) => {
                    error!(error = %e, "Failed to install signal handlers");
                }
            },
        }
    })
}

#[cfg(test)]
#[path = "shutdown_tests.rs"]
mod shutdown_tests;
