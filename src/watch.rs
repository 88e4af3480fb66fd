// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Service watch loop.
//!
//! The loop has three phases:
//!
//! 1. **Bootstrap** - list services once and capture the resource-version cursor
//!    (optionally reconciling every listed service)
//! 2. **Streaming** - watch from the cursor; every notification is classified
//!    and reconciled in delivery order, one at a time
//! 3. **Terminal** - cancellation was observed between notifications, or the
//!    stream ended or failed in a way it cannot recover from
//!
//! Per-notification failures never end the loop: they are logged and the next
//! notification is processed.

use crate::classifier::{classify, ChangeKind, ServiceSnapshot};
use crate::errors::StreamError;
use crate::metrics;
use crate::reconciler::{ReconcileOutcome, Reconciler};
use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::constants::WATCH_GONE_STATUS_CODE;

/// Result of the bootstrap list call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceList {
    /// Every service that existed at `cursor`
    pub snapshots: Vec<ServiceSnapshot>,
    /// Resource version to start watching from
    pub cursor: String,
}

/// Status carried by an error notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchStatus {
    /// HTTP-style status code (410 means the cursor expired)
    pub code: u16,
    /// Machine-readable reason
    pub reason: String,
    /// Human-readable message
    pub message: String,
}

/// One item of the service watch stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchNotification {
    Added(ServiceSnapshot),
    Modified(ServiceSnapshot),
    Deleted(ServiceSnapshot),
    /// The API server reported an error in-band
    Error(WatchStatus),
}

impl WatchNotification {
    /// Lower-case label used in logs and metrics.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Added(_) => ChangeKind::Added.as_str(),
            Self::Modified(_) => ChangeKind::Modified.as_str(),
            Self::Deleted(_) => ChangeKind::Deleted.as_str(),
            Self::Error(_) => "error",
        }
    }

    /// The carried snapshot, with its change kind taken from the variant.
    #[must_use]
    pub fn into_snapshot(self) -> Option<ServiceSnapshot> {
        let (mut snapshot, change_kind) = match self {
            Self::Added(s) => (s, ChangeKind::Added),
            Self::Modified(s) => (s, ChangeKind::Modified),
            Self::Deleted(s) => (s, ChangeKind::Deleted),
            Self::Error(_) => return None,
        };
        snapshot.change_kind = change_kind;
        Some(snapshot)
    }
}

/// Stream of watch notifications.
pub type NotificationStream = BoxStream<'static, Result<WatchNotification, StreamError>>;

/// Orchestration API capability the loop depends on.
#[async_trait]
pub trait ServiceSource: Send + Sync {
    /// List every service and return the cursor of the listing.
    async fn list_services(&self) -> Result<ServiceList, StreamError>;

    /// Watch services from `cursor`.
    ///
    /// The stream ends only when it cannot be resumed; stream-level failures are
    /// yielded as errors.
    fn watch_services(&self, cursor: String) -> NotificationStream;
}

/// The controller's single logical worker.
pub struct WatchLoop<S> {
    source: S,
    reconciler: Reconciler,
    initial_sync: bool,
}

impl<S: ServiceSource> WatchLoop<S> {
    /// Create a loop reading from `source` and applying changes with `reconciler`.
    pub fn new(source: S, reconciler: Reconciler) -> Self {
        Self {
            source,
            reconciler,
            initial_sync: false,
        }
    }

    /// Reconcile every listed service during bootstrap.
    #[must_use]
    pub fn with_initial_sync(mut self, initial_sync: bool) -> Self {
        self.initial_sync = initial_sync;
        self
    }

    /// Run until `shutdown` is cancelled or the stream becomes unusable.
    ///
    /// Cancellation is observed while waiting for the next notification; a
    /// reconciliation already in progress is allowed to finish.
    ///
    /// # Errors
    ///
    /// Returns the [`StreamError`] that made the stream unusable:
    /// a failed bootstrap list, a failed (re)open, an expired cursor, or an
    /// unexpected end of stream.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), StreamError> {
        info!("Listing services");
        let list = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("Shutdown requested before bootstrap completed");
                return Ok(());
            }
            result = self.source.list_services() => result.inspect_err(|e| {
                metrics::record_error("watch", e.reason());
                error!(error = %e, "Failed to list services");
            })?,
        };

        info!(
            service_count = list.snapshots.len(),
            cursor = %list.cursor,
            initial_sync = self.initial_sync,
            "Bootstrap complete"
        );

        if self.initial_sync {
            for snapshot in list.snapshots {
                if shutdown.is_cancelled() {
                    info!("Shutdown requested during initial sync");
                    return Ok(());
                }
                self.handle_snapshot(snapshot).await;
            }
        }

        let mut stream = self.source.watch_services(list.cursor);
        info!("Watching services");

        loop {
            let next = tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("Shutdown requested, stopping watch loop");
                    return Ok(());
                }
                next = stream.next() => next,
            };

            match next {
                Some(Ok(WatchNotification::Error(status))) => {
                    metrics::record_notification("error");
                    if status.code == WATCH_GONE_STATUS_CODE {
                        let err = StreamError::CursorExpired {
                            message: status.message,
                        };
                        metrics::record_error("watch", err.reason());
                        error!(error = %err, "Watch cursor expired");
                        return Err(err);
                    }
                    warn!(
                        code = status.code,
                        reason = %status.reason,
                        message = %status.message,
                        "Watch reported an error, skipping notification"
                    );
                }
                Some(Ok(notification)) => {
                    if let Some(snapshot) = notification.into_snapshot() {
                        self.handle_snapshot(snapshot).await;
                    }
                }
                Some(Err(e)) if e.is_recoverable() => {
                    metrics::record_error("watch", e.reason());
                    warn!(error = %e, "Skipping undecodable notification");
                }
                Some(Err(e)) => {
                    metrics::record_error("watch", e.reason());
                    error!(error = %e, "Watch stream failed");
                    return Err(e);
                }
                None => {
                    let err = StreamError::Closed;
                    metrics::record_error("watch", err.reason());
                    error!(error = %err, "Watch stream ended");
                    return Err(err);
                }
            }
        }
    }

    async fn handle_snapshot(&self, snapshot: ServiceSnapshot) {
        metrics::record_notification(snapshot.change_kind.as_str());

        let action = classify(&snapshot);
        let service = snapshot.key();
        debug!(
            service = %service,
            change = %snapshot.change_kind,
            action = action.kind(),
            "Classified notification"
        );

        match self.reconciler.reconcile(&action).await {
            Ok(ReconcileOutcome::Skipped) => {
                debug!(service = %service, "Nothing to reconcile");
            }
            Ok(outcome) => {
                debug!(service = %service, outcome = ?outcome, "Reconciled service");
            }
            Err(e) => {
                warn!(
                    service = %service,
                    domain = action.domain_name().unwrap_or_default(),
                    reason = e.reason(),
                    error = %e,
                    "Reconciliation failed, dropping notification"
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod watch_tests;
