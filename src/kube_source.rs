// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Kubernetes implementation of [`ServiceSource`].
//!
//! Bootstrap is a paginated `list` of `Service` objects whose resourceVersion
//! becomes the watch cursor. The watch itself is a raw `watch` call opened from
//! that cursor. The API server ends every watch after a timeout; when that
//! happens the stream is reopened from the last resourceVersion it delivered,
//! so consumers see one continuous stream.
//!
//! Reopens are spaced by an exponential backoff that starts again from its
//! initial delay once an event arrives, so a watch that keeps ending at once
//! does not hammer the API server.
//!
//! A failed reopen is yielded as [`StreamError::WatchFailed`] and ends the
//! stream, as does an in-band `410 Gone` status.

use crate::classifier::{ChangeKind, ServiceSnapshot};
use crate::errors::StreamError;
use crate::metrics;
use crate::retry::{Backoff, RetryPolicy};
use crate::watch::{
    NotificationStream, ServiceList, ServiceSource, WatchNotification, WatchStatus,
};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use k8s_openapi::api::core::v1::Service;
use kube::api::{ListParams, WatchEvent, WatchParams};
use kube::{Api, Client};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::constants::{
    LIST_PAGE_SIZE, WATCH_GONE_STATUS_CODE, WATCH_REOPEN_INITIAL_DELAY_MILLIS,
    WATCH_REOPEN_MAX_DELAY_SECS, WATCH_TIMEOUT_SECS,
};

/// Delay schedule between watch reopens: 1s doubling to 30s, never giving up.
#[must_use]
pub fn default_reopen_backoff() -> RetryPolicy {
    RetryPolicy {
        max_attempts: u32::MAX,
        initial_interval: Duration::from_millis(WATCH_REOPEN_INITIAL_DELAY_MILLIS),
        max_interval: Duration::from_secs(WATCH_REOPEN_MAX_DELAY_SECS),
        max_elapsed_time: None,
        ..RetryPolicy::default()
    }
}

/// Build a snapshot of `service` for `change_kind`.
///
/// The domain comes from the `annotation_key` annotation. The address is the
/// hostname of the first load-balancer ingress entry. An IP-only ingress has
/// no address, since a CNAME target must be a name.
#[must_use]
pub fn snapshot_from_service(
    service: &Service,
    change_kind: ChangeKind,
    annotation_key: &str,
) -> ServiceSnapshot {
    let domain_name = service
        .metadata
        .annotations
        .as_ref()
        .and_then(|annotations| annotations.get(annotation_key))
        .cloned();

    let first_ingress = service
        .status
        .as_ref()
        .and_then(|status| status.load_balancer.as_ref())
        .and_then(|lb| lb.ingress.as_ref())
        .and_then(|ingress| ingress.first());

    let address = first_ingress
        .and_then(|entry| entry.hostname.clone())
        .filter(|hostname| !hostname.is_empty());

    if address.is_none() && domain_name.is_some() {
        if let Some(ip) = first_ingress.and_then(|entry| entry.ip.as_deref()) {
            debug!(
                service = service.metadata.name.as_deref().unwrap_or_default(),
                ip = %ip,
                "Load balancer has only an IP address, which cannot be a CNAME target"
            );
        }
    }

    ServiceSnapshot {
        name: service.metadata.name.clone().unwrap_or_default(),
        namespace: service.metadata.namespace.clone(),
        domain_name,
        address,
        change_kind,
    }
}

/// Translate one watch event, advancing `cursor` past it.
///
/// Bookmarks only move the cursor and produce no notification.
pub(crate) fn translate_event(
    event: WatchEvent<Service>,
    annotation_key: &str,
    cursor: &mut String,
) -> Option<WatchNotification> {
    let mut advance = |service: &Service| {
        if let Some(rv) = service.metadata.resource_version.as_ref() {
            cursor.clone_from(rv);
        }
    };

    match event {
        WatchEvent::Added(service) => {
            advance(&service);
            Some(WatchNotification::Added(snapshot_from_service(
                &service,
                ChangeKind::Added,
                annotation_key,
            )))
        }
        WatchEvent::Modified(service) => {
            advance(&service);
            Some(WatchNotification::Modified(snapshot_from_service(
                &service,
                ChangeKind::Modified,
                annotation_key,
            )))
        }
        WatchEvent::Deleted(service) => {
            advance(&service);
            Some(WatchNotification::Deleted(snapshot_from_service(
                &service,
                ChangeKind::Deleted,
                annotation_key,
            )))
        }
        WatchEvent::Bookmark(bookmark) => {
            cursor.clone_from(&bookmark.metadata.resource_version);
            None
        }
        WatchEvent::Error(status) => Some(WatchNotification::Error(WatchStatus {
            code: status.code,
            reason: status.reason.clone(),
            message: status.message.clone(),
        })),
    }
}

/// State threaded through the reopening watch stream.
struct WatchState {
    api: Api<Service>,
    annotation_key: String,
    cursor: String,
    events: Option<BoxStream<'static, kube::Result<WatchEvent<Service>>>>,
    reopen_backoff: Backoff,
    reopening: bool,
    finished: bool,
}

impl WatchState {
    async fn next(mut self) -> Option<(Result<WatchNotification, StreamError>, Self)> {
        loop {
            if self.finished {
                return None;
            }

            if self.events.is_none() {
                if self.reopening {
                    let delay = self
                        .reopen_backoff
                        .next_delay()
                        .unwrap_or(Duration::from_secs(WATCH_REOPEN_MAX_DELAY_SECS));
                    debug!(cursor = %self.cursor, delay = ?delay, "Waiting before reopening watch");
                    tokio::time::sleep(delay).await;
                }

                let params = WatchParams::default().timeout(WATCH_TIMEOUT_SECS);
                match self.api.watch(&params, &self.cursor).await {
                    Ok(events) => {
                        debug!(cursor = %self.cursor, "Opened service watch");
                        self.events = Some(events.boxed());
                    }
                    Err(e) => {
                        self.finished = true;
                        let err = StreamError::WatchFailed {
                            cursor: self.cursor.clone(),
                            reason: e.to_string(),
                        };
                        return Some((Err(err), self));
                    }
                }
            }

            let Some(events) = self.events.as_mut() else {
                continue;
            };

            match events.next().await {
                Some(Ok(event)) => {
                    self.reopen_backoff.reset();
                    let Some(notification) =
                        translate_event(event, &self.annotation_key, &mut self.cursor)
                    else {
                        continue;
                    };
                    if let WatchNotification::Error(status) = &notification {
                        if status.code == WATCH_GONE_STATUS_CODE {
                            self.finished = true;
                        }
                    }
                    return Some((Ok(notification), self));
                }
                Some(Err(e)) => {
                    warn!(cursor = %self.cursor, error = %e, "Failed to decode watch event");
                    let err = StreamError::Decode {
                        reason: e.to_string(),
                    };
                    return Some((Err(err), self));
                }
                None => {
                    debug!(cursor = %self.cursor, "Watch ended by server, reopening");
                    metrics::record_watch_reopened();
                    self.events = None;
                    self.reopening = true;
                }
            }
        }
    }
}

/// [`ServiceSource`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeServiceSource {
    api: Api<Service>,
    annotation_key: String,
    reopen_backoff: RetryPolicy,
}

impl KubeServiceSource {
    /// Watch services in `namespace`, or in every namespace when `None`.
    #[must_use]
    pub fn new(
        client: Client,
        namespace: Option<&str>,
        annotation_key: impl Into<String>,
    ) -> Self {
        let api = match namespace {
            Some(ns) => Api::namespaced(client, ns),
            None => Api::all(client),
        };

        Self {
            api,
            annotation_key: annotation_key.into(),
            reopen_backoff: default_reopen_backoff(),
        }
    }

    /// Override the delay schedule between watch reopens.
    #[must_use]
    pub fn with_reopen_backoff(mut self, reopen_backoff: RetryPolicy) -> Self {
        self.reopen_backoff = reopen_backoff;
        self
    }
}

#[async_trait]
impl ServiceSource for KubeServiceSource {
    async fn list_services(&self) -> Result<ServiceList, StreamError> {
        let mut params = ListParams::default().limit(LIST_PAGE_SIZE);
        let mut cursor: Option<String> = None;
        let mut snapshots = Vec::new();

        loop {
            let page = self
                .api
                .list(&params)
                .await
                .map_err(|e| StreamError::ListFailed {
                    reason: e.to_string(),
                })?;

            if cursor.is_none() {
                cursor.clone_from(&page.metadata.resource_version);
            }
            snapshots.extend(page.items.iter().map(|service| {
                snapshot_from_service(service, ChangeKind::Added, &self.annotation_key)
            }));

            match page.metadata.continue_.as_deref() {
                Some(token) if !token.is_empty() => {
                    params = params.continue_token(token);
                }
                _ => break,
            }
        }

        let cursor = cursor
            .filter(|c| !c.is_empty())
            .ok_or_else(|| StreamError::ListFailed {
                reason: "list response carried no resourceVersion".to_string(),
            })?;

        info!(
            service_count = snapshots.len(),
            cursor = %cursor,
            "Listed services"
        );

        Ok(ServiceList { snapshots, cursor })
    }

    fn watch_services(&self, cursor: String) -> NotificationStream {
        let state = WatchState {
            api: self.api.clone(),
            annotation_key: self.annotation_key.clone(),
            cursor,
            events: None,
            reopen_backoff: self.reopen_backoff.backoff(),
            reopening: false,
            finished: false,
        };

        stream::unfold(state, WatchState::next).boxed()
    }
}

#[cfg(test)]
#[path = "kube_source_tests.rs"]
mod kube_source_tests;
