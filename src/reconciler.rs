// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Applies one [`ReconcileAction`] to the DNS provider.
//!
//! For `Upsert` and `Delete` the reconciler fetches the hosted zone catalogue,
//! resolves the governing zone and issues exactly one logical mutation. Each
//! provider call goes through [`retry_provider_call`], so transient failures
//! are retried a bounded number of times before the reconciliation is given up.
//!
//! Failures are returned to the caller, which logs them and moves on; nothing
//! here is fatal to the watch loop.

use crate::classifier::ReconcileAction;
use crate::errors::ReconcileError;
use crate::metrics;
use crate::provider::{DnsProvider, RecordType};
use crate::retry::{retry_provider_call, RetryError, RetryPolicy};
use crate::zones::{resolve, HostedZone};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::constants::DEFAULT_DNS_RECORD_TTL_SECS;

/// What a successful reconciliation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// No provider call was needed
    Skipped,
    /// The record was created or replaced in `zone`
    Upserted { zone: HostedZone },
    /// The record was removed from `zone`
    Deleted { zone: HostedZone },
}

/// Turns reconcile actions into DNS provider calls.
#[derive(Clone)]
pub struct Reconciler {
    provider: Arc<dyn DnsProvider>,
    record_ttl_secs: u32,
    retry: RetryPolicy,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler")
            .field("provider", &self.provider.name())
            .field("record_ttl_secs", &self.record_ttl_secs)
            .field("retry", &self.retry)
            .finish()
    }
}

impl Reconciler {
    /// Create a reconciler with the default TTL and retry policy.
    #[must_use]
    pub fn new(provider: Arc<dyn DnsProvider>) -> Self {
        Self {
            provider,
            record_ttl_secs: DEFAULT_DNS_RECORD_TTL_SECS,
            retry: RetryPolicy::default(),
        }
    }

    /// Override the TTL of published records.
    #[must_use]
    pub fn with_record_ttl(mut self, ttl_secs: u32) -> Self {
        self.record_ttl_secs = ttl_secs;
        self
    }

    /// Override the retry policy for provider calls.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Apply `action`.
    ///
    /// # Errors
    ///
    /// - [`ReconcileError::NoMatchingZone`] if no hosted zone governs the domain
    /// - [`ReconcileError::ProviderCallFailed`] if listing zones or the mutation
    ///   failed after the retry budget was spent
    pub async fn reconcile(
        &self,
        action: &ReconcileAction,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let (domain_name, target) = match action {
            ReconcileAction::Skip => {
                metrics::record_reconciliation_skipped();
                return Ok(ReconcileOutcome::Skipped);
            }
            ReconcileAction::Upsert {
                domain_name,
                target_address,
            } => (domain_name.as_str(), Some(target_address.as_str())),
            ReconcileAction::Delete { domain_name } => (domain_name.as_str(), None),
        };

        let start = Instant::now();
        let result = self.apply(domain_name, target).await;
        let duration = start.elapsed();

        metrics::record_reconciliation(action.kind(), result.is_ok(), duration);
        if let Err(e) = &result {
            metrics::record_error("reconciler", e.reason());
            if let ReconcileError::ProviderCallFailed { source, .. } = e {
                metrics::record_error("provider", source.reason());
            }
        }

        result
    }

    async fn apply(
        &self,
        domain_name: &str,
        target: Option<&str>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let failed = |e: RetryError| ReconcileError::ProviderCallFailed {
            domain: domain_name.to_string(),
            attempts: e.attempts,
            source: e.source,
        };

        let zones = retry_provider_call(&self.retry, "list_hosted_zones", || {
            self.provider.list_hosted_zones()
        })
        .await
        .map_err(failed)?;

        let Some(zone) = resolve(domain_name, &zones) else {
            warn!(
                domain = %domain_name,
                zone_count = zones.len(),
                "No hosted zone governs domain, skipping"
            );
            return Err(ReconcileError::NoMatchingZone {
                domain: domain_name.to_string(),
            });
        };

        debug!(
            domain = %domain_name,
            zone = %zone.name,
            zone_id = %zone.id,
            provider = self.provider.name(),
            "Resolved hosted zone"
        );

        match target {
            Some(target) => {
                retry_provider_call(&self.retry, "upsert_record", || {
                    self.provider.upsert_record(
                        &zone.id,
                        domain_name,
                        RecordType::Cname,
                        target,
                        self.record_ttl_secs,
                    )
                })
                .await
                .map_err(failed)?;

                info!(
                    domain = %domain_name,
                    target = %target,
                    zone = %zone.name,
                    ttl = self.record_ttl_secs,
                    "Upserted {} record",
                    RecordType::Cname
                );
                Ok(ReconcileOutcome::Upserted { zone: zone.clone() })
            }
            None => {
                retry_provider_call(&self.retry, "delete_record", || {
                    self.provider
                        .delete_record(&zone.id, domain_name, RecordType::Cname)
                })
                .await
                .map_err(failed)?;

                info!(
                    domain = %domain_name,
                    zone = %zone.name,
                    "Deleted {} record",
                    RecordType::Cname
                );
                Ok(ReconcileOutcome::Deleted { zone: zone.clone() })
            }
        }
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod reconciler_tests;
