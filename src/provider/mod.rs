// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! DNS provider capability.
//!
//! The reconciler only needs three operations from a DNS provider: list the
//! hosted zones, create-or-replace a record, and delete a record. They are
//! expressed by the [`DnsProvider`] trait so the reconciler can be tested with
//! an in-memory fake and so the concrete backend is injected at startup.
//!
//! The shipped backend is [`rfc2136::Rfc2136Provider`], which sends RFC 2136
//! dynamic updates (optionally TSIG-signed) to an authoritative primary and
//! reads the zone catalogue from either a static list or an HTTP zone API
//! ([`zone_api::ZoneApiClient`]).

pub mod rfc2136;
pub mod tsig;
pub mod zone_api;

use crate::errors::ProviderError;
use crate::zones::HostedZone;
use async_trait::async_trait;
use std::fmt;

/// Record types the controller publishes.
///
/// Only alias-style records are managed; one record per domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordType {
    Cname,
}

impl RecordType {
    /// Wire-format mnemonic.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Cname => "CNAME",
        }
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations the reconciler needs from a DNS provider.
///
/// Mutations must be idempotent: upserting the same record twice, or deleting
/// a record that does not exist, succeeds.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Short provider name for logs.
    fn name(&self) -> &str;

    /// Fetch the hosted zone catalogue, sorted ascending by name.
    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>, ProviderError>;

    /// Create or replace the record `domain_name -> value` in the zone `zone_id`.
    async fn upsert_record(
        &self,
        zone_id: &str,
        domain_name: &str,
        record_type: RecordType,
        value: &str,
        ttl_secs: u32,
    ) -> Result<(), ProviderError>;

    /// Remove the record for `domain_name` from the zone `zone_id`.
    async fn delete_record(
        &self,
        zone_id: &str,
        domain_name: &str,
        record_type: RecordType,
    ) -> Result<(), ProviderError>;
}
