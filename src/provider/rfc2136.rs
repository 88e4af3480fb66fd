// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! RFC 2136 dynamic update provider.
//!
//! Records are written to an authoritative primary with DNS UPDATE messages,
//! signed with TSIG when a key is configured:
//!
//! - upsert appends a CNAME with no prerequisites; a CNAME RRset holds a single
//!   record, so the server replaces whatever alias was there before
//! - delete removes the whole CNAME RRset for the name, which succeeds even if
//!   nothing exists
//!
//! The zone catalogue comes from a static list or from the zone HTTP API.

use super::tsig::{create_tsig_signer, TsigKeyData};
use super::zone_api::ZoneApiClient;
use super::{DnsProvider, RecordType};
use crate::errors::ProviderError;
use crate::zones::{normalize_fqdn, HostedZone};
use async_trait::async_trait;
use hickory_client::client::{Client, SyncClient};
use hickory_client::op::ResponseCode;
use hickory_client::rr::{rdata, DNSClass, Name, RData, Record, RecordType as DnsRecordType};
use hickory_client::udp::UdpClientConnection;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::constants::DNS_UPDATE_TIMEOUT_SECS;

/// Where the provider reads hosted zones from.
#[derive(Debug, Clone)]
pub enum ZoneCatalogue {
    /// Fixed list given at startup
    Static(Vec<HostedZone>),
    /// Zone HTTP API
    Api(ZoneApiClient),
}

impl ZoneCatalogue {
    /// Build a static catalogue from zone names; the id of each zone is its
    /// normalized name.
    #[must_use]
    pub fn from_names<S: AsRef<str>>(names: &[S]) -> Self {
        let mut zones: Vec<HostedZone> = names
            .iter()
            .map(|name| normalize_fqdn(name.as_ref()))
            .map(|name| HostedZone {
                id: name.clone(),
                name,
            })
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));
        zones.dedup();
        Self::Static(zones)
    }

    async fn list(&self) -> Result<Vec<HostedZone>, ProviderError> {
        match self {
            Self::Static(zones) => Ok(zones.clone()),
            Self::Api(client) => client.list_zones().await,
        }
    }
}

/// Update operation carried by one DNS UPDATE message.
#[derive(Debug, Clone)]
enum UpdateOp {
    Append(Record),
    DeleteRrset(Record),
}

impl UpdateOp {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Append(_) => "append",
            Self::DeleteRrset(_) => "delete",
        }
    }
}

/// [`DnsProvider`] backed by RFC 2136 dynamic updates.
#[derive(Debug, Clone)]
pub struct Rfc2136Provider {
    server: SocketAddr,
    tsig_key: Option<TsigKeyData>,
    catalogue: ZoneCatalogue,
    timeout: Duration,
}

impl Rfc2136Provider {
    /// Create a provider that updates `server`.
    #[must_use]
    pub fn new(
        server: SocketAddr,
        tsig_key: Option<TsigKeyData>,
        catalogue: ZoneCatalogue,
    ) -> Self {
        Self {
            server,
            tsig_key,
            catalogue,
            timeout: Duration::from_secs(DNS_UPDATE_TIMEOUT_SECS),
        }
    }

    /// Override the per-update timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Server updates are sent to.
    #[must_use]
    pub fn server(&self) -> SocketAddr {
        self.server
    }

    async fn send_update(
        &self,
        zone_id: &str,
        domain_name: &str,
        op: UpdateOp,
    ) -> Result<(), ProviderError> {
        let zone = parse_name(domain_name, zone_id)?;
        let server = self.server;
        let timeout = self.timeout;
        let key_data = self.tsig_key.clone();
        let domain = domain_name.to_string();
        let zone_label = zone.to_string();
        let op_name = op.as_str();

        let transport = |reason: String| ProviderError::Transport {
            domain: domain_name.to_string(),
            server: server.to_string(),
            reason,
        };

        debug!(
            server = %server,
            zone = %zone_label,
            domain = %domain,
            operation = op_name,
            tsig = key_data.is_some(),
            "Sending dynamic DNS update"
        );

        let response_code = tokio::task::spawn_blocking(move || {
            let conn = UdpClientConnection::with_timeout(server, timeout)
                .map_err(|e| format!("Failed to create UDP connection: {e}"))?;

            let client = match key_data {
                Some(key_data) => {
                    let signer = create_tsig_signer(&key_data).map_err(|e| format!("{e:#}"))?;
                    SyncClient::with_tsigner(conn, signer)
                }
                None => SyncClient::new(conn),
            };

            let response = match op {
                UpdateOp::Append(record) => client.append(record, zone, false),
                UpdateOp::DeleteRrset(record) => client.delete_rrset(record, zone),
            }
            .map_err(|e| e.to_string())?;

            Ok::<_, String>(response.response_code())
        })
        .await
        .map_err(|e| transport(format!("Update task failed: {e}")))?
        .map_err(transport)?;

        match response_code {
            ResponseCode::NoError => {
                info!(
                    server = %server,
                    zone = %zone_label,
                    domain = %domain,
                    operation = op_name,
                    "Dynamic DNS update applied"
                );
                Ok(())
            }
            code => Err(ProviderError::UpdateRejected {
                domain,
                zone: zone_label,
                server: server.to_string(),
                rcode: format!("{code:?}"),
                retryable: is_retryable_response_code(code),
            }),
        }
    }
}

#[async_trait]
impl DnsProvider for Rfc2136Provider {
    fn name(&self) -> &str {
        "rfc2136"
    }

    async fn list_hosted_zones(&self) -> Result<Vec<HostedZone>, ProviderError> {
        self.catalogue.list().await
    }

    async fn upsert_record(
        &self,
        zone_id: &str,
        domain_name: &str,
        record_type: RecordType,
        value: &str,
        ttl_secs: u32,
    ) -> Result<(), ProviderError> {
        let record = match record_type {
            RecordType::Cname => build_cname_record(domain_name, value, ttl_secs)?,
        };
        self.send_update(zone_id, domain_name, UpdateOp::Append(record))
            .await
    }

    async fn delete_record(
        &self,
        zone_id: &str,
        domain_name: &str,
        record_type: RecordType,
    ) -> Result<(), ProviderError> {
        let record = match record_type {
            RecordType::Cname => build_delete_record(domain_name, DnsRecordType::CNAME)?,
        };
        self.send_update(zone_id, domain_name, UpdateOp::DeleteRrset(record))
            .await
    }
}

/// Parse `value` as an absolute DNS name, reporting failures against `domain`.
fn parse_name(domain: &str, value: &str) -> Result<Name, ProviderError> {
    Name::from_str(&normalize_fqdn(value)).map_err(|e| ProviderError::InvalidRecord {
        domain: domain.to_string(),
        reason: format!("'{value}' is not a valid DNS name: {e}"),
    })
}

/// Build the CNAME record `domain -> target`.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidRecord`] if either name is not valid DNS.
pub(crate) fn build_cname_record(
    domain: &str,
    target: &str,
    ttl_secs: u32,
) -> Result<Record, ProviderError> {
    let fqdn = parse_name(domain, domain)?;
    let target_name = parse_name(domain, target)?;

    let mut record = Record::from_rdata(fqdn, ttl_secs, RData::CNAME(rdata::CNAME(target_name)));
    record.set_dns_class(DNSClass::IN);
    Ok(record)
}

/// Build the record that identifies the RRset to remove for `domain`.
///
/// # Errors
///
/// Returns [`ProviderError::InvalidRecord`] if the name is not valid DNS.
pub(crate) fn build_delete_record(
    domain: &str,
    record_type: DnsRecordType,
) -> Result<Record, ProviderError> {
    let fqdn = parse_name(domain, domain)?;

    let mut record = Record::with(fqdn, record_type, 0);
    record.set_dns_class(DNSClass::IN);
    Ok(record)
}

/// Whether an update rejected with `code` may succeed if sent again.
#[must_use]
pub(crate) fn is_retryable_response_code(code: ResponseCode) -> bool {
    matches!(code, ResponseCode::ServFail)
}

#[cfg(test)]
#[path = "rfc2136_tests.rs"]
mod rfc2136_tests;
