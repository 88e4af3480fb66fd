// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! HTTP client for the zone catalogue API.
//!
//! The catalogue is served at `GET {base}/api/v1/zones` and returns
//!
//! ```json
//! { "zones": ["example.com", "sub.example.com"] }
//! ```
//!
//! Each request is a single attempt; retrying is left to the reconciler so a
//! zone listing and the mutation that follows it share one retry budget.

use crate::errors::ProviderError;
use crate::retry::is_retryable_http_status;
use crate::zones::{normalize_fqdn, HostedZone};
use reqwest::Client as HttpClient;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::constants::{ZONE_API_LIST_PATH, ZONE_API_TIMEOUT_SECS};

/// Body of the zone listing response.
#[derive(Debug, Deserialize)]
struct ZoneListResponse {
    zones: Vec<String>,
}

/// Build the API base URL from a server address
///
/// Converts "zone-api.dns.svc.cluster.local:8080" or "zone-api:8080"
/// to `<http://zone-api.dns.svc.cluster.local:8080>` or `<http://zone-api:8080>`
pub(crate) fn build_api_url(server: &str) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        server.trim_end_matches('/').to_string()
    } else {
        format!("http://{}", server.trim_end_matches('/'))
    }
}

/// Client for the zone catalogue endpoint.
#[derive(Debug, Clone)]
pub struct ZoneApiClient {
    http: HttpClient,
    list_url: String,
    token: Option<String>,
}

impl ZoneApiClient {
    /// Create a client for the API at `server` (`host:port` or a full URL).
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(server: &str, token: Option<String>) -> reqwest::Result<Self> {
        let http = HttpClient::builder()
            .timeout(Duration::from_secs(ZONE_API_TIMEOUT_SECS))
            .build()?;

        Ok(Self::with_client(http, server, token))
    }

    /// Create a client around an existing HTTP client.
    #[must_use]
    pub fn with_client(http: HttpClient, server: &str, token: Option<String>) -> Self {
        Self {
            http,
            list_url: format!("{}{ZONE_API_LIST_PATH}", build_api_url(server)),
            token,
        }
    }

    /// Endpoint the catalogue is read from.
    #[must_use]
    pub fn list_url(&self) -> &str {
        &self.list_url
    }

    /// Fetch the catalogue, sorted ascending by zone name.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderError::ZoneListFailed`]; the `retryable` flag is set for
    /// connection failures and HTTP 429/5xx responses.
    pub async fn list_zones(&self) -> Result<Vec<HostedZone>, ProviderError> {
        let failed = |reason: String, retryable: bool| ProviderError::ZoneListFailed {
            endpoint: self.list_url.clone(),
            reason,
            retryable,
        };

        let mut request = self.http.get(&self.list_url);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Bearer {token}"));
        }

        debug!(url = %self.list_url, auth_enabled = self.token.is_some(), "Listing hosted zones");

        let response = request
            .send()
            .await
            .map_err(|e| failed(format!("Failed to send HTTP request: {e}"), true))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(
                url = %self.list_url,
                status = %status,
                error = %body,
                "Zone API request failed"
            );
            return Err(failed(
                format!("HTTP {status}: {body}"),
                is_retryable_http_status(status),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| failed(format!("Failed to read response body: {e}"), true))?;
        let parsed: ZoneListResponse = serde_json::from_str(&body)
            .map_err(|e| failed(format!("Invalid zone list response: {e}"), false))?;

        let mut zones: Vec<HostedZone> = parsed
            .zones
            .iter()
            .filter(|name| !name.trim().is_empty())
            .map(|name| {
                let name = normalize_fqdn(name);
                HostedZone {
                    id: name.clone(),
                    name,
                }
            })
            .collect();
        zones.sort_by(|a, b| a.name.cmp(&b.name));

        debug!(url = %self.list_url, zone_count = zones.len(), "Listed hosted zones");
        Ok(zones)
    }
}

#[cfg(test)]
#[path = "zone_api_tests.rs"]
mod zone_api_tests;
