// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Command-line configuration.
//!
//! Every flag can also be given through the environment. [`Args::validate`]
//! checks the combination of flags up front so that a bad configuration fails
//! at startup with a [`ConfigError`] instead of on the first notification.

use crate::errors::ConfigError;
use crate::provider::rfc2136::{Rfc2136Provider, ZoneCatalogue};
use crate::provider::tsig::load_key_file;
use crate::provider::zone_api::ZoneApiClient;
use crate::retry::RetryPolicy;
use clap::Parser;
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::constants::{
    DEFAULT_DNS_RECORD_TTL_SECS, DEFAULT_PROVIDER_MAX_ATTEMPTS, DNS_PORT, DOMAIN_NAME_ANNOTATION,
    METRICS_SERVER_BIND_ADDRESS, METRICS_SERVER_PORT,
};

/// Publish Kubernetes LoadBalancer services as DNS CNAME records
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "svcdns", version, long_about = None)]
pub struct Args {
    /// Path to a kubeconfig file (in-cluster or inferred configuration when unset)
    #[arg(long, env = "KUBECONFIG_FILE")]
    pub kubeconfig: Option<PathBuf>,

    /// Only watch services in this namespace (default: all namespaces)
    #[arg(long, env = "SVCDNS_NAMESPACE")]
    pub namespace: Option<String>,

    /// Service annotation holding the DNS name to publish
    #[arg(long, env = "SVCDNS_ANNOTATION_KEY", default_value = DOMAIN_NAME_ANNOTATION)]
    pub annotation_key: String,

    /// Authoritative primary receiving dynamic updates (IP or IP:port)
    #[arg(long, env = "SVCDNS_DNS_SERVER")]
    pub dns_server: String,

    /// BIND9 key file used to sign updates with TSIG
    #[arg(long, env = "SVCDNS_TSIG_KEY_FILE")]
    pub tsig_key_file: Option<PathBuf>,

    /// Zone catalogue API (host:port or URL)
    #[arg(long, env = "SVCDNS_ZONE_API_URL")]
    pub zone_api_url: Option<String>,

    /// File holding a bearer token for the zone catalogue API
    #[arg(long, env = "SVCDNS_ZONE_API_TOKEN_FILE")]
    pub zone_api_token_file: Option<PathBuf>,

    /// Hosted zone (repeatable); used instead of the zone API
    #[arg(long = "zone", value_name = "ZONE")]
    pub zones: Vec<String>,

    /// TTL of published records in seconds
    #[arg(long, env = "SVCDNS_RECORD_TTL", default_value_t = DEFAULT_DNS_RECORD_TTL_SECS)]
    pub record_ttl: u32,

    /// Attempts per DNS provider call (1 disables retry)
    #[arg(long, env = "SVCDNS_MAX_ATTEMPTS", default_value_t = DEFAULT_PROVIDER_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Reconcile every existing service before streaming changes
    #[arg(long)]
    pub initial_sync: bool,

    /// Address the metrics server binds to
    #[arg(long, env = "SVCDNS_METRICS_BIND_ADDRESS", default_value = METRICS_SERVER_BIND_ADDRESS)]
    pub metrics_bind_address: String,

    /// Port the metrics server listens on
    #[arg(long, env = "SVCDNS_METRICS_PORT", default_value_t = METRICS_SERVER_PORT)]
    pub metrics_port: u16,
}

impl Args {
    /// Check the flags for consistency.
    ///
    /// # Errors
    ///
    /// Returns the first [`ConfigError`] found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_api = self
            .zone_api_url
            .as_deref()
            .is_some_and(|url| !url.trim().is_empty());
        let has_static = self.zones.iter().any(|z| !z.trim().is_empty());

        match (has_api, has_static) {
            (false, false) => return Err(ConfigError::MissingZoneSource),
            (true, true) => return Err(ConfigError::ConflictingZoneSources),
            _ => {}
        }

        if self.zone_api_token_file.is_some() && !has_api {
            return Err(ConfigError::InvalidValue {
                field: "--zone-api-token-file",
                reason: "requires --zone-api-url".to_string(),
            });
        }

        if self.record_ttl == 0 {
            return Err(ConfigError::InvalidValue {
                field: "--record-ttl",
                reason: "must be greater than zero".to_string(),
            });
        }

        if self.max_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "--max-attempts",
                reason: "must be at least 1".to_string(),
            });
        }

        if self.annotation_key.trim().is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "--annotation-key",
                reason: "must not be empty".to_string(),
            });
        }

        self.dns_server_addr()?;
        self.metrics_addr()?;
        Ok(())
    }

    /// Parse `--dns-server`; a bare IP gets the standard DNS port.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDnsServer`] if the value is neither `IP` nor `IP:port`.
    pub fn dns_server_addr(&self) -> Result<SocketAddr, ConfigError> {
        let value = self.dns_server.trim();
        if let Ok(addr) = value.parse::<SocketAddr>() {
            return Ok(addr);
        }

        value
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, DNS_PORT))
            .map_err(|e| ConfigError::InvalidDnsServer {
                address: self.dns_server.clone(),
                reason: e.to_string(),
            })
    }

    /// Address the metrics server binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `--metrics-bind-address` is not an IP.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.metrics_bind_address
            .trim()
            .parse::<IpAddr>()
            .map(|ip| SocketAddr::new(ip, self.metrics_port))
            .map_err(|e| ConfigError::InvalidValue {
                field: "--metrics-bind-address",
                reason: e.to_string(),
            })
    }

    /// Retry policy for provider calls.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::with_max_attempts(self.max_attempts)
    }

    /// Build the zone catalogue from `--zone-api-url` or `--zone`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the token file cannot be read or the HTTP
    /// client cannot be built.
    pub fn zone_catalogue(&self) -> Result<ZoneCatalogue, ConfigError> {
        let Some(url) = self.zone_api_url.as_deref().filter(|u| !u.trim().is_empty()) else {
            return Ok(ZoneCatalogue::from_names(&self.zones));
        };

        let token = match &self.zone_api_token_file {
            Some(path) => Some(read_token_file(path)?),
            None => None,
        };

        let client = ZoneApiClient::new(url.trim(), token).map_err(|e| ConfigError::InvalidValue {
            field: "--zone-api-url",
            reason: e.to_string(),
        })?;
        debug!(url = client.list_url(), "Using zone catalogue API");
        Ok(ZoneCatalogue::Api(client))
    }

    /// Build the DNS provider described by the flags.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid server address, key file, or
    /// zone catalogue.
    pub fn build_provider(&self) -> Result<Rfc2136Provider, ConfigError> {
        let server = self.dns_server_addr()?;
        let tsig_key = self
            .tsig_key_file
            .as_deref()
            .map(load_key_file)
            .transpose()?;

        info!(
            server = %server,
            tsig_key = tsig_key.as_ref().map(|k| k.name.as_str()),
            "Configured RFC 2136 provider"
        );

        Ok(Rfc2136Provider::new(server, tsig_key, self.zone_catalogue()?))
    }
}

fn read_token_file(path: &Path) -> Result<String, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidValue {
        field: "--zone-api-token-file",
        reason,
    };

    let token = std::fs::read_to_string(path)
        .map_err(|e| invalid(format!("{}: {e}", path.display())))?
        .trim()
        .to_string();

    if token.is_empty() {
        return Err(invalid(format!("{} is empty", path.display())));
    }
    Ok(token)
}

/// Install `ring` as the process-wide rustls crypto provider.
///
/// kube and reqwest enable different rustls backends, so none is picked
/// automatically. Calling this more than once is harmless.
pub fn install_crypto_provider() {
    if rustls::crypto::ring::default_provider()
        .install_default()
        .is_err()
    {
        debug!("rustls crypto provider already installed");
    }
}

/// Create the Kubernetes client.
///
/// Uses `kubeconfig` when given, otherwise the in-cluster or inferred
/// configuration.
///
/// # Errors
///
/// Returns [`ConfigError::KubeconfigLoad`] if the file cannot be loaded and
/// [`ConfigError::ClientCreation`] if the client cannot be created.
pub async fn build_kube_client(kubeconfig: Option<&Path>) -> Result<Client, ConfigError> {
    install_crypto_provider();

    let config = match kubeconfig {
        Some(path) => {
            let load_failed = |reason: String| ConfigError::KubeconfigLoad {
                path: path.display().to_string(),
                reason,
            };

            debug!(path = %path.display(), "Loading kubeconfig");
            let kubeconfig = Kubeconfig::read_from(path).map_err(|e| load_failed(e.to_string()))?;
            Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
                .await
                .map_err(|e| load_failed(e.to_string()))?
        }
        None => Config::infer()
            .await
            .map_err(|e| ConfigError::ClientCreation {
                reason: e.to_string(),
            })?,
    };

    Client::try_from(config).map_err(|e| ConfigError::ClientCreation {
        reason: e.to_string(),
    })
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
